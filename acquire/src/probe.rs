use indexmap::IndexMap;
use log::warn;
use ndarray::{Array1, Array2, Array3, ArrayD, Axis};
use serde::{Deserialize, Serialize};
use crate::error::ConfigurationError;
use crate::reduce::WindowAverages;

/*
 Statistics over repeated detects. Records cycle through the detect groups in order, so with
 groups [("a",2),("b",1)] records go a a b a a b ... Each group is arranged as
 [repeat, sub repeat, window], a repeat being one pass through the cycle.
 */

#[derive(Clone,Copy,Debug,PartialEq,Eq,Serialize,Deserialize)]
pub enum StatisticsMode {
    /// over repeats and sub repeats
    All,
    /// over repeats only, sub repeats kept apart
    ProbeRepeats,
}

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum Channel {
    Signal,
    Monitor,
}

/// Results that were computed but deserve a second look.
#[derive(Clone,Debug,PartialEq,Eq)]
pub enum StatisticalNotice {
    /// one sample only, the error is the spread within the detect window
    SingleRepeat{label:String,mode:StatisticsMode},
    /// the monitor averaged to zero so the ratio is undefined
    ZeroMonitor{label:String},
}

#[derive(Clone,Debug,PartialEq)]
struct Grouped {
    averages:Array3<f64>,
    errors:Array3<f64>,
}

#[derive(Clone,Debug)]
pub struct Probe {
    signal:IndexMap<String,Grouped>,
    monitor:IndexMap<String,Grouped>,
    notices:Vec<StatisticalNotice>,
}

fn cycle(data:&Array2<f64>,groups:&[(String,usize)]) -> Result<IndexMap<String,Array3<f64>>,ConfigurationError> {
    let period:usize = groups.iter().map(|(_,n)| n).sum();
    if period == 0 || data.nrows() % period != 0 || data.nrows() == 0 {
        return Err(ConfigurationError::IncompleteCycle{cycle:period,found:data.nrows()});
    }
    let repeats = data.nrows()/period;
    let windows = data.ncols();
    let mut out = IndexMap::new();
    let mut offset = 0;
    for (label,count) in groups {
        if out.contains_key(label) {
            return Err(ConfigurationError::DuplicateGroup(label.clone()));
        }
        if *count == 0 {
            return Err(ConfigurationError::EmptyGroup(label.clone()));
        }
        let grouped = Array3::from_shape_fn((repeats,*count,windows),|(r,k,w)| data[[r*period + offset + k,w]]);
        out.insert(label.clone(),grouped);
        offset += count;
    }
    Ok(out)
}

fn group(data:&WindowAverages,groups:&[(String,usize)]) -> Result<IndexMap<String,Grouped>,ConfigurationError> {
    let averages = cycle(&data.averages,groups)?;
    let mut errors = cycle(&data.errors,groups)?;
    Ok(averages.into_iter().map(|(label,a)| {
        let e = errors.swap_remove(&label).unwrap_or_else(|| Array3::zeros(a.dim()));
        (label,Grouped{averages:a,errors:e})
    }).collect())
}

fn standard_error(values:&[f64]) -> f64 {
    utils::sample_standard_error(values)
}

impl Probe {
    pub fn new(signal:&WindowAverages,monitor:&WindowAverages,groups:&[(String,usize)]) -> Result<Self,ConfigurationError> {
        Ok(Self {
            signal:group(signal,groups)?,
            monitor:group(monitor,groups)?,
            notices:vec![],
        })
    }

    pub fn labels(&self) -> Vec<&str> {
        self.signal.keys().map(|k| k.as_str()).collect()
    }

    /// number of repeats and sub repeats of a group
    pub fn shape(&self,label:&str) -> Result<(usize,usize),ConfigurationError> {
        let (r,k,_) = self.grouped(label,Channel::Signal)?.averages.dim();
        Ok((r,k))
    }

    pub fn notices(&self) -> &[StatisticalNotice] {
        &self.notices
    }

    fn grouped(&self,label:&str,channel:Channel) -> Result<&Grouped,ConfigurationError> {
        let map = match channel {
            Channel::Signal => &self.signal,
            Channel::Monitor => &self.monitor,
        };
        map.get(label).ok_or(ConfigurationError::UnknownGroup(label.to_string()))
    }

    /// [windows] for All, [sub repeats, windows] for ProbeRepeats
    pub fn averages(&self,label:&str,channel:Channel,mode:StatisticsMode) -> Result<ArrayD<f64>,ConfigurationError> {
        let data = &self.grouped(label,channel)?.averages;
        Ok(match mode {
            StatisticsMode::All => {
                Array1::from_iter(data.axis_iter(Axis(2)).map(|w| utils::mean(&w.iter().cloned().collect::<Vec<f64>>()))).into_dyn()
            }
            StatisticsMode::ProbeRepeats => {
                data.map_axis(Axis(0),|lane| utils::mean(&lane.to_vec())).into_dyn()
            }
        })
    }

    /// Standard error of the mean, std/sqrt(n-1) over the reduced axes. With one sample the
    /// spread within its detect window stands in, and a notice is kept.
    pub fn errors(&mut self,label:&str,channel:Channel,mode:StatisticsMode) -> Result<ArrayD<f64>,ConfigurationError> {
        let grouped = self.grouped(label,channel)?;
        let (repeats,sub_repeats,_) = grouped.averages.dim();
        let (result,single) = match mode {
            StatisticsMode::All if repeats*sub_repeats > 1 => {
                let e = grouped.averages.axis_iter(Axis(2)).map(|w| standard_error(&w.iter().cloned().collect::<Vec<f64>>()));
                (Array1::from_iter(e).into_dyn(),false)
            }
            StatisticsMode::All => {
                (grouped.errors.index_axis(Axis(0),0).index_axis(Axis(0),0).to_owned().into_dyn(),true)
            }
            StatisticsMode::ProbeRepeats if repeats > 1 => {
                (grouped.averages.map_axis(Axis(0),|lane| standard_error(&lane.to_vec())).into_dyn(),false)
            }
            StatisticsMode::ProbeRepeats => {
                (grouped.errors.index_axis(Axis(0),0).to_owned().into_dyn(),true)
            }
        };
        if single {
            warn!("group {} has a single sample, using the spread within the detect window as its error",label);
            self.notices.push(StatisticalNotice::SingleRepeat{label:label.to_string(),mode});
        }
        Ok(result)
    }

    /// Signal over monitor and its propagated error.
    pub fn ratio(&mut self,label:&str,mode:StatisticsMode) -> Result<(ArrayD<f64>,ArrayD<f64>),ConfigurationError> {
        let s = self.averages(label,Channel::Signal,mode)?;
        let m = self.averages(label,Channel::Monitor,mode)?;
        let s_err = self.errors(label,Channel::Signal,mode)?;
        let m_err = self.errors(label,Channel::Monitor,mode)?;
        let mut ratio = s.clone();
        let mut error = s.clone();
        let mut zero_monitor = false;
        for (((r,e),(s,m)),(se,me)) in ratio.iter_mut().zip(error.iter_mut())
            .zip(s.iter().zip(m.iter()))
            .zip(s_err.iter().zip(m_err.iter())) {
            if *m == 0.0 {
                zero_monitor = true;
                *r = f64::NAN;
                *e = f64::NAN;
            }else {
                *r = s/m;
                *e = ((se/m).powi(2) + (s*me/(m*m)).powi(2)).sqrt();
            }
        }
        if zero_monitor {
            warn!("monitor of group {} averages to zero",label);
            self.notices.push(StatisticalNotice::ZeroMonitor{label:label.to_string()});
        }
        Ok((ratio,error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn averages(a:Array2<f64>) -> WindowAverages {
        let errors = Array2::from_elem(a.dim(),0.01);
        WindowAverages{averages:a,errors}
    }

    #[test]
    fn records_cycle_through_groups(){
        // a a b a a b
        let signal = averages(array![[1.0],[2.0],[10.0],[3.0],[4.0],[20.0]]);
        let groups = vec![("a".to_string(),2),("b".to_string(),1)];
        let mut probe = Probe::new(&signal,&signal,&groups).unwrap();
        assert_eq!(probe.shape("a").unwrap(),(2,2));
        assert_eq!(probe.averages("a",Channel::Signal,StatisticsMode::All).unwrap(),array![2.5].into_dyn());
        assert_eq!(probe.averages("a",Channel::Signal,StatisticsMode::ProbeRepeats).unwrap(),array![[2.0],[3.0]].into_dyn());
        assert_eq!(probe.averages("b",Channel::Signal,StatisticsMode::All).unwrap(),array![15.0].into_dyn());
        // std of [10,20] is 5, over sqrt(1)
        assert_eq!(probe.errors("b",Channel::Signal,StatisticsMode::All).unwrap(),array![5.0].into_dyn());
        assert!(probe.notices().is_empty());
        assert_eq!(probe.labels(),vec!["a","b"]);
    }

    #[test]
    fn single_repeat_falls_back_to_window_spread(){
        let signal = averages(array![[1.0,2.0]]);
        let groups = vec![("only".to_string(),1)];
        let mut probe = Probe::new(&signal,&signal,&groups).unwrap();
        let e = probe.errors("only",Channel::Signal,StatisticsMode::All).unwrap();
        assert_eq!(e,array![0.01,0.01].into_dyn());
        assert_eq!(probe.notices(),&[StatisticalNotice::SingleRepeat{label:"only".to_string(),mode:StatisticsMode::All}]);
    }

    #[test]
    fn ratio_of_clean_signals_has_no_error(){
        let signal = WindowAverages{averages:Array2::from_elem((4,2),0.5),errors:Array2::zeros((4,2))};
        let monitor = WindowAverages{averages:Array2::from_elem((4,2),1.0),errors:Array2::zeros((4,2))};
        let mut probe = Probe::new(&signal,&monitor,&[("p".to_string(),2)]).unwrap();
        let (ratio,error) = probe.ratio("p",StatisticsMode::All).unwrap();
        assert_eq!(ratio,array![0.5,0.5].into_dyn());
        assert_eq!(error,array![0.0,0.0].into_dyn());
    }

    #[test]
    fn ratio_error_propagates(){
        let signal = averages(array![[1.0],[3.0]]);
        let monitor = averages(array![[2.0],[2.0]]);
        let mut probe = Probe::new(&signal,&monitor,&[("p".to_string(),1)]).unwrap();
        let (ratio,error) = probe.ratio("p",StatisticsMode::All).unwrap();
        assert_eq!(ratio,array![1.0].into_dyn());
        // signal error is 1, monitor error 0
        assert!((error[[0]] - 0.5).abs() < 1E-12);
    }

    #[test]
    fn zero_monitor_gives_nan(){
        let signal = averages(array![[1.0],[1.0]]);
        let monitor = averages(array![[0.0],[0.0]]);
        let mut probe = Probe::new(&signal,&monitor,&[("p".to_string(),1)]).unwrap();
        let (ratio,_) = probe.ratio("p",StatisticsMode::All).unwrap();
        assert!(ratio[[0]].is_nan());
        assert!(probe.notices().contains(&StatisticalNotice::ZeroMonitor{label:"p".to_string()}));
    }

    #[test]
    fn groups_without_records_are_rejected(){
        let signal = averages(array![[1.0,2.0],[3.0,4.0]]);
        let groups = vec![("a".to_string(),2),("b".to_string(),0)];
        let result = Probe::new(&signal,&signal,&groups);
        assert_eq!(result.err(),Some(ConfigurationError::EmptyGroup("b".to_string())));
    }

    #[test]
    fn incomplete_cycles_are_rejected(){
        let signal = averages(array![[1.0],[2.0],[3.0]]);
        let result = Probe::new(&signal,&signal,&[("a".to_string(),2)]);
        assert_eq!(result.err(),Some(ConfigurationError::IncompleteCycle{cycle:2,found:3}));
        let result = Probe::new(&signal,&signal,&[("a".to_string(),3)]);
        assert_eq!(result.unwrap().errors("x",Channel::Signal,StatisticsMode::All),Err(ConfigurationError::UnknownGroup("x".to_string())));
    }
}
