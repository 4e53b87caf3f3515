use serde::{Deserialize, Serialize};
use crate::error::WaveformError;

/// High on each [start, end) window. Overlapping or touching windows are merged so that
/// every stored window is one rising edge.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct TtlPulses {
    windows:Vec<(f64,f64)>,
}

impl TtlPulses {
    pub fn new(windows:&[(f64,f64)]) -> Result<Self,WaveformError> {
        for (start,end) in windows {
            if end <= start {
                return Err(WaveformError::InvalidWindow{start:*start,end:*end});
            }
        }
        let mut sorted = windows.to_vec();
        sorted.sort_by(|a,b| a.0.total_cmp(&b.0));
        let mut merged:Vec<(f64,f64)> = Vec::with_capacity(sorted.len());
        for (start,end) in sorted {
            match merged.last_mut() {
                Some(last) if start <= last.1 => last.1 = last.1.max(end),
                _=> merged.push((start,end))
            }
        }
        Ok(Self{windows:merged})
    }

    pub fn single(start:f64,end:f64) -> Result<Self,WaveformError> {
        Self::new(&[(start,end)])
    }

    pub fn windows(&self) -> &[(f64,f64)] {
        &self.windows
    }
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct TtlMultiFunctions {
    pub functions:Vec<TtlFunction>,
    pub start_times:Vec<f64>,
    pub end_times:Vec<f64>,
}

impl TtlMultiFunctions {
    pub fn new(functions:Vec<TtlFunction>,start_times:Vec<f64>,end_times:Vec<f64>) -> Result<Self,WaveformError> {
        if functions.len() != start_times.len() || functions.len() != end_times.len() {
            return Err(WaveformError::WindowCountMismatch{functions:functions.len(),windows:start_times.len().min(end_times.len())});
        }
        for k in 0..start_times.len() {
            if end_times[k] <= start_times[k] {
                return Err(WaveformError::InvalidWindow{start:start_times[k],end:end_times[k]});
            }
            if k > 0 && start_times[k] < end_times[k-1] {
                return Err(WaveformError::OverlappingWindows(k));
            }
        }
        Ok(Self{functions,start_times,end_times})
    }
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
#[serde(tag = "function")]
pub enum TtlFunction {
    Off,
    On,
    Pulses(TtlPulses),
    MultiFunctions(TtlMultiFunctions),
}

impl TtlFunction {
    pub fn pulses(windows:&[(f64,f64)]) -> Result<Self,WaveformError> {
        Ok(TtlFunction::Pulses(TtlPulses::new(windows)?))
    }

    pub fn output(&self,times:&[f64]) -> Vec<bool> {
        match self {
            TtlFunction::Off => vec![false;times.len()],
            TtlFunction::On => vec![true;times.len()],
            TtlFunction::Pulses(p) => {
                times.iter().map(|t| p.windows.iter().any(|(s,e)| t >= s && t < e)).collect()
            }
            TtlFunction::MultiFunctions(m) => {
                let mut out = vec![false;times.len()];
                for (k,function) in m.functions.iter().enumerate() {
                    let (start,end) = (m.start_times[k],m.end_times[k]);
                    let indices:Vec<usize> = times.iter().enumerate()
                        .filter(|(_,t)| **t >= start && **t < end)
                        .map(|(i,_)| i).collect();
                    let shifted:Vec<f64> = indices.iter().map(|i| times[*i] - start).collect();
                    let values = function.output(&shifted);
                    indices.iter().zip(values).for_each(|(i,v)| out[*i] = v);
                }
                out
            }
        }
    }

    pub fn min_duration(&self) -> f64 {
        match self {
            TtlFunction::Off | TtlFunction::On => 0.0,
            TtlFunction::Pulses(p) => p.windows.iter().map(|w| w.1).fold(0.0,f64::max),
            TtlFunction::MultiFunctions(m) => m.end_times.iter().cloned().fold(0.0,f64::max)
        }
    }

    /// rising edges produced by one replay of the function
    pub fn trigger_count(&self) -> usize {
        match self {
            TtlFunction::Off | TtlFunction::On => 0,
            TtlFunction::Pulses(p) => p.windows.len(),
            TtlFunction::MultiFunctions(m) => m.functions.iter().map(|f| f.trigger_count()).sum()
        }
    }

    pub fn is_off(&self) -> bool {
        matches!(self,TtlFunction::Off)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulses_are_half_open(){
        let f = TtlFunction::pulses(&[(1.0,2.0)]).unwrap();
        assert_eq!(f.output(&[0.5,1.0,1.5,2.0]),vec![false,true,true,false]);
        assert_eq!(f.min_duration(),2.0);
    }

    #[test]
    fn overlapping_pulses_merge_into_one_trigger(){
        let f = TtlFunction::pulses(&[(3.0,4.0),(0.0,1.0),(0.5,2.0)]).unwrap();
        assert_eq!(f.trigger_count(),2);
        match &f {
            TtlFunction::Pulses(p) => assert_eq!(p.windows(),&[(0.0,2.0),(3.0,4.0)]),
            _=> panic!("expected pulses")
        }
    }

    #[test]
    fn levels_have_no_triggers(){
        assert_eq!(TtlFunction::On.trigger_count(),0);
        assert_eq!(TtlFunction::Off.trigger_count(),0);
        assert_eq!(TtlFunction::On.output(&[0.0,1.0]),vec![true,true]);
    }

    #[test]
    fn multi_functions_sum_triggers(){
        let inner = TtlFunction::pulses(&[(0.0,1E-6)]).unwrap();
        let m = TtlMultiFunctions::new(vec![inner.clone(),TtlFunction::On,inner],vec![0.0,2E-6,4E-6],vec![2E-6,4E-6,6E-6]).unwrap();
        let f = TtlFunction::MultiFunctions(m);
        assert_eq!(f.trigger_count(),2);
        assert_eq!(f.output(&[0.5E-6,1.5E-6,3E-6,4.5E-6,5.5E-6]),vec![true,false,true,true,false]);
        assert_eq!(f.min_duration(),6E-6);
    }

    #[test]
    fn reversed_window_is_rejected(){
        assert!(TtlPulses::single(2.0,1.0).is_err());
    }
}
