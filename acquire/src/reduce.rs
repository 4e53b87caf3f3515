use indexmap::IndexMap;
use ndarray::{concatenate, s, Array2, ArrayView2, Axis};
use crate::error::ConfigurationError;

/// Per record and window averages of one digitizer channel, [records, windows], with the
/// standard error of each window's samples alongside.
#[derive(Clone,Debug,PartialEq)]
pub struct WindowAverages {
    pub averages:Array2<f64>,
    pub errors:Array2<f64>,
}

impl WindowAverages {
    pub fn num_of_records(&self) -> usize {
        self.averages.nrows()
    }

    pub fn num_of_windows(&self) -> usize {
        self.averages.ncols()
    }

    /// stacks batches along the record axis, keeping capture order
    pub fn concatenate(batches:&[WindowAverages]) -> Result<Self,ConfigurationError> {
        let averages:Vec<ArrayView2<f64>> = batches.iter().map(|b| b.averages.view()).collect();
        let errors:Vec<ArrayView2<f64>> = batches.iter().map(|b| b.errors.view()).collect();
        Ok(Self {
            averages:concat_records(&averages)?,
            errors:concat_records(&errors)?,
        })
    }
}

pub(crate) fn concat_records(views:&[ArrayView2<f64>]) -> Result<Array2<f64>,ConfigurationError> {
    concatenate(Axis(0),views).map_err(|e| ConfigurationError::BatchShape(e.to_string()))
}

/// sample index ranges of the detect windows, int(t sr) for both ends
pub fn window_bounds(windows:&[(f64,f64)],sample_rate:f64,samples:usize) -> Result<Vec<(usize,usize)>,ConfigurationError> {
    windows.iter().enumerate().map(|(i,(start,end))| {
        let (a,b) = ((start*sample_rate) as usize,(end*sample_rate) as usize);
        if b <= a {
            Err(ConfigurationError::EmptyWindow(i))
        }else if b > samples {
            Err(ConfigurationError::WindowOutOfRecord{window:i,start:a,end:b,samples})
        }else {
            Ok((a,b))
        }
    }).collect()
}

/// Averages every record over each detect window.
pub fn bin_and_average(data:&Array2<f64>,sample_rate:f64,windows:&[(f64,f64)]) -> Result<WindowAverages,ConfigurationError> {
    let bounds = window_bounds(windows,sample_rate,data.ncols())?;
    let mut averages = Array2::<f64>::zeros((data.nrows(),bounds.len()));
    let mut errors = Array2::<f64>::zeros((data.nrows(),bounds.len()));
    for (w,(a,b)) in bounds.iter().enumerate() {
        for (r,record) in data.slice(s![..,*a..*b]).outer_iter().enumerate() {
            let samples:Vec<f64> = record.iter().cloned().collect();
            averages[[r,w]] = utils::mean(&samples);
            errors[[r,w]] = utils::sample_standard_error(&samples);
        }
    }
    Ok(WindowAverages{averages,errors})
}

/// Splits records into the contiguous runs named by the detect groups.
pub fn group_data_by_detects(data:&Array2<f64>,groups:&[(String,usize)]) -> Result<IndexMap<String,Array2<f64>>,ConfigurationError> {
    let expected:usize = groups.iter().map(|(_,n)| n).sum();
    if expected != data.nrows() {
        return Err(ConfigurationError::GroupCountMismatch{expected,found:data.nrows()});
    }
    let mut grouped = IndexMap::new();
    let mut index = 0;
    for (label,count) in groups {
        if grouped.contains_key(label) {
            return Err(ConfigurationError::DuplicateGroup(label.clone()));
        }
        grouped.insert(label.clone(),data.slice(s![index..index + count,..]).to_owned());
        index += count;
    }
    Ok(grouped)
}
