use serde::{Deserialize, Serialize};

/// What the reduction step needs to know about a compiled sequence.
#[derive(Clone,Debug,Default,PartialEq,Serialize,Deserialize)]
pub struct AnalysisMetadata {
    /// keep raw traces instead of window averages
    pub fid:bool,
    pub digitizer_duration:f64,
    /// [start, end) of every detect window, relative to the digitizer trigger
    pub detect_pulse_times:Vec<(f64,f64)>,
    pub detect_detunings:Vec<f64>,
    /// (label, number of records) in the order the records are captured
    pub detect_groups:Vec<(String,usize)>,
}

impl AnalysisMetadata {
    pub fn new(digitizer_duration:f64,detect_pulse_times:Vec<(f64,f64)>,detect_detunings:Vec<f64>) -> Self {
        Self {
            fid:false,
            digitizer_duration,
            detect_pulse_times,
            detect_detunings,
            detect_groups:vec![],
        }
    }

    pub fn add_detect_group(&mut self,label:&str,count:usize) {
        self.detect_groups.push((label.to_string(),count));
    }

    pub fn num_of_record_cycles(&self) -> usize {
        self.detect_groups.iter().map(|(_,n)| n).sum()
    }

    pub fn n_windows(&self) -> usize {
        self.detect_pulse_times.len()
    }
}
