use std::f64::consts::PI;
use std::time::Duration;
use log::{debug, info};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use seq_tools::error::SequenceError;
use seq_tools::program::CompiledProgram;
use crate::device::{CaptureConfig, CaptureData, CaptureDevice, PlaybackDevice};
use crate::error::AcquireError;

/// Stands in for the waveform generator. Keeps the uploaded program and counts replays.
#[derive(Clone,Debug,Default)]
pub struct SimulatedAwg {
    program:Option<CompiledProgram>,
    running:bool,
    replays:usize,
    played_time:f64,
    uploads:usize,
    step_updates:usize,
    fail_after:Option<usize>,
}

impl SimulatedAwg {
    pub fn new() -> Self {
        Self::default()
    }

    /// the sequencer reports an error once this many replays have completed
    pub fn failing_after(mut self,replays:usize) -> Self {
        self.fail_after = Some(replays);
        self
    }

    pub fn program(&self) -> Option<&CompiledProgram> {
        self.program.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// full uploads and step table updates received so far
    pub fn uploads(&self) -> (usize,usize) {
        (self.uploads,self.step_updates)
    }

    pub fn replays(&self) -> usize {
        self.replays
    }

    /// sequencer time spent replaying so far
    pub fn played_time(&self) -> f64 {
        self.played_time
    }

    fn loaded(&self) -> Result<&CompiledProgram,AcquireError> {
        self.program.as_ref().ok_or(AcquireError::Device("no program uploaded".to_string()))
    }
}

impl PlaybackDevice for SimulatedAwg {
    fn setup(&mut self,program:&CompiledProgram) -> Result<(),AcquireError> {
        debug!("simulated awg: {} segments, {} steps uploaded",program.segments.len(),program.steps.len());
        self.program = Some(program.clone());
        self.uploads += 1;
        Ok(())
    }

    fn update_steps(&mut self,program:&CompiledProgram) -> Result<(),AcquireError> {
        let loaded = self.loaded()?;
        if let Some((name,_)) = program.segments.iter().find(|(name,seg)| loaded.segments.get(*name) != Some(*seg)) {
            return Err(SequenceError::SegmentTableChanged(name.clone()).into());
        }
        let segments = loaded.segments.clone();
        debug!("simulated awg: step table of {} steps updated",program.steps.len());
        self.program = Some(CompiledProgram{segments,..program.clone()});
        self.step_updates += 1;
        Ok(())
    }

    fn start(&mut self) -> Result<(),AcquireError> {
        self.loaded()?;
        self.running = true;
        Ok(())
    }

    fn wait_for_complete(&mut self) -> Result<(),AcquireError> {
        if !self.running {
            return Err(AcquireError::Device("sequence was not started".to_string()));
        }
        if self.fail_after.map_or(false,|n| self.replays >= n) {
            return Err(AcquireError::Device("sequencer stopped responding".to_string()));
        }
        let duration = self.loaded()?.total_duration();
        self.played_time += duration;
        self.replays += 1;
        self.running = false;
        Ok(())
    }

    fn stop(&mut self) -> Result<(),AcquireError> {
        self.running = false;
        Ok(())
    }
}

/// A digitizer input: a dc level plus an optional tone.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct SimulatedChannel {
    pub level:f64,
    pub tone_amplitude:f64,
    pub tone_frequency:f64,
}

impl SimulatedChannel {
    pub fn constant(level:f64) -> Self {
        Self{level,tone_amplitude:0.0,tone_frequency:0.0}
    }

    fn value(&self,t:f64) -> f64 {
        self.level + self.tone_amplitude*(2.0*PI*self.tone_frequency*t).sin()
    }
}

/// Stands in for the digitizer. Records follow each other every record_period seconds.
#[derive(Clone,Debug)]
pub struct SimulatedDigitizer {
    inputs:Vec<SimulatedChannel>,
    record_period:f64,
    time_out:bool,
    config:Option<CaptureConfig>,
    armed:bool,
    records_delivered:usize,
}

impl SimulatedDigitizer {
    pub fn new(inputs:Vec<SimulatedChannel>,record_period:f64) -> Self {
        Self {
            inputs,
            record_period,
            time_out:false,
            config:None,
            armed:false,
            records_delivered:0,
        }
    }

    /// never reports data as ready
    pub fn timing_out(mut self) -> Self {
        self.time_out = true;
        self
    }

    pub fn config(&self) -> Option<&CaptureConfig> {
        self.config.as_ref()
    }

    fn record(&self,input:&SimulatedChannel,record:usize,samples:usize,sample_rate:f64) -> Vec<f64> {
        let t0 = record as f64*self.record_period;
        (0..samples).map(|j| input.value(t0 + j as f64/sample_rate)).collect()
    }
}

impl CaptureDevice for SimulatedDigitizer {
    fn configure(&mut self,config:&CaptureConfig) -> Result<(),AcquireError> {
        if let Some(c) = config.channels.iter().find(|c| **c >= self.inputs.len()) {
            return Err(AcquireError::Device(format!("digitizer has no input {}",c)));
        }
        debug!("simulated digitizer: {} records of {} samples",config.num_of_records,config.samples_per_record);
        self.config = Some(config.clone());
        Ok(())
    }

    fn arm(&mut self) -> Result<(),AcquireError> {
        if self.config.is_none() {
            return Err(AcquireError::Device("digitizer armed before it was configured".to_string()));
        }
        self.armed = true;
        Ok(())
    }

    fn wait_for_data_ready(&mut self,timeout:Duration) -> Result<bool,AcquireError> {
        if !self.armed {
            return Err(AcquireError::Device("digitizer is not armed".to_string()));
        }
        if self.time_out {
            info!("simulated digitizer: no data within {:?}",timeout);
        }
        Ok(!self.time_out)
    }

    fn get_data(&mut self) -> Result<CaptureData,AcquireError> {
        let config = self.config.as_ref().ok_or(AcquireError::Device("digitizer is not configured".to_string()))?;
        let (records,samples) = (config.num_of_records,config.samples_per_record);
        let mut channels = vec![];
        for c in &config.channels {
            let flat:Vec<f64> = (0..records)
                .flat_map(|r| self.record(&self.inputs[*c],self.records_delivered + r,samples,config.sample_rate))
                .collect();
            let array = Array2::from_shape_vec((records,samples),flat)
                .map_err(|e| AcquireError::Device(e.to_string()))?;
            channels.push(array);
        }
        self.records_delivered += records;
        Ok(CaptureData{sample_rate:config.sample_rate,channels})
    }
}
