use std::time::Duration;
use log::debug;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use seq_tools::program::CompiledProgram;
use crate::error::AcquireError;

/*
 The two instruments of an acquisition. The waveform generator replays a compiled program
 autonomously once started. The digitizer captures one record per trigger pulse and hands
 the records back as [records, samples] arrays, one per channel.
 */

pub trait PlaybackDevice {
    fn open(&mut self) -> Result<(),AcquireError> {
        Ok(())
    }
    fn close(&mut self) -> Result<(),AcquireError> {
        Ok(())
    }
    /// uploads segments and steps
    fn setup(&mut self,program:&CompiledProgram) -> Result<(),AcquireError>;
    /// replaces only the step table, the segment memory stays as it is
    fn update_steps(&mut self,program:&CompiledProgram) -> Result<(),AcquireError>;
    fn start(&mut self) -> Result<(),AcquireError>;
    fn wait_for_complete(&mut self) -> Result<(),AcquireError>;
    fn stop(&mut self) -> Result<(),AcquireError>;
}

pub trait CaptureDevice {
    fn open(&mut self) -> Result<(),AcquireError> {
        Ok(())
    }
    fn close(&mut self) -> Result<(),AcquireError> {
        Ok(())
    }
    fn configure(&mut self,config:&CaptureConfig) -> Result<(),AcquireError>;
    fn arm(&mut self) -> Result<(),AcquireError>;
    /// false when the timeout passed before the data was ready
    fn wait_for_data_ready(&mut self,timeout:Duration) -> Result<bool,AcquireError>;
    fn get_data(&mut self) -> Result<CaptureData,AcquireError>;
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct CaptureConfig {
    pub sample_rate:f64,
    pub channels:Vec<usize>,
    pub voltage_range:f64,
    pub samples_per_record:usize,
    pub num_of_records:usize,
}

impl CaptureConfig {
    /// Enough samples per record to cover the digitizer duration of the program, and one record
    /// per trigger for every replay in a transfer.
    pub fn for_program(sample_rate:f64,channels:&[usize],voltage_range:f64,program:&CompiledProgram,replays_per_transfer:usize) -> Self {
        let samples_per_record = (program.analysis.digitizer_duration*sample_rate).ceil() as usize;
        Self {
            sample_rate,
            channels:channels.to_vec(),
            voltage_range,
            samples_per_record,
            num_of_records:program.num_of_records()*replays_per_transfer,
        }
    }
}

#[derive(Clone,Debug,PartialEq)]
pub struct CaptureData {
    pub sample_rate:f64,
    pub channels:Vec<Array2<f64>>,
}

impl CaptureData {
    pub fn num_of_records(&self) -> usize {
        self.channels.first().map_or(0,|c| c.nrows())
    }

    pub fn channel(&self,index:usize) -> Result<&Array2<f64>,AcquireError> {
        self.channels.get(index).ok_or_else(|| crate::error::ConfigurationError::MissingChannel{
            channel:index,
            available:self.channels.len()
        }.into())
    }
}

/// Owns both instruments for the duration of an acquisition session.
pub struct Apparatus<P:PlaybackDevice,C:CaptureDevice> {
    playback:P,
    capture:C,
}

impl<P:PlaybackDevice,C:CaptureDevice> Apparatus<P,C> {
    pub fn open(mut playback:P,mut capture:C) -> Result<Self,AcquireError> {
        playback.open()?;
        if let Err(e) = capture.open() {
            playback.close()?;
            return Err(e);
        }
        debug!("apparatus opened");
        Ok(Self{playback,capture})
    }

    pub fn playback(&mut self) -> &mut P {
        &mut self.playback
    }

    pub fn capture(&mut self) -> &mut C {
        &mut self.capture
    }

    /// closes both devices and hands them back
    pub fn close(mut self) -> Result<(P,C),AcquireError> {
        let playback_result = self.playback.close();
        self.capture.close()?;
        playback_result?;
        debug!("apparatus closed");
        Ok((self.playback,self.capture))
    }
}
