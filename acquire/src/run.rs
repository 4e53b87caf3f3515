use std::thread;
use std::time::Duration;
use chrono::{DateTime, Local};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use seq_tools::program::CompiledProgram;
use crate::config::DigitizerConfig;
use crate::device::{Apparatus, CaptureConfig, CaptureData, CaptureDevice, PlaybackDevice};
use crate::error::{AcquireError, ConfigurationError};
use crate::reduce::{bin_and_average, concat_records, WindowAverages};

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct RunParams {
    pub data_transfer_repeats:usize,
    pub sequence_repeats_per_transfer:usize,
    /// seconds to wait for the digitizer after each transfer
    pub timeout:f64,
    /// seconds between arming the digitizer and the first replay
    pub settle_time:f64,
}

fn seconds(name:&'static str,value:f64) -> Result<Duration,ConfigurationError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigurationError::InvalidTime{name,value})
}

impl RunParams {
    pub fn timeout_duration(&self) -> Result<Duration,ConfigurationError> {
        seconds("timeout",self.timeout)
    }

    pub fn settle_duration(&self) -> Result<Duration,ConfigurationError> {
        seconds("settle_time",self.settle_time)
    }

    /// both times must be finite and not negative
    pub fn validate(&self) -> Result<(),ConfigurationError> {
        self.timeout_duration()?;
        self.settle_duration()?;
        Ok(())
    }
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            data_transfer_repeats:1,
            sequence_repeats_per_transfer:20,
            timeout:1.0,
            settle_time:0.1,
        }
    }
}

/// What gets sent to the playback device before a run.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Serialize,Deserialize)]
pub enum SetupMode {
    /// segments and steps
    Full,
    /// the step table only, for programs recompiled against the loaded segments
    StepsOnly,
    /// nothing, the device already holds the program
    Skip,
}

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum RunState {
    Idle,
    Armed,
    Playing,
    Stopped,
    DataReady,
    Timeout,
    Reduced,
}

fn advance(state:&mut RunState,next:RunState) {
    debug!("run state {:?} -> {:?}",state,next);
    *state = next;
}

#[derive(Clone,Debug,PartialEq)]
pub enum RunData {
    /// whole traces, for free induction decay measurements
    Raw(CaptureData),
    Reduced{signal:WindowAverages,monitor:WindowAverages},
}

impl RunData {
    pub fn num_of_records(&self) -> usize {
        match self {
            RunData::Raw(data) => data.num_of_records(),
            RunData::Reduced{signal,..} => signal.num_of_records(),
        }
    }
}

#[derive(Clone,Debug)]
pub struct RunResult {
    pub started:DateTime<Local>,
    pub finished:DateTime<Local>,
    pub data:RunData,
    /// reduced data of each transfer in the order they were taken
    pub transfers:Vec<RunData>,
}

fn reduce(data:CaptureData,windows:&[(f64,f64)]) -> Result<RunData,AcquireError> {
    let signal = bin_and_average(data.channel(0)?,data.sample_rate,windows)?;
    let monitor = bin_and_average(data.channel(1)?,data.sample_rate,windows)?;
    Ok(RunData::Reduced{signal,monitor})
}

fn combine(transfers:&[RunData]) -> Result<RunData,AcquireError> {
    match transfers.first() {
        Some(RunData::Raw(first)) => {
            let mut channels = vec![];
            for c in 0..first.channels.len() {
                let mut views = vec![];
                for t in transfers {
                    match t {
                        RunData::Raw(d) => views.push(d.channel(c)?.view()),
                        RunData::Reduced{..} => return Err(AcquireError::Device("raw and reduced transfers mixed".to_string()))
                    }
                }
                channels.push(concat_records(&views)?);
            }
            Ok(RunData::Raw(CaptureData{sample_rate:first.sample_rate,channels}))
        }
        Some(RunData::Reduced{..}) => {
            let mut signals = vec![];
            let mut monitors = vec![];
            for t in transfers {
                match t {
                    RunData::Reduced{signal,monitor} => {
                        signals.push(signal.clone());
                        monitors.push(monitor.clone());
                    }
                    RunData::Raw(_) => return Err(AcquireError::Device("raw and reduced transfers mixed".to_string()))
                }
            }
            Ok(RunData::Reduced{
                signal:WindowAverages::concatenate(&signals)?,
                monitor:WindowAverages::concatenate(&monitors)?,
            })
        }
        None => Err(AcquireError::Device("no data was transferred".to_string()))
    }
}

fn replay<P:PlaybackDevice,C:CaptureDevice>(apparatus:&mut Apparatus<P,C>,repeats:usize) -> Result<(),AcquireError> {
    for _ in 0..repeats {
        apparatus.playback().start()?;
        apparatus.playback().wait_for_complete()?;
    }
    Ok(())
}

/// Replays the program and collects what the digitizer saw. The setup mode decides what is
/// sent to the playback device first. Each transfer replays the program
/// sequence_repeats_per_transfer times before the records are read back and, unless the
/// program asks for raw traces, averaged per window.
pub fn run_sequence<P:PlaybackDevice,C:CaptureDevice>(
    apparatus:&mut Apparatus<P,C>,
    program:&CompiledProgram,
    digitizer:&DigitizerConfig,
    params:&RunParams,
    setup:SetupMode
) -> Result<RunResult,AcquireError> {
    let settle = params.settle_duration()?;
    let timeout = params.timeout_duration()?;
    let started = Local::now();
    let mut state = RunState::Idle;
    match setup {
        SetupMode::Full => apparatus.playback().setup(program)?,
        SetupMode::StepsOnly => apparatus.playback().update_steps(program)?,
        SetupMode::Skip => {}
    }
    let capture_config = CaptureConfig::for_program(
        digitizer.sample_rate,
        &digitizer.channels,
        digitizer.voltage_range,
        program,
        params.sequence_repeats_per_transfer
    );
    apparatus.capture().configure(&capture_config)?;
    apparatus.capture().arm()?;
    advance(&mut state,RunState::Armed);
    thread::sleep(settle);

    let windows = &program.analysis.detect_pulse_times;
    let mut transfers = vec![];
    for transfer in 0..params.data_transfer_repeats {
        info!("transfer {} of {}",transfer + 1,params.data_transfer_repeats);
        advance(&mut state,RunState::Playing);
        let played = replay(apparatus,params.sequence_repeats_per_transfer);
        let stopped = apparatus.playback().stop();
        if let (Err(_),Err(e)) = (&played,&stopped) {
            warn!("playback could not be stopped after a failed replay: {}",e);
        }
        played?;
        stopped?;
        advance(&mut state,RunState::Stopped);

        if !apparatus.capture().wait_for_data_ready(timeout)? {
            advance(&mut state,RunState::Timeout);
            return Err(AcquireError::HardwareTimeout{operation:"digitizer data transfer",timeout:params.timeout});
        }
        advance(&mut state,RunState::DataReady);
        let data = apparatus.capture().get_data()?;
        let transfer_data = match program.analysis.fid {
            true => RunData::Raw(data),
            false => reduce(data,windows)?
        };
        advance(&mut state,RunState::Reduced);
        transfers.push(transfer_data);
    }
    let data = combine(&transfers)?;
    info!("{} records collected",data.num_of_records());
    Ok(RunResult{started,finished:Local::now(),data,transfers})
}
