use log::debug;
use serde::{Deserialize, Serialize};
use seq_tools::awg_function::SineSweep;
use seq_tools::channel_map::ChannelMap;
use seq_tools::error::SequenceError;
use seq_tools::segment::Segment;
use seq_tools::sequence::Sequence;
use crate::detect::{detect_segment, detect_steps, AoParams, DetectParams};
use crate::experiment::{break_repeats, break_segments, ExperimentParameters, Initialize, BREAK_NAME, SHUTTER_BREAK_NAME};

/*
 Optical spectroscopy with state preparation. Each phase pumps the ensemble with a frequency
 sweep (burning a chasm, an antihole, or driving an rf transition) and is then read out by a
 number of detect cycles. The records of every phase are labelled so they can be grouped after
 the run.
 */

pub const DETECT_NAME:&str = "detect";

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
#[serde(tag = "kind")]
pub enum Pump {
    /// sweep of the probe light around an optical detuning
    Optical{center_detuning:f64,scan:f64},
    /// sweep of a named awg channel around a frequency
    Direct{channel_name:String,center_frequency:f64,scan:f64},
    None,
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct PhaseParams {
    pub label:String,
    pub pump:Pump,
    pub amplitude:f64,
    pub duration:f64,
    pub repeats:u64,
    /// wait between the pump and the detection
    pub detect_delay:f64,
    pub detect_cycles:u64,
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct SpectroscopyParams {
    pub name:String,
    pub ao:AoParams,
    pub detect:DetectParams,
    pub shutter_rise_delay:f64,
    pub phases:Vec<PhaseParams>,
}

impl Initialize for SpectroscopyParams {
    fn default() -> Self {
        SpectroscopyParams {
            name:"spectroscopy".to_string(),
            ao:AoParams::default(),
            detect:DetectParams::default(),
            shutter_rise_delay:3E-3,
            phases:vec![
                PhaseParams {
                    label:"chasm".to_string(),
                    pump:Pump::Optical{center_detuning:0.0,scan:3E6},
                    amplitude:2000.0,
                    duration:10E-3,
                    repeats:20,
                    detect_delay:0.0,
                    detect_cycles:16,
                },
                PhaseParams {
                    label:"antihole".to_string(),
                    pump:Pump::Optical{center_detuning:18E6,scan:1E6},
                    amplitude:2000.0,
                    duration:10E-3,
                    repeats:100,
                    detect_delay:1E-3,
                    detect_cycles:16,
                },
                PhaseParams {
                    label:"rf".to_string(),
                    pump:Pump::Direct{channel_name:"rf_coil".to_string(),center_frequency:119.2E3,scan:20E3},
                    amplitude:4000.0,
                    duration:1E-3,
                    repeats:1,
                    detect_delay:0.0,
                    detect_cycles:16,
                },
            ],
        }
    }
}

fn pump_segment(phase:&PhaseParams,ao:&AoParams,channel_map:&ChannelMap) -> Result<Option<Segment>,SequenceError> {
    let (channel,start,stop) = match &phase.pump {
        Pump::Optical{center_detuning,scan} => {
            (channel_map.awg_index(&ao.channel_name)?,ao.frequency(center_detuning - scan),ao.frequency(center_detuning + scan))
        }
        Pump::Direct{channel_name,center_frequency,scan} => {
            (channel_map.awg_index(channel_name)?,center_frequency - scan,center_frequency + scan)
        }
        Pump::None => return Ok(None)
    };
    let mut segment = Segment::new(&phase.label,Some(phase.duration));
    segment.add_awg_function(channel,SineSweep::new(start,stop,phase.amplitude,0.0,phase.duration,0.0)?)?;
    Ok(Some(segment))
}

impl ExperimentParameters for SpectroscopyParams {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn build_sequence(&self,channel_map:&ChannelMap) -> Result<(Sequence,Vec<(String,u64)>),SequenceError> {
        let mut sequence = Sequence::new(channel_map.clone());
        let (detect,metadata) = detect_segment(DETECT_NAME,&self.ao,&self.detect,channel_map)?;
        sequence.add_segment(detect)?;
        sequence.analysis_parameters = metadata;
        sequence.set_trigger_channel(channel_map.ttl_index(&self.detect.trigger_channel_name)?)?;

        let (idle,shutter) = break_segments(channel_map,&self.detect.shutter_channel_name)?;
        sequence.add_segment(idle)?;
        sequence.add_segment(shutter)?;

        let mut steps:Vec<(String,u64)> = vec![];
        for phase in &self.phases {
            if [DETECT_NAME,BREAK_NAME,SHUTTER_BREAK_NAME].contains(&phase.label.as_str()) {
                return Err(SequenceError::ReservedName(phase.label.clone()));
            }
            if let Some(segment) = pump_segment(phase,&self.ao,channel_map)? {
                sequence.add_segment(segment)?;
                steps.push((phase.label.clone(),phase.repeats));
            }
            if phase.detect_cycles == 0 {
                continue;
            }
            steps.push((BREAK_NAME.to_string(),break_repeats(phase.detect_delay)));
            steps.push((SHUTTER_BREAK_NAME.to_string(),break_repeats(self.shutter_rise_delay)));
            steps.extend(detect_steps(DETECT_NAME,phase.detect_cycles));
            sequence.analysis_parameters.add_detect_group(&phase.label,phase.detect_cycles as usize);
        }
        debug!("{}: {} phases, {} steps, {} detects per replay",self.name,self.phases.len(),steps.len(),sequence.analysis_parameters.num_of_record_cycles());
        Ok((sequence,steps))
    }
}
