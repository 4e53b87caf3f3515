use std::path::Path;
use serde::{Deserialize, Serialize};
use seq_tools::channel_map::ChannelMap;
use spectrum::BufferStrategy;
use crate::error::ConfigFileError;
use crate::run::RunParams;
use crate::sim::SimulatedChannel;

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct DigitizerConfig {
    pub sample_rate:f64,
    pub voltage_range:f64,
    /// inputs to capture, the first is the signal and the second the monitor
    pub channels:Vec<usize>,
}

impl Default for DigitizerConfig {
    fn default() -> Self {
        Self {
            sample_rate:25E6,
            voltage_range:2.0,
            channels:vec![0,1],
        }
    }
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct SimulationConfig {
    pub record_period:f64,
    pub time_out:bool,
    pub inputs:Vec<SimulatedChannel>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            record_period:2E-4,
            time_out:false,
            inputs:vec![
                SimulatedChannel{level:0.5,tone_amplitude:0.01,tone_frequency:120.0},
                SimulatedChannel::constant(1.0),
            ],
        }
    }
}

/// Noise spectrum of the detect averages, one trace per transfer.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct SpectrumConfig {
    pub max_points_per_decade:Option<usize>,
    pub strategy:BufferStrategy,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            max_points_per_decade:Some(20),
            strategy:BufferStrategy::Accumulate,
        }
    }
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct AcquireConfig {
    pub run:RunParams,
    pub digitizer:DigitizerConfig,
    pub simulation:SimulationConfig,
    pub spectrum:SpectrumConfig,
    pub channel_map:ChannelMap,
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            run:RunParams::default(),
            digitizer:DigitizerConfig::default(),
            simulation:SimulationConfig::default(),
            spectrum:SpectrumConfig::default(),
            channel_map:ChannelMap::default(),
        }
    }
}

impl AcquireConfig {
    pub fn load(config_file:&Path) -> Result<Self,ConfigFileError> {
        let toml_str = utils::read_to_string(config_file,"toml")?;
        let config:Self = toml::from_str(&toml_str)?;
        config.run.validate()?;
        Ok(config)
    }

    pub fn write(&self,config_file:&Path) -> Result<(),ConfigFileError> {
        let toml_str = toml::to_string(self)?;
        utils::write_to_file(config_file,"toml",&toml_str)?;
        Ok(())
    }

    pub fn write_default(config_file:&Path) -> Result<(),ConfigFileError> {
        Self::default().write(config_file)
    }
}
