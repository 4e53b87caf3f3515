use thiserror::Error;
use seq_lib::experiment::ParamsError;
use seq_tools::error::SequenceError;
use spectrum::SpectrumError;

/// Problems with what was asked for, found before or after the hardware runs.
#[derive(Debug,Clone,PartialEq,Error)]
pub enum ConfigurationError {
    #[error(transparent)]
    Sequence(#[from] SequenceError),
    #[error("window {window} ({start}..{end} samples) does not fit in records of {samples} samples")]
    WindowOutOfRecord{window:usize,start:usize,end:usize,samples:usize},
    #[error("window {0} contains no samples")]
    EmptyWindow(usize),
    #[error("obtained {found} records but the detect groups add up to {expected}")]
    GroupCountMismatch{expected:usize,found:usize},
    #[error("{found} records cannot be split into cycles of {cycle} detects")]
    IncompleteCycle{cycle:usize,found:usize},
    #[error("no detect group labelled {0}")]
    UnknownGroup(String),
    #[error("detect group {0} is listed twice")]
    DuplicateGroup(String),
    #[error("detect group {0} has no records")]
    EmptyGroup(String),
    #[error("batches cannot be combined: {0}")]
    BatchShape(String),
    #[error("capture channel {channel} requested but only {available} were captured")]
    MissingChannel{channel:usize,available:usize},
    #[error("experiment {0} is not recognized")]
    UnknownExperiment(String),
    #[error("{name} of {value} s is not a usable time")]
    InvalidTime{name:&'static str,value:f64},
}

#[derive(Debug,Error)]
pub enum ConfigFileError {
    #[error("config file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("cannot write config: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("cannot parse json: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Params(#[from] ParamsError),
    #[error("invalid run configuration: {0}")]
    Invalid(#[from] ConfigurationError),
}

#[derive(Debug,Error)]
pub enum AcquireError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("{operation} did not finish within {timeout} s")]
    HardwareTimeout{operation:&'static str,timeout:f64},
    #[error("device error: {0}")]
    Device(String),
    #[error(transparent)]
    Config(#[from] ConfigFileError),
    #[error(transparent)]
    Spectrum(#[from] SpectrumError),
}

impl From<SequenceError> for AcquireError {
    fn from(e:SequenceError) -> Self {
        AcquireError::Configuration(e.into())
    }
}

impl From<ParamsError> for AcquireError {
    fn from(e:ParamsError) -> Self {
        AcquireError::Config(e.into())
    }
}
