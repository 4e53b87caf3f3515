use thiserror::Error;

#[derive(Debug,Clone,PartialEq,Error)]
pub enum WaveformError {
    #[error("at least one of the frequencies, amplitudes and phases must be a list")]
    NoListParameter,
    #[error("list parameters must be of the same length (found {0:?})")]
    ListLengthMismatch(Vec<usize>),
    #[error("window end {end} must come after its start {start}")]
    InvalidWindow{start:f64,end:f64},
    #[error("window {0} overlaps the window before it")]
    OverlappingWindows(usize),
    #[error("{functions} functions given for {windows} time windows")]
    WindowCountMismatch{functions:usize,windows:usize},
    #[error("{0} must be positive")]
    NonPositive(&'static str),
}

#[derive(Debug,Clone,PartialEq,Error)]
pub enum SequenceError {
    #[error("the duration of the {0} segment must be defined")]
    UndefinedDuration(String),
    #[error("segment {segment} lasts {duration} s but its functions need {min} s")]
    DurationTooShort{segment:String,duration:f64,min:f64},
    #[error("{0} is the name of a built in segment")]
    ReservedName(String),
    #[error("segment {0} is not defined")]
    UnknownSegment(String),
    #[error("must implement at least one segment")]
    EmptySequence,
    #[error("{kind} channel {channel} does not exist")]
    UnknownChannel{kind:&'static str,channel:usize},
    #[error("no channel named {0}")]
    UnknownChannelName(String),
    #[error("{kind} channel {channel} of segment {segment} already has a function assigned")]
    ChannelOccupied{segment:String,kind:&'static str,channel:usize},
    #[error("channel {channel} of segment {segment} exceeds the maximum allowed amplitude ({amplitude} > {limit})")]
    AmplitudeExceeded{segment:String,channel:usize,amplitude:f64,limit:f64},
    #[error("awg channel {0} carries more than one ttl line, only the 16th bit is available")]
    TtlBitConflict(usize),
    #[error("segment {0} differs from the one already programmed")]
    SegmentTableChanged(String),
    #[error(transparent)]
    Waveform(#[from] WaveformError),
}
