use thiserror::Error;

#[derive(Debug,Clone,PartialEq,Error)]
pub enum SpectrumError {
    #[error("trace has {found} samples, expected {expected}")]
    LengthMismatch{expected:usize,found:usize},
    #[error("no traces have been added")]
    Empty,
    #[error("a rolling window must hold at least one trace")]
    ZeroWindow,
    #[error("at least two samples are needed for a spectrum")]
    TooFewSamples,
}
