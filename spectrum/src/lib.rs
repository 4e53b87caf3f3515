pub mod error;
pub mod buffer;
pub mod binning;
pub mod power_spectrum;
pub mod cross_spectrum;

pub use error::SpectrumError;
pub use buffer::BufferStrategy;
pub use power_spectrum::PowerSpectrum;
pub use cross_spectrum::CCedPowerSpectrum;
