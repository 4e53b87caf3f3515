pub mod experiment;
pub mod detect;
pub mod spectroscopy;
pub mod detect_noise;
