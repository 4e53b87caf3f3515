pub mod args;
pub mod build;
pub mod config;
pub mod device;
pub mod error;
pub mod probe;
pub mod reduce;
pub mod run;
pub mod sim;
