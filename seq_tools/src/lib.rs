pub mod hardware_constants;
pub mod error;
pub mod awg_function;
pub mod ttl_function;
pub mod channel_map;
pub mod segment;
pub mod analysis;
pub mod program;
pub mod sequence;
pub mod board;
