use std::path::Path;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use seq_tools::channel_map::ChannelMap;
use seq_tools::error::SequenceError;
use seq_tools::segment::Segment;
use seq_tools::sequence::Sequence;
use seq_tools::ttl_function::TtlFunction;

#[derive(Debug,Error)]
pub enum ParamsError {
    #[error("parameter file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse parameters: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parameter sets stored as json files.
pub trait Initialize: Sized + Serialize + DeserializeOwned {
    fn default() -> Self;
    fn load(params_file:&Path) -> Result<Self,ParamsError> {
        let json_str = utils::read_to_string(params_file,"json")?;
        Ok(serde_json::from_str(&json_str)?)
    }
    fn write_default(params_file:&Path) -> Result<(),ParamsError> {
        let params = Self::default();
        let str = serde_json::to_string_pretty(&params)?;
        utils::write_to_file(params_file,"json",&str)?;
        Ok(())
    }
}

/// An experiment knows how to turn its parameters into segments and steps.
pub trait ExperimentParameters {
    fn name(&self) -> String;
    /// the sequence with every segment added and the steps to replay
    fn build_sequence(&self,channel_map:&ChannelMap) -> Result<(Sequence,Vec<(String,u64)>),SequenceError>;
}

pub const BREAK_TIME:f64 = 10E-6;
pub const BREAK_NAME:&str = "break";
pub const SHUTTER_BREAK_NAME:&str = "shutter_break";

/// Short idle segments, one with the shutter closed and one with it open, repeated to make delays.
pub fn break_segments(channel_map:&ChannelMap,shutter_channel_name:&str) -> Result<(Segment,Segment),SequenceError> {
    let idle = Segment::empty(BREAK_NAME,BREAK_TIME);
    let mut shutter = Segment::empty(SHUTTER_BREAK_NAME,BREAK_TIME);
    shutter.add_ttl_function(channel_map.ttl_index(shutter_channel_name)?,TtlFunction::On)?;
    Ok((idle,shutter))
}

/// repeats of a break segment covering at least the given time
pub fn break_repeats(time:f64) -> u64 {
    // tolerate rounding in the division
    (time/BREAK_TIME - 1E-9).ceil().max(0.0) as u64
}
