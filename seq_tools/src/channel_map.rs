use std::collections::BTreeMap;
use std::ops::Range;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::error::SequenceError;
use crate::hardware_constants::{AWG_CHANNELS_PER_BOARD, AWG_MAX_DAC, TTL_CHANNELS_PER_BOARD};

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct AwgChannel {
    pub name:String,
    pub max_allowed_amplitude:f64,
}

impl AwgChannel {
    pub fn new(name:&str,max_allowed_amplitude:f64) -> Self {
        Self{name:name.to_string(),max_allowed_amplitude}
    }
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct TtlChannel {
    pub name:String,
}

/// Names and limits of the analog and digital outputs. Channels are numbered across boards,
/// four analog outputs and three ttl lines per board.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct ChannelMap {
    pub awg_channels:Vec<AwgChannel>,
    pub ttl_channels:Vec<TtlChannel>,
}

impl Default for ChannelMap {
    fn default() -> Self {
        let awg = [
            ("channel_0",AWG_MAX_DAC as f64 + 1.0),
            ("ao_dp",3200.0),
            ("eo_bb",2300.0),
            ("eo_ac",4500.0),
            ("blue_laser",18000.0),
            ("eo_ca",4500.0),
            ("rf_coil",10000.0),
            ("field_plate",AWG_MAX_DAC as f64 + 1.0),
        ];
        let ttl = ["sequence","digitizer","shutter","ttl_3","ttl_4","ttl_5"];
        Self {
            awg_channels:awg.iter().map(|(n,a)| AwgChannel::new(n,*a)).collect(),
            ttl_channels:ttl.iter().map(|n| TtlChannel{name:n.to_string()}).collect(),
        }
    }
}

impl ChannelMap {
    pub fn load(path:&Path) -> Result<Self,std::io::Error> {
        let s = utils::read_to_string(path,"json")?;
        serde_json::from_str(&s).map_err(std::io::Error::from)
    }

    pub fn awg_index(&self,name:&str) -> Result<usize,SequenceError> {
        self.awg_channels.iter().position(|c| c.name == name).ok_or(SequenceError::UnknownChannelName(name.to_string()))
    }

    pub fn ttl_index(&self,name:&str) -> Result<usize,SequenceError> {
        self.ttl_channels.iter().position(|c| c.name == name).ok_or(SequenceError::UnknownChannelName(name.to_string()))
    }

    pub fn n_awg_channels(&self) -> usize {
        self.awg_channels.len()
    }

    pub fn n_ttl_channels(&self) -> usize {
        self.ttl_channels.len()
    }

    pub fn awg_limit(&self,channel:usize) -> Result<f64,SequenceError> {
        self.awg_channels.get(channel).map(|c| c.max_allowed_amplitude).ok_or(SequenceError::UnknownChannel{kind:"awg",channel})
    }

    pub fn check_ttl(&self,channel:usize) -> Result<(),SequenceError> {
        match channel < self.ttl_channels.len() {
            true => Ok(()),
            false => Err(SequenceError::UnknownChannel{kind:"ttl",channel})
        }
    }

    pub fn n_boards(&self) -> usize {
        (self.n_awg_channels() + AWG_CHANNELS_PER_BOARD - 1)/AWG_CHANNELS_PER_BOARD
    }

    pub fn board_awg_channels(&self,board:usize) -> Range<usize> {
        let start = (board*AWG_CHANNELS_PER_BOARD).min(self.n_awg_channels());
        start..((board + 1)*AWG_CHANNELS_PER_BOARD).min(self.n_awg_channels())
    }

    pub fn board_ttl_channels(&self,board:usize) -> Range<usize> {
        let start = (board*TTL_CHANNELS_PER_BOARD).min(self.n_ttl_channels());
        start..((board + 1)*TTL_CHANNELS_PER_BOARD).min(self.n_ttl_channels())
    }

    /// the awg channel whose 16th bit carries a ttl line
    pub fn ttl_to_awg(&self,ttl_channel:usize) -> usize {
        let board = ttl_channel/TTL_CHANNELS_PER_BOARD;
        board*AWG_CHANNELS_PER_BOARD + ttl_channel%TTL_CHANNELS_PER_BOARD
    }

    pub fn ttl_to_awg_map(&self) -> BTreeMap<usize,usize> {
        (0..self.n_ttl_channels()).map(|t| (t,self.ttl_to_awg(t))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_map_spans_two_boards(){
        let map = ChannelMap::default();
        assert_eq!(map.n_boards(),2);
        assert_eq!(map.board_awg_channels(1),4..8);
        assert_eq!(map.board_ttl_channels(1),3..6);
        assert_eq!(map.awg_index("rf_coil").unwrap(),6);
        assert_eq!(map.ttl_index("digitizer").unwrap(),1);
        assert_eq!(map.awg_limit(1).unwrap(),3200.0);
    }

    #[test]
    fn ttl_lines_map_to_first_three_awg_channels_of_their_board(){
        let map = ChannelMap::default();
        let m:Vec<usize> = (0..6).map(|t| map.ttl_to_awg(t)).collect();
        assert_eq!(m,vec![0,1,2,4,5,6]);
    }

    #[test]
    fn unknown_names_fail(){
        let map = ChannelMap::default();
        assert_eq!(map.awg_index("nope"),Err(SequenceError::UnknownChannelName("nope".to_string())));
        assert!(map.awg_limit(8).is_err());
        assert!(map.check_ttl(6).is_err());
    }
}
