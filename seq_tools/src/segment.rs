use std::collections::BTreeMap;
use std::ops::Range;
use serde::{Deserialize, Serialize};
use crate::awg_function::{AwgFunction, AwgPulse, MultiFunctions};
use crate::error::SequenceError;
use crate::hardware_constants::{segment_samples, AWG_SAMPLE_RATE, BOOKEND_DURATION, END_SEGMENT_NAME, START_SEGMENT_NAME};
use crate::ttl_function::{TtlFunction, TtlMultiFunctions};

/*
 A segment is a named slice of time holding at most one function per analog channel and one
 per ttl line. Its length is either given explicitly or taken from the longest function it
 holds, and padding is added on top in both cases. The sequencer replays segments whole, so
 the length that matters to the hardware is rounded up to the awg memory granularity.
 */

// explicit durations may fall short of the functions by float rounding only
const DURATION_TOLERANCE:f64 = 1E-12;

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct Segment {
    pub name:String,
    duration:Option<f64>,
    padding:f64,
    awg_functions:BTreeMap<usize,AwgFunction>,
    ttl_functions:BTreeMap<usize,TtlFunction>,
}

impl Segment {
    pub fn new(name:&str,duration:Option<f64>) -> Self {
        Self {
            name:name.to_string(),
            duration,
            padding:0.0,
            awg_functions:BTreeMap::new(),
            ttl_functions:BTreeMap::new(),
        }
    }

    /// a segment that outputs nothing for the given time
    pub fn empty(name:&str,duration:f64) -> Self {
        Self::new(name,Some(duration))
    }

    pub fn start() -> Self {
        Self::empty(START_SEGMENT_NAME,BOOKEND_DURATION)
    }

    pub fn end() -> Self {
        Self::empty(END_SEGMENT_NAME,BOOKEND_DURATION)
    }

    /// Plays the parts one after another. Every channel used by any part is wrapped in a
    /// multi function with one window per part.
    pub fn multi(name:&str,parts:&[Segment]) -> Result<Self,SequenceError> {
        let durations = parts.iter().map(|p| p.duration()).collect::<Result<Vec<f64>,SequenceError>>()?;
        let mut starts = Vec::with_capacity(parts.len());
        let mut ends = Vec::with_capacity(parts.len());
        let mut t = 0.0;
        for d in &durations {
            starts.push(t);
            t += d;
            ends.push(t);
        }
        let mut segment = Self::new(name,Some(t));

        let awg_channels:Vec<usize> = parts.iter().flat_map(|p| p.awg_channels_used()).collect::<std::collections::BTreeSet<usize>>().into_iter().collect();
        for ch in awg_channels {
            let functions = parts.iter().map(|p| p.awg_functions.get(&ch).cloned().unwrap_or(AwgFunction::Zero)).collect();
            let m = MultiFunctions::new(functions,starts.clone(),ends.clone())?;
            segment.add_awg_function(ch,m)?;
        }

        let ttl_channels:Vec<usize> = parts.iter().flat_map(|p| p.ttl_channels_used()).collect::<std::collections::BTreeSet<usize>>().into_iter().collect();
        for ch in ttl_channels {
            let functions = parts.iter().map(|p| p.ttl_functions.get(&ch).cloned().unwrap_or(TtlFunction::Off)).collect();
            let m = TtlMultiFunctions::new(functions,starts.clone(),ends.clone())?;
            segment.add_ttl_function(ch,TtlFunction::MultiFunctions(m))?;
        }
        Ok(segment)
    }

    pub fn add_awg_function<F:Into<AwgFunction>>(&mut self,channel:usize,function:F) -> Result<(),SequenceError> {
        if self.awg_functions.contains_key(&channel) {
            return Err(SequenceError::ChannelOccupied{segment:self.name.clone(),kind:"awg",channel});
        }
        self.awg_functions.insert(channel,function.into());
        Ok(())
    }

    pub fn add_ttl_function(&mut self,channel:usize,function:TtlFunction) -> Result<(),SequenceError> {
        if self.ttl_functions.contains_key(&channel) {
            return Err(SequenceError::ChannelOccupied{segment:self.name.clone(),kind:"ttl",channel});
        }
        self.ttl_functions.insert(channel,function);
        Ok(())
    }

    pub fn set_padding(&mut self,padding:f64) {
        self.padding = padding;
    }

    pub fn padding(&self) -> f64 {
        self.padding
    }

    pub fn awg_functions(&self) -> &BTreeMap<usize,AwgFunction> {
        &self.awg_functions
    }

    pub fn ttl_functions(&self) -> &BTreeMap<usize,TtlFunction> {
        &self.ttl_functions
    }

    fn min_duration(&self) -> f64 {
        let awg = self.awg_functions.values().map(|f| f.min_duration()).fold(0.0,f64::max);
        let ttl = self.ttl_functions.values().map(|f| f.min_duration()).fold(0.0,f64::max);
        awg.max(ttl)
    }

    /// requested duration plus padding, never shorter than the functions it holds
    pub fn duration(&self) -> Result<f64,SequenceError> {
        let min = self.min_duration();
        let base = match self.duration {
            Some(d) if min - d > DURATION_TOLERANCE => {
                return Err(SequenceError::DurationTooShort{segment:self.name.clone(),duration:d,min});
            }
            Some(d) => d,
            None if min <= 0.0 => return Err(SequenceError::UndefinedDuration(self.name.clone())),
            None => min
        };
        Ok(base + self.padding)
    }

    pub fn samples(&self,sample_rate:f64) -> Result<usize,SequenceError> {
        Ok(segment_samples(self.duration()?,sample_rate))
    }

    /// duration after rounding to the awg segment granularity
    pub fn actual_duration(&self) -> Result<f64,SequenceError> {
        Ok(self.samples(AWG_SAMPLE_RATE)? as f64/AWG_SAMPLE_RATE)
    }

    pub fn awg_channels_used(&self) -> Vec<usize> {
        self.awg_functions.iter().filter(|(_,f)| **f != AwgFunction::Zero).map(|(ch,_)| *ch).collect()
    }

    pub fn ttl_channels_used(&self) -> Vec<usize> {
        self.ttl_functions.iter().filter(|(_,f)| !f.is_off()).map(|(ch,_)| *ch).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.awg_channels_used().is_empty() && self.ttl_channels_used().is_empty()
    }

    /// true if any function drives one of the given channels
    pub fn drives_any(&self,awg_channels:&Range<usize>,ttl_channels:&Range<usize>) -> bool {
        self.awg_channels_used().iter().any(|c| awg_channels.contains(c))
            || self.ttl_channels_used().iter().any(|c| ttl_channels.contains(c))
    }

    pub fn render_awg(&self,channel:usize,times:&[f64]) -> Vec<f64> {
        match self.awg_functions.get(&channel) {
            Some(f) => f.output(times),
            None => vec![0.0;times.len()]
        }
    }

    pub fn render_ttl(&self,channel:usize,times:&[f64]) -> Vec<bool> {
        match self.ttl_functions.get(&channel) {
            Some(f) => f.output(times),
            None => vec![false;times.len()]
        }
    }

    pub fn trigger_count(&self,ttl_channel:usize) -> usize {
        self.ttl_functions.get(&ttl_channel).map_or(0,|f| f.trigger_count())
    }

    /// Interleaved dac words for the given awg channels, one sample of every channel after another.
    /// The ttl lines mapped onto a channel replace its least significant bit with bit 15.
    pub fn get_sample_data(&self,awg_channels:&[usize],ttl_to_awg:&BTreeMap<usize,usize>,n_samples:usize,sample_rate:f64) -> Result<Vec<i16>,SequenceError> {
        let times:Vec<f64> = (0..n_samples).map(|i| i as f64/sample_rate).collect();
        let n_channels = awg_channels.len();
        let mut data = vec![0i16;n_samples*n_channels];
        for (c,awg_ch) in awg_channels.iter().enumerate() {
            let analog = self.render_awg(*awg_ch,&times);
            let ttl_lines:Vec<usize> = ttl_to_awg.iter()
                .filter(|(ttl,awg)| *awg == awg_ch && self.ttl_functions.contains_key(*ttl))
                .map(|(ttl,_)| *ttl).collect();
            if ttl_lines.len() > 1 {
                return Err(SequenceError::TtlBitConflict(*awg_ch));
            }
            let digital = match ttl_lines.first() {
                Some(ttl) => self.render_ttl(*ttl,&times),
                None => vec![false;n_samples]
            };
            for (i,(a,d)) in analog.iter().zip(digital.iter()).enumerate() {
                data[i*n_channels + c] = pack_word(*a,*d);
            }
        }
        Ok(data)
    }
}

fn pack_word(analog:f64,ttl:bool) -> i16 {
    let dac = analog.round().clamp(i16::MIN as f64,i16::MAX as f64) as i16;
    (((dac as u16) >> 1) | ((ttl as u16) << 15)) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::awg_function::{Constant, SinePulse};
    use crate::hardware_constants::AWG_MIN_SEGMENT_SAMPLE;

    #[test]
    fn duration_from_functions_plus_padding(){
        let mut s = Segment::new("probe",None);
        s.add_awg_function(1,SinePulse::windowed(1E6,100.0,0.0,Some(1E-6),Some(3E-6)).unwrap()).unwrap();
        s.add_ttl_function(0,TtlFunction::pulses(&[(0.0,4E-6)]).unwrap()).unwrap();
        s.set_padding(1E-6);
        assert!((s.duration().unwrap() - 5E-6).abs() < 1E-15);

        let mut explicit = Segment::new("fixed",Some(10E-6));
        explicit.set_padding(2E-6);
        assert!((explicit.duration().unwrap() - 12E-6).abs() < 1E-15);
    }

    #[test]
    fn undefined_duration_is_an_error(){
        let mut s = Segment::new("tone",None);
        s.add_awg_function(0,SinePulse::new(1E6,10.0)).unwrap();
        assert_eq!(s.duration(),Err(SequenceError::UndefinedDuration("tone".to_string())));
    }

    #[test]
    fn explicit_duration_must_hold_the_functions(){
        let mut s = Segment::new("short",Some(1E-6));
        s.add_awg_function(0,SinePulse::windowed(1E6,10.0,0.0,Some(0.0),Some(5E-6)).unwrap()).unwrap();
        assert_eq!(s.duration(),Err(SequenceError::DurationTooShort{segment:"short".to_string(),duration:1E-6,min:5E-6}));
        assert!(s.actual_duration().is_err());

        let mut exact = Segment::new("exact",Some(5E-6));
        exact.add_awg_function(0,SinePulse::windowed(1E6,10.0,0.0,Some(0.0),Some(5E-6)).unwrap()).unwrap();
        assert_eq!(exact.duration(),Ok(5E-6));
    }

    #[test]
    fn occupied_channel_is_rejected(){
        let mut s = Segment::new("a",Some(1E-6));
        s.add_awg_function(2,Constant::new(1.0)).unwrap();
        let e = s.add_awg_function(2,Constant::new(2.0));
        assert_eq!(e,Err(SequenceError::ChannelOccupied{segment:"a".to_string(),kind:"awg",channel:2}));
    }

    #[test]
    fn actual_duration_rounds_to_memory_granularity(){
        let s = Segment::empty("short",1E-9);
        assert!((s.actual_duration().unwrap() - AWG_MIN_SEGMENT_SAMPLE as f64/AWG_SAMPLE_RATE).abs() < 1E-18);
        let s = Segment::empty("odd",1000.5/AWG_SAMPLE_RATE);
        assert_eq!(s.samples(AWG_SAMPLE_RATE).unwrap(),1024);
    }

    #[test]
    fn multi_segment_concatenates_parts(){
        let mut a = Segment::new("a",Some(2E-6));
        a.add_awg_function(0,Constant::new(10.0)).unwrap();
        let mut b = Segment::new("b",Some(3E-6));
        b.add_awg_function(1,Constant::new(20.0)).unwrap();
        b.add_ttl_function(0,TtlFunction::On).unwrap();
        let m = Segment::multi("ab",&[a,b]).unwrap();
        assert!((m.duration().unwrap() - 5E-6).abs() < 1E-15);
        assert_eq!(m.render_awg(0,&[1E-6,3E-6]),vec![10.0,0.0]);
        assert_eq!(m.render_awg(1,&[1E-6,3E-6]),vec![0.0,20.0]);
        assert_eq!(m.render_ttl(0,&[1E-6,3E-6]),vec![false,true]);
    }

    #[test]
    fn ttl_rides_in_bit_15(){
        let mut s = Segment::new("packed",Some(1E-6));
        s.add_awg_function(0,Constant::new(-2.0)).unwrap();
        s.add_awg_function(1,Constant::new(100.0)).unwrap();
        s.add_ttl_function(0,TtlFunction::On).unwrap();
        let map:BTreeMap<usize,usize> = [(0,0),(1,1)].into_iter().collect();
        let data = s.get_sample_data(&[0,1],&map,2,1E6).unwrap();
        assert_eq!(data.len(),4);
        assert_eq!(data[0] as u16,((-2i16 as u16) >> 1) | 0x8000);
        assert_eq!(data[1],50);
        assert_eq!(data[2],data[0]);
    }

    #[test]
    fn two_ttl_lines_on_one_channel_conflict(){
        let mut s = Segment::new("bad",Some(1E-6));
        s.add_ttl_function(0,TtlFunction::On).unwrap();
        s.add_ttl_function(3,TtlFunction::On).unwrap();
        let map:BTreeMap<usize,usize> = [(0,0),(3,0)].into_iter().collect();
        assert_eq!(s.get_sample_data(&[0],&map,4,1E6),Err(SequenceError::TtlBitConflict(0)));
    }
}
