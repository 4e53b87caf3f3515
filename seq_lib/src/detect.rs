use serde::{Deserialize, Serialize};
use seq_tools::analysis::AnalysisMetadata;
use seq_tools::awg_function::{Constant, FidPulse, SinePulse, SineTrain};
use seq_tools::channel_map::ChannelMap;
use seq_tools::error::SequenceError;
use seq_tools::segment::Segment;
use seq_tools::ttl_function::TtlFunction;

pub const TRIGGER_START:f64 = 0.0;
pub const TRIGGER_DURATION:f64 = 4E-6;
/// recording time before the first probe pulse
pub const DETECT_PADDING:f64 = 4E-6;
pub const MAX_DETECT_CYCLES:u64 = 1_000_000;

/// acousto-optic modulator driving the probe light
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct AoParams {
    pub channel_name:String,
    pub center_frequency:f64,
    /// diffraction order, optical detunings are divided by it
    pub order:f64,
    pub rise_delay:f64,
    pub fall_delay:f64,
}

impl Default for AoParams {
    fn default() -> Self {
        Self {
            channel_name:"ao_dp".to_string(),
            center_frequency:80E6,
            order:2.0,
            rise_delay:1.1E-6,
            fall_delay:0.6E-6,
        }
    }
}

impl AoParams {
    pub fn frequency(&self,optical_detuning:f64) -> f64 {
        self.center_frequency + optical_detuning/self.order
    }
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct FidParams {
    pub probe_detuning:f64,
    pub pump_amplitude:f64,
    pub pump_time:f64,
    pub wait_time:f64,
    pub probe_amplitude:f64,
    pub probe_time:f64,
    pub phase:f64,
}

/// constant field during detection, shifting every detuning by plus and minus the stark shift
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct FieldPlateParams {
    pub channel_name:String,
    pub amplitude:f64,
    pub stark_shift:f64,
}

/// electro-optic sideband held on during detection
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct EoParams {
    pub channel_name:String,
    pub frequency:f64,
    pub amplitude:f64,
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct DetectParams {
    pub trigger_channel_name:String,
    pub shutter_channel_name:String,
    pub detunings:Vec<f64>,
    pub on_time:f64,
    pub off_time:f64,
    pub ao_amplitude:f64,
    /// dead time after the last probe pulse
    pub delay:f64,
    pub fid:Option<FidParams>,
    pub field_plate:Option<FieldPlateParams>,
    pub eo:Option<EoParams>,
}

impl Default for DetectParams {
    fn default() -> Self {
        Self {
            trigger_channel_name:"digitizer".to_string(),
            shutter_channel_name:"shutter".to_string(),
            detunings:vec![-2E6,-1E6,0.0,1E6,2E6],
            on_time:5E-6,
            off_time:1E-6,
            ao_amplitude:2000.0,
            delay:8E-6,
            fid:None,
            field_plate:None,
            eo:None,
        }
    }
}

impl DetectParams {
    /// detunings as played, interleaved around the stark shift when the field plate is used
    pub fn all_detunings(&self) -> Vec<f64> {
        match &self.field_plate {
            None => self.detunings.clone(),
            Some(fp) => self.detunings.iter().flat_map(|d| [d - fp.stark_shift,d + fp.stark_shift]).collect()
        }
    }
}

/// Builds the detection segment and the metadata needed to reduce its records.
///
/// The digitizer is triggered at the start of the segment. Probe pulses begin after the padding
/// and half an off time, and each detect window is its pulse shifted by the ao rise and fall delays.
pub fn detect_segment(name:&str,ao:&AoParams,params:&DetectParams,channel_map:&ChannelMap) -> Result<(Segment,AnalysisMetadata),SequenceError> {
    let mut segment = Segment::new(name,None);
    let trigger = channel_map.ttl_index(&params.trigger_channel_name)?;
    segment.add_ttl_function(trigger,TtlFunction::pulses(&[(TRIGGER_START,TRIGGER_START + TRIGGER_DURATION)])?)?;
    segment.add_ttl_function(channel_map.ttl_index(&params.shutter_channel_name)?,TtlFunction::On)?;

    if let Some(eo) = &params.eo {
        segment.add_awg_function(channel_map.awg_index(&eo.channel_name)?,SinePulse::new(eo.frequency,eo.amplitude))?;
    }

    let detunings = params.all_detunings();
    let ao_frequencies:Vec<f64> = detunings.iter().map(|d| ao.frequency(*d)).collect();
    let pulse_start = TRIGGER_START + DETECT_PADDING + params.off_time/2.0;
    let ao_channel = channel_map.awg_index(&ao.channel_name)?;

    let (pulse_times,fid) = match &params.fid {
        Some(fid) => {
            let pulse = FidPulse {
                pump_frequencies:ao_frequencies,
                pump_amplitude:fid.pump_amplitude,
                pump_time:fid.pump_time,
                wait_time:fid.wait_time,
                probe_frequency:ao.frequency(fid.probe_detuning),
                probe_amplitude:fid.probe_amplitude,
                probe_time:fid.probe_time,
                probe_phase:fid.phase/ao.order,
                start_time:pulse_start,
            };
            let window = pulse.probe_window();
            segment.add_awg_function(ao_channel,pulse)?;
            (vec![window],true)
        }
        None => {
            let train = SineTrain::new(params.on_time,params.off_time,ao_frequencies.into(),params.ao_amplitude.into(),0.0.into(),pulse_start)?;
            let windows = train.burst_windows();
            segment.add_awg_function(ao_channel,train)?;
            (windows,false)
        }
    };

    if let Some(fp) = &params.field_plate {
        segment.add_awg_function(channel_map.awg_index(&fp.channel_name)?,Constant::new(fp.amplitude))?;
    }

    let detect_pulse_times = pulse_times.iter().map(|(s,e)| (s + ao.rise_delay,e + ao.fall_delay)).collect();
    let mut metadata = AnalysisMetadata::new(segment.duration()? - TRIGGER_START,detect_pulse_times,detunings);
    metadata.fid = fid;
    segment.set_padding(params.delay);
    Ok((segment,metadata))
}

/// splits detect cycles over several steps so no step exceeds the loop limit
pub fn detect_steps(name:&str,cycles:u64) -> Vec<(String,u64)> {
    let mut steps:Vec<(String,u64)> = (0..cycles/MAX_DETECT_CYCLES).map(|_| (name.to_string(),MAX_DETECT_CYCLES)).collect();
    let remainder = cycles%MAX_DETECT_CYCLES;
    if remainder > 0 {
        steps.push((name.to_string(),remainder));
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_follow_the_pulse_train(){
        let ao = AoParams::default();
        let params = DetectParams{detunings:vec![0.0,1E6],..DetectParams::default()};
        let map = ChannelMap::default();
        let (segment,meta) = detect_segment("detect",&ao,&params,&map).unwrap();
        let first_start = DETECT_PADDING + params.off_time/2.0;
        let period = params.on_time + params.off_time;
        assert_eq!(meta.detect_pulse_times.len(),2);
        assert!((meta.detect_pulse_times[1].0 - (first_start + period + ao.rise_delay)).abs() < 1E-15);
        assert!((meta.detect_pulse_times[1].1 - (first_start + period + params.on_time + ao.fall_delay)).abs() < 1E-15);
        // the digitizer records up to the end of the train, the delay comes after
        assert!((meta.digitizer_duration - (first_start + 2.0*period)).abs() < 1E-15);
        assert!((segment.duration().unwrap() - meta.digitizer_duration - params.delay).abs() < 1E-15);
        assert_eq!(segment.trigger_count(map.ttl_index("digitizer").unwrap()),1);
        assert!(!meta.fid);
    }

    #[test]
    fn field_plate_interleaves_detunings(){
        let params = DetectParams {
            detunings:vec![0.0,1E6],
            field_plate:Some(FieldPlateParams{channel_name:"field_plate".to_string(),amplitude:4000.0,stark_shift:2E6}),
            ..DetectParams::default()
        };
        assert_eq!(params.all_detunings(),vec![-2E6,2E6,-1E6,3E6]);
        let (segment,meta) = detect_segment("detect",&AoParams::default(),&params,&ChannelMap::default()).unwrap();
        assert_eq!(meta.n_windows(),4);
        assert!(segment.awg_channels_used().contains(&7));
    }

    #[test]
    fn fid_detection_has_one_window(){
        let fid = FidParams {
            probe_detuning:0.0,
            pump_amplitude:1000.0,
            pump_time:10E-6,
            wait_time:2E-6,
            probe_amplitude:500.0,
            probe_time:20E-6,
            phase:0.0,
        };
        let params = DetectParams{fid:Some(fid),..DetectParams::default()};
        let ao = AoParams::default();
        let (_,meta) = detect_segment("detect",&ao,&params,&ChannelMap::default()).unwrap();
        assert!(meta.fid);
        let start = DETECT_PADDING + params.off_time/2.0 + 12E-6;
        assert_eq!(meta.detect_pulse_times.len(),1);
        assert!((meta.detect_pulse_times[0].0 - (start + ao.rise_delay)).abs() < 1E-15);
    }

    #[test]
    fn unknown_channel_names_fail(){
        let params = DetectParams{trigger_channel_name:"camera".to_string(),..DetectParams::default()};
        let e = detect_segment("detect",&AoParams::default(),&params,&ChannelMap::default());
        assert_eq!(e.map(|_| ()),Err(SequenceError::UnknownChannelName("camera".to_string())));
    }

    #[test]
    fn detect_cycles_are_split(){
        assert_eq!(detect_steps("detect",5),vec![("detect".to_string(),5)]);
        let steps = detect_steps("detect",2_500_000);
        let loops:Vec<u64> = steps.iter().map(|s| s.1).collect();
        assert_eq!(loops,vec![1_000_000,1_000_000,500_000]);
        assert!(detect_steps("detect",0).is_empty());
    }
}
