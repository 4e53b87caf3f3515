use serde::{Deserialize, Serialize};
use seq_tools::channel_map::ChannelMap;
use seq_tools::error::SequenceError;
use seq_tools::sequence::Sequence;
use crate::detect::{detect_segment, detect_steps, AoParams, DetectParams};
use crate::experiment::{break_repeats, break_segments, ExperimentParameters, Initialize, SHUTTER_BREAK_NAME};

/// Repeated detection without any preparation, for the noise of the probe itself.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct DetectNoiseParams {
    pub name:String,
    pub ao:AoParams,
    pub detect:DetectParams,
    pub shutter_rise_delay:f64,
    pub cycles:u64,
}

impl Initialize for DetectNoiseParams {
    fn default() -> Self {
        DetectNoiseParams {
            name:"detect_noise".to_string(),
            ao:AoParams::default(),
            detect:DetectParams{detunings:vec![0.0],..DetectParams::default()},
            shutter_rise_delay:3E-3,
            cycles:1000,
        }
    }
}

impl ExperimentParameters for DetectNoiseParams {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn build_sequence(&self,channel_map:&ChannelMap) -> Result<(Sequence,Vec<(String,u64)>),SequenceError> {
        let mut sequence = Sequence::new(channel_map.clone());
        let (detect,metadata) = detect_segment("detect",&self.ao,&self.detect,channel_map)?;
        sequence.add_segment(detect)?;
        sequence.analysis_parameters = metadata;
        sequence.analysis_parameters.add_detect_group("noise",self.cycles as usize);
        sequence.set_trigger_channel(channel_map.ttl_index(&self.detect.trigger_channel_name)?)?;
        let (_,shutter) = break_segments(channel_map,&self.detect.shutter_channel_name)?;
        sequence.add_segment(shutter)?;

        let mut steps = vec![(SHUTTER_BREAK_NAME.to_string(),break_repeats(self.shutter_rise_delay))];
        steps.extend(detect_steps("detect",self.cycles));
        Ok((sequence,steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_group_for_all_cycles(){
        let params = DetectNoiseParams{cycles:1_500_000,..<DetectNoiseParams as Initialize>::default()};
        let (mut sequence,steps) = params.build_sequence(&ChannelMap::default()).unwrap();
        assert_eq!(steps.len(),3);
        let program = sequence.setup_sequence(&steps).unwrap();
        assert_eq!(program.num_of_records(),1_500_000);
        assert_eq!(sequence.num_of_record_cycles(),1_500_000);
    }
}
