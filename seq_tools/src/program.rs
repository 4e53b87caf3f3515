use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use crate::analysis::AnalysisMetadata;
use crate::segment::Segment;

#[derive(Clone,Copy,Debug,PartialEq,Eq,Serialize,Deserialize)]
pub enum StepEnd {
    EndLoop,
    EndSequence,
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct CompiledStep {
    pub segment_index:usize,
    pub loops:u64,
    pub next_step:usize,
    pub end:StepEnd,
    /// segment length after rounding to awg memory
    pub duration:f64,
    pub awg_channels:Vec<usize>,
    pub ttl_channels:Vec<usize>,
    /// digitizer triggers per replay of the segment
    pub triggers:usize,
}

/// Flat step table the sequencer replays on its own. The segment table is in first-use order
/// and step segment indices point into it.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct CompiledProgram {
    pub segments:IndexMap<String,Segment>,
    pub steps:Vec<CompiledStep>,
    /// ttl lines driven by at least one step
    pub ttl_driven:Vec<bool>,
    pub n_awg_channels:usize,
    pub trigger_channel:Option<usize>,
    pub analysis:AnalysisMetadata,
}

impl CompiledProgram {
    pub fn loop_counts(&self) -> Vec<u64> {
        self.steps.iter().map(|s| s.loops).collect()
    }

    pub fn next_steps(&self) -> Vec<usize> {
        self.steps.iter().map(|s| s.next_step).collect()
    }

    pub fn durations(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.duration).collect()
    }

    pub fn conditions(&self) -> Vec<StepEnd> {
        self.steps.iter().map(|s| s.end).collect()
    }

    pub fn segment_indices(&self) -> Vec<usize> {
        self.steps.iter().map(|s| s.segment_index).collect()
    }

    pub fn step_segment(&self,step:usize) -> Option<&Segment> {
        self.steps.get(step).and_then(|s| self.segments.get_index(s.segment_index)).map(|(_,seg)| seg)
    }

    /// records the digitizer captures in one replay of the program
    pub fn num_of_records(&self) -> usize {
        self.steps.iter().map(|s| s.loops as usize*s.triggers).sum()
    }

    pub fn total_duration(&self) -> f64 {
        self.steps.iter().map(|s| s.duration*s.loops as f64).sum()
    }
}
