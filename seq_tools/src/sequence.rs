use indexmap::IndexMap;
use log::debug;
use crate::analysis::AnalysisMetadata;
use crate::awg_function::AwgPulse;
use crate::channel_map::ChannelMap;
use crate::error::SequenceError;
use crate::program::{CompiledProgram, CompiledStep, StepEnd};
use crate::segment::Segment;

/*
 A sequence is the set of named segments an experiment may use plus the list of steps to replay
 them. Compiling turns the steps into the flat tables the hardware sequencer walks through:
 one entry per step with its segment, loop count, successor and end condition. The last step
 loops back to the first so the whole program can be replayed by restarting the card.
 */

#[derive(Clone,Debug,PartialEq)]
pub struct Sequence {
    segments:IndexMap<String,Segment>,
    channel_map:ChannelMap,
    trigger_channel:Option<usize>,
    pub analysis_parameters:AnalysisMetadata,
    steps:Vec<(String,u64)>,
}

impl Sequence {
    pub fn new(channel_map:ChannelMap) -> Self {
        Self {
            segments:IndexMap::new(),
            channel_map,
            trigger_channel:None,
            analysis_parameters:AnalysisMetadata::default(),
            steps:vec![],
        }
    }

    /// ttl line that triggers the digitizer, used to count records
    pub fn set_trigger_channel(&mut self,channel:usize) -> Result<(),SequenceError> {
        self.channel_map.check_ttl(channel)?;
        self.trigger_channel = Some(channel);
        Ok(())
    }

    pub fn trigger_channel(&self) -> Option<usize> {
        self.trigger_channel
    }

    pub fn channel_map(&self) -> &ChannelMap {
        &self.channel_map
    }

    pub fn segments(&self) -> &IndexMap<String,Segment> {
        &self.segments
    }

    pub fn segment(&self,name:&str) -> Result<&Segment,SequenceError> {
        self.segments.get(name).ok_or(SequenceError::UnknownSegment(name.to_string()))
    }

    pub fn steps(&self) -> &[(String,u64)] {
        &self.steps
    }

    /// Adds a segment after checking its duration, and its channels and amplitudes against the
    /// channel map. A segment with the same name is replaced.
    pub fn add_segment(&mut self,segment:Segment) -> Result<(),SequenceError> {
        segment.duration()?;
        for (channel,function) in segment.awg_functions() {
            let limit = self.channel_map.awg_limit(*channel)?;
            let amplitude = function.max_amplitude();
            if amplitude > limit {
                return Err(SequenceError::AmplitudeExceeded{segment:segment.name.clone(),channel:*channel,amplitude,limit});
            }
        }
        for channel in segment.ttl_functions().keys() {
            self.channel_map.check_ttl(*channel)?;
        }
        if self.segments.contains_key(&segment.name) {
            debug!("replacing segment {}",segment.name);
        }
        self.segments.insert(segment.name.clone(),segment);
        Ok(())
    }

    /// compile the steps into a program, keeping them as the current steps
    pub fn setup_sequence<S:AsRef<str>>(&mut self,steps:&[(S,u64)]) -> Result<CompiledProgram,SequenceError> {
        let program = self.compile(steps)?;
        self.steps = owned_steps(steps);
        Ok(program)
    }

    pub fn compile<S:AsRef<str>>(&self,steps:&[(S,u64)]) -> Result<CompiledProgram,SequenceError> {
        let steps = self.checked_steps(steps)?;
        let mut table:IndexMap<String,Segment> = IndexMap::new();
        for (name,_) in &steps {
            if !table.contains_key(*name) {
                table.insert(name.to_string(),self.segment(name)?.clone());
            }
        }
        self.build_program(table,&steps)
    }

    /// Compiles new steps against the segment table of a program that is already loaded.
    /// Fails if any step needs a segment that is missing from that table or has changed since.
    pub fn recompile_steps<S:AsRef<str>>(&mut self,previous:&CompiledProgram,steps:&[(S,u64)]) -> Result<CompiledProgram,SequenceError> {
        let checked = self.checked_steps(steps)?;
        for (name,_) in &checked {
            let current = self.segment(name)?;
            match previous.segments.get(*name) {
                Some(loaded) if loaded == current => {}
                _=> return Err(SequenceError::SegmentTableChanged(name.to_string()))
            }
        }
        let program = self.build_program(previous.segments.clone(),&checked)?;
        self.steps = owned_steps(steps);
        Ok(program)
    }

    // unknown names fail, zero repeats are dropped
    fn checked_steps<'a,S:AsRef<str>>(&self,steps:&'a [(S,u64)]) -> Result<Vec<(&'a str,u64)>,SequenceError> {
        if steps.is_empty() {
            return Err(SequenceError::EmptySequence);
        }
        for (name,_) in steps {
            self.segment(name.as_ref())?;
        }
        let kept:Vec<(&str,u64)> = steps.iter().filter(|(_,n)| *n > 0).map(|(s,n)| (s.as_ref(),*n)).collect();
        if kept.is_empty() {
            return Err(SequenceError::EmptySequence);
        }
        Ok(kept)
    }

    fn build_program(&self,table:IndexMap<String,Segment>,steps:&[(&str,u64)]) -> Result<CompiledProgram,SequenceError> {
        let n_steps = steps.len();
        let mut ttl_driven = vec![false;self.channel_map.n_ttl_channels()];
        let mut compiled = Vec::with_capacity(n_steps);
        for (i,(name,loops)) in steps.iter().enumerate() {
            let (segment_index,_,segment) = table.get_full(*name).ok_or(SequenceError::UnknownSegment(name.to_string()))?;
            let ttl_channels = segment.ttl_channels_used();
            ttl_channels.iter().for_each(|ch| ttl_driven[*ch] = true);
            let last = i + 1 == n_steps;
            compiled.push(CompiledStep {
                segment_index,
                loops:*loops,
                next_step:if last {0} else {i + 1},
                end:if last {StepEnd::EndSequence} else {StepEnd::EndLoop},
                duration:segment.actual_duration()?,
                awg_channels:segment.awg_channels_used(),
                ttl_channels,
                triggers:self.trigger_channel.map_or(0,|ch| segment.trigger_count(ch)),
            });
        }
        let program = CompiledProgram {
            segments:table,
            steps:compiled,
            ttl_driven,
            n_awg_channels:self.channel_map.n_awg_channels(),
            trigger_channel:self.trigger_channel,
            analysis:self.analysis_parameters.clone(),
        };
        debug!("compiled {} steps over {} segments, {:.6} s per replay",program.steps.len(),program.segments.len(),program.total_duration());
        Ok(program)
    }

    /// records captured by one replay of the current steps
    pub fn num_of_records(&self) -> Result<usize,SequenceError> {
        let mut n = 0;
        for (name,loops) in &self.steps {
            let segment = self.segment(name)?;
            let triggers = self.trigger_channel.map_or(0,|ch| segment.trigger_count(ch));
            n += *loops as usize*triggers;
        }
        Ok(n)
    }

    pub fn num_of_record_cycles(&self) -> usize {
        self.analysis_parameters.num_of_record_cycles()
    }

    pub fn total_duration(&self) -> Result<f64,SequenceError> {
        let mut t = 0.0;
        for (name,loops) in &self.steps {
            t += self.segment(name)?.actual_duration()?*(*loops as f64);
        }
        Ok(t)
    }
}

fn owned_steps<S:AsRef<str>>(steps:&[(S,u64)]) -> Vec<(String,u64)> {
    steps.iter().map(|(s,n)| (s.as_ref().to_string(),*n)).collect()
}
