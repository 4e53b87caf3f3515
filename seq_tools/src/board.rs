use std::collections::BTreeMap;
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use crate::channel_map::ChannelMap;
use crate::error::SequenceError;
use crate::hardware_constants::{AWG_SAMPLE_RATE, FILLER_DURATION, FILLER_SEGMENT_NAME, MAX_STEP_LOOPS};
use crate::program::{CompiledProgram, StepEnd};
use crate::segment::Segment;
use crate::ttl_function::TtlFunction;

/*
 Each awg board runs its own sequencer, so the compiled program is lowered once per board.
 The board program is wrapped by a short start and end segment. Steps that drive none of the
 board's channels still take time; runs of them are collapsed into repeats of a 1 ms filler plus
 one filler holding the rest, which keeps the board's segment memory small.
 */

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct BoardStep {
    pub step:usize,
    pub segment_index:usize,
    pub next_step:usize,
    pub loops:u64,
    pub end:StepEnd,
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct BoardProgram {
    pub board:usize,
    pub awg_channels:Vec<usize>,
    pub ttl_channels:Vec<usize>,
    pub segments:IndexMap<String,Segment>,
    pub steps:Vec<BoardStep>,
    /// segment memory partitions, a power of two
    pub max_segments:usize,
}

enum Slot {
    Active(Segment,u64),
    Empty(f64),
}

impl BoardProgram {
    pub fn lower(program:&CompiledProgram,channel_map:&ChannelMap,board:usize) -> Result<Self,SequenceError> {
        let awg_range = channel_map.board_awg_channels(board);
        let ttl_range = channel_map.board_ttl_channels(board);

        let mut start = Segment::start();
        if board == 0 && channel_map.n_boards() > 1 {
            // the first board starts the others
            start.add_ttl_function(0,TtlFunction::On)?;
        }

        let mut slots = vec![Slot::Active(start,1)];
        for step in &program.steps {
            let segment = program.segments.get_index(step.segment_index)
                .map(|(_,s)| s)
                .ok_or(SequenceError::UnknownSegment(format!("index {}",step.segment_index)))?;
            match segment.drives_any(&awg_range,&ttl_range) {
                true => slots.push(Slot::Active(segment.clone(),step.loops)),
                false => slots.push(Slot::Empty(segment.actual_duration()?*step.loops as f64))
            }
        }
        slots.push(Slot::Active(Segment::end(),1));

        let mut plan:Vec<(Segment,u64)> = vec![];
        let mut empty_duration = 0.0;
        for slot in slots {
            match slot {
                Slot::Empty(d) => empty_duration += d,
                Slot::Active(segment,loops) => {
                    plan.extend(filler_steps(empty_duration)?);
                    empty_duration = 0.0;
                    plan.push((segment,loops));
                }
            }
        }

        let mut segments:IndexMap<String,Segment> = IndexMap::new();
        let mut entries:Vec<(usize,u64)> = vec![];
        for (segment,loops) in plan {
            let index = match segments.get_index_of(&segment.name) {
                Some(i) => i,
                None => segments.insert_full(segment.name.clone(),segment).0
            };
            let mut remaining = loops;
            while remaining > 0 {
                let n = remaining.min(MAX_STEP_LOOPS);
                entries.push((index,n));
                remaining -= n;
            }
        }

        let n_steps = entries.len();
        let steps:Vec<BoardStep> = entries.into_iter().enumerate().map(|(i,(segment_index,loops))|{
            let last = i + 1 == n_steps;
            BoardStep {
                step:i,
                segment_index,
                next_step:if last {0} else {i + 1},
                loops,
                end:if last {StepEnd::EndSequence} else {StepEnd::EndLoop},
            }
        }).collect();

        let max_segments = segments.len().next_power_of_two();
        debug!("board {}: {} steps, {} segments in {} partitions",board,steps.len(),segments.len(),max_segments);
        Ok(Self {
            board,
            awg_channels:awg_range.collect(),
            ttl_channels:ttl_range.collect(),
            segments,
            steps,
            max_segments,
        })
    }

    /// dac words for one segment of this board
    pub fn sample_data(&self,segment_index:usize,channel_map:&ChannelMap) -> Result<Vec<i16>,SequenceError> {
        let (name,segment) = self.segments.get_index(segment_index)
            .ok_or(SequenceError::UnknownSegment(format!("index {}",segment_index)))?;
        let ttl_map:BTreeMap<usize,usize> = self.ttl_channels.iter().map(|t| (*t,channel_map.ttl_to_awg(*t))).collect();
        let n_samples = segment.samples(AWG_SAMPLE_RATE)?;
        debug!("rendering {} ({} samples)",name,n_samples);
        segment.get_sample_data(&self.awg_channels,&ttl_map,n_samples,AWG_SAMPLE_RATE)
    }

    pub fn total_duration(&self) -> Result<f64,SequenceError> {
        let mut t = 0.0;
        for step in &self.steps {
            if let Some((_,segment)) = self.segments.get_index(step.segment_index) {
                t += segment.actual_duration()?*step.loops as f64;
            }
        }
        Ok(t)
    }
}

/// fill an idle time with 1 ms segments and one remainder segment
fn filler_steps(empty_duration:f64) -> Result<Vec<(Segment,u64)>,SequenceError> {
    if empty_duration <= 0.0 {
        return Ok(vec![]);
    }
    let filler = Segment::empty(FILLER_SEGMENT_NAME,FILLER_DURATION);
    let filler_duration = filler.actual_duration()?;
    let mut steps = vec![];
    // keep at least one filler length for the remainder so it is never too short
    let n_filler = ((empty_duration/filler_duration).floor() as i64 - 1).max(0) as u64;
    if n_filler > 0 {
        steps.push((filler,n_filler));
    }
    let remainder = empty_duration - n_filler as f64*filler_duration;
    if remainder > 0.5/AWG_SAMPLE_RATE {
        let name = format!("__filler_{:e}s",remainder);
        steps.push((Segment::empty(&name,remainder),1));
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::awg_function::Constant;
    use crate::sequence::Sequence;

    fn program() -> (CompiledProgram,ChannelMap) {
        let map = ChannelMap::default();
        let mut seq = Sequence::new(map.clone());
        let mut a = Segment::new("board0",Some(10E-6));
        a.add_awg_function(1,Constant::new(100.0)).unwrap();
        seq.add_segment(a).unwrap();
        let mut b = Segment::new("board1",Some(10E-6));
        b.add_awg_function(6,Constant::new(100.0)).unwrap();
        seq.add_segment(b).unwrap();
        seq.add_segment(Segment::empty("wait",2.5E-3)).unwrap();
        let p = seq.compile(&[("board0",1),("wait",2),("board1",3)]).unwrap();
        (p,map)
    }

    #[test]
    fn bookends_and_fillers(){
        let (p,map) = program();
        let b = BoardProgram::lower(&p,&map,0).unwrap();
        let names:Vec<&str> = b.steps.iter().map(|s| b.segments.get_index(s.segment_index).unwrap().0.as_str()).collect();
        assert_eq!(names[0],"__start");
        assert_eq!(names[1],"board0");
        assert_eq!(names[2],FILLER_SEGMENT_NAME);
        assert!(names[3].starts_with("__filler_"));
        assert_eq!(*names.last().unwrap(),"__end");
        // wait twice and board1 three times are idle on board 0
        let idle = 2.0*Segment::empty("w",2.5E-3).actual_duration().unwrap() + 3.0*Segment::empty("w",10E-6).actual_duration().unwrap();
        let filler = Segment::empty("f",FILLER_DURATION).actual_duration().unwrap();
        assert_eq!(b.steps[2].loops,(idle/filler).floor() as u64 - 1);
        let bookends = 2.0*Segment::start().actual_duration().unwrap();
        assert!((b.total_duration().unwrap() - (p.total_duration() + bookends)).abs() < 1E-7);
        assert_eq!(b.max_segments,8);
        assert!(b.segments.get("__start").unwrap().ttl_channels_used() == vec![0]);
    }

    #[test]
    fn last_step_wraps_and_ends(){
        let (p,map) = program();
        let b = BoardProgram::lower(&p,&map,1).unwrap();
        let last = b.steps.last().unwrap();
        assert_eq!(last.next_step,0);
        assert_eq!(last.end,StepEnd::EndSequence);
        assert!(b.steps[..b.steps.len()-1].iter().all(|s| s.end == StepEnd::EndLoop));
        assert!(b.segments.get("__start").unwrap().is_empty());
        assert!(b.segments.contains_key("board1"));
        assert!(!b.segments.contains_key("board0"));
    }

    #[test]
    fn large_loop_counts_are_split(){
        let map = ChannelMap::default();
        let mut seq = Sequence::new(map.clone());
        let mut a = Segment::new("tone",Some(1E-6));
        a.add_awg_function(0,Constant::new(1.0)).unwrap();
        seq.add_segment(a).unwrap();
        let p = seq.compile(&[("tone",MAX_STEP_LOOPS + 5)]).unwrap();
        let b = BoardProgram::lower(&p,&map,0).unwrap();
        let loops:Vec<u64> = b.steps.iter().map(|s| s.loops).collect();
        assert_eq!(loops,vec![1,MAX_STEP_LOOPS,5,1]);
    }

    #[test]
    fn sample_data_covers_board_channels(){
        let (p,map) = program();
        let b = BoardProgram::lower(&p,&map,0).unwrap();
        let index = b.segments.get_index_of("board0").unwrap();
        let data = b.sample_data(index,&map).unwrap();
        let n = Segment::empty("x",10E-6).samples(AWG_SAMPLE_RATE).unwrap();
        assert_eq!(data.len(),4*n);
        assert_eq!(data[1],50);
        assert_eq!(data[0],0);
    }
}
