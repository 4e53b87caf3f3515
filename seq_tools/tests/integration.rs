use proptest::prelude::*;
use seq_tools::awg_function::{AwgFunction, AwgPulse, SinePulse, SineSweep, SineTrain};
use seq_tools::channel_map::ChannelMap;
use seq_tools::error::SequenceError;
use seq_tools::segment::Segment;
use seq_tools::sequence::Sequence;
use seq_tools::ttl_function::TtlFunction;

fn time_axis(n:usize,duration:f64) -> Vec<f64> {
    (0..n).map(|i| i as f64*duration/n as f64).collect()
}

proptest! {
    #[test]
    fn windowed_functions_are_local(start in 0.0f64..5E-6,width in 0.1E-6f64..5E-6,freq in 1E5f64..1E8,phase in 0.0f64..6.3) {
        let end = start + width;
        let functions:Vec<AwgFunction> = vec![
            SinePulse::windowed(freq,1000.0,phase,Some(start),Some(end)).unwrap().into(),
            SineSweep::new(freq,2.0*freq,1000.0,start,end,phase).unwrap().into(),
            SineTrain::new(width/4.0,width/4.0,vec![freq,freq*1.1].into(),1000.0.into(),phase.into(),start).unwrap().into(),
        ];
        let times = time_axis(4000,12E-6);
        for f in functions {
            let y = f.output(&times);
            prop_assert_eq!(y.len(),times.len());
            for (t,v) in times.iter().zip(y.iter()) {
                if *t < start || *t >= end {
                    prop_assert_eq!(*v,0.0);
                }
            }
        }
    }

    #[test]
    fn segment_duration_covers_its_functions(start in 0.0f64..10E-6,width in 0.1E-6f64..10E-6,padding in 0.0f64..2E-6) {
        let pulse = SinePulse::windowed(1E6,100.0,0.0,Some(start),Some(start + width)).unwrap();
        let min = pulse.min_duration();
        let mut s = Segment::new("probe",None);
        s.add_awg_function(1,pulse).unwrap();
        s.add_ttl_function(1,TtlFunction::pulses(&[(0.0,4E-6)]).unwrap()).unwrap();
        s.set_padding(padding);
        let d = s.duration().unwrap();
        prop_assert!(d >= min);
        prop_assert!(d >= 4E-6);
        prop_assert!(s.actual_duration().unwrap() >= d);
    }

    #[test]
    fn explicit_durations_hold_their_functions(end in 0.5E-6f64..10E-6,requested in 0.1E-6f64..12E-6) {
        let mut s = Segment::new("probe",Some(requested));
        s.add_awg_function(1,SinePulse::windowed(1E6,100.0,0.0,Some(0.0),Some(end)).unwrap()).unwrap();
        let mut seq = Sequence::new(ChannelMap::default());
        match s.duration() {
            Ok(d) => {
                prop_assert!(d >= end - 1E-12);
                seq.add_segment(s).unwrap();
                let p = seq.compile(&[("probe",1)]).unwrap();
                prop_assert!(p.durations()[0] >= end - 1E-12);
            }
            Err(e) => {
                prop_assert!(requested < end);
                prop_assert_eq!(e.clone(),SequenceError::DurationTooShort{segment:"probe".to_string(),duration:requested,min:end});
                prop_assert_eq!(seq.add_segment(s),Err(e));
            }
        }
    }

    #[test]
    fn compiling_is_deterministic(repeats in proptest::collection::vec(0u64..20,1..8)) {
        let mut seq = Sequence::new(ChannelMap::default());
        seq.set_trigger_channel(1).unwrap();
        let mut burn = Segment::new("burn",Some(100E-6));
        burn.add_awg_function(1,SinePulse::new(80E6,1000.0)).unwrap();
        seq.add_segment(burn).unwrap();
        let mut probe = Segment::new("probe",Some(16E-6));
        probe.add_ttl_function(1,TtlFunction::pulses(&[(0.0,4E-6)]).unwrap()).unwrap();
        seq.add_segment(probe).unwrap();
        let names = ["burn","probe"];
        let steps:Vec<(&str,u64)> = repeats.iter().enumerate().map(|(i,r)| (names[i%2],*r)).collect();
        let a = seq.compile(&steps);
        let b = seq.compile(&steps);
        prop_assert_eq!(&a,&b);
        if let Ok(p) = a {
            let expected:u64 = steps.iter().filter(|(n,_)| *n == "probe").map(|(_,r)| *r).sum();
            prop_assert_eq!(p.num_of_records() as u64,expected);
            prop_assert_eq!(p.loop_counts().len(),steps.iter().filter(|(_,r)| *r > 0).count());
        }
    }
}
