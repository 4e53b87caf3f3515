use proptest::prelude::*;
use spectrum::{BufferStrategy, CCedPowerSpectrum, PowerSpectrum};

fn variance(x:&[f64]) -> f64 {
    let n = x.len() as f64;
    let m = x.iter().sum::<f64>()/n;
    x.iter().map(|v| (v - m).powi(2)).sum::<f64>()/n
}

proptest! {
    #[test]
    fn psd_integrates_to_the_variance(trace in prop::collection::vec(-1.0f64..1.0,2..300),dt in 1E-6f64..1E-2) {
        let n = trace.len();
        let mut ps = PowerSpectrum::new(n,dt,None,BufferStrategy::Accumulate).unwrap();
        ps.add_data(&trace).unwrap();
        let df = 1.0/(n as f64*dt);
        let integral = ps.power_spectrum().unwrap().iter().sum::<f64>()*df;
        // an even length trace has its nyquist bin outside the positive frequencies
        let nyquist = match n % 2 {
            0 => {
                let alternating:f64 = trace.iter().enumerate().map(|(i,v)| if i % 2 == 0 {*v} else {-*v}).sum();
                (alternating/n as f64).powi(2)
            }
            _=> 0.0
        };
        prop_assert!((integral + nyquist - variance(&trace)).abs() < 1E-9);
    }

    #[test]
    fn rolling_window_keeps_the_latest(traces in prop::collection::vec(prop::collection::vec(-1.0f64..1.0,16),1..8),size in 1usize..4) {
        let mut roll = PowerSpectrum::new(16,1E-3,None,BufferStrategy::RollingWindow(size)).unwrap();
        for t in &traces {
            roll.add_data(t).unwrap();
        }
        prop_assert_eq!(roll.num_of_averages(),traces.len().min(size));
        let mut latest = PowerSpectrum::new(16,1E-3,None,BufferStrategy::Accumulate).unwrap();
        for t in &traces[traces.len().saturating_sub(size)..] {
            latest.add_data(t).unwrap();
        }
        let a = roll.power_spectrum().unwrap();
        let b = latest.power_spectrum().unwrap();
        for (x,y) in a.iter().zip(b.iter()) {
            prop_assert!((x - y).abs() < 1E-9);
        }
    }
}

#[test]
fn cross_spectrum_keeps_only_shared_tones(){
    let n = 256;
    let tone = |bin:f64,phase:f64| -> Vec<f64> {
        (0..n).map(|i| (2.0*std::f64::consts::PI*bin*i as f64/n as f64 + phase).sin()).collect()
    };
    let mut cc = CCedPowerSpectrum::new(n,1E-3,BufferStrategy::Accumulate).unwrap();
    for k in 0..8 {
        let shared = tone(20.0,0.0);
        let a:Vec<f64> = shared.iter().zip(tone(50.0,k as f64).iter()).map(|(s,t)| s + t).collect();
        let b:Vec<f64> = shared.iter().zip(tone(70.0,2.0*k as f64).iter()).map(|(s,t)| s + t).collect();
        cc.add_data(&a,&b).unwrap();
    }
    let cross = cc.power_spectrum().unwrap();
    let auto = cc.auto_power_spectrum_1().unwrap();
    // positive frequencies start at bin 1
    assert!((cross[19].re - auto[19]).abs() < 1E-9*auto[19]);
    assert!(cross[49].norm() < 1E-9*auto[49]);
    assert_eq!(cc.num_of_averages(),8);
}
