/*
 An awg function is a pure function of time that returns the analog samples of one channel.
 Times are absolute seconds from the start of the segment the function is placed in, so the
 same function can be rendered on any sample grid. Functions that declare a start and end time
 are exactly zero outside of [start_time, end_time).

 Amplitudes are in awg dac units. Range checking against the channel limits happens when a
 segment is added to a sequence, not here.
 */

use std::f64::consts::PI;
use serde::{Deserialize, Serialize};
use crate::error::WaveformError;

pub trait AwgPulse {
    fn output(&self,times:&[f64]) -> Vec<f64>;
    /// shortest segment that contains the whole function
    fn min_duration(&self) -> f64 {
        0.0
    }
    fn max_amplitude(&self) -> f64;
}

/// A parameter given either once for every burst or once per burst.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
#[serde(untagged)]
pub enum ParamList {
    Single(f64),
    List(Vec<f64>),
}

impl From<f64> for ParamList {
    fn from(value:f64) -> Self {
        ParamList::Single(value)
    }
}

impl From<Vec<f64>> for ParamList {
    fn from(values:Vec<f64>) -> Self {
        ParamList::List(values)
    }
}

/// broadcast single values to the length of the list parameters
pub fn unify_lists(params:&[&ParamList]) -> Result<Vec<Vec<f64>>,WaveformError> {
    let length = params.iter().filter_map(|p| match p {
        ParamList::List(v) => Some(v.len()),
        ParamList::Single(_) => None
    }).last().ok_or(WaveformError::NoListParameter)?;
    let unified:Vec<Vec<f64>> = params.iter().map(|p| match p {
        ParamList::Single(v) => vec![*v;length],
        ParamList::List(v) => v.clone()
    }).collect();
    if unified.iter().any(|v| v.len() != length) {
        return Err(WaveformError::ListLengthMismatch(unified.iter().map(|v| v.len()).collect()));
    }
    Ok(unified)
}

fn check_window(start:f64,end:f64) -> Result<(),WaveformError> {
    match end > start {
        true => Ok(()),
        false => Err(WaveformError::InvalidWindow{start,end})
    }
}

fn in_window(t:f64,start:Option<f64>,end:Option<f64>) -> bool {
    start.map_or(true,|s| t >= s) && end.map_or(true,|e| t < e)
}

fn sine(frequency:f64,amplitude:f64,phase:f64,t:f64) -> f64 {
    amplitude*(2.0*PI*frequency*t + phase).sin()
}

fn window_min_duration(start:Option<f64>,end:Option<f64>) -> f64 {
    end.or(start).unwrap_or(0.0)
}

// ln(cosh(x)) without overflowing for large |x|
fn ln_cosh(x:f64) -> f64 {
    let a = x.abs();
    a + (-2.0*a).exp().ln_1p() - std::f64::consts::LN_2
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct Constant {
    pub amplitude:f64,
}

impl Constant {
    pub fn new(amplitude:f64) -> Self {
        Self{amplitude}
    }
}

impl AwgPulse for Constant {
    fn output(&self,times:&[f64]) -> Vec<f64> {
        vec![self.amplitude;times.len()]
    }
    fn max_amplitude(&self) -> f64 {
        self.amplitude
    }
}

#[derive(Clone,Copy,Debug,PartialEq,Eq,Serialize,Deserialize)]
pub enum RampShape {
    Linear,
    HalfSine,
}

/// Holds start_amplitude until ramp_start, ramps to end_amplitude by ramp_end and holds it after.
/// This is a level, so it is not zero outside of the ramp.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct Ramp {
    pub start_amplitude:f64,
    pub end_amplitude:f64,
    pub ramp_start:f64,
    pub ramp_end:f64,
    pub shape:RampShape,
}

impl Ramp {
    pub fn new(start_amplitude:f64,end_amplitude:f64,ramp_start:f64,ramp_end:f64,shape:RampShape) -> Result<Self,WaveformError> {
        check_window(ramp_start,ramp_end)?;
        Ok(Self{start_amplitude,end_amplitude,ramp_start,ramp_end,shape})
    }
}

impl AwgPulse for Ramp {
    fn output(&self,times:&[f64]) -> Vec<f64> {
        let ramp_time = self.ramp_end - self.ramp_start;
        let ramp_amplitude = self.end_amplitude - self.start_amplitude;
        times.iter().map(|t|{
            if *t <= self.ramp_start {
                self.start_amplitude
            }
            else if *t > self.ramp_end {
                self.end_amplitude
            }
            else {
                let x = (t - self.ramp_start)/ramp_time;
                match self.shape {
                    RampShape::Linear => self.start_amplitude + ramp_amplitude*x,
                    RampShape::HalfSine => self.start_amplitude + ramp_amplitude*(PI*x/2.0).sin()
                }
            }
        }).collect()
    }
    fn min_duration(&self) -> f64 {
        self.ramp_end
    }
    fn max_amplitude(&self) -> f64 {
        self.start_amplitude.max(self.end_amplitude)
    }
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct SinePulse {
    pub frequency:f64,
    pub amplitude:f64,
    pub phase:f64,
    pub start_time:Option<f64>,
    pub end_time:Option<f64>,
}

impl SinePulse {
    /// continuous tone, always on
    pub fn new(frequency:f64,amplitude:f64) -> Self {
        Self{frequency,amplitude,phase:0.0,start_time:None,end_time:None}
    }
    pub fn windowed(frequency:f64,amplitude:f64,phase:f64,start_time:Option<f64>,end_time:Option<f64>) -> Result<Self,WaveformError> {
        if let (Some(s),Some(e)) = (start_time,end_time) {
            check_window(s,e)?;
        }
        Ok(Self{frequency,amplitude,phase,start_time,end_time})
    }
}

impl AwgPulse for SinePulse {
    fn output(&self,times:&[f64]) -> Vec<f64> {
        times.iter().map(|t| match in_window(*t,self.start_time,self.end_time) {
            true => sine(self.frequency,self.amplitude,self.phase,*t),
            false => 0.0
        }).collect()
    }
    fn min_duration(&self) -> f64 {
        window_min_duration(self.start_time,self.end_time)
    }
    fn max_amplitude(&self) -> f64 {
        self.amplitude
    }
}

/// sum of two tones sharing one amplitude and phase
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct TwoSinePulse {
    pub frequency1:f64,
    pub frequency2:f64,
    pub amplitude:f64,
    pub phase:f64,
    pub start_time:Option<f64>,
    pub end_time:Option<f64>,
}

impl TwoSinePulse {
    pub fn new(frequency1:f64,frequency2:f64,amplitude:f64,phase:f64,start_time:Option<f64>,end_time:Option<f64>) -> Result<Self,WaveformError> {
        if let (Some(s),Some(e)) = (start_time,end_time) {
            check_window(s,e)?;
        }
        Ok(Self{frequency1,frequency2,amplitude,phase,start_time,end_time})
    }
}

impl AwgPulse for TwoSinePulse {
    fn output(&self,times:&[f64]) -> Vec<f64> {
        times.iter().map(|t| match in_window(*t,self.start_time,self.end_time) {
            true => sine(self.frequency1,self.amplitude,self.phase,*t) + sine(self.frequency2,self.amplitude,self.phase,*t),
            false => 0.0
        }).collect()
    }
    fn min_duration(&self) -> f64 {
        window_min_duration(self.start_time,self.end_time)
    }
    fn max_amplitude(&self) -> f64 {
        self.amplitude
    }
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct SimultaneousSinePulses {
    pub frequencies:Vec<f64>,
    pub amplitude:f64,
    pub phase:f64,
    pub start_time:Option<f64>,
    pub end_time:Option<f64>,
}

impl SimultaneousSinePulses {
    pub fn new(frequencies:Vec<f64>,amplitude:f64,phase:f64,start_time:Option<f64>,end_time:Option<f64>) -> Result<Self,WaveformError> {
        if let (Some(s),Some(e)) = (start_time,end_time) {
            check_window(s,e)?;
        }
        Ok(Self{frequencies,amplitude,phase,start_time,end_time})
    }
}

impl AwgPulse for SimultaneousSinePulses {
    fn output(&self,times:&[f64]) -> Vec<f64> {
        times.iter().map(|t| match in_window(*t,self.start_time,self.end_time) {
            true => self.frequencies.iter().map(|f| sine(*f,self.amplitude,self.phase,*t)).sum(),
            false => 0.0
        }).collect()
    }
    fn min_duration(&self) -> f64 {
        window_min_duration(self.start_time,self.end_time)
    }
    fn max_amplitude(&self) -> f64 {
        self.amplitude*self.frequencies.len() as f64
    }
}

/// product of tones, amplitude times the product of their sines
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct ProductSinePulses {
    pub frequencies:Vec<f64>,
    pub amplitude:f64,
    pub phase:f64,
    pub start_time:Option<f64>,
    pub end_time:Option<f64>,
}

impl ProductSinePulses {
    pub fn new(frequencies:Vec<f64>,amplitude:f64,phase:f64,start_time:Option<f64>,end_time:Option<f64>) -> Result<Self,WaveformError> {
        if let (Some(s),Some(e)) = (start_time,end_time) {
            check_window(s,e)?;
        }
        Ok(Self{frequencies,amplitude,phase,start_time,end_time})
    }
}

impl AwgPulse for ProductSinePulses {
    fn output(&self,times:&[f64]) -> Vec<f64> {
        times.iter().map(|t| match in_window(*t,self.start_time,self.end_time) {
            true => self.frequencies.iter().map(|f| sine(*f,1.0,self.phase,*t)).product::<f64>()*self.amplitude,
            false => 0.0
        }).collect()
    }
    fn min_duration(&self) -> f64 {
        window_min_duration(self.start_time,self.end_time)
    }
    fn max_amplitude(&self) -> f64 {
        self.amplitude
    }
}

/// Linear frequency sweep from start_frequency to stop_frequency.
///
/// The instantaneous frequency multiplies the absolute time, f_inst(t)·t, with f_inst sweeping
/// half of the range. When start_time is 0 this is the same as integrating a full-range linear
/// chirp. For any other start time the phase is not continuous with a chirp, see
/// [SineSweep::continuous_phase_output].
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct SineSweep {
    pub start_frequency:f64,
    pub stop_frequency:f64,
    pub amplitude:f64,
    pub start_time:f64,
    pub end_time:f64,
    pub phase:f64,
    /// multiply by a sech envelope centered in the window
    pub enveloped:bool,
}

fn sweep_value(start_frequency:f64,stop_frequency:f64,amplitude:f64,start_time:f64,end_time:f64,phase:f64,t:f64) -> f64 {
    let duration = end_time - start_time;
    let frequency_scan = stop_frequency - start_frequency;
    let instant_frequency = (t - start_time)/duration*frequency_scan/2.0 + start_frequency;
    amplitude*(2.0*PI*instant_frequency*t + phase).sin()
}

impl SineSweep {
    pub fn new(start_frequency:f64,stop_frequency:f64,amplitude:f64,start_time:f64,end_time:f64,phase:f64) -> Result<Self,WaveformError> {
        check_window(start_time,end_time)?;
        Ok(Self{start_frequency,stop_frequency,amplitude,start_time,end_time,phase,enveloped:false})
    }

    pub fn with_envelope(mut self) -> Self {
        self.enveloped = true;
        self
    }

    fn envelope(&self,t:f64) -> f64 {
        match self.enveloped {
            true => {
                let center = (self.start_time + self.end_time)/2.0;
                1.0/((t - center)/(self.end_time - self.start_time)*8.0).cosh()
            }
            false => 1.0
        }
    }

    /// The same sweep with the phase integrated from the start of the window.
    pub fn continuous_phase_output(&self,times:&[f64]) -> Vec<f64> {
        let duration = self.end_time - self.start_time;
        let frequency_scan = self.stop_frequency - self.start_frequency;
        times.iter().map(|t| match in_window(*t,Some(self.start_time),Some(self.end_time)) {
            true => {
                let tau = t - self.start_time;
                let phase = 2.0*PI*(self.start_frequency*tau + frequency_scan*tau*tau/(2.0*duration));
                self.envelope(*t)*self.amplitude*(phase + self.phase).sin()
            }
            false => 0.0
        }).collect()
    }
}

impl AwgPulse for SineSweep {
    fn output(&self,times:&[f64]) -> Vec<f64> {
        times.iter().map(|t| match in_window(*t,Some(self.start_time),Some(self.end_time)) {
            true => self.envelope(*t)*sweep_value(self.start_frequency,self.stop_frequency,self.amplitude,self.start_time,self.end_time,self.phase,*t),
            false => 0.0
        }).collect()
    }
    fn min_duration(&self) -> f64 {
        self.end_time
    }
    fn max_amplitude(&self) -> f64 {
        self.amplitude
    }
}

/// two simultaneous sweeps in the same window
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct DoubleSineSweep {
    pub start_frequency_1:f64,
    pub stop_frequency_1:f64,
    pub amplitude_1:f64,
    pub start_frequency_2:f64,
    pub stop_frequency_2:f64,
    pub amplitude_2:f64,
    pub start_time:f64,
    pub end_time:f64,
    pub phase:f64,
}

impl DoubleSineSweep {
    pub fn new(first:(f64,f64,f64),second:(f64,f64,f64),start_time:f64,end_time:f64,phase:f64) -> Result<Self,WaveformError> {
        check_window(start_time,end_time)?;
        Ok(Self{
            start_frequency_1:first.0,
            stop_frequency_1:first.1,
            amplitude_1:first.2,
            start_frequency_2:second.0,
            stop_frequency_2:second.1,
            amplitude_2:second.2,
            start_time,
            end_time,
            phase
        })
    }
}

impl AwgPulse for DoubleSineSweep {
    fn output(&self,times:&[f64]) -> Vec<f64> {
        times.iter().map(|t| match in_window(*t,Some(self.start_time),Some(self.end_time)) {
            true => {
                sweep_value(self.start_frequency_1,self.stop_frequency_1,self.amplitude_1,self.start_time,self.end_time,self.phase,*t)
                + sweep_value(self.start_frequency_2,self.stop_frequency_2,self.amplitude_2,self.start_time,self.end_time,self.phase,*t)
            }
            false => 0.0
        }).collect()
    }
    fn min_duration(&self) -> f64 {
        self.end_time
    }
    fn max_amplitude(&self) -> f64 {
        self.amplitude_1.max(self.amplitude_2)
    }
}

/// Tone bursts of length on_time separated by off_time, stepping through the frequency,
/// amplitude and phase lists one burst at a time.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct SineTrain {
    pub on_time:f64,
    pub off_time:f64,
    pub frequencies:Vec<f64>,
    pub amplitudes:Vec<f64>,
    pub phases:Vec<f64>,
    pub start_time:f64,
}

impl SineTrain {
    pub fn new(on_time:f64,off_time:f64,frequencies:ParamList,amplitudes:ParamList,phases:ParamList,start_time:f64) -> Result<Self,WaveformError> {
        if on_time <= 0.0 {
            return Err(WaveformError::NonPositive("on time"));
        }
        let mut lists = unify_lists(&[&frequencies,&amplitudes,&phases])?;
        let phases = lists.pop().unwrap_or_default();
        let amplitudes = lists.pop().unwrap_or_default();
        let frequencies = lists.pop().unwrap_or_default();
        Ok(Self{on_time,off_time,frequencies,amplitudes,phases,start_time})
    }

    /// [start, end) of every burst
    pub fn burst_windows(&self) -> Vec<(f64,f64)> {
        let period = self.on_time + self.off_time;
        (0..self.frequencies.len()).map(|k|{
            let start = self.start_time + k as f64*period;
            (start,start + self.on_time)
        }).collect()
    }
}

impl AwgPulse for SineTrain {
    fn output(&self,times:&[f64]) -> Vec<f64> {
        let mut out = vec![0.0;times.len()];
        for (k,(start,end)) in self.burst_windows().into_iter().enumerate() {
            times.iter().zip(out.iter_mut()).filter(|(t,_)| **t >= start && **t < end).for_each(|(t,o)|{
                *o = sine(self.frequencies[k],self.amplitudes[k],self.phases[k],*t);
            });
        }
        out
    }
    fn min_duration(&self) -> f64 {
        self.start_time + self.frequencies.len() as f64*(self.on_time + self.off_time)
    }
    fn max_amplitude(&self) -> f64 {
        self.amplitudes.iter().cloned().fold(0.0,f64::max)
    }
}

/// one burst per frequency, (amplitude, on_time, off_time) shared by the whole train
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct Train {
    pub frequencies:Vec<f64>,
    pub amplitude:f64,
    pub on_time:f64,
    pub off_time:f64,
}

impl Train {
    // bursts starting at start, the end of the last burst
    fn windows(&self,start:f64) -> (Vec<(f64,f64)>,f64) {
        let mut t = start;
        let mut end = start;
        let windows:Vec<(f64,f64)> = self.frequencies.iter().map(|_|{
            end = t + self.on_time;
            let w = (t,end);
            t = end + self.off_time;
            w
        }).collect();
        (windows,end)
    }
}

/// Two sine trains one after the other, the second starting delay_between_trains after the
/// last burst of the first and shifted in phase by phase_difference.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct DoubleSineTrain {
    pub train_1:Train,
    pub delay_between_trains:f64,
    pub train_2:Train,
    pub phase_difference:f64,
}

impl DoubleSineTrain {
    /// A single second train frequency is repeated for every burst of the first train.
    pub fn new(train_1_frequencies:Vec<f64>,train_1:(f64,f64,f64),delay_between_trains:f64,train_2_frequencies:ParamList,train_2:(f64,f64,f64),phase_difference:f64) -> Result<Self,WaveformError> {
        if train_1_frequencies.is_empty() {
            return Err(WaveformError::NoListParameter);
        }
        if train_1.1 <= 0.0 || train_2.1 <= 0.0 {
            return Err(WaveformError::NonPositive("on time"));
        }
        let train_2_frequencies = match train_2_frequencies {
            ParamList::Single(f) => vec![f;train_1_frequencies.len()],
            ParamList::List(f) => f
        };
        Ok(Self{
            train_1:Train{frequencies:train_1_frequencies,amplitude:train_1.0,on_time:train_1.1,off_time:train_1.2},
            delay_between_trains,
            train_2:Train{frequencies:train_2_frequencies,amplitude:train_2.0,on_time:train_2.1,off_time:train_2.2},
            phase_difference,
        })
    }

    /// [start, end) of the bursts of both trains
    pub fn burst_windows(&self) -> (Vec<(f64,f64)>,Vec<(f64,f64)>) {
        let (first,end) = self.train_1.windows(0.0);
        let (second,_) = self.train_2.windows(end + self.delay_between_trains);
        (first,second)
    }
}

impl AwgPulse for DoubleSineTrain {
    fn output(&self,times:&[f64]) -> Vec<f64> {
        let (first,second) = self.burst_windows();
        let mut out = vec![0.0;times.len()];
        let trains = [(&self.train_1,first,0.0),(&self.train_2,second,self.phase_difference)];
        for (train,windows,phase) in trains {
            for (f,(start,end)) in train.frequencies.iter().zip(windows) {
                times.iter().zip(out.iter_mut()).filter(|(t,_)| **t >= start && **t < end).for_each(|(t,o)|{
                    *o += sine(*f,train.amplitude,phase,*t);
                });
            }
        }
        out
    }
    fn min_duration(&self) -> f64 {
        let (first,second) = self.burst_windows();
        second.last().or(first.last()).map_or(0.0,|(_,end)| *end)
    }
    fn max_amplitude(&self) -> f64 {
        self.train_1.amplitude.max(self.train_2.amplitude)
    }
}

/// A frequency comb on for on_time_1, then after delay the same comb shifted by comb_detuning
/// for on_time_2 with a phase offset.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct SimultaneousDoubleSineTrain {
    pub frequencies:Vec<f64>,
    pub amplitude_1:f64,
    pub amplitude_2:f64,
    pub comb_detuning:f64,
    pub phase_difference:f64,
    pub on_time_1:f64,
    pub on_time_2:f64,
    pub delay:f64,
}

impl SimultaneousDoubleSineTrain {
    pub fn new(frequencies:Vec<f64>,amplitudes:(f64,f64),comb_detuning:f64,phase_difference:f64,on_times:(f64,f64),delay:f64) -> Result<Self,WaveformError> {
        if frequencies.is_empty() {
            return Err(WaveformError::NoListParameter);
        }
        if on_times.0 <= 0.0 || on_times.1 <= 0.0 {
            return Err(WaveformError::NonPositive("on time"));
        }
        Ok(Self{
            frequencies,
            amplitude_1:amplitudes.0,
            amplitude_2:amplitudes.1,
            comb_detuning,
            phase_difference,
            on_time_1:on_times.0,
            on_time_2:on_times.1,
            delay
        })
    }
}

impl AwgPulse for SimultaneousDoubleSineTrain {
    fn output(&self,times:&[f64]) -> Vec<f64> {
        let second_start = self.on_time_1 + self.delay;
        let second_end = second_start + self.on_time_2;
        times.iter().map(|t|{
            if *t >= 0.0 && *t < self.on_time_1 {
                self.frequencies.iter().map(|f| sine(*f,self.amplitude_1,0.0,*t)).sum()
            }
            else if *t >= second_start && *t < second_end {
                self.frequencies.iter().map(|f| sine(f + self.comb_detuning,self.amplitude_2,self.phase_difference,*t)).sum()
            }
            else {
                0.0
            }
        }).collect()
    }
    fn min_duration(&self) -> f64 {
        self.on_time_1 + self.delay + self.on_time_2
    }
    fn max_amplitude(&self) -> f64 {
        self.amplitude_1.max(self.amplitude_2)*self.frequencies.len() as f64
    }
}

/// Hyperbolic-secant / tanh adiabatic passage pulse (HS1 shape with a flat chirp section).
///
/// The amplitude rises as a sech over t_0, stays flat for the chirp time t_ch and falls as a sech
/// over t_0 again. The instantaneous frequency follows tanh edges around a linear chirp
/// of the full scan range centred on center_frequency.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct HshPulse {
    pub amplitude:f64,
    pub t_0:f64,
    pub t_e:f64,
    pub t_ch:f64,
    pub center_frequency:f64,
    pub scan_range:f64,
}

impl HshPulse {
    pub fn new(amplitude:f64,t_0:f64,t_e:f64,t_ch:f64,center_frequency:f64,scan_range:f64) -> Result<Self,WaveformError> {
        if t_e <= 0.0 {
            return Err(WaveformError::NonPositive("edge time"));
        }
        if t_ch <= 0.0 {
            return Err(WaveformError::NonPositive("chirp time"));
        }
        Ok(Self{amplitude,t_0,t_e,t_ch,center_frequency,scan_range})
    }

    pub fn duration(&self) -> f64 {
        self.t_ch + 2.0*self.t_0
    }

    pub fn omega(&self,t:f64) -> f64 {
        let (t0,tch,te) = (self.t_0,self.t_ch,self.t_e);
        if t < 0.0 {
            0.0
        }
        else if t <= t0 {
            self.amplitude/((t - t0)/te).cosh()
        }
        else if t <= t0 + tch {
            self.amplitude
        }
        else if t <= self.duration() {
            self.amplitude/((t - t0 - tch)/te).cosh()
        }
        else {
            0.0
        }
    }

    /// integrated frequency in cycles
    pub fn phase_cycles(&self,t:f64) -> f64 {
        let (t0,tch,te,fc) = (self.t_0,self.t_ch,self.t_e,self.center_frequency);
        let kappa = 2.0*self.scan_range/tch;
        let int_f_1 = |r:f64| fc*r - kappa*tch*r/2.0 + te*te*kappa*ln_cosh((r - t0)/te);
        let int_f_2 = |r:f64| fc*r + 0.5*kappa*r*r - kappa*r*(t0 + tch/2.0);
        let int_f_3 = |r:f64| fc*r + kappa*tch*r/2.0 + te*te*kappa*ln_cosh((t0 + tch - r)/te);
        if t < 0.0 {
            0.0
        }
        else if t <= t0 {
            int_f_1(t) - int_f_1(0.0)
        }
        else if t <= t0 + tch {
            int_f_1(t0) - int_f_1(0.0) + int_f_2(t) - int_f_2(t0)
        }
        else if t <= self.duration() {
            int_f_1(t0) - int_f_1(0.0) + int_f_2(t0 + tch) - int_f_2(t0) + int_f_3(t) - int_f_3(t0 + tch)
        }
        else {
            0.0
        }
    }
}

impl AwgPulse for HshPulse {
    fn output(&self,times:&[f64]) -> Vec<f64> {
        times.iter().map(|t| self.omega(*t)*(2.0*PI*self.phase_cycles(*t)).sin()).collect()
    }
    fn min_duration(&self) -> f64 {
        self.duration()
    }
    fn max_amplitude(&self) -> f64 {
        self.amplitude
    }
}

/// Sub-pulses played back to back with no gaps.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct CompositePulse {
    pub durations:Vec<f64>,
    pub frequencies:Vec<f64>,
    pub amplitudes:Vec<f64>,
    pub phases:Vec<f64>,
    pub start_time:f64,
}

impl CompositePulse {
    pub fn new(durations:ParamList,frequencies:ParamList,amplitudes:ParamList,phases:ParamList,start_time:f64) -> Result<Self,WaveformError> {
        let mut lists = unify_lists(&[&durations,&frequencies,&amplitudes,&phases])?;
        let phases = lists.pop().unwrap_or_default();
        let amplitudes = lists.pop().unwrap_or_default();
        let frequencies = lists.pop().unwrap_or_default();
        let durations = lists.pop().unwrap_or_default();
        if durations.iter().any(|d| *d <= 0.0) {
            return Err(WaveformError::NonPositive("sub-pulse duration"));
        }
        Ok(Self{durations,frequencies,amplitudes,phases,start_time})
    }

    pub fn windows(&self) -> Vec<(f64,f64)> {
        let mut start = self.start_time;
        self.durations.iter().map(|d|{
            let w = (start,start + d);
            start += d;
            w
        }).collect()
    }
}

impl AwgPulse for CompositePulse {
    fn output(&self,times:&[f64]) -> Vec<f64> {
        let mut out = vec![0.0;times.len()];
        for (k,(start,end)) in self.windows().into_iter().enumerate() {
            times.iter().zip(out.iter_mut()).filter(|(t,_)| **t >= start && **t < end).for_each(|(t,o)|{
                *o = sine(self.frequencies[k],self.amplitudes[k],self.phases[k],*t);
            });
        }
        out
    }
    fn min_duration(&self) -> f64 {
        self.start_time + self.durations.iter().sum::<f64>()
    }
    fn max_amplitude(&self) -> f64 {
        self.amplitudes.iter().cloned().fold(0.0,f64::max)
    }
}

/// pi/2 - delay - pi - delay - pi/2
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct SpinEcho {
    pub piov2_time:f64,
    pub pi_time:f64,
    pub delay_time:f64,
    pub frequency:f64,
    pub amplitude:f64,
    pub phase:f64,
    pub phase_pi:f64,
}

impl SpinEcho {
    pub fn new(piov2_time:f64,pi_time:f64,delay_time:f64,frequency:f64,amplitude:f64,phase:f64,phase_pi:f64) -> Result<Self,WaveformError> {
        if piov2_time <= 0.0 || pi_time <= 0.0 {
            return Err(WaveformError::NonPositive("pulse time"));
        }
        Ok(Self{piov2_time,pi_time,delay_time,frequency,amplitude,phase,phase_pi})
    }
}

impl AwgPulse for SpinEcho {
    fn output(&self,times:&[f64]) -> Vec<f64> {
        let first_end = self.piov2_time;
        let pi_start = first_end + self.delay_time;
        let pi_end = pi_start + self.pi_time;
        let last_start = pi_end + self.delay_time;
        let last_end = last_start + self.piov2_time;
        times.iter().map(|t|{
            if *t >= 0.0 && *t < first_end {
                sine(self.frequency,self.amplitude,0.0,*t)
            }
            else if *t >= pi_start && *t < pi_end {
                sine(self.frequency,self.amplitude,self.phase_pi,*t)
            }
            else if *t >= last_start && *t < last_end {
                sine(self.frequency,self.amplitude,self.phase,*t)
            }
            else {
                0.0
            }
        }).collect()
    }
    fn min_duration(&self) -> f64 {
        2.0*self.piov2_time + 2.0*self.delay_time + self.pi_time
    }
    fn max_amplitude(&self) -> f64 {
        self.amplitude
    }
}

/// Pump tones, a wait, then a single phase-controlled probe tone.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct FidPulse {
    pub pump_frequencies:Vec<f64>,
    pub pump_amplitude:f64,
    pub pump_time:f64,
    pub wait_time:f64,
    pub probe_frequency:f64,
    pub probe_amplitude:f64,
    pub probe_time:f64,
    pub probe_phase:f64,
    pub start_time:f64,
}

impl FidPulse {
    pub fn probe_window(&self) -> (f64,f64) {
        let start = self.start_time + self.pump_time + self.wait_time;
        (start,start + self.probe_time)
    }
}

impl AwgPulse for FidPulse {
    fn output(&self,times:&[f64]) -> Vec<f64> {
        let pump_end = self.start_time + self.pump_time;
        let (probe_start,probe_end) = self.probe_window();
        times.iter().map(|t|{
            let mut v = 0.0;
            if *t >= self.start_time && *t < pump_end {
                v += self.pump_frequencies.iter().map(|f| sine(*f,self.pump_amplitude,0.0,*t)).sum::<f64>();
            }
            if *t >= probe_start && *t < probe_end {
                v += sine(self.probe_frequency,self.probe_amplitude,self.probe_phase,*t);
            }
            v
        }).collect()
    }
    fn min_duration(&self) -> f64 {
        self.start_time + self.pump_time + self.wait_time + self.probe_time
    }
    fn max_amplitude(&self) -> f64 {
        self.pump_amplitude.max(self.probe_amplitude)
    }
}

/// Places functions in disjoint windows of one channel. Each function sees time relative to the
/// start of its own window.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct MultiFunctions {
    pub functions:Vec<AwgFunction>,
    pub start_times:Vec<f64>,
    pub end_times:Vec<f64>,
}

impl MultiFunctions {
    pub fn new(functions:Vec<AwgFunction>,start_times:Vec<f64>,end_times:Vec<f64>) -> Result<Self,WaveformError> {
        if functions.len() != start_times.len() || functions.len() != end_times.len() {
            return Err(WaveformError::WindowCountMismatch{functions:functions.len(),windows:start_times.len().min(end_times.len())});
        }
        for k in 0..start_times.len() {
            check_window(start_times[k],end_times[k])?;
            if k > 0 && start_times[k] < end_times[k-1] {
                return Err(WaveformError::OverlappingWindows(k));
            }
        }
        Ok(Self{functions,start_times,end_times})
    }
}

impl AwgPulse for MultiFunctions {
    fn output(&self,times:&[f64]) -> Vec<f64> {
        let mut out = vec![0.0;times.len()];
        for (k,function) in self.functions.iter().enumerate() {
            let (start,end) = (self.start_times[k],self.end_times[k]);
            let indices:Vec<usize> = times.iter().enumerate()
                .filter(|(_,t)| **t >= start && **t < end)
                .map(|(i,_)| i).collect();
            let shifted:Vec<f64> = indices.iter().map(|i| times[*i] - start).collect();
            let values = function.output(&shifted);
            indices.iter().zip(values).for_each(|(i,v)| out[*i] = v);
        }
        out
    }
    fn min_duration(&self) -> f64 {
        self.end_times.iter().cloned().fold(0.0,f64::max)
    }
    fn max_amplitude(&self) -> f64 {
        self.functions.iter().map(|f| f.max_amplitude()).fold(0.0,f64::max)
    }
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
#[serde(tag = "function")]
pub enum AwgFunction {
    Zero,
    Constant(Constant),
    Ramp(Ramp),
    SinePulse(SinePulse),
    TwoSinePulse(TwoSinePulse),
    SimultaneousSinePulses(SimultaneousSinePulses),
    ProductSinePulses(ProductSinePulses),
    SineSweep(SineSweep),
    DoubleSineSweep(DoubleSineSweep),
    SineTrain(SineTrain),
    DoubleSineTrain(DoubleSineTrain),
    SimultaneousDoubleSineTrain(SimultaneousDoubleSineTrain),
    HshPulse(HshPulse),
    CompositePulse(CompositePulse),
    SpinEcho(SpinEcho),
    FidPulse(FidPulse),
    MultiFunctions(MultiFunctions),
}

impl AwgFunction {
    fn pulse(&self) -> Option<&dyn AwgPulse> {
        match self {
            AwgFunction::Zero => None,
            AwgFunction::Constant(p) => Some(p),
            AwgFunction::Ramp(p) => Some(p),
            AwgFunction::SinePulse(p) => Some(p),
            AwgFunction::TwoSinePulse(p) => Some(p),
            AwgFunction::SimultaneousSinePulses(p) => Some(p),
            AwgFunction::ProductSinePulses(p) => Some(p),
            AwgFunction::SineSweep(p) => Some(p),
            AwgFunction::DoubleSineSweep(p) => Some(p),
            AwgFunction::SineTrain(p) => Some(p),
            AwgFunction::DoubleSineTrain(p) => Some(p),
            AwgFunction::SimultaneousDoubleSineTrain(p) => Some(p),
            AwgFunction::HshPulse(p) => Some(p),
            AwgFunction::CompositePulse(p) => Some(p),
            AwgFunction::SpinEcho(p) => Some(p),
            AwgFunction::FidPulse(p) => Some(p),
            AwgFunction::MultiFunctions(p) => Some(p),
        }
    }
}

impl AwgPulse for AwgFunction {
    fn output(&self,times:&[f64]) -> Vec<f64> {
        match self.pulse() {
            Some(p) => p.output(times),
            None => vec![0.0;times.len()]
        }
    }
    fn min_duration(&self) -> f64 {
        self.pulse().map_or(0.0,|p| p.min_duration())
    }
    fn max_amplitude(&self) -> f64 {
        self.pulse().map_or(0.0,|p| p.max_amplitude())
    }
}

macro_rules! into_awg_function {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for AwgFunction {
                fn from(p:$variant) -> Self {
                    AwgFunction::$variant(p)
                }
            }
        )*
    };
}

into_awg_function!(Constant,Ramp,SinePulse,TwoSinePulse,SimultaneousSinePulses,ProductSinePulses,SineSweep,DoubleSineSweep,SineTrain,DoubleSineTrain,SimultaneousDoubleSineTrain,HshPulse,CompositePulse,SpinEcho,FidPulse,MultiFunctions);

#[cfg(test)]
mod tests {
    use super::*;

    fn time_axis(n:usize,dt:f64) -> Vec<f64> {
        (0..n).map(|i| i as f64*dt).collect()
    }

    #[test]
    fn sine_pulse_is_zero_outside_window(){
        let p = SinePulse::windowed(1E6,100.0,0.3,Some(2E-6),Some(5E-6)).unwrap();
        let t = time_axis(1000,1E-8);
        let y = p.output(&t);
        for (ti,yi) in t.iter().zip(y.iter()) {
            if *ti < 2E-6 || *ti >= 5E-6 {
                assert_eq!(*yi,0.0);
            }
        }
        assert!(y.iter().any(|v| *v != 0.0));
        assert_eq!(p.min_duration(),5E-6);
    }

    #[test]
    fn sine_pulse_min_duration_falls_back_to_start(){
        let p = SinePulse::windowed(1E6,1.0,0.0,Some(3E-6),None).unwrap();
        assert_eq!(p.min_duration(),3E-6);
        assert_eq!(SinePulse::new(1E6,1.0).min_duration(),0.0);
    }

    #[test]
    fn sweep_keeps_absolute_time_formula(){
        let s = SineSweep::new(1E6,3E6,1000.0,0.0,10E-6,0.0).unwrap();
        let t = vec![4E-6];
        let f_inst:f64 = 4E-6/10E-6*2E6/2.0 + 1E6;
        let expected = 1000.0*(2.0*PI*f_inst*4E-6).sin();
        assert!((s.output(&t)[0] - expected).abs() < 1E-9);
    }

    #[test]
    fn sweep_interpretations_agree_only_from_zero(){
        let t = time_axis(2000,5E-9);
        let from_zero = SineSweep::new(1E6,5E6,1.0,0.0,10E-6,0.2).unwrap();
        let a = from_zero.output(&t);
        let b = from_zero.continuous_phase_output(&t);
        a.iter().zip(b.iter()).for_each(|(x,y)| assert!((x - y).abs() < 1E-6));

        let delayed = SineSweep::new(1E6,5E6,1.0,2E-6,10E-6,0.2).unwrap();
        let a = delayed.output(&t);
        let b = delayed.continuous_phase_output(&t);
        let max_diff = a.iter().zip(b.iter()).map(|(x,y)| (x - y).abs()).fold(0.0,f64::max);
        assert!(max_diff > 0.1);
    }

    #[test]
    fn enveloped_sweep_peaks_at_center(){
        let s = SineSweep::new(0.0,0.0,1.0,0.0,1.0,PI/2.0).unwrap().with_envelope();
        let y = s.output(&[0.5,0.0]);
        assert!((y[0] - 1.0).abs() < 1E-12);
        assert!((y[1] - 1.0/4f64.cosh()).abs() < 1E-12);
    }

    #[test]
    fn sine_train_broadcasts_scalars(){
        let train = SineTrain::new(1E-6,1E-6,vec![1E6,2E6,3E6].into(),100.0.into(),0.0.into(),0.5E-6).unwrap();
        assert_eq!(train.amplitudes,vec![100.0;3]);
        assert_eq!(train.phases,vec![0.0;3]);
        assert!((train.min_duration() - 6.5E-6).abs() < 1E-15);
        assert_eq!(train.max_amplitude(),100.0);
        // off between bursts
        let y = train.output(&[1.7E-6,0.4E-6,7E-6]);
        assert_eq!(y,vec![0.0,0.0,0.0]);
        // second burst plays the second frequency
        let t = 2.7E-6;
        let y = train.output(&[t]);
        assert!((y[0] - 100.0*(2.0*PI*2E6*t).sin()).abs() < 1E-9);
    }

    #[test]
    fn sine_train_requires_consistent_lists(){
        let e = SineTrain::new(1E-6,1E-6,1E6.into(),100.0.into(),0.0.into(),0.0);
        assert_eq!(e,Err(WaveformError::NoListParameter));
        let e = SineTrain::new(1E-6,1E-6,vec![1E6,2E6].into(),vec![1.0,2.0,3.0].into(),0.0.into(),0.0);
        assert!(matches!(e,Err(WaveformError::ListLengthMismatch(_))));
    }

    #[test]
    fn product_of_tones_stays_in_window(){
        let p = ProductSinePulses::new(vec![1E6,3E6],50.0,0.0,Some(1E-6),Some(2E-6)).unwrap();
        let t = 1.3E-6;
        let expected = 50.0*(2.0*PI*1E6*t).sin()*(2.0*PI*3E6*t).sin();
        assert!((p.output(&[t])[0] - expected).abs() < 1E-9);
        assert_eq!(p.output(&[0.5E-6,2E-6]),vec![0.0,0.0]);
        assert_eq!(p.max_amplitude(),50.0);
        assert_eq!(p.min_duration(),2E-6);
    }

    #[test]
    fn double_train_follows_the_first_after_the_delay(){
        // bursts at [0,1) and [3,4) us, then the second train from 6 us
        let d = DoubleSineTrain::new(vec![1E6,2E6],(10.0,1E-6,2E-6),2E-6,5E6.into(),(20.0,0.5E-6,0.5E-6),PI).unwrap();
        assert_eq!(d.train_2.frequencies,vec![5E6,5E6]);
        let (first,second) = d.burst_windows();
        let expected = [(0.0,1E-6),(3E-6,4E-6)];
        assert_eq!(first.len(),2);
        first.iter().zip(expected.iter()).for_each(|(a,b)| assert!((a.0 - b.0).abs() < 1E-15 && (a.1 - b.1).abs() < 1E-15));
        assert!((second[0].0 - 6E-6).abs() < 1E-15);
        assert!((d.min_duration() - 7.5E-6).abs() < 1E-15);
        assert_eq!(d.max_amplitude(),20.0);

        let y = d.output(&[2E-6,5E-6,7.6E-6]);
        assert_eq!(y,vec![0.0,0.0,0.0]);
        let t = 6.2E-6;
        assert!((d.output(&[t])[0] - 20.0*(2.0*PI*5E6*t + PI).sin()).abs() < 1E-9);
        assert!(matches!(DoubleSineTrain::new(vec![],(1.0,1E-6,0.0),0.0,1E6.into(),(1.0,1E-6,0.0),0.0),Err(WaveformError::NoListParameter)));
    }

    #[test]
    fn shifted_comb_plays_after_the_delay(){
        let s = SimultaneousDoubleSineTrain::new(vec![1E6,2E6],(10.0,5.0),0.5E6,0.0,(1E-6,2E-6),1E-6).unwrap();
        assert!((s.min_duration() - 4E-6).abs() < 1E-15);
        assert_eq!(s.max_amplitude(),20.0);
        assert_eq!(s.output(&[1.5E-6,4.5E-6]),vec![0.0,0.0]);
        let t = 0.3E-6;
        let first = 10.0*((2.0*PI*1E6*t).sin() + (2.0*PI*2E6*t).sin());
        assert!((s.output(&[t])[0] - first).abs() < 1E-9);
        let t = 2.5E-6;
        let second = 5.0*((2.0*PI*1.5E6*t).sin() + (2.0*PI*2.5E6*t).sin());
        assert!((s.output(&[t])[0] - second).abs() < 1E-9);
    }

    #[test]
    fn composite_pulse_back_to_back(){
        let c = CompositePulse::new(vec![1E-6,2E-6].into(),1E6.into(),vec![10.0,20.0].into(),vec![0.0,PI].into(),1E-6).unwrap();
        assert!((c.min_duration() - 4E-6).abs() < 1E-15);
        assert_eq!(c.max_amplitude(),20.0);
        let t = [0.5E-6,1.5E-6,2.5E-6,4.5E-6];
        let y = c.output(&t);
        assert_eq!(y[0],0.0);
        assert!((y[1] - 10.0*(2.0*PI*1E6*t[1]).sin()).abs() < 1E-9);
        assert!((y[2] - 20.0*(2.0*PI*1E6*t[2] + PI).sin()).abs() < 1E-9);
        assert_eq!(y[3],0.0);
    }

    #[test]
    fn hsh_pulse_shape(){
        let h = HshPulse::new(1000.0,1E-3,0.2E-3,2E-3,100E3,20E3).unwrap();
        assert!((h.min_duration() - 4E-3).abs() < 1E-15);
        assert_eq!(h.omega(-1E-6),0.0);
        assert_eq!(h.omega(1.5E-3),1000.0);
        assert!((h.omega(0.0) - 1000.0/5f64.cosh()).abs() < 1E-9);
        assert_eq!(h.omega(4.1E-3),0.0);
        // phase is continuous across the section boundaries
        for edge in [1E-3,3E-3] {
            let before = h.phase_cycles(edge);
            let after = h.phase_cycles(edge + 1E-12);
            assert!((after - before).abs() < 1E-6);
        }
        // flat section chirps through the center frequency at its midpoint
        let dt = 1E-9;
        let f_mid = (h.phase_cycles(2E-3 + dt) - h.phase_cycles(2E-3 - dt))/(2.0*dt);
        assert!((f_mid - 100E3).abs() < 1.0);
    }

    #[test]
    fn multi_functions_shift_time(){
        let pump = AwgFunction::from(Constant::new(5.0));
        let probe = AwgFunction::from(SinePulse::windowed(1E6,10.0,0.0,Some(0.0),Some(1E-6)).unwrap());
        let m = MultiFunctions::new(vec![pump,probe],vec![0.0,2E-6],vec![1E-6,3E-6]).unwrap();
        let y = m.output(&[0.5E-6,1.5E-6,2.25E-6,3.5E-6]);
        assert_eq!(y[0],5.0);
        assert_eq!(y[1],0.0);
        assert!((y[2] - 10.0).abs() < 1E-9);
        assert_eq!(y[3],0.0);
        assert_eq!(m.min_duration(),3E-6);
        assert_eq!(m.max_amplitude(),10.0);
    }

    #[test]
    fn multi_functions_reject_overlap(){
        let f = vec![AwgFunction::Zero,AwgFunction::Zero];
        let e = MultiFunctions::new(f,vec![0.0,1E-6],vec![2E-6,3E-6]);
        assert_eq!(e,Err(WaveformError::OverlappingWindows(1)));
    }

    #[test]
    fn spin_echo_is_silent_during_delays(){
        let s = SpinEcho::new(1E-6,2E-6,3E-6,1E6,7.0,0.0,PI).unwrap();
        assert!((s.min_duration() - 10E-6).abs() < 1E-15);
        let y = s.output(&[2E-6,7E-6,10.5E-6]);
        assert_eq!(y,vec![0.0,0.0,0.0]);
    }

    #[test]
    fn function_serializes_with_tag(){
        let f = AwgFunction::from(Constant::new(3.0));
        let s = serde_json::to_string(&f).unwrap();
        assert!(s.contains("\"function\":\"Constant\""));
        let back:AwgFunction = serde_json::from_str(&s).unwrap();
        assert_eq!(back,f);
    }
}
