use log::debug;
use utils::{fft, fft_freq, mean};
use crate::binning::LogBinning;
use crate::buffer::{BufferStrategy, TraceBuffer};
use crate::error::SpectrumError;

/*
 One-sided power spectral density of a voltage signal, averaged over many traces of equal length.
 For a trace x of n samples spaced dt apart (duration T = n dt) the density at the positive
 frequencies of the dft grid is 2 |FFT(x/sqrt(T)) dt|^2, so integrating it over frequency gives
 the variance of the trace.
 */

#[derive(Clone,Debug)]
pub struct PowerSpectrum {
    num_of_samples:usize,
    time_resolution:f64,
    frequencies:Vec<f64>,
    positive:Vec<bool>,
    binning:Option<LogBinning>,
    spectra:TraceBuffer<Vec<f64>>,
    averages:TraceBuffer<f64>,
}

/// positive frequencies of the dft grid and the mask selecting them
pub(crate) fn positive_frequencies(num_of_samples:usize,time_resolution:f64) -> (Vec<f64>,Vec<bool>) {
    let all = fft_freq(num_of_samples,time_resolution);
    let mask:Vec<bool> = all.iter().map(|f| *f > 0.0).collect();
    (all.into_iter().filter(|f| *f > 0.0).collect(),mask)
}

impl PowerSpectrum {
    pub fn new(num_of_samples:usize,time_resolution:f64,max_points_per_decade:Option<usize>,strategy:BufferStrategy) -> Result<Self,SpectrumError> {
        if num_of_samples < 2 {
            return Err(SpectrumError::TooFewSamples);
        }
        let (frequencies,positive) = positive_frequencies(num_of_samples,time_resolution);
        let binning = max_points_per_decade.map(|ppd| LogBinning::new(&frequencies,ppd));
        debug!("power spectrum of {} samples, {} frequencies, binned from index {:?}",
            num_of_samples,frequencies.len(),binning.as_ref().and_then(|b| b.start_index()));
        Ok(Self {
            num_of_samples,
            time_resolution,
            frequencies,
            positive,
            binning,
            spectra:TraceBuffer::new(strategy)?,
            averages:TraceBuffer::new(strategy)?,
        })
    }

    fn duration(&self) -> f64 {
        self.num_of_samples as f64*self.time_resolution
    }

    fn trace_spectrum(&self,trace:&[f64]) -> Vec<f64> {
        let scale = 1.0/self.duration().sqrt();
        let scaled:Vec<f64> = trace.iter().map(|v| v*scale).collect();
        fft(&scaled).iter().zip(self.positive.iter())
            .filter(|(_,p)| **p)
            .map(|(c,_)| 2.0*(*c*self.time_resolution).norm_sqr())
            .collect()
    }

    /// Adds one trace. With a rolling window the oldest trace is replaced once the window is full.
    pub fn add_data(&mut self,trace:&[f64]) -> Result<(),SpectrumError> {
        if trace.len() != self.num_of_samples {
            return Err(SpectrumError::LengthMismatch{expected:self.num_of_samples,found:trace.len()});
        }
        self.spectra.push(self.trace_spectrum(trace));
        self.averages.push(mean(trace));
        Ok(())
    }

    fn bin(&self,values:Vec<f64>) -> Vec<f64> {
        match &self.binning {
            Some(b) => b.bin(&values),
            None => values
        }
    }

    pub fn f(&self) -> Vec<f64> {
        self.bin(self.frequencies.clone())
    }

    pub fn num_of_averages(&self) -> usize {
        self.averages.len()
    }

    pub fn strategy(&self) -> BufferStrategy {
        self.spectra.strategy()
    }

    pub fn error_signal_average(&self) -> Result<f64,SpectrumError> {
        match self.averages.is_empty() {
            true => Err(SpectrumError::Empty),
            false => Ok(mean(self.averages.entries()))
        }
    }

    pub fn power_spectrum(&self) -> Result<Vec<f64>,SpectrumError> {
        if self.spectra.is_empty() {
            return Err(SpectrumError::Empty);
        }
        let n = self.spectra.len() as f64;
        let mut sum = vec![0.0;self.frequencies.len()];
        for spectrum in self.spectra.entries() {
            sum.iter_mut().zip(spectrum.iter()).for_each(|(s,v)| *s += v);
        }
        Ok(self.bin(sum.into_iter().map(|s| s/n).collect()))
    }

    pub fn voltage_spectrum(&self) -> Result<Vec<f64>,SpectrumError> {
        Ok(self.power_spectrum()?.iter().map(|p| p.sqrt()).collect())
    }

    pub fn relative_power_spectrum(&self) -> Result<Vec<f64>,SpectrumError> {
        let avg = self.error_signal_average()?;
        Ok(self.power_spectrum()?.iter().map(|p| p/(avg*avg)).collect())
    }

    pub fn relative_voltage_spectrum(&self) -> Result<Vec<f64>,SpectrumError> {
        let avg = self.error_signal_average()?.abs();
        Ok(self.voltage_spectrum()?.iter().map(|v| v/avg).collect())
    }
}
