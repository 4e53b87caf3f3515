use num_complex::Complex;
use utils::{fft, mean};
use crate::buffer::{BufferStrategy, TraceBuffer};
use crate::error::SpectrumError;
use crate::power_spectrum::positive_frequencies;

/// Cross spectrum of two simultaneously recorded signals, 2 conj(F1) F2, with the auto
/// spectrum of each signal kept alongside. Uncorrelated noise averages out of the cross term.
#[derive(Clone,Debug)]
pub struct CCedPowerSpectrum {
    num_of_samples:usize,
    time_resolution:f64,
    frequencies:Vec<f64>,
    positive:Vec<bool>,
    cross:TraceBuffer<Vec<Complex<f64>>>,
    auto_1:TraceBuffer<Vec<f64>>,
    auto_2:TraceBuffer<Vec<f64>>,
    averages_1:TraceBuffer<f64>,
    averages_2:TraceBuffer<f64>,
}

fn mean_of_rows<T>(rows:&[Vec<T>],zero:T) -> Vec<T>
    where T:Copy + std::ops::AddAssign + std::ops::Div<f64,Output=T> {
    let n = rows.len() as f64;
    let mut sum = vec![zero;rows.first().map_or(0,|r| r.len())];
    for row in rows {
        sum.iter_mut().zip(row.iter()).for_each(|(s,v)| *s += *v);
    }
    sum.into_iter().map(|s| s/n).collect()
}

impl CCedPowerSpectrum {
    pub fn new(num_of_samples:usize,time_resolution:f64,strategy:BufferStrategy) -> Result<Self,SpectrumError> {
        if num_of_samples < 2 {
            return Err(SpectrumError::TooFewSamples);
        }
        let (frequencies,positive) = positive_frequencies(num_of_samples,time_resolution);
        Ok(Self {
            num_of_samples,
            time_resolution,
            frequencies,
            positive,
            cross:TraceBuffer::new(strategy)?,
            auto_1:TraceBuffer::new(strategy)?,
            auto_2:TraceBuffer::new(strategy)?,
            averages_1:TraceBuffer::new(strategy)?,
            averages_2:TraceBuffer::new(strategy)?,
        })
    }

    fn transform(&self,trace:&[f64]) -> Vec<Complex<f64>> {
        let scale = 1.0/(self.num_of_samples as f64*self.time_resolution).sqrt();
        let scaled:Vec<f64> = trace.iter().map(|v| v*scale).collect();
        fft(&scaled).into_iter().zip(self.positive.iter())
            .filter(|(_,p)| **p)
            .map(|(c,_)| c*self.time_resolution)
            .collect()
    }

    pub fn add_data(&mut self,trace_1:&[f64],trace_2:&[f64]) -> Result<(),SpectrumError> {
        for trace in [trace_1,trace_2] {
            if trace.len() != self.num_of_samples {
                return Err(SpectrumError::LengthMismatch{expected:self.num_of_samples,found:trace.len()});
            }
        }
        let f1 = self.transform(trace_1);
        let f2 = self.transform(trace_2);
        self.cross.push(f1.iter().zip(f2.iter()).map(|(a,b)| 2.0*a.conj()*b).collect());
        self.auto_1.push(f1.iter().map(|a| 2.0*a.norm_sqr()).collect());
        self.auto_2.push(f2.iter().map(|b| 2.0*b.norm_sqr()).collect());
        self.averages_1.push(mean(trace_1));
        self.averages_2.push(mean(trace_2));
        Ok(())
    }

    pub fn f(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn num_of_averages(&self) -> usize {
        self.averages_1.len()
    }

    fn check_data(&self) -> Result<(),SpectrumError> {
        match self.cross.is_empty() {
            true => Err(SpectrumError::Empty),
            false => Ok(())
        }
    }

    pub fn error_signal_1_average(&self) -> Result<f64,SpectrumError> {
        self.check_data()?;
        Ok(mean(self.averages_1.entries()))
    }

    pub fn error_signal_2_average(&self) -> Result<f64,SpectrumError> {
        self.check_data()?;
        Ok(mean(self.averages_2.entries()))
    }

    pub fn power_spectrum(&self) -> Result<Vec<Complex<f64>>,SpectrumError> {
        self.check_data()?;
        Ok(mean_of_rows(self.cross.entries(),Complex::new(0.0,0.0)))
    }

    pub fn voltage_spectrum(&self) -> Result<Vec<Complex<f64>>,SpectrumError> {
        Ok(self.power_spectrum()?.iter().map(|p| p.sqrt()).collect())
    }

    pub fn relative_power_spectrum(&self) -> Result<Vec<Complex<f64>>,SpectrumError> {
        let norm = self.error_signal_1_average()?*self.error_signal_2_average()?;
        Ok(self.power_spectrum()?.iter().map(|p| p/norm).collect())
    }

    pub fn relative_voltage_spectrum(&self) -> Result<Vec<Complex<f64>>,SpectrumError> {
        let norm = Complex::new(self.error_signal_1_average()?*self.error_signal_2_average()?,0.0).sqrt();
        Ok(self.voltage_spectrum()?.iter().map(|v| v/norm).collect())
    }

    pub fn auto_power_spectrum_1(&self) -> Result<Vec<f64>,SpectrumError> {
        self.check_data()?;
        Ok(mean_of_rows(self.auto_1.entries(),0.0))
    }

    pub fn auto_power_spectrum_2(&self) -> Result<Vec<f64>,SpectrumError> {
        self.check_data()?;
        Ok(mean_of_rows(self.auto_2.entries(),0.0))
    }
}
