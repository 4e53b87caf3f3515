use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use rustfft::FftPlanner;
use num_complex::Complex;

pub fn read_to_string(filepath:&Path,extension:&str) -> io::Result<String> {
    let p = filepath.with_extension(extension);
    let mut f = File::open(&p)?;
    let mut s = String::new();
    f.read_to_string(&mut s)?;
    Ok(s)
}

pub fn write_to_file(filepath:&Path,extension:&str,string:&str) -> io::Result<()> {
    let p = filepath.with_extension(extension);
    let mut f = File::create(p)?;
    f.write_all(string.as_bytes())
}

/// forward fourier transform of a real-valued trace
pub fn fft(real:&[f64]) -> Vec<Complex<f64>> {
    let n = real.len();
    let mut fft_planner = FftPlanner::<f64>::new();
    let fft = fft_planner.plan_fft_forward(n);
    let mut complex_tmp:Vec<Complex<f64>> = real.iter().map(|val| Complex::<f64>::new(*val, 0.0)).collect();
    fft.process(&mut complex_tmp);
    complex_tmp
}

/// sample frequencies of a length-n dft with sample spacing dt, in standard (unshifted) order
pub fn fft_freq(n:usize,dt:f64) -> Vec<f64> {
    let scale = 1.0/(n as f64*dt);
    let n_positive = (n as i64 - 1)/2;
    (0..n as i64).map(|i|{
        let k = if i <= n_positive {i} else {i - n as i64};
        k as f64*scale
    }).collect()
}

pub fn linspace(start:f64,end:f64,n:usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![start],
        _=> {
            let step = (end-start)/(n-1) as f64;
            let mut v:Vec<f64> = (0..n).map(|i| start + i as f64*step).collect();
            v.pop();
            v.push(end);
            v
        }
    }
}

/// n points evenly spaced in log10 between 10^log_start and 10^log_end
pub fn logspace(log_start:f64,log_end:f64,n:usize) -> Vec<f64> {
    linspace(log_start,log_end,n).iter().map(|e| 10f64.powf(*e)).collect()
}

/// index of the bin each value falls in, for monotonically increasing edges.
/// i is returned when edges[i-1] <= x < edges[i], 0 below the first edge and edges.len() at or above the last
pub fn digitize(values:&[f64],edges:&[f64]) -> Vec<usize> {
    values.iter().map(|x| edges.partition_point(|e| e <= x)).collect()
}

pub fn mean(x:&[f64]) -> f64 {
    x.iter().sum::<f64>()/x.len() as f64
}

/// population standard deviation
pub fn std_dev(x:&[f64]) -> f64 {
    let m = mean(x);
    let var = x.iter().map(|v| (v-m).powi(2)).sum::<f64>()/x.len() as f64;
    var.sqrt()
}

/// standard error estimated from the sample dispersion, std/sqrt(n-1). NaN for fewer than 2 samples
pub fn sample_standard_error(x:&[f64]) -> f64 {
    if x.len() < 2 {
        return f64::NAN;
    }
    std_dev(x)/((x.len() - 1) as f64).sqrt()
}

fn num_digits(number:f64) -> i32 {
    number.abs().log10().floor() as i32
}

fn round_to(number:f64,decimals:i32) -> f64 {
    if decimals >= 0 {
        let scale = 10f64.powi(decimals);
        (number*scale).round()/scale
    }
    else {
        let scale = 10f64.powi(-decimals);
        (number/scale).round()*scale
    }
}

/// (extra error digits, error rounds up to the next power of ten)
fn check_error_first_digit(error:f64) -> (i32,bool) {
    let error_digits = num_digits(error);
    let scaled_error = (error*10f64.powi(-error_digits + 1)).round();
    if (10.0..=19.0).contains(&scaled_error) {
        (1,false)
    }
    else if scaled_error >= 95.0 && (error*10f64.powi(-error_digits)).round() == 10.0 {
        (1,true)
    }
    else {
        (0,false)
    }
}

/// Presents a value with its uncertainty in parenthesis notation with matching significant digits.
///
/// present_float(1.0, 0.036, None) gives "1.00(4)", present_float(1.0, 0.018, None) gives "1.000(18)".
/// When `digits` is None the error keeps two digits if it starts with a 1, otherwise one.
pub fn present_float(value:f64,error:f64,digits:Option<i32>) -> String {
    if !error.is_finite() || error <= 0.0 {
        return format!("{}({})",value,error);
    }
    let (n_error_digits,rounded_up) = match digits {
        Some(d) => (d,false),
        None => {
            let (extra,rounded_up) = check_error_first_digit(error);
            (1 + extra,rounded_up)
        }
    };
    let error_digits = num_digits(error);
    let round_digits = match rounded_up {
        true => -error_digits + n_error_digits - 2,
        false => -error_digits + n_error_digits - 1
    };
    let format_digits = round_digits.max(0) as usize;
    let value_str = format!("{:.*}",format_digits,round_to(value,round_digits));

    let rounded_error = round_to(error,round_digits);
    let rounded_error_digits = num_digits(rounded_error);
    let error_str = if rounded_error_digits < 0 && -rounded_error_digits <= round_digits {
        format!("{:.0}",rounded_error*10f64.powi(round_digits))
    }
    else {
        format!("{:.*}",format_digits,rounded_error)
    };
    format!("{}({})",value_str,error_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fft_freq_matches_standard_ordering(){
        let f = fft_freq(4,0.25);
        assert_eq!(f,vec![0.0,1.0,-2.0,-1.0]);
        let f = fft_freq(5,1.0);
        assert_eq!(f,vec![0.0,0.2,0.4,-0.4,-0.2]);
    }

    #[test]
    fn fft_of_constant_is_dc_only(){
        let x = vec![2.0;8];
        let f = fft(&x);
        assert!((f[0].re - 16.0).abs() < 1E-12);
        f.iter().skip(1).for_each(|c| assert!(c.norm() < 1E-12));
    }

    #[test]
    fn digitize_bins(){
        let edges = vec![1.0,2.0,4.0];
        let idx = digitize(&[0.5,1.0,1.5,2.0,3.9,4.0,10.0],&edges);
        assert_eq!(idx,vec![0,1,1,2,2,3,3]);
    }

    #[test]
    fn logspace_endpoints(){
        let v = logspace(0.0,2.0,3);
        assert!((v[0] - 1.0).abs() < 1E-12);
        assert!((v[1] - 10.0).abs() < 1E-9);
        assert!((v[2] - 100.0).abs() < 1E-9);
    }

    #[test]
    fn standard_error_from_dispersion(){
        let x = [1.0,3.0];
        assert!((std_dev(&x) - 1.0).abs() < 1E-12);
        assert!((sample_standard_error(&x) - 1.0).abs() < 1E-12);
        assert!(sample_standard_error(&[1.0]).is_nan());
    }

    #[test]
    fn present_float_significant_digits(){
        assert_eq!(present_float(1.0,0.036,None),"1.00(4)");
        assert_eq!(present_float(1.0,0.018,None),"1.000(18)");
        assert_eq!(present_float(1.0,0.1,Some(1)),"1.0(1)");
        assert_eq!(present_float(1.0,0.96,None),"1.0(1.0)");
        assert_eq!(present_float(1234.5,23.0,None),"1230(20)");
    }
}
