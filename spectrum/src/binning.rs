use utils::{digitize, logspace, mean};

/// Averages spectrum points in log spaced bins where the native grid is denser than the
/// requested points per decade. Points below the first crowded bin are passed through.
#[derive(Clone,Debug,PartialEq)]
pub struct LogBinning {
    edges:Vec<f64>,
    digitized:Vec<usize>,
    start_index:Option<usize>,
}

impl LogBinning {
    pub fn new(frequencies:&[f64],max_points_per_decade:usize) -> Self {
        let f_min = frequencies.iter().cloned().fold(f64::INFINITY,f64::min);
        let f_max = frequencies.iter().cloned().fold(f64::NEG_INFINITY,f64::max);
        let log_max = (f_max*1.0001).log10();
        let log_min = f_min.log10();
        let n_edges = ((log_max - log_min)*max_points_per_decade as f64) as usize + 1;
        let edges = logspace(log_min,log_max,n_edges);
        let digitized = digitize(frequencies,&edges);
        let start_index = digitized.windows(2).position(|w| w[0] == w[1]);
        Self{edges,digitized,start_index}
    }

    pub fn start_index(&self) -> Option<usize> {
        self.start_index
    }

    pub fn n_bins(&self) -> usize {
        self.edges.len() + 1
    }

    pub fn bin(&self,values:&[f64]) -> Vec<f64> {
        let start = match self.start_index {
            Some(s) => s,
            None => return values.to_vec()
        };
        let mut bins:Vec<Vec<f64>> = vec![vec![];self.n_bins()];
        values.iter().zip(self.digitized.iter()).skip(start).for_each(|(v,d)| bins[*d].push(*v));
        let mut out = values[..start].to_vec();
        out.extend(bins.iter().filter(|b| !b.is_empty()).map(|b| mean(b)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_is_kept_and_tail_averaged(){
        let f:Vec<f64> = (1..=1000).map(|i| i as f64).collect();
        let binning = LogBinning::new(&f,10);
        let start = binning.start_index().unwrap();
        let binned = binning.bin(&f);
        assert_eq!(&binned[..start],&f[..start]);
        assert!(binned.len() - start <= binning.n_bins());
        assert!(binned.len() < f.len());
        // averages of increasing frequencies stay increasing
        assert!(binned.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn sparse_grid_is_not_binned(){
        let f = vec![1.0,10.0,100.0];
        let binning = LogBinning::new(&f,2);
        assert_eq!(binning.start_index(),None);
        assert_eq!(binning.bin(&f),f);
    }
}
