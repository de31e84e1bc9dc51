//! Fixed-width histogram binning over [0, 1]
//!
//! Bins are half-open `[lower, upper)` except the last, which is closed so
//! that a value of exactly 1.0 lands in it instead of overflowing.

use crate::types::DensityBin;

/// Number of microstate histogram bins
pub const BIN_COUNT: usize = 10;

/// Fixed-width density binning over [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityBins {
    count: usize,
}

impl Default for DensityBins {
    fn default() -> Self {
        Self::new(BIN_COUNT)
    }
}

impl DensityBins {
    pub fn new(count: usize) -> Self {
        assert!(count > 0, "histogram needs at least one bin");
        Self { count }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn width(&self) -> f64 {
        1.0 / self.count as f64
    }

    /// Bin edges, `count + 1` values from 0.0 to 1.0
    pub fn edges(&self) -> Vec<f64> {
        (0..=self.count)
            .map(|i| i as f64 / self.count as f64)
            .collect()
    }

    /// Bin index for `value`, or `None` when it falls outside [0, 1]
    pub fn bin(&self, value: f64) -> Option<usize> {
        if !(0.0..=1.0).contains(&value) {
            return None;
        }
        // Scale then floor; the epsilon keeps exact edges like 0.3 (0.2999..)
        // in the bin they start.
        let scaled = value * self.count as f64;
        let index = (scaled + 1e-9).floor() as usize;
        Some(index.min(self.count - 1))
    }

    /// Density histogram of `values`; area sums to 1 when any value is in range
    pub fn histogram<I>(&self, values: I) -> (u32, Vec<DensityBin>)
    where
        I: IntoIterator<Item = f64>,
    {
        let mut counts = vec![0u32; self.count];
        let mut total = 0u32;
        for value in values {
            match self.bin(value) {
                Some(index) => {
                    counts[index] += 1;
                    total += 1;
                }
                None => log::warn!("value {value} outside [0, 1] left out of histogram"),
            }
        }

        let width = self.width();
        let edges = self.edges();
        let bins = counts
            .iter()
            .enumerate()
            .map(|(i, &count)| DensityBin {
                lower: edges[i],
                upper: edges[i + 1],
                count,
                density: if total == 0 {
                    0.0
                } else {
                    f64::from(count) / (f64::from(total) * width)
                },
            })
            .collect();

        (total, bins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_values() {
        let bins = DensityBins::default();
        assert_eq!(bins.bin(0.0), Some(0));
        assert_eq!(bins.bin(0.1), Some(1));
        assert_eq!(bins.bin(0.999), Some(9));
        assert_eq!(bins.bin(1.0), Some(9));
    }

    #[test]
    fn test_interior_edges_start_their_bin() {
        let bins = DensityBins::default();
        for i in 1..10 {
            let edge = i as f64 / 10.0;
            assert_eq!(bins.bin(edge), Some(i), "edge {edge}");
        }
        assert_eq!(bins.bin(0.2999), Some(2));
        assert_eq!(bins.bin(1.0 / 3.0), Some(3));
    }

    #[test]
    fn test_out_of_range() {
        let bins = DensityBins::default();
        assert_eq!(bins.bin(-0.01), None);
        assert_eq!(bins.bin(1.01), None);
        assert_eq!(bins.bin(f64::NAN), None);
    }

    #[test]
    fn test_edges() {
        let edges = DensityBins::default().edges();
        assert_eq!(edges.len(), 11);
        assert_eq!(edges[0], 0.0);
        assert_eq!(edges[10], 1.0);
        assert!((edges[3] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_histogram_density_area_is_one() {
        let bins = DensityBins::default();
        let (total, hist) = bins.histogram(vec![0.0, 0.05, 0.25, 0.4, 0.4, 0.99]);
        assert_eq!(total, 6);
        assert_eq!(hist.len(), 10);
        assert_eq!(hist[0].count, 2);
        assert_eq!(hist[4].count, 2);
        assert!((hist[0].density - 2.0 / (6.0 * 0.1)).abs() < 1e-9);

        let area: f64 = hist.iter().map(|b| b.density * (b.upper - b.lower)).sum();
        assert!((area - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_histogram_of_nothing() {
        let (total, hist) = DensityBins::default().histogram(Vec::new());
        assert_eq!(total, 0);
        assert!(hist.iter().all(|b| b.count == 0 && b.density == 0.0));
    }
}
