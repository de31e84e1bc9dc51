//! Descriptive statistics for grouped microstate scores

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().sum();
    Some(sum / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator), `None` below two values
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let variance: f64 = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>()
        / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Collects one group's scores and reduces them independently of arrival order
#[derive(Debug, Clone, Default)]
pub struct ScoreAccumulator {
    values: Vec<f64>,
}

impl ScoreAccumulator {
    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Scores in ascending order
    pub fn sorted(&self) -> Vec<f64> {
        let mut values = self.values.clone();
        values.sort_by(f64::total_cmp);
        values
    }

    /// `(mean, sample std dev)`, or `None` for an empty group.
    ///
    /// Values are summed in sorted order so shuffled input yields bit-identical
    /// results.
    pub fn mean_std(&self) -> Option<(f64, Option<f64>)> {
        let sorted = self.sorted();
        let mean = mean(&sorted)?;
        Some((mean, sample_std_dev(&sorted)))
    }
}
