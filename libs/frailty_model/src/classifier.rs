/// Minimal trait for probabilistic classifiers over a feature row.
///
/// Class indices follow the probability order: index 0 is low risk, index 1
/// is high risk.
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    fn n_features(&self) -> usize;

    fn n_classes(&self) -> usize;

    /// Per-class probabilities for one row, summing to one.
    fn predict_proba(&self, x: &[f64]) -> Vec<f64>;

    /// Most probable class; ties go to the lower index.
    fn predict(&self, x: &[f64]) -> usize {
        argmax(&self.predict_proba(x))
    }

    fn predict_proba_batch(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|x| self.predict_proba(x)).collect()
    }
}

/// Index of the first maximum.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_prefers_first_on_ties() {
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[0.2, 0.8]), 1);
        assert_eq!(argmax(&[]), 0);
    }
}
