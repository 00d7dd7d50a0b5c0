use frailty_model::{FeatureVector, Indicator, Locale, ReferenceDataset, FEATURE_COUNT};

use crate::explain::ExplainError;

/// Quartile bins of one feature, learned from the reference set.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBins {
    /// Distinct 25/50/75th percentiles, ascending.
    pub boundaries: Vec<f64>,
    /// Reference values falling in each bin.
    pub members: Vec<Vec<f64>>,
    /// Mean of the reference bin indices.
    pub mean: f64,
    /// Population standard deviation of the reference bin indices, 1 when
    /// the column is constant.
    pub scale: f64,
}

impl FeatureBins {
    pub fn n_bins(&self) -> usize {
        self.boundaries.len() + 1
    }

    /// Index of the bin containing `value`.
    pub fn bin_of(&self, value: f64) -> usize {
        self.boundaries.iter().filter(|b| **b < value).count()
    }

    /// Condition text of `bin` for a feature called `name`.
    pub fn bin_name(&self, bin: usize, name: &str) -> String {
        let b = &self.boundaries;
        match bin {
            0 => format!("{name} <= {:.2}", b[0]),
            i if i == b.len() => format!("{name} > {:.2}", b[i - 1]),
            i => format!("{:.2} < {name} <= {:.2}", b[i - 1], b[i]),
        }
    }

    /// Standardize a neighbourhood value the way the reference bins were.
    pub fn standardize(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }

    /// Share of the reference set in each bin.
    pub fn frequencies(&self) -> Vec<f64> {
        let total: usize = self.members.iter().map(Vec::len).sum();
        self.members
            .iter()
            .map(|m| m.len() as f64 / total as f64)
            .collect()
    }
}

/// Maps every feature to its quartile bin.
#[derive(Debug, Clone, PartialEq)]
pub struct QuartileDiscretizer {
    bins: Vec<FeatureBins>,
}

impl QuartileDiscretizer {
    pub fn fit(reference: &ReferenceDataset) -> Result<Self, ExplainError> {
        if reference.is_empty() {
            return Err(ExplainError::EmptyReference);
        }
        let bins = Indicator::ALL
            .iter()
            .map(|&indicator| fit_feature(&reference.column(indicator)))
            .collect();
        Ok(Self { bins })
    }

    pub fn feature(&self, indicator: Indicator) -> &FeatureBins {
        &self.bins[indicator.index()]
    }

    pub fn discretize(&self, features: &FeatureVector) -> [usize; FEATURE_COUNT] {
        let x = features.as_f64();
        let mut out = [0; FEATURE_COUNT];
        for (i, bins) in self.bins.iter().enumerate() {
            out[i] = bins.bin_of(x[i]);
        }
        out
    }

    /// Standardize every column of a neighbourhood row.
    pub fn standardize(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(&self.bins)
            .map(|(v, bins)| bins.standardize(*v))
            .collect()
    }

    /// Condition text for the bin `features` falls into.
    pub fn describe(&self, indicator: Indicator, features: &FeatureVector, locale: Locale) -> String {
        let bins = self.feature(indicator);
        let bin = bins.bin_of(f64::from(features.get(indicator)));
        bins.bin_name(bin, indicator.column_name(locale))
    }
}

fn fit_feature(column: &[f64]) -> FeatureBins {
    let mut sorted = column.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mut boundaries: Vec<f64> = [25.0, 50.0, 75.0]
        .iter()
        .map(|q| percentile(&sorted, *q))
        .collect();
    boundaries.dedup();

    let mut members = vec![Vec::new(); boundaries.len() + 1];
    let mut indices = Vec::with_capacity(column.len());
    for &v in column {
        let bin = boundaries.iter().filter(|b| **b < v).count();
        members[bin].push(v);
        indices.push(bin as f64);
    }
    let (mean, scale) = mean_and_scale(&indices);
    FeatureBins {
        boundaries,
        members,
        mean,
        scale,
    }
}

fn mean_and_scale(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    let scale = var.sqrt();
    if scale < 10.0 * f64::EPSILON {
        (mean, 1.0)
    } else {
        (mean, scale)
    }
}

/// Linear interpolation between closest ranks.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = q / 100.0 * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn percentiles_interpolate_linearly() {
        let sorted = [0.0, 0.0, 1.0, 1.0, 1.0];
        assert_eq!(percentile(&sorted, 25.0), 0.0);
        assert_eq!(percentile(&sorted, 50.0), 1.0);
        let sorted = [0.0, 1.0];
        assert_eq!(percentile(&sorted, 25.0), 0.25);
    }

    #[test]
    fn binary_column_gets_two_bins() {
        // 0,0,0,1 -> quartiles 0, 0, 0.25
        let bins = fit_feature(&[0.0, 0.0, 0.0, 1.0]);
        assert_eq!(bins.boundaries, vec![0.0, 0.25]);
        let names: Vec<String> = (0..bins.n_bins()).map(|b| bins.bin_name(b, "PHQ")).collect();
        assert_eq!(names, vec!["PHQ <= 0.00", "0.00 < PHQ <= 0.25", "PHQ > 0.25"]);
        assert_eq!(bins.bin_of(0.0), 0);
        assert_eq!(bins.bin_of(1.0), 2);
        assert_eq!(bins.members[1].len(), 0);
        assert_eq!(bins.frequencies(), vec![0.75, 0.0, 0.25]);
    }

    #[test]
    fn scaler_uses_bin_indices() {
        // bins 0, 0, 0, 2: mean 0.5, population std sqrt(0.75)
        let bins = fit_feature(&[0.0, 0.0, 0.0, 1.0]);
        assert!((bins.mean - 0.5).abs() < 1e-12);
        assert!((bins.scale - 0.75f64.sqrt()).abs() < 1e-12);
        assert!((bins.standardize(1.0) - 0.5 / 0.75f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn constant_column_keeps_unit_scale() {
        let bins = fit_feature(&[1.0, 1.0, 1.0]);
        assert_eq!(bins.mean, 0.0);
        assert_eq!(bins.scale, 1.0);
        assert_eq!(bins.standardize(1.0), 1.0);
    }

    #[test]
    fn constant_column_has_single_boundary() {
        let bins = fit_feature(&[1.0, 1.0, 1.0]);
        assert_eq!(bins.boundaries, vec![1.0]);
        assert_eq!(bins.n_bins(), 2);
        assert_eq!(bins.bin_name(0, "Exercise"), "Exercise <= 1.00");
        assert_eq!(bins.bin_name(1, "Exercise"), "Exercise > 1.00");
        assert_eq!(bins.bin_of(1.0), 0);
    }

    #[test]
    fn fit_rejects_empty_reference() {
        let empty = ReferenceDataset::from_rows(Vec::new());
        assert_eq!(
            QuartileDiscretizer::fit(&empty),
            Err(ExplainError::EmptyReference)
        );
    }

    #[test]
    fn describes_the_instance_bin() {
        let rows = vec![
            FeatureVector::all_zero(),
            FeatureVector::all_zero(),
            FeatureVector::all_one(),
            FeatureVector::all_one(),
        ];
        let d = QuartileDiscretizer::fit(&ReferenceDataset::from_rows(rows)).unwrap();
        // quartiles of 0,0,1,1 are 0, 0.5 and 1
        let name = Indicator::Phq.column_name(Locale::En);
        assert_eq!(
            d.describe(Indicator::Phq, &FeatureVector::all_one(), Locale::En),
            format!("0.50 < {name} <= 1.00")
        );
        assert_eq!(
            d.describe(Indicator::SleepDuration, &FeatureVector::all_zero(), Locale::Zh),
            "睡眠时长 <= 0.00"
        );
        assert_eq!(d.discretize(&FeatureVector::all_zero()), [0; FEATURE_COUNT]);
    }
}
