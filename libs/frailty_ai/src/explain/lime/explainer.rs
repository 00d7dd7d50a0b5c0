use std::cmp::Ordering;

use frailty_model::{FeatureVector, Indicator, Locale, ReferenceDataset, FEATURE_COUNT};
use log::debug;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::discretize::QuartileDiscretizer;
use super::ridge::{fit_weighted, RidgeFit};
use crate::explain::ExplainError;
use crate::predict::RiskClass;

const SELECTION_ALPHA: f64 = 0.01;
const SURROGATE_ALPHA: f64 = 1.0;

/// How the explained features are chosen before the final fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSelection {
    /// Forward selection up to six features, highest weights above.
    #[default]
    Auto,
    Forward,
    HighestWeights,
    /// Every feature.
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimeSettings {
    pub num_features: usize,
    pub num_samples: usize,
    pub label: RiskClass,
    /// `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Defaults to `0.75 * sqrt(15)`.
    pub kernel_width: Option<f64>,
    pub feature_selection: FeatureSelection,
}

impl Default for LimeSettings {
    fn default() -> Self {
        Self {
            num_features: 10,
            num_samples: 5000,
            label: RiskClass::High,
            seed: Some(0),
            kernel_width: None,
            feature_selection: FeatureSelection::Auto,
        }
    }
}

impl LimeSettings {
    pub fn validate(&self) -> Result<(), ExplainError> {
        if self.num_features == 0 || self.num_features > FEATURE_COUNT {
            return Err(ExplainError::InvalidSettings(format!(
                "num_features must be between 1 and {FEATURE_COUNT}, got {}",
                self.num_features
            )));
        }
        if self.num_samples < 2 {
            return Err(ExplainError::InvalidSettings(format!(
                "num_samples must be at least 2, got {}",
                self.num_samples
            )));
        }
        if let Some(w) = self.kernel_width {
            if !w.is_finite() || w <= 0.0 {
                return Err(ExplainError::InvalidSettings(format!(
                    "kernel_width must be positive, got {w}"
                )));
            }
        }
        Ok(())
    }

    pub fn kernel_width(&self) -> f64 {
        self.kernel_width
            .unwrap_or_else(|| 0.75 * (FEATURE_COUNT as f64).sqrt())
    }
}

/// One feature of the local surrogate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimeWeight {
    pub indicator: Indicator,
    /// Bin condition, e.g. `PHQ <= 0.00`.
    pub description: String,
    /// The instance's answer.
    pub value: u8,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimeExplanation {
    pub label: RiskClass,
    pub intercept: f64,
    /// Weighted R² of the surrogate on the neighbourhood.
    pub score: f64,
    /// Surrogate prediction at the instance.
    pub local_prediction: f64,
    /// Model probabilities at the instance.
    pub predict_proba: Vec<f64>,
    /// Sorted by decreasing |weight|.
    pub weights: Vec<LimeWeight>,
    pub num_samples: usize,
    pub kernel_width: f64,
}

impl LimeExplanation {
    pub fn weight(&self, indicator: Indicator) -> Option<f64> {
        self.weights
            .iter()
            .find(|w| w.indicator == indicator)
            .map(|w| w.weight)
    }
}

/// Tabular LIME over the fifteen binary indicators.
#[derive(Debug, Clone)]
pub struct LimeTabularExplainer {
    discretizer: QuartileDiscretizer,
    samplers: Vec<WeightedIndex<f64>>,
    settings: LimeSettings,
}

impl LimeTabularExplainer {
    pub fn new(reference: &ReferenceDataset, settings: LimeSettings) -> Result<Self, ExplainError> {
        settings.validate()?;
        let discretizer = QuartileDiscretizer::fit(reference)?;
        let samplers = Indicator::ALL
            .iter()
            .map(|&i| {
                WeightedIndex::new(discretizer.feature(i).frequencies())
                    .map_err(|_| ExplainError::EmptyReference)
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            "lime explainer fitted on {} reference rows: {} samples, {} features, kernel width {:.3}",
            reference.len(),
            settings.num_samples,
            settings.num_features,
            settings.kernel_width()
        );
        Ok(Self {
            discretizer,
            samplers,
            settings,
        })
    }

    pub fn settings(&self) -> &LimeSettings {
        &self.settings
    }

    pub fn discretizer(&self) -> &QuartileDiscretizer {
        &self.discretizer
    }

    /// Explain `predict_fn`'s probability of the configured label around
    /// `features`. `predict_fn` maps rows to per-class probabilities.
    pub fn explain<F>(
        &self,
        features: &FeatureVector,
        predict_fn: F,
        locale: Locale,
    ) -> Result<LimeExplanation, ExplainError>
    where
        F: Fn(&[Vec<f64>]) -> Vec<Vec<f64>>,
    {
        let settings = &self.settings;
        let mut rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (binary, inverse) = self.sample(features, &mut rng);
        let scaled: Vec<Vec<f64>> = binary
            .iter()
            .map(|row| self.discretizer.standardize(row))
            .collect();

        let width = settings.kernel_width();
        let origin = &scaled[0];
        let weights: Vec<f64> = scaled
            .iter()
            .map(|row| {
                let d2: f64 = row.iter().zip(origin).map(|(z, o)| (z - o) * (z - o)).sum();
                (-d2 / (width * width)).exp().sqrt()
            })
            .collect();

        let proba = predict_fn(&inverse);
        let label = settings.label.index();
        if proba.len() != inverse.len() || proba.iter().any(|p| p.len() <= label) {
            return Err(ExplainError::NonFinite("classifier output shape".into()));
        }
        let target: Vec<f64> = proba.iter().map(|p| p[label]).collect();
        if target.iter().any(|t| !t.is_finite()) {
            return Err(ExplainError::NonFinite("classifier probabilities".into()));
        }

        let used = self.select_features(&scaled, &target, &weights)?;
        let fit = fit_weighted(&scaled, &used, &target, &weights, SURROGATE_ALPHA)?;
        if !fit.intercept.is_finite() || fit.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ExplainError::NonFinite("surrogate coefficients".into()));
        }
        let instance: Vec<f64> = used.iter().map(|&j| origin[j]).collect();
        let local_prediction = fit.predict(&instance);
        debug!(
            "lime surrogate: score {:.4}, intercept {:.4}, local prediction {:.4}",
            fit.score, fit.intercept, local_prediction
        );

        let mut lime_weights: Vec<LimeWeight> = used
            .iter()
            .zip(&fit.coefficients)
            .filter_map(|(&j, &w)| {
                let indicator = Indicator::from_index(j)?;
                Some(LimeWeight {
                    indicator,
                    description: self.discretizer.describe(indicator, features, locale),
                    value: features.get(indicator),
                    weight: w,
                })
            })
            .collect();
        lime_weights.sort_by(|a, b| by_magnitude(a.weight, b.weight));

        Ok(LimeExplanation {
            label: settings.label,
            intercept: fit.intercept,
            score: fit.score,
            local_prediction,
            predict_proba: proba[0].clone(),
            weights: lime_weights,
            num_samples: settings.num_samples,
            kernel_width: width,
        })
    }

    /// Binary and undiscretized neighbourhoods. Row 0 is the instance.
    fn sample(&self, features: &FeatureVector, rng: &mut StdRng) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        let n = self.settings.num_samples;
        let instance_bins = self.discretizer.discretize(features);
        let mut binary = vec![vec![0.0; FEATURE_COUNT]; n];
        let mut inverse = vec![vec![0.0; FEATURE_COUNT]; n];
        binary[0] = vec![1.0; FEATURE_COUNT];
        inverse[0] = features.as_f64().to_vec();

        for (j, &indicator) in Indicator::ALL.iter().enumerate() {
            let bins = self.discretizer.feature(indicator);
            for row in 1..n {
                let bin = self.samplers[j].sample(rng);
                binary[row][j] = if bin == instance_bins[j] { 1.0 } else { 0.0 };
                let members = &bins.members[bin];
                inverse[row][j] = if members.iter().all(|v| *v == members[0]) {
                    members[0]
                } else {
                    members[rng.gen_range(0..members.len())]
                };
            }
        }
        (binary, inverse)
    }

    /// `rows` are standardized neighbours, row 0 being the instance.
    fn select_features(
        &self,
        rows: &[Vec<f64>],
        target: &[f64],
        weights: &[f64],
    ) -> Result<Vec<usize>, ExplainError> {
        let k = self.settings.num_features;
        let all: Vec<usize> = (0..FEATURE_COUNT).collect();
        match self.settings.feature_selection {
            FeatureSelection::None => Ok(all),
            FeatureSelection::Forward => forward_selection(rows, target, weights, k),
            FeatureSelection::HighestWeights => highest_weights(rows, target, weights, k),
            FeatureSelection::Auto if k <= 6 => forward_selection(rows, target, weights, k),
            FeatureSelection::Auto => highest_weights(rows, target, weights, k),
        }
    }
}

fn by_magnitude(a: f64, b: f64) -> Ordering {
    b.abs().total_cmp(&a.abs())
}

/// Rank features by `|coef · x0|` of a lightly regularised fit on all of them.
fn highest_weights(
    rows: &[Vec<f64>],
    target: &[f64],
    weights: &[f64],
    k: usize,
) -> Result<Vec<usize>, ExplainError> {
    let all: Vec<usize> = (0..FEATURE_COUNT).collect();
    let fit = fit_weighted(rows, &all, target, weights, SELECTION_ALPHA)?;
    let origin = rows.first().ok_or(ExplainError::Singular)?;
    let mut ranked: Vec<(usize, f64)> = all
        .into_iter()
        .zip(fit.coefficients)
        .map(|(j, c)| (j, c * origin[j]))
        .collect();
    ranked.sort_by(|a, b| by_magnitude(a.1, b.1));
    Ok(ranked.into_iter().take(k).map(|(j, _)| j).collect())
}

/// Greedily add the feature that most improves the weighted R².
fn forward_selection(
    rows: &[Vec<f64>],
    target: &[f64],
    weights: &[f64],
    k: usize,
) -> Result<Vec<usize>, ExplainError> {
    let mut used: Vec<usize> = Vec::with_capacity(k);
    for _ in 0..k {
        let mut best: Option<(usize, f64)> = None;
        for j in (0..FEATURE_COUNT).filter(|j| !used.contains(j)) {
            let mut candidate = used.clone();
            candidate.push(j);
            let Ok(RidgeFit { score, .. }) = fit_weighted(rows, &candidate, target, weights, 0.0)
            else {
                continue;
            };
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((j, score));
            }
        }
        match best {
            Some((j, _)) => used.push(j),
            None => break,
        }
    }
    if used.is_empty() {
        return Err(ExplainError::Singular);
    }
    Ok(used)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Every indicator answered 1 in a third of the rows.
    fn reference() -> ReferenceDataset {
        let rows = (0..42)
            .map(|j| {
                let codes: Vec<i64> = (0..FEATURE_COUNT as i64)
                    .map(|k| i64::from((j + k) % 3 == 0))
                    .collect();
                FeatureVector::from_codes(&codes).unwrap()
            })
            .collect();
        ReferenceDataset::from_rows(rows)
    }

    /// p(high) rises with PHQ and falls with exercise.
    fn model(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let phq = Indicator::Phq.index();
        let ex = Indicator::Exercise.index();
        rows.iter()
            .map(|r| {
                let p = 0.3 + 0.4 * r[phq] - 0.2 * r[ex];
                vec![1.0 - p, p]
            })
            .collect()
    }

    fn settings(num_samples: usize) -> LimeSettings {
        LimeSettings {
            num_samples,
            ..LimeSettings::default()
        }
    }

    #[test]
    fn default_settings_match_lime_tabular() {
        let s = LimeSettings::default();
        assert_eq!(s.num_features, 10);
        assert_eq!(s.num_samples, 5000);
        assert_eq!(s.label, RiskClass::High);
        assert!((s.kernel_width() - 0.75 * 15f64.sqrt()).abs() < 1e-12);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let bad = LimeSettings {
            num_features: 0,
            ..LimeSettings::default()
        };
        assert!(matches!(
            LimeTabularExplainer::new(&reference(), bad),
            Err(ExplainError::InvalidSettings(_))
        ));
        let bad = LimeSettings {
            kernel_width: Some(-1.0),
            ..LimeSettings::default()
        };
        assert!(bad.validate().is_err());
        assert!(settings(1).validate().is_err());
    }

    #[test]
    fn explanation_picks_up_the_driving_features() {
        let explainer = LimeTabularExplainer::new(&reference(), settings(2000)).unwrap();
        let x = FeatureVector::all_zero()
            .with(Indicator::Phq, true)
            .with(Indicator::Exercise, true);
        let exp = explainer.explain(&x, model, Locale::En).unwrap();

        assert_eq!(exp.weights.len(), 10);
        assert_eq!(exp.label, RiskClass::High);
        assert!(exp.weights.iter().all(|w| w.weight.is_finite()));
        let top: Vec<Indicator> = exp.weights.iter().take(2).map(|w| w.indicator).collect();
        assert!(top.contains(&Indicator::Phq), "{top:?}");
        assert!(top.contains(&Indicator::Exercise), "{top:?}");
        // the instance sits in the high-PHQ bin, so its weight is positive
        assert!(exp.weight(Indicator::Phq).unwrap() > 0.0);
        assert!(exp.weight(Indicator::Exercise).unwrap() < 0.0);
        assert!((exp.predict_proba[1] - 0.5).abs() < 1e-12);
        for pair in exp.weights.windows(2) {
            assert!(pair[0].weight.abs() >= pair[1].weight.abs());
        }
    }

    #[test]
    fn same_seed_gives_same_explanation() {
        let explainer = LimeTabularExplainer::new(&reference(), settings(500)).unwrap();
        let x = FeatureVector::all_one();
        let a = explainer.explain(&x, model, Locale::Zh).unwrap();
        let b = explainer.explain(&x, model, Locale::Zh).unwrap();
        assert_eq!(a, b);
        let known = Indicator::column_names(Locale::Zh);
        for w in &a.weights {
            assert!(known.iter().any(|name| w.description.contains(name)), "{}", w.description);
        }
    }

    #[test]
    fn forward_selection_is_used_for_few_features() {
        let s = LimeSettings {
            num_features: 2,
            num_samples: 1000,
            ..LimeSettings::default()
        };
        let explainer = LimeTabularExplainer::new(&reference(), s).unwrap();
        let exp = explainer
            .explain(&FeatureVector::all_zero(), model, Locale::En)
            .unwrap();
        let mut picked: Vec<Indicator> = exp.weights.iter().map(|w| w.indicator).collect();
        picked.sort_by_key(|i| i.index());
        assert_eq!(picked, vec![Indicator::Phq, Indicator::Exercise]);
        assert!(exp.score > 0.99, "{}", exp.score);
    }

    #[test]
    fn surrogate_is_fitted_on_standardized_neighbours() {
        let s = LimeSettings {
            num_features: 1,
            num_samples: 800,
            feature_selection: FeatureSelection::Forward,
            ..LimeSettings::default()
        };
        let explainer = LimeTabularExplainer::new(&reference(), s.clone()).unwrap();
        // a third of the reference rows sit in bin 1 of every feature
        let scale = (2.0f64 / 9.0).sqrt();
        for &i in &Indicator::ALL {
            let bins = explainer.discretizer().feature(i);
            assert!((bins.mean - 1.0 / 3.0).abs() < 1e-12);
            assert!((bins.scale - scale).abs() < 1e-12);
        }

        let phq = Indicator::Phq.index();
        let phq_only = |rows: &[Vec<f64>]| -> Vec<Vec<f64>> {
            rows.iter()
                .map(|r| {
                    let p = 0.3 + 0.4 * r[phq];
                    vec![1.0 - p, p]
                })
                .collect()
        };
        let x = FeatureVector::all_zero().with(Indicator::Phq, true);
        let exp = explainer.explain(&x, phq_only, Locale::En).unwrap();
        assert_eq!(exp.weights.len(), 1);
        assert_eq!(exp.weights[0].indicator, Indicator::Phq);

        // redo the same draw by hand: kernel on standardized distance,
        // one-feature ridge with alpha 1 on the standardized PHQ column
        let mut rng = StdRng::seed_from_u64(0);
        let (binary, _) = explainer.sample(&x, &mut rng);
        let width = s.kernel_width();
        let w: Vec<f64> = binary
            .iter()
            .map(|row| {
                let d2: f64 = row.iter().map(|b| ((b - 1.0) / scale).powi(2)).sum();
                (-d2 / (2.0 * width * width)).exp()
            })
            .collect();
        let z: Vec<f64> = binary.iter().map(|r| (r[phq] - 1.0 / 3.0) / scale).collect();
        let y: Vec<f64> = binary.iter().map(|r| 0.3 + 0.4 * r[phq]).collect();
        let w_sum: f64 = w.iter().sum();
        let z_bar = z.iter().zip(&w).map(|(a, b)| a * b).sum::<f64>() / w_sum;
        let y_bar = y.iter().zip(&w).map(|(a, b)| a * b).sum::<f64>() / w_sum;
        let mut sxx = 0.0;
        let mut sxy = 0.0;
        for ((zi, yi), wi) in z.iter().zip(&y).zip(&w) {
            sxx += wi * (zi - z_bar) * (zi - z_bar);
            sxy += wi * (zi - z_bar) * (yi - y_bar);
        }
        let expected = sxy / (sxx + SURROGATE_ALPHA);
        assert!((exp.weights[0].weight - expected).abs() < 1e-9);
        // the raw slope 0.4 is reported per standard deviation, then shrunk
        assert!((expected - 0.4 * scale * sxx / (sxx + SURROGATE_ALPHA)).abs() < 1e-9);
        assert!((exp.intercept + expected * z_bar - y_bar).abs() < 1e-9);
    }

    #[test]
    fn malformed_classifier_output_is_an_error() {
        let explainer = LimeTabularExplainer::new(&reference(), settings(50)).unwrap();
        let nan = |rows: &[Vec<f64>]| vec![vec![f64::NAN, f64::NAN]; rows.len()];
        assert!(matches!(
            explainer.explain(&FeatureVector::all_zero(), nan, Locale::En),
            Err(ExplainError::NonFinite(_))
        ));
        let short = |_: &[Vec<f64>]| Vec::new();
        assert!(explainer
            .explain(&FeatureVector::all_zero(), short, Locale::En)
            .is_err());
    }
}
