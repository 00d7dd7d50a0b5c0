use frailty_model::{FeatureVector, Indicator, FEATURE_COUNT};
use serde::{Deserialize, Serialize};

use crate::predict::RiskClass;

/// SHAP attributions of one sample for every class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapValues {
    /// Expected model output per class.
    pub base_values: Vec<f64>,
    /// `values[class][feature]`.
    pub values: Vec<[f64; FEATURE_COUNT]>,
}

impl ShapValues {
    pub fn n_classes(&self) -> usize {
        self.base_values.len()
    }

    /// `base_value + Σ contributions` for `class`.
    pub fn output(&self, class: usize) -> f64 {
        self.base_values[class] + self.values[class].iter().sum::<f64>()
    }

    pub fn for_class(&self, class: RiskClass) -> ClassAttribution {
        let c = class.index();
        ClassAttribution {
            class,
            base_value: self.base_values[c],
            contributions: self.values[c],
        }
    }
}

/// Additive explanation of one class probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassAttribution {
    pub class: RiskClass,
    pub base_value: f64,
    pub contributions: [f64; FEATURE_COUNT],
}

impl ClassAttribution {
    pub fn output_value(&self) -> f64 {
        self.base_value + self.contributions.iter().sum::<f64>()
    }

    pub fn contribution(&self, indicator: Indicator) -> f64 {
        self.contributions[indicator.index()]
    }

    /// Indicators by decreasing absolute contribution.
    pub fn ranked(&self) -> Vec<(Indicator, f64)> {
        let mut ranked: Vec<(Indicator, f64)> = Indicator::ALL
            .iter()
            .map(|&i| (i, self.contributions[i.index()]))
            .collect();
        ranked.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        ranked
    }

    /// Contributions paired with the answers they explain, dropping exact zeros.
    pub fn nonzero(&self, features: &FeatureVector) -> Vec<(Indicator, u8, f64)> {
        self.ranked()
            .into_iter()
            .filter(|(_, v)| *v != 0.0)
            .map(|(i, v)| (i, features.get(i), v))
            .collect()
    }
}
