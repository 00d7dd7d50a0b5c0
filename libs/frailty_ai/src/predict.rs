use frailty_model::{argmax, Classifier, FeatureVector, Locale};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Predicted frailty outcome. The discriminant is the classifier's class index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskClass {
    Low = 0,
    High = 1,
}

impl RiskClass {
    pub const ALL: [RiskClass; 2] = [RiskClass::Low, RiskClass::High];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<RiskClass> {
        Self::ALL.get(index).copied()
    }

    /// Short label used in the headline.
    pub fn label(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (RiskClass::Low, Locale::En) => "low risk",
            (RiskClass::High, Locale::En) => "high risk",
            (RiskClass::Low, Locale::Zh) => "低风险",
            (RiskClass::High, Locale::Zh) => "高风险",
        }
    }

    /// Class name shown in LIME reports.
    pub fn class_name(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (RiskClass::Low, Locale::En) => "Low frailty risk",
            (RiskClass::High, Locale::En) => "High frailty risk",
            (RiskClass::Low, Locale::Zh) => "低衰弱风险",
            (RiskClass::High, Locale::Zh) => "高衰弱风险",
        }
    }

    /// Name of the model output explained by a force plot for this class.
    pub fn outcome_name(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (RiskClass::Low, Locale::En) => "No frailty risk",
            (RiskClass::High, Locale::En) => "Frailty risk",
            (RiskClass::Low, Locale::Zh) => "无衰弱风险",
            (RiskClass::High, Locale::Zh) => "衰弱风险",
        }
    }

    pub fn other(self) -> RiskClass {
        match self {
            RiskClass::Low => RiskClass::High,
            RiskClass::High => RiskClass::Low,
        }
    }
}

impl fmt::Display for RiskClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Class label and class probabilities for one feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub class: RiskClass,
    /// `[p(low), p(high)]`, summing to one.
    pub probabilities: [f64; 2],
}

impl PredictionResult {
    pub fn probability(&self, class: RiskClass) -> f64 {
        self.probabilities[class.index()]
    }

    /// Probability of the predicted class.
    pub fn confidence(&self) -> f64 {
        self.probability(self.class)
    }

    pub fn confidence_percent(&self) -> f64 {
        self.confidence() * 100.0
    }

    pub fn headline(&self, locale: Locale) -> String {
        match locale {
            Locale::En => format!(
                "Frailty risk level: {} ({})",
                self.class,
                self.class.label(locale)
            ),
            Locale::Zh => format!(
                "衰弱风险等级：{}（{}）",
                self.class,
                self.class.label(locale)
            ),
        }
    }

    pub fn probability_line(&self, locale: Locale) -> String {
        let low = format_percent(self.probability(RiskClass::Low));
        let high = format_percent(self.probability(RiskClass::High));
        match locale {
            Locale::En => format!("Risk probability: low risk {low} | high risk {high}"),
            Locale::Zh => format!("风险概率：低风险概率 {low} | 高风险概率 {high}"),
        }
    }
}

/// Format a probability as a percentage with two decimals.
pub fn format_percent(p: f64) -> String {
    format!("{:.2}%", p * 100.0)
}

/// Single forward inference over one feature vector.
///
/// The predicted class is the most probable one, with ties going to low risk.
pub fn predict<C: Classifier + ?Sized>(model: &C, features: &FeatureVector) -> PredictionResult {
    let proba = model.predict_proba(&features.as_f64());
    let probabilities = [proba[0], proba[1]];
    let class = match argmax(&probabilities) {
        0 => RiskClass::Low,
        _ => RiskClass::High,
    };
    PredictionResult {
        class,
        probabilities,
    }
}

/// Predictor bound to one loaded classifier.
pub struct Predictor<'a, C: Classifier + ?Sized> {
    model: &'a C,
}

impl<'a, C: Classifier + ?Sized> Predictor<'a, C> {
    pub fn new(model: &'a C) -> Self {
        Self { model }
    }

    pub fn predict(&self, features: &FeatureVector) -> PredictionResult {
        predict(self.model, features)
    }

    /// `predict_proba` over raw rows, the form LIME queries the model in.
    pub fn predict_proba_rows(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        self.model.predict_proba_batch(rows)
    }
}
