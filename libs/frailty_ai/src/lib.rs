//! Frailty risk prediction with templated advice and local explanations.
//!
//! ```no_run
//! use frailty_ai::{EvaluationOptions, Evaluator, LimeSettings};
//! use frailty_model::{load_forest, load_reference, FeatureVector};
//!
//! let model = load_forest("RF.json")?;
//! let reference = load_reference("X_test.csv")?;
//! let evaluator = Evaluator::new(model, &reference, LimeSettings::default());
//! let out = evaluator.evaluate(&FeatureVector::all_zero(), &EvaluationOptions::default());
//! println!("{}", out.prediction.headline(Default::default()));
//! # Ok::<(), frailty_model::LoadError>(())
//! ```

pub mod advice;
pub mod evaluate;
pub mod explain;
pub mod predict;
pub mod render;

pub use advice::{advise, Advice};
pub use evaluate::{Evaluation, EvaluationOptions, Evaluator, LimePanel, ShapPanel};
pub use explain::lime::{
    FeatureSelection, LimeExplanation, LimeSettings, LimeTabularExplainer, LimeWeight,
};
pub use explain::shap::{ClassAttribution, ShapValues, TreeExplainer};
pub use explain::ExplainError;
pub use predict::{format_percent, predict, PredictionResult, Predictor, RiskClass};
