//! Local explanations for a single prediction.
//!
//! - [`shap`]: exact TreeSHAP attributions over the random forest
//! - [`lime`]: a weighted ridge surrogate fitted on perturbed neighbours
//!   drawn from the reference dataset

pub mod lime;
pub mod shap;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExplainError {
    #[error("reference dataset is empty")]
    EmptyReference,
    #[error("invalid explainer settings: {0}")]
    InvalidSettings(String),
    #[error("surrogate model system is singular")]
    Singular,
    #[error("non-finite value in {0}")]
    NonFinite(String),
}
