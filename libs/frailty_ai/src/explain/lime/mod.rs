//! Tabular LIME.
//!
//! Neighbours are sampled per feature from the quartile bins of the
//! reference set, mapped back to answer values, labelled by the classifier
//! and weighted by an exponential kernel on their distance to the instance
//! in standardized bin space. A weighted ridge model fitted on the same
//! standardized rows gives the local weights, one per standard deviation.

mod discretize;
mod explainer;
mod ridge;

pub use discretize::{FeatureBins, QuartileDiscretizer};
pub use explainer::{
    FeatureSelection, LimeExplanation, LimeSettings, LimeTabularExplainer, LimeWeight,
};
