//! Frailty questionnaire primitives.
//!
//! - [`Indicator`]: the fifteen binary questionnaire items, their training
//!   order and their wording per [`Locale`]
//! - [`FeatureVector`]: one validated answer set
//! - [`RandomForest`]: the classifier artifact, loaded from JSON
//! - [`ReferenceDataset`]: prior answer sets used as an explanation
//!   neighbourhood, loaded from CSV
//!
//! ```
//! use frailty_model::{FeatureVector, Indicator};
//!
//! let answers = FeatureVector::all_zero()
//!     .with(Indicator::Phq, true)
//!     .with(Indicator::Polypharmacy, true);
//! assert_eq!(answers.get(Indicator::Phq), 1);
//! assert_eq!(answers.as_f64().iter().sum::<f64>(), 2.0);
//! ```
pub mod classifier;
pub mod dataset;
pub mod error;
pub mod feature;
pub mod forest;
pub mod indicator;

pub use classifier::{argmax, Classifier};
pub use dataset::{load_reference, ReferenceDataset};
pub use error::{InputError, LoadError};
pub use feature::{parse_code, FeatureVector};
pub use forest::{load_forest, DecisionTree, RandomForest};
pub use indicator::{Indicator, Locale, FEATURE_COUNT};
