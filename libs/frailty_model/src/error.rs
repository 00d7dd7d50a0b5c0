//! Error types for artifact loading and input validation

use std::path::PathBuf;
use thiserror::Error;

use crate::indicator::Indicator;

/// Failures while loading the classifier or the reference dataset.
///
/// These are startup-fatal: nothing can be evaluated without both artifacts.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed model artifact {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed reference dataset {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("invalid model artifact: {0}")]
    InvalidModel(String),
    #[error("invalid reference dataset {} (row {row}): {reason}", path.display())]
    InvalidDataset {
        path: PathBuf,
        row: usize,
        reason: String,
    },
    #[error("reference dataset {} has no rows", .0.display())]
    EmptyDataset(PathBuf),
}

/// A submitted answer set that cannot become a feature vector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("expected {expected} values, got {found}")]
    WrongLength { expected: usize, found: usize },
    #[error("{feature}: code {value} is not 0 or 1")]
    InvalidCode { feature: Indicator, value: i64 },
    #[error("{feature}: '{raw}' is not a valid 0/1 code")]
    Unparseable { feature: Indicator, raw: String },
    #[error("missing answer for '{0}'")]
    MissingField(String),
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("duplicate answer for '{0}'")]
    DuplicateField(String),
}

impl InputError {
    /// The indicator the error refers to, when there is one.
    pub fn indicator(&self) -> Option<Indicator> {
        match self {
            InputError::InvalidCode { feature, .. } | InputError::Unparseable { feature, .. } => {
                Some(*feature)
            }
            InputError::MissingField(key) | InputError::DuplicateField(key) => {
                Indicator::from_key(key)
            }
            _ => None,
        }
    }
}
