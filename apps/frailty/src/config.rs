//! `frailty.toml` settings.

use std::path::{Path, PathBuf};

use frailty_ai::{EvaluationOptions, FeatureSelection, LimeSettings, RiskClass};
use frailty_model::Locale;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "frailty.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub locale: Locale,
    pub artifacts: ArtifactsConfig,
    pub server: ServerConfig,
    pub explain: ExplainConfig,
    pub lime: LimeConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactsConfig {
    pub model: PathBuf,
    pub reference: PathBuf,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("RF.json"),
            reference: PathBuf::from("X_test.csv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExplainConfig {
    pub shap: bool,
    pub lime: bool,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            shap: true,
            lime: true,
        }
    }
}

/// Sampling seed: a number, or `"entropy"` for a fresh seed per explanation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Seed {
    Fixed(u64),
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimeConfig {
    pub num_features: usize,
    pub num_samples: usize,
    /// Class index explained by LIME.
    pub label: usize,
    pub seed: Seed,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel_width: Option<f64>,
    pub feature_selection: FeatureSelection,
}

impl Default for LimeConfig {
    fn default() -> Self {
        let d = LimeSettings::default();
        Self {
            num_features: d.num_features,
            num_samples: d.num_samples,
            label: d.label.index(),
            seed: Seed::Fixed(0),
            kernel_width: d.kernel_width,
            feature_selection: d.feature_selection,
        }
    }
}

impl LimeConfig {
    pub fn settings(&self) -> Result<LimeSettings, ConfigError> {
        let label = RiskClass::from_index(self.label).ok_or_else(|| {
            ConfigError::Invalid(format!("lime.label must be 0 or 1, got {}", self.label))
        })?;
        let seed = match &self.seed {
            Seed::Fixed(s) => Some(*s),
            Seed::Named(name) if name == "entropy" => None,
            Seed::Named(other) => {
                return Err(ConfigError::Invalid(format!(
                    "lime.seed must be a number or \"entropy\", got \"{other}\""
                )))
            }
        };
        let settings = LimeSettings {
            num_features: self.num_features,
            num_samples: self.num_samples,
            label,
            seed,
            kernel_width: self.kernel_width,
            feature_selection: self.feature_selection,
        };
        settings
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(settings)
    }
}

impl Config {
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path`, or `frailty.toml` when no path is given. Only the
    /// default file may be absent, in which case defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no {} found, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        let config = Self::from_toml_str(&text, &path)?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn evaluation_options(&self) -> EvaluationOptions {
        EvaluationOptions {
            locale: self.locale,
            shap: self.explain.shap,
            lime: self.explain.lime,
        }
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
