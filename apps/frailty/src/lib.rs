//! Application layer of the frailty risk predictor: configuration, the
//! HTTP form server and the views shared with the `frailty` binary.

pub mod config;
pub mod output;
pub mod pages;
pub mod server;

use std::sync::Arc;

use frailty_ai::Evaluator;
use frailty_model::{load_forest, load_reference, LoadError};
use log::info;

use crate::config::{Config, ConfigError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Load both artifacts named by `config` and build the shared evaluator.
pub fn build_evaluator(config: &Config) -> Result<Arc<Evaluator>, StartupError> {
    let lime = config.lime.settings()?;
    let model = load_forest(&config.artifacts.model)?;
    let reference = load_reference(&config.artifacts.reference)?;
    info!(
        "evaluator ready: {} trees, {} reference rows",
        model.n_trees(),
        reference.len()
    );
    Ok(Arc::new(Evaluator::new(model, &reference, lime)))
}
