//! Shared fixtures for the workspace tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use frailty::config::Config;
use frailty_ai::{Evaluator, LimeSettings};
use frailty_model::{load_forest, load_reference, Indicator, Locale, RandomForest, ReferenceDataset};
use tempfile::TempDir;

/// Directory holding the bundled demo `RF.json` and `X_test.csv`.
pub fn demo_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../assets/demo")
}

pub fn demo_model_path() -> PathBuf {
    demo_dir().join("RF.json")
}

pub fn demo_reference_path() -> PathBuf {
    demo_dir().join("X_test.csv")
}

pub fn demo_forest() -> RandomForest {
    load_forest(demo_model_path()).expect("bundled demo model loads")
}

pub fn demo_reference() -> ReferenceDataset {
    load_reference(demo_reference_path()).expect("bundled demo reference loads")
}

/// LIME settings small enough for tests but with the production defaults otherwise.
pub fn quick_lime() -> LimeSettings {
    LimeSettings {
        num_samples: 600,
        ..LimeSettings::default()
    }
}

pub fn demo_evaluator() -> Arc<Evaluator> {
    Arc::new(Evaluator::new(demo_forest(), &demo_reference(), quick_lime()))
}

/// Write a reference CSV with the Chinese column header into `dir`.
pub fn write_reference_csv(dir: &Path, rows: &[[u8; 15]]) -> PathBuf {
    let path = dir.join("X_test.csv");
    let mut text = Indicator::column_names(Locale::Zh).join(",");
    text.push('\n');
    for row in rows {
        let cells: Vec<String> = row.iter().map(u8::to_string).collect();
        text.push_str(&cells.join(","));
        text.push('\n');
    }
    std::fs::write(&path, text).expect("write reference csv");
    path
}

/// A working directory with copies of the demo artifacts and a config
/// pointing at them.
pub struct Workspace {
    pub dir: TempDir,
    pub config: Config,
}

impl Workspace {
    pub fn with_demo_artifacts() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let model = dir.path().join("RF.json");
        let reference = dir.path().join("X_test.csv");
        std::fs::copy(demo_model_path(), &model).expect("copy model");
        std::fs::copy(demo_reference_path(), &reference).expect("copy reference");
        let mut config = Config::default();
        config.artifacts.model = model;
        config.artifacts.reference = reference;
        config.lime.num_samples = 600;
        Self { dir, config }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
