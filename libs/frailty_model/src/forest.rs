//! Random-forest classifier artifact.
//!
//! The artifact is JSON in the scikit-learn `tree_` array layout: one entry
//! per node in `children_left`, `children_right`, `feature`, `threshold`,
//! `value` and `weighted_n_node_samples`. Leaves have both children set to
//! `-1`. Samples with `x[feature] <= threshold` go left.
//!
//! ```
//! use frailty_model::forest::{DecisionTree, RandomForest};
//! use frailty_model::Classifier;
//!
//! // one stump splitting on the first indicator
//! let tree = DecisionTree {
//!     children_left: vec![1, -1, -1],
//!     children_right: vec![2, -1, -1],
//!     feature: vec![0, -2, -2],
//!     threshold: vec![0.5, -2.0, -2.0],
//!     value: vec![vec![6.0, 4.0], vec![5.0, 1.0], vec![1.0, 3.0]],
//!     weighted_n_node_samples: vec![10.0, 6.0, 4.0],
//! };
//! let forest = RandomForest::new("stump", vec![tree]).unwrap();
//! let mut x = [0.0; 15];
//! x[0] = 1.0;
//! let p = forest.predict_proba(&x);
//! assert!((p[1] - 0.75).abs() < 1e-12);
//! ```

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::path::Path;

use crate::classifier::Classifier;
use crate::error::LoadError;
use crate::indicator::FEATURE_COUNT;

/// Marker scikit-learn uses for "no child".
pub const TREE_LEAF: i64 = -1;

/// Class labels the forest must have been trained on, in probability order.
pub const EXPECTED_CLASSES: [i64; 2] = [0, 1];

/// One fitted decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class weights (counts or fractions, normalized on use).
    pub value: Vec<Vec<f64>>,
    /// Cover of every node. Filled from the `value` row sums when the
    /// artifact leaves it out.
    #[serde(default)]
    pub weighted_n_node_samples: Vec<f64>,
}

impl DecisionTree {
    pub fn node_count(&self) -> usize {
        self.children_left.len()
    }

    pub fn is_leaf(&self, node: usize) -> bool {
        self.children_left[node] == TREE_LEAF
    }

    pub fn left(&self, node: usize) -> usize {
        self.children_left[node] as usize
    }

    pub fn right(&self, node: usize) -> usize {
        self.children_right[node] as usize
    }

    pub fn split_feature(&self, node: usize) -> usize {
        self.feature[node] as usize
    }

    pub fn threshold(&self, node: usize) -> f64 {
        self.threshold[node]
    }

    pub fn cover(&self, node: usize) -> f64 {
        self.weighted_n_node_samples[node]
    }

    /// Child a sample with `value` at this node's split feature goes to.
    pub fn next_node(&self, node: usize, value: f64) -> usize {
        if value <= self.threshold[node] {
            self.left(node)
        } else {
            self.right(node)
        }
    }

    /// Class distribution at `node`, normalized to sum to one.
    pub fn distribution(&self, node: usize) -> Vec<f64> {
        let row = &self.value[node];
        let total: f64 = row.iter().sum();
        row.iter().map(|v| v / total).collect()
    }

    /// Leaf reached by `x`.
    pub fn apply(&self, x: &[f64]) -> usize {
        let mut node = 0;
        while !self.is_leaf(node) {
            node = self.next_node(node, x[self.split_feature(node)]);
        }
        node
    }

    pub fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        self.distribution(self.apply(x))
    }

    pub fn depth(&self) -> usize {
        fn walk(tree: &DecisionTree, node: usize) -> usize {
            if tree.is_leaf(node) {
                0
            } else {
                1 + walk(tree, tree.left(node)).max(walk(tree, tree.right(node)))
            }
        }
        walk(self, 0)
    }

    fn validate(&mut self, index: usize, n_features: usize, n_classes: usize) -> Result<(), LoadError> {
        let invalid = |msg: String| LoadError::InvalidModel(format!("tree {index}: {msg}"));
        let n = self.node_count();
        if n == 0 {
            return Err(invalid("no nodes".into()));
        }
        if self.weighted_n_node_samples.is_empty() {
            self.weighted_n_node_samples = self.value.iter().map(|row| row.iter().sum()).collect();
        }
        let lengths = [
            ("children_right", self.children_right.len()),
            ("feature", self.feature.len()),
            ("threshold", self.threshold.len()),
            ("value", self.value.len()),
            ("weighted_n_node_samples", self.weighted_n_node_samples.len()),
        ];
        for (name, len) in lengths {
            if len != n {
                return Err(invalid(format!("{name} has {len} entries, expected {n}")));
            }
        }
        for node in 0..n {
            let (l, r) = (self.children_left[node], self.children_right[node]);
            if (l == TREE_LEAF) != (r == TREE_LEAF) {
                return Err(invalid(format!("node {node} has exactly one child")));
            }
            if l != TREE_LEAF {
                // children are stored after their parent, which rules out cycles
                for child in [l, r] {
                    if child <= node as i64 || child >= n as i64 {
                        return Err(invalid(format!("node {node} has invalid child {child}")));
                    }
                }
                let f = self.feature[node];
                if f < 0 || f as usize >= n_features {
                    return Err(invalid(format!("node {node} splits on feature {f}")));
                }
                if !self.threshold[node].is_finite() {
                    return Err(invalid(format!("node {node} has a non-finite threshold")));
                }
            }
            let row = &self.value[node];
            if row.len() != n_classes {
                return Err(invalid(format!(
                    "node {node} has {} class weights, expected {n_classes}",
                    row.len()
                )));
            }
            let total: f64 = row.iter().sum();
            if row.iter().any(|v| !v.is_finite() || *v < 0.0) || total <= 0.0 {
                return Err(invalid(format!("node {node} has invalid class weights {row:?}")));
            }
            let cover = self.weighted_n_node_samples[node];
            if !cover.is_finite() || cover <= 0.0 {
                return Err(invalid(format!("node {node} has invalid cover {cover}")));
            }
        }
        Ok(())
    }
}

/// A fitted random forest over the fifteen indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[serde(default = "default_n_features")]
    pub n_features: usize,
    #[serde(default = "default_classes")]
    pub classes: Vec<i64>,
    pub trees: Vec<DecisionTree>,
}

fn default_model_name() -> String {
    "random_forest".to_string()
}

fn default_n_features() -> usize {
    FEATURE_COUNT
}

fn default_classes() -> Vec<i64> {
    EXPECTED_CLASSES.to_vec()
}

impl RandomForest {
    /// Assemble and validate a forest over the fifteen indicators.
    pub fn new(model_name: impl Into<String>, trees: Vec<DecisionTree>) -> Result<Self, LoadError> {
        let mut forest = Self {
            model_name: model_name.into(),
            n_features: FEATURE_COUNT,
            classes: EXPECTED_CLASSES.to_vec(),
            trees,
        };
        forest.validate()?;
        Ok(forest)
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RandomForest>(s)
    }

    /// Load and validate the artifact at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut forest = Self::from_json_str(&text).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        forest.validate()?;
        info!(
            "loaded model '{}' from {}: {} trees, max depth {}",
            forest.model_name,
            path.display(),
            forest.trees.len(),
            forest.max_depth()
        );
        Ok(forest)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn max_depth(&self) -> usize {
        self.trees.iter().map(DecisionTree::depth).max().unwrap_or(0)
    }

    fn validate(&mut self) -> Result<(), LoadError> {
        if self.n_features != FEATURE_COUNT {
            return Err(LoadError::InvalidModel(format!(
                "model expects {} features, the questionnaire has {FEATURE_COUNT}",
                self.n_features
            )));
        }
        if self.classes != EXPECTED_CLASSES {
            return Err(LoadError::InvalidModel(format!(
                "model classes {:?}, expected {EXPECTED_CLASSES:?}",
                self.classes
            )));
        }
        if self.trees.is_empty() {
            return Err(LoadError::InvalidModel("forest has no trees".into()));
        }
        let (n_features, n_classes) = (self.n_features, self.classes.len());
        for (i, tree) in self.trees.iter_mut().enumerate() {
            tree.validate(i, n_features, n_classes)?;
        }
        debug!("validated {} trees", self.trees.len());
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Mean of the per-tree leaf distributions.
    fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        let mut acc = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (a, p) in acc.iter_mut().zip(tree.predict_proba(x)) {
                *a += p;
            }
        }
        let n = self.trees.len() as f64;
        acc.iter_mut().for_each(|a| *a /= n);
        acc
    }
}

/// Load the classifier artifact at `path`.
pub fn load_forest(path: impl AsRef<Path>) -> Result<RandomForest, LoadError> {
    RandomForest::load(path)
}
