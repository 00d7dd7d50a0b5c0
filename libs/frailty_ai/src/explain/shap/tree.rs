use std::sync::Arc;

use frailty_model::{Classifier, DecisionTree, FeatureVector, RandomForest, FEATURE_COUNT};
use log::{debug, trace};

use super::path::PathState;
use super::values::ShapValues;
use crate::explain::ExplainError;

/// Explainer bound to one forest. Expected values are computed once.
#[derive(Debug, Clone)]
pub struct TreeExplainer {
    model: Arc<RandomForest>,
    expected_value: Vec<f64>,
}

impl TreeExplainer {
    pub fn new(model: Arc<RandomForest>) -> Self {
        let n_classes = model.n_classes();
        let mut expected_value = vec![0.0; n_classes];
        for tree in &model.trees {
            for (e, v) in expected_value.iter_mut().zip(tree_expectation(tree, 0)) {
                *e += v;
            }
        }
        let n = model.n_trees() as f64;
        expected_value.iter_mut().for_each(|e| *e /= n);
        debug!("tree explainer expected value {expected_value:?}");
        Self {
            model,
            expected_value,
        }
    }

    /// Mean model output over the training distribution, per class.
    pub fn expected_value(&self) -> &[f64] {
        &self.expected_value
    }

    pub fn model(&self) -> &RandomForest {
        &self.model
    }

    pub fn shap_values(&self, features: &FeatureVector) -> Result<ShapValues, ExplainError> {
        let x = features.as_f64();
        let n_classes = self.expected_value.len();
        let mut phi = vec![[0.0; FEATURE_COUNT]; n_classes];

        for (t, tree) in self.model.trees.iter().enumerate() {
            let mut walker = Walker {
                tree,
                x: &x,
                phi: &mut phi,
            };
            walker.recurse(0, &PathState::new(), 0, 1.0, 1.0, None);
            trace!("tree {t} done");
        }

        let n = self.model.n_trees() as f64;
        for row in phi.iter_mut() {
            for v in row.iter_mut() {
                *v /= n;
            }
        }

        if phi.iter().flatten().any(|v| !v.is_finite()) {
            return Err(ExplainError::NonFinite("shap values".into()));
        }
        Ok(ShapValues {
            base_values: self.expected_value.clone(),
            values: phi,
        })
    }
}

/// Cover-weighted mean leaf distribution below `node`.
fn tree_expectation(tree: &DecisionTree, node: usize) -> Vec<f64> {
    if tree.is_leaf(node) {
        return tree.distribution(node);
    }
    let (l, r) = (tree.left(node), tree.right(node));
    let cover = tree.cover(node);
    let wl = tree.cover(l) / cover;
    let wr = tree.cover(r) / cover;
    tree_expectation(tree, l)
        .into_iter()
        .zip(tree_expectation(tree, r))
        .map(|(a, b)| wl * a + wr * b)
        .collect()
}

struct Walker<'a> {
    tree: &'a DecisionTree,
    x: &'a [f64],
    phi: &'a mut [[f64; FEATURE_COUNT]],
}

impl Walker<'_> {
    fn recurse(
        &mut self,
        node: usize,
        parent: &PathState,
        unique_depth: usize,
        zero_fraction: f64,
        one_fraction: f64,
        feature: Option<usize>,
    ) {
        let mut path = PathState::child_of(parent, unique_depth);
        path.extend(unique_depth, zero_fraction, one_fraction, feature);

        let tree = self.tree;
        if tree.is_leaf(node) {
            let dist = tree.distribution(node);
            for i in 1..=unique_depth {
                let w = path.unwound_sum(unique_depth, i);
                let el = path.get(i);
                let Some(f) = el.feature else { continue };
                let scale = w * (el.one_fraction - el.zero_fraction);
                for (class, p) in dist.iter().enumerate() {
                    self.phi[class][f] += scale * p;
                }
            }
            return;
        }

        let split = tree.split_feature(node);
        let hot = tree.next_node(node, self.x[split]);
        let cold = if hot == tree.left(node) {
            tree.right(node)
        } else {
            tree.left(node)
        };
        let cover = tree.cover(node);
        let hot_zero = tree.cover(hot) / cover;
        let cold_zero = tree.cover(cold) / cover;

        let mut depth = unique_depth;
        let mut incoming_zero = 1.0;
        let mut incoming_one = 1.0;
        if let Some(k) = path.find(depth, split) {
            let el = *path.get(k);
            incoming_zero = el.zero_fraction;
            incoming_one = el.one_fraction;
            path.unwind(depth, k);
            depth -= 1;
        }

        self.recurse(
            hot,
            &path,
            depth + 1,
            hot_zero * incoming_zero,
            incoming_one,
            Some(split),
        );
        self.recurse(
            cold,
            &path,
            depth + 1,
            cold_zero * incoming_zero,
            0.0,
            Some(split),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frailty_model::Indicator;

    fn node_tree(
        left: Vec<i64>,
        right: Vec<i64>,
        feature: Vec<i64>,
        value: Vec<Vec<f64>>,
    ) -> DecisionTree {
        let n = left.len();
        DecisionTree {
            children_left: left,
            children_right: right,
            feature,
            threshold: vec![0.5; n],
            value,
            weighted_n_node_samples: Vec::new(),
        }
    }

    /// Two levels: PHQ at the root, exercise below its positive branch.
    fn forest() -> Arc<RandomForest> {
        let phq = Indicator::Phq.index() as i64;
        let ex = Indicator::Exercise.index() as i64;
        let hf = Indicator::HardFood.index() as i64;
        let a = node_tree(
            vec![1, -1, 3, -1, -1],
            vec![2, -1, 4, -1, -1],
            vec![phq, -2, ex, -2, -2],
            vec![
                vec![60.0, 40.0],
                vec![45.0, 5.0],
                vec![15.0, 35.0],
                vec![3.0, 27.0],
                vec![12.0, 8.0],
            ],
        );
        let b = node_tree(
            vec![1, -1, -1],
            vec![2, -1, -1],
            vec![hf, -2, -2],
            vec![vec![50.0, 30.0], vec![40.0, 10.0], vec![10.0, 20.0]],
        );
        // same feature split twice on one path
        let c = node_tree(
            vec![1, 2, -1, -1, -1],
            vec![4, 3, -1, -1, -1],
            vec![phq, phq, -2, -2, -2],
            vec![
                vec![10.0, 10.0],
                vec![8.0, 4.0],
                vec![6.0, 2.0],
                vec![2.0, 2.0],
                vec![2.0, 6.0],
            ],
        );
        let mut forest = RandomForest::new("test", vec![a, b, c]).unwrap();
        forest.trees[2].threshold = vec![0.5, 0.25, 0.0, 0.0, 0.0];
        Arc::new(forest)
    }

    #[test]
    fn values_are_additive_for_every_class() {
        let model = forest();
        let explainer = TreeExplainer::new(model.clone());
        for bits in [0u16, 0x7fff, 0b1_0000_0001, 0b11_0000_0000] {
            let fv = FeatureVector::from_bits(bits);
            let shap = explainer.shap_values(&fv).unwrap();
            let proba = model.predict_proba(&fv.as_f64());
            for c in 0..2 {
                assert!(
                    (shap.output(c) - proba[c]).abs() < 1e-9,
                    "class {c} bits {bits:b}: {} vs {}",
                    shap.output(c),
                    proba[c]
                );
            }
        }
    }

    #[test]
    fn unused_features_get_zero_attribution() {
        let explainer = TreeExplainer::new(forest());
        let shap = explainer
            .shap_values(&FeatureVector::all_one())
            .unwrap();
        for i in Indicator::ALL {
            if !matches!(i, Indicator::Phq | Indicator::Exercise | Indicator::HardFood) {
                assert_eq!(shap.values[1][i.index()], 0.0, "{i}");
            }
        }
        assert!(shap.values[1][Indicator::Phq.index()] > 0.0);
    }

    #[test]
    fn single_split_matches_closed_form() {
        // phi = p(leaf taken) - E[p]
        let t = node_tree(
            vec![1, -1, -1],
            vec![2, -1, -1],
            vec![0, -2, -2],
            vec![vec![4.0, 4.0], vec![3.0, 1.0], vec![1.0, 3.0]],
        );
        let model = Arc::new(RandomForest::new("stump", vec![t]).unwrap());
        let explainer = TreeExplainer::new(model);
        assert!((explainer.expected_value()[1] - 0.5).abs() < 1e-12);
        let shap = explainer
            .shap_values(&FeatureVector::all_one())
            .unwrap();
        assert!((shap.values[1][0] - 0.25).abs() < 1e-12);
        assert!((shap.values[0][0] + 0.25).abs() < 1e-12);
    }
}
