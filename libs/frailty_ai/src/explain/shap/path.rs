//! Feature path bookkeeping for TreeSHAP.
//!
//! A path holds one element per distinct feature split on between the root
//! and the current node. `pweight` carries the permutation weights of every
//! subset size; extending and unwinding keep them consistent in O(depth).

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct PathElement {
    /// `None` for the root sentinel.
    pub feature: Option<usize>,
    /// Fraction of cover flowing this way when the feature is missing.
    pub zero_fraction: f64,
    /// 1 when the explained sample follows this branch, else 0.
    pub one_fraction: f64,
    pub pweight: f64,
}

/// Unique feature path from the root to the node being visited.
#[derive(Debug, Clone, Default)]
pub(crate) struct PathState {
    elements: Vec<PathElement>,
}

impl PathState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the first `unique_depth` elements of `parent`, with room for
    /// one more.
    pub fn child_of(parent: &PathState, unique_depth: usize) -> Self {
        let mut elements = Vec::with_capacity(unique_depth + 1);
        elements.extend_from_slice(&parent.elements[..unique_depth]);
        elements.push(PathElement::default());
        Self { elements }
    }

    pub fn get(&self, index: usize) -> &PathElement {
        &self.elements[index]
    }

    /// Position of `feature` among the first `unique_depth + 1` elements.
    pub fn find(&self, unique_depth: usize, feature: usize) -> Option<usize> {
        self.elements[..=unique_depth]
            .iter()
            .position(|e| e.feature == Some(feature))
    }

    /// Append a split at `unique_depth` and update the subset weights.
    pub fn extend(
        &mut self,
        unique_depth: usize,
        zero_fraction: f64,
        one_fraction: f64,
        feature: Option<usize>,
    ) {
        let p = &mut self.elements;
        if p.len() <= unique_depth {
            p.resize(unique_depth + 1, PathElement::default());
        }
        p[unique_depth] = PathElement {
            feature,
            zero_fraction,
            one_fraction,
            pweight: if unique_depth == 0 { 1.0 } else { 0.0 },
        };
        let d = unique_depth as f64;
        for i in (0..unique_depth).rev() {
            let fi = i as f64;
            p[i + 1].pweight += one_fraction * p[i].pweight * (fi + 1.0) / (d + 1.0);
            p[i].pweight = zero_fraction * p[i].pweight * (d - fi) / (d + 1.0);
        }
    }

    /// Remove the element at `path_index`, undoing its effect on the weights.
    pub fn unwind(&mut self, unique_depth: usize, path_index: usize) {
        let p = &mut self.elements;
        let one_fraction = p[path_index].one_fraction;
        let zero_fraction = p[path_index].zero_fraction;
        let d = unique_depth as f64;
        let mut next_one_portion = p[unique_depth].pweight;

        for i in (0..unique_depth).rev() {
            let fi = i as f64;
            if one_fraction != 0.0 {
                let tmp = p[i].pweight;
                p[i].pweight = next_one_portion * (d + 1.0) / ((fi + 1.0) * one_fraction);
                next_one_portion = tmp - p[i].pweight * zero_fraction * (d - fi) / (d + 1.0);
            } else {
                p[i].pweight = p[i].pweight * (d + 1.0) / (zero_fraction * (d - fi));
            }
        }

        for i in path_index..unique_depth {
            p[i].feature = p[i + 1].feature;
            p[i].zero_fraction = p[i + 1].zero_fraction;
            p[i].one_fraction = p[i + 1].one_fraction;
        }
    }

    /// Total permutation weight of the path with `path_index` unwound,
    /// without modifying the path.
    pub fn unwound_sum(&self, unique_depth: usize, path_index: usize) -> f64 {
        let p = &self.elements;
        let one_fraction = p[path_index].one_fraction;
        let zero_fraction = p[path_index].zero_fraction;
        let d = unique_depth as f64;
        let mut next_one_portion = p[unique_depth].pweight;
        let mut total = 0.0;

        for i in (0..unique_depth).rev() {
            let fi = i as f64;
            if one_fraction != 0.0 {
                let tmp = next_one_portion * (d + 1.0) / ((fi + 1.0) * one_fraction);
                total += tmp;
                next_one_portion = p[i].pweight - tmp * zero_fraction * ((d - fi) / (d + 1.0));
            } else {
                total += (p[i].pweight / zero_fraction) / ((d - fi) / (d + 1.0));
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_sentinel_has_unit_weight() {
        let mut path = PathState::new();
        path.extend(0, 1.0, 1.0, None);
        assert_eq!(path.get(0).pweight, 1.0);
        assert_eq!(path.find(0, 3), None);
    }

    #[test]
    fn unwound_sum_of_single_split_is_one() {
        // root, then a split the sample follows with half the cover
        let mut path = PathState::new();
        path.extend(0, 1.0, 1.0, None);
        let mut child = PathState::child_of(&path, 1);
        child.extend(1, 0.5, 1.0, Some(2));
        assert_eq!(child.find(1, 2), Some(1));
        let w = child.unwound_sum(1, 1);
        assert!((w - 1.0).abs() < 1e-12, "{w}");
    }

    #[test]
    fn unwind_restores_previous_weights() {
        let mut path = PathState::new();
        path.extend(0, 1.0, 1.0, None);
        path.extend(1, 0.4, 1.0, Some(0));
        let before: Vec<f64> = (0..2).map(|i| path.get(i).pweight).collect();
        path.extend(2, 0.3, 0.0, Some(5));
        path.unwind(2, 2);
        for (i, w) in before.iter().enumerate() {
            assert!((path.get(i).pweight - w).abs() < 1e-12);
        }
        assert_eq!(path.get(1).feature, Some(0));
    }
}
