//! TreeSHAP value computation.
//!
//! Exact Shapley values of a tree ensemble in polynomial time, using the
//! node covers recorded at training time as the background distribution.

mod path;
mod tree;
mod values;

pub use tree::TreeExplainer;
pub use values::{ClassAttribution, ShapValues};
