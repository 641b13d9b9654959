//! Visual complexity counters derived from a quad-tree decomposition.

use crate::core_modules::quad_tree::DecompositionTree;
use serde::{Deserialize, Serialize};

/// Block-count complexity of one decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityMetrics {
    /// Number of leaves: more splitting means a busier image.
    pub leaf_count: u64,
    /// Sum of `depth_weight(depth)` over all leaves.
    pub depth_weighted_count: u64,
}

/// Weight of a leaf at `depth`; a root leaf weighs 1 and every level adds 1.
///
/// Fixed so that scores stay comparable between runs.
pub const fn depth_weight(depth: u32) -> u64 {
    depth as u64 + 1
}

pub fn score(tree: &DecompositionTree) -> ComplexityMetrics {
    tree.leaves().fold(
        ComplexityMetrics {
            leaf_count: 0,
            depth_weighted_count: 0,
        },
        |acc, leaf| ComplexityMetrics {
            leaf_count: acc.leaf_count + 1,
            depth_weighted_count: acc.depth_weighted_count + depth_weight(leaf.depth),
        },
    )
}
