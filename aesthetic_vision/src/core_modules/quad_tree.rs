// THEORY:
// The quad-tree decomposer is the backbone of the engine. It recursively
// partitions an `IntensityField` into rectangular blocks until each block is
// either homogeneous enough or too small to split further. The number and the
// depth of the resulting leaves are a direct measure of how "busy" an image is,
// and the leaf layout is what the symmetry and self-similarity scorers compare.
//
// Key architectural principles:
// 1.  **Stopping rule**: a block splits only while its standard deviation is above
//     `min_std` AND its shorter side is above `min_size` (and, optionally, while it
//     is shallower than `max_depth`). Blocks thinner than 2 pixels never split.
// 2.  **Exact tiling**: children come from `Block::quadrants`, which floors the
//     top/left halves, so the four children always cover the parent exactly.
// 3.  **Arena, not pointers**: the tree is a flat `Vec<TreeNode>` in pre-order
//     (top-left, top-right, bottom-left, bottom-right), with child indices on
//     internal nodes. Identical inputs always produce identical node sequences.

use crate::core_modules::block::{Block, BlockStats};
use crate::core_modules::intensity_field::IntensityField;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Thresholds driving the split test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecompositionParams {
    /// A block splits only if its standard deviation is strictly above this.
    pub min_std: f64,
    /// A block splits only if its shorter side is strictly above this.
    pub min_size: u32,
    /// Optional cap on tree depth; the root is depth 0.
    pub max_depth: Option<u32>,
}

impl DecompositionParams {
    pub fn new(min_std: f64, min_size: u32) -> Self {
        Self {
            min_std,
            min_size,
            max_depth: None,
        }
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = Some(max_depth);
        self
    }
}

/// One node of the decomposition arena.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub block: Block,
    pub stats: BlockStats,
    pub depth: u32,
    /// Arena indices of the TL, TR, BL, BR children; `None` for leaves.
    pub children: Option<[usize; 4]>,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// A quad-tree over an intensity field, stored as a pre-order arena.
#[derive(Debug, Clone, PartialEq)]
pub struct DecompositionTree {
    nodes: Vec<TreeNode>,
    params: DecompositionParams,
}

impl DecompositionTree {
    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn params(&self) -> &DecompositionParams {
        &self.params
    }

    /// Leaves in pre-order.
    pub fn leaves(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter().filter(|node| node.is_leaf())
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    pub fn max_depth(&self) -> u32 {
        self.leaves().map(|leaf| leaf.depth).max().unwrap_or(0)
    }

    /// Set of leaf rectangles, for position-keyed lookups.
    pub fn leaf_blocks(&self) -> HashSet<Block> {
        self.leaves().map(|leaf| leaf.block).collect()
    }

    pub fn contains_leaf(&self, block: &Block) -> bool {
        self.leaves().any(|leaf| leaf.block == *block)
    }
}

/// Decomposes `field` with the given thresholds and no depth cap.
pub fn decompose(field: &IntensityField, min_std: f64, min_size: u32) -> DecompositionTree {
    decompose_with(field, &DecompositionParams::new(min_std, min_size))
}

/// Decomposes `field` according to `params`.
///
/// Degenerate inputs (an empty field, or `min_size` larger than the field)
/// yield a single root leaf instead of an error.
pub fn decompose_with(field: &IntensityField, params: &DecompositionParams) -> DecompositionTree {
    let mut nodes = Vec::new();
    evaluate(field, field.bounds(), 0, params, &mut nodes);
    DecompositionTree {
        nodes,
        params: *params,
    }
}

fn should_split(block: &Block, stats: &BlockStats, depth: u32, params: &DecompositionParams) -> bool {
    let depth_allows = params.max_depth.is_none_or(|max| depth < max);
    depth_allows && stats.std_dev > params.min_std && block.min_side() > params.min_size
}

/// Pushes `block` and, if it splits, its whole subtree. Returns the node's index.
fn evaluate(
    field: &IntensityField,
    block: Block,
    depth: u32,
    params: &DecompositionParams,
    nodes: &mut Vec<TreeNode>,
) -> usize {
    let stats = field.block_stats(&block);
    let index = nodes.len();
    nodes.push(TreeNode {
        block,
        stats,
        depth,
        children: None,
    });

    if !should_split(&block, &stats, depth, params) {
        return index;
    }
    // A 1-pixel-wide block has no quadrants; it stays a leaf.
    let Some(quadrants) = block.quadrants() else {
        return index;
    };

    let mut children = [0usize; 4];
    for (slot, quadrant) in children.iter_mut().zip(quadrants) {
        *slot = evaluate(field, quadrant, depth + 1, params, nodes);
    }
    nodes[index].children = Some(children);
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(size: u32, cell: u32) -> IntensityField {
        let values = (0..size * size)
            .map(|i| {
                let (x, y) = (i % size, i / size);
                if (x / cell + y / cell) % 2 == 0 { 0.0 } else { 255.0 }
            })
            .collect();
        IntensityField::from_values(size, size, values)
    }

    fn noise(width: u32, height: u32, seed: u64) -> IntensityField {
        let mut state = seed;
        let values = (0..width * height)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 33) % 256) as f64
            })
            .collect();
        IntensityField::from_values(width, height, values)
    }

    fn assert_exact_partition(field: &IntensityField, tree: &DecompositionTree) {
        let mut coverage = vec![0u8; (field.width() * field.height()) as usize];
        for leaf in tree.leaves() {
            for y in leaf.block.y..leaf.block.bottom() {
                for x in leaf.block.x..leaf.block.right() {
                    coverage[(y * field.width() + x) as usize] += 1;
                }
            }
        }
        assert!(coverage.iter().all(|&c| c == 1), "leaves must cover every pixel once");
        let area: u64 = tree.leaves().map(|leaf| leaf.block.area()).sum();
        assert_eq!(area, field.bounds().area());
    }

    #[test]
    fn uniform_field_is_a_single_leaf() {
        let field = IntensityField::from_values(64, 64, vec![128.0; 64 * 64]);
        let tree = decompose(&field, 10.0, 20);
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.root().block, field.bounds());
        assert!(tree.root().is_leaf());
    }

    #[test]
    fn leaves_partition_odd_sized_noise() {
        for (w, h) in [(37, 23), (1, 9), (64, 3), (101, 101)] {
            let field = noise(w, h, 7);
            let tree = decompose(&field, 3.0, 1);
            assert_exact_partition(&field, &tree);
        }
    }

    #[test]
    fn children_follow_parent_in_preorder() {
        let field = checkerboard(32, 4);
        let tree = decompose(&field, 5.0, 4);
        for (index, node) in tree.nodes().iter().enumerate() {
            if let Some(children) = node.children {
                assert_eq!(children[0], index + 1);
                for child in children {
                    assert_eq!(tree.nodes()[child].depth, node.depth + 1);
                    assert!(node.block.contains(&tree.nodes()[child].block));
                }
            }
        }
    }

    #[test]
    fn raising_min_std_never_adds_leaves() {
        let field = noise(96, 80, 42);
        let mut previous = usize::MAX;
        for min_std in [0.0, 5.0, 20.0, 60.0, 73.0, 200.0] {
            let count = decompose(&field, min_std, 2).leaf_count();
            assert!(count <= previous, "min_std {min_std} produced {count} > {previous}");
            previous = count;
        }
    }

    #[test]
    fn min_size_larger_than_field_gives_single_leaf() {
        let field = checkerboard(16, 1);
        assert_eq!(decompose(&field, 0.0, 100).leaf_count(), 1);
    }

    #[test]
    fn empty_field_gives_single_empty_leaf() {
        let field = IntensityField::from_values(0, 0, Vec::new());
        let tree = decompose(&field, 0.0, 1);
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.root().block.area(), 0);
    }

    #[test]
    fn max_depth_caps_the_tree() {
        let field = checkerboard(64, 1);
        let tree = decompose_with(&field, &DecompositionParams::new(0.0, 1).with_max_depth(2));
        assert_eq!(tree.max_depth(), 2);
        assert_eq!(tree.leaf_count(), 16);
    }

    #[test]
    fn repeated_decomposition_is_identical() {
        let field = noise(50, 70, 3);
        assert_eq!(decompose(&field, 12.0, 3), decompose(&field, 12.0, 3));
    }
}
