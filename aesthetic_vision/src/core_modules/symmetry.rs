// THEORY:
// Left-right symmetry is measured by decomposing an image and its horizontal
// mirror with the same thresholds and comparing the two trees position by
// position. A perfectly mirror-symmetric image produces two identical trees
// over identical intensities.
//
// The two trees are not isomorphic in general, so the comparison is keyed by
// rectangle, never by leaf index. For every leaf of either tree we ask:
// 1.  **Alignment**: is the same rectangle also a leaf of the other tree?
// 2.  **Intensity**: how far apart are the two fields' means over that rectangle?
//
// Dissimilarity D = ALIGNMENT_WEIGHT * (1 - aligned_fraction)
//                 + INTENSITY_WEIGHT * min(1, mean_abs_difference / INTENSITY_DISCREPANCY_SCALE)
// Score = 100 * (1 - D), clamped to [0, 100].

use crate::core_modules::block::Block;
use crate::core_modules::intensity_field::IntensityField;
use crate::core_modules::quad_tree::{DecompositionParams, DecompositionTree, decompose_with};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const ALIGNMENT_WEIGHT: f64 = 0.5;
pub const INTENSITY_WEIGHT: f64 = 0.5;
/// Mean gray-level difference at which the intensity term saturates.
pub const INTENSITY_DISCREPANCY_SCALE: f64 = 64.0;

/// The score together with the two terms it was built from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymmetryBreakdown {
    /// Share of leaves (both trees) whose rectangle is also a leaf of the other tree.
    pub aligned_fraction: f64,
    /// Area-weighted mean absolute difference of block means, in gray levels.
    pub mean_abs_difference: f64,
    /// Symmetry in [0, 100]; 100 means a perfect mirror.
    pub score: f64,
}

#[derive(Default)]
struct Tally {
    leaves: u64,
    aligned: u64,
    weighted_difference: f64,
    area: f64,
}

/// Symmetry score in [0, 100].
pub fn score(field: &IntensityField, min_std: f64, min_size: u32) -> f64 {
    analyze(field, &DecompositionParams::new(min_std, min_size)).score
}

pub fn analyze(field: &IntensityField, params: &DecompositionParams) -> SymmetryBreakdown {
    analyze_tree(field, &decompose_with(field, params), params)
}

/// Like [`analyze`], reusing `original_tree`, which must be the decomposition
/// of `field` under `params`. Only the mirror is decomposed here.
pub fn analyze_tree(
    field: &IntensityField,
    original_tree: &DecompositionTree,
    params: &DecompositionParams,
) -> SymmetryBreakdown {
    let mirror = field.mirrored();
    let mirror_tree = decompose_with(&mirror, params);

    let mut tally = Tally::default();
    compare_into(&mut tally, original_tree, &mirror_tree.leaf_blocks(), &mirror);
    compare_into(&mut tally, &mirror_tree, &original_tree.leaf_blocks(), field);

    let aligned_fraction = if tally.leaves == 0 {
        1.0
    } else {
        tally.aligned as f64 / tally.leaves as f64
    };
    let mean_abs_difference = if tally.area > 0.0 {
        tally.weighted_difference / tally.area
    } else {
        0.0
    };

    SymmetryBreakdown {
        aligned_fraction,
        mean_abs_difference,
        score: to_score(aligned_fraction, mean_abs_difference),
    }
}

/// Maps the two discrepancy terms onto [0, 100]; monotonically decreasing in both.
pub fn to_score(aligned_fraction: f64, mean_abs_difference: f64) -> f64 {
    let misalignment = (1.0 - aligned_fraction).clamp(0.0, 1.0);
    let intensity = (mean_abs_difference / INTENSITY_DISCREPANCY_SCALE).clamp(0.0, 1.0);
    let dissimilarity = ALIGNMENT_WEIGHT * misalignment + INTENSITY_WEIGHT * intensity;
    (100.0 * (1.0 - dissimilarity)).clamp(0.0, 100.0)
}

fn compare_into(
    tally: &mut Tally,
    tree: &DecompositionTree,
    other_leaves: &HashSet<Block>,
    other_field: &IntensityField,
) {
    for leaf in tree.leaves() {
        tally.leaves += 1;
        if other_leaves.contains(&leaf.block) {
            tally.aligned += 1;
        }
        let area = leaf.block.area() as f64;
        let other_mean = other_field.block_stats(&leaf.block).mean;
        tally.weighted_difference += area * (leaf.stats.mean - other_mean).abs();
        tally.area += area;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f64) -> IntensityField {
        let values = (0..width * height).map(|i| f(i % width, i / width)).collect();
        IntensityField::from_values(width, height, values)
    }

    #[test]
    fn uniform_field_is_perfectly_symmetric() {
        let field = field_from_fn(64, 64, |_, _| 128.0);
        assert_eq!(score(&field, 10.0, 20), 100.0);
    }

    #[test]
    fn mirror_symmetric_pattern_scores_100() {
        let width = 90;
        let field = field_from_fn(width, 40, |x, y| {
            let folded = x.min(width - 1 - x);
            ((folded * 7 + y * 3) % 256) as f64
        });
        let breakdown = analyze(&field, &DecompositionParams::new(5.0, 4));
        assert!((breakdown.score - 100.0).abs() < 1e-9, "{breakdown:?}");
        assert_eq!(breakdown.aligned_fraction, 1.0);
    }

    #[test]
    fn half_black_half_white_is_strongly_asymmetric() {
        let field = field_from_fn(64, 64, |x, _| if x < 32 { 0.0 } else { 255.0 });
        let breakdown = analyze(&field, &DecompositionParams::new(5.0, 4));
        assert!(breakdown.score < 60.0, "{breakdown:?}");
        assert!(breakdown.score >= 0.0);
        assert!(breakdown.mean_abs_difference > 200.0);
    }

    #[test]
    fn score_stays_in_range_for_noise() {
        let mut state = 99u64;
        let field = field_from_fn(73, 41, |_, _| {
            state = state.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
            ((state >> 40) % 256) as f64
        });
        let value = score(&field, 8.0, 2);
        assert!((0.0..=100.0).contains(&value));
    }

    #[test]
    fn prebuilt_tree_gives_the_same_breakdown() {
        let field = field_from_fn(96, 64, |x, y| ((x * x + 5 * y) % 256) as f64);
        let params = DecompositionParams::new(8.0, 4);
        let tree = decompose_with(&field, &params);
        assert_eq!(analyze_tree(&field, &tree, &params), analyze(&field, &params));
    }

    #[test]
    fn score_mapping_is_monotonic() {
        assert_eq!(to_score(1.0, 0.0), 100.0);
        assert!(to_score(0.9, 0.0) > to_score(0.5, 0.0));
        assert!(to_score(1.0, 10.0) > to_score(1.0, 30.0));
        assert_eq!(to_score(0.0, 1_000.0), 0.0);
    }
}
