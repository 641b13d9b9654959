// THEORY:
// Self-similarity asks whether an image looks structurally the same at
// different scales. The field is halved repeatedly (scale 0 is the original,
// scale k is halved k times) and every scale is decomposed with the same
// thresholds. Each scale is summarised by a profile, and consecutive profiles
// are compared with histogram intersection.
//
// Profile of one scale:
// - depth profile: share of the image area covered by leaves at each depth
// - intensity profile: area-weighted histogram of leaf means (16 bins over 0..=255)
//
// The split rule is driven by contrast, not by pixel counts, so structure that
// repeats across scales keeps its depth profile when the image is halved. The
// profiles are therefore compared depth for depth. Detail that only exists at
// the pixel level (noise, one-pixel patterns) disappears or moves up a level on
// halving, and the depth term drops.
//
// Aggregation:
// 1.  A pair where both scales are a single leaf carries no structure and is
//     left out. If every pair is like that the image is flat at every scale and
//     scores 1.
// 2.  The remaining pairs are averaged with weight 2^-k for the pair starting at
//     scale k, so the finer scales, where the image has the most detail, decide.
// 3.  Halving stops once it no longer shrinks the field (1x1). Every later scale
//     would be identical, so `max_level` only bounds the work.

use crate::core_modules::intensity_field::IntensityField;
use crate::core_modules::quad_tree::{DecompositionParams, DecompositionTree, decompose_with};
use serde::{Deserialize, Serialize};

pub const INTENSITY_BINS: usize = 16;
const INTENSITY_RANGE: f64 = 256.0;

/// Comparison of scale `level` with scale `level + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalePair {
    pub level: u32,
    /// Mean of the depth and intensity intersections, in [0, 1].
    pub similarity: f64,
    /// False when both scales decompose to a single leaf.
    pub informative: bool,
}

/// Per-pair similarities and the weighted score built from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfSimilarityBreakdown {
    /// Number of scales actually decomposed, including scale 0.
    pub scales: usize,
    pub pairs: Vec<ScalePair>,
    /// In [0, 1].
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct ScaleProfile {
    depth_area: Vec<f64>,
    intensity: [f64; INTENSITY_BINS],
    single_leaf: bool,
}

/// Self-similarity in [0, 1] over at most `max_level` consecutive scale pairs.
pub fn score(field: &IntensityField, min_std: f64, min_size: u32, max_level: u32) -> f64 {
    analyze(field, &DecompositionParams::new(min_std, min_size), max_level).score
}

pub fn analyze(
    field: &IntensityField,
    params: &DecompositionParams,
    max_level: u32,
) -> SelfSimilarityBreakdown {
    let levels = max_level.max(1);

    let mut scale = field.clone();
    let mut profiles = vec![profile(&decompose_with(&scale, params))];
    for _ in 0..levels {
        let next = scale.downsampled();
        if (next.width(), next.height()) == (scale.width(), scale.height()) {
            break;
        }
        scale = next;
        profiles.push(profile(&decompose_with(&scale, params)));
    }

    let pairs: Vec<ScalePair> = profiles
        .windows(2)
        .zip(0u32..)
        .map(|(pair, level)| ScalePair {
            level,
            similarity: compare(&pair[0], &pair[1]),
            informative: !(pair[0].single_leaf && pair[1].single_leaf),
        })
        .collect();

    SelfSimilarityBreakdown {
        scales: profiles.len(),
        score: weighted_score(&pairs),
        pairs,
    }
}

fn profile(tree: &DecompositionTree) -> ScaleProfile {
    let total_area = tree.root().block.area() as f64;
    let mut intensity = [0.0; INTENSITY_BINS];

    if total_area == 0.0 {
        intensity[0] = 1.0;
        return ScaleProfile {
            depth_area: vec![1.0],
            intensity,
            single_leaf: true,
        };
    }

    let mut depth_area = vec![0.0; tree.max_depth() as usize + 1];
    for leaf in tree.leaves() {
        let share = leaf.block.area() as f64 / total_area;
        depth_area[leaf.depth as usize] += share;
        intensity[intensity_bin(leaf.stats.mean)] += share;
    }
    ScaleProfile {
        depth_area,
        intensity,
        single_leaf: tree.root().is_leaf(),
    }
}

fn intensity_bin(mean: f64) -> usize {
    let bin = (mean / INTENSITY_RANGE * INTENSITY_BINS as f64).floor();
    (bin.max(0.0) as usize).min(INTENSITY_BINS - 1)
}

/// Histogram intersection; missing trailing entries count as zero.
fn intersection(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x.min(*y)).sum()
}

fn compare(finer: &ScaleProfile, coarser: &ScaleProfile) -> f64 {
    let depth = intersection(&finer.depth_area, &coarser.depth_area);
    let intensity = intersection(&finer.intensity, &coarser.intensity);
    (0.5 * (depth + intensity)).clamp(0.0, 1.0)
}

fn pair_weight(level: u32) -> f64 {
    0.5f64.powi(level.min(1023) as i32)
}

fn weighted_score(pairs: &[ScalePair]) -> f64 {
    let (weighted, total) = pairs
        .iter()
        .filter(|pair| pair.informative)
        .fold((0.0, 0.0), |(weighted, total), pair| {
            let weight = pair_weight(pair.level);
            (weighted + weight * pair.similarity, total + weight)
        });
    if total == 0.0 {
        1.0
    } else {
        (weighted / total).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f64) -> IntensityField {
        let values = (0..width * height).map(|i| f(i % width, i / width)).collect();
        IntensityField::from_values(width, height, values)
    }

    fn noise(size: u32, seed: u64) -> IntensityField {
        let mut state = seed;
        field_from_fn(size, size, |_, _| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((state >> 33) % 256) as f64
        })
    }

    fn params() -> DecompositionParams {
        DecompositionParams::new(10.0, 4)
    }

    #[test]
    fn uniform_field_is_fully_self_similar() {
        let field = field_from_fn(64, 64, |_, _| 90.0);
        let breakdown = analyze(&field, &DecompositionParams::new(10.0, 20), 4);
        assert_eq!(breakdown.pairs.len(), 4);
        assert!(breakdown.pairs.iter().all(|pair| !pair.informative));
        assert_eq!(breakdown.score, 1.0);
    }

    #[test]
    fn scale_invariant_halves_score_one() {
        let field = field_from_fn(256, 256, |x, _| if x < 128 { 0.0 } else { 255.0 });
        let breakdown = analyze(&field, &params(), 4);
        assert_eq!(breakdown.scales, 5);
        for pair in &breakdown.pairs {
            assert!(pair.informative);
            assert!((pair.similarity - 1.0).abs() < 1e-12, "{pair:?}");
        }
        assert!((breakdown.score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn repeating_structure_outscores_noise() {
        let halves = field_from_fn(256, 256, |x, _| if x < 128 { 0.0 } else { 255.0 });
        let halves_score = score(&halves, 10.0, 4, 4);
        let noise_score = score(&noise(256, 9), 10.0, 4, 4);
        assert!(
            halves_score > noise_score + 0.25,
            "halves {halves_score} vs noise {noise_score}"
        );
    }

    #[test]
    fn pixel_checker_that_flattens_is_not_maximal() {
        let checker = field_from_fn(256, 256, |x, y| if (x + y) % 2 == 0 { 0.0 } else { 255.0 });
        let breakdown = analyze(&checker, &params(), 4);
        // Every coarser scale is flat gray, so only the first pair counts.
        assert!(breakdown.pairs[0].informative);
        assert!(breakdown.pairs[1..].iter().all(|pair| !pair.informative));
        assert!(breakdown.score <= 0.5 + 1e-12, "{breakdown:?}");

        let halves = field_from_fn(256, 256, |x, _| if x < 128 { 0.0 } else { 255.0 });
        assert!(score(&halves, 10.0, 4, 4) > breakdown.score);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let field = field_from_fn(128, 96, |x, y| ((x * x + 3 * y) % 251) as f64);
        let first = score(&field, 10.0, 4, 4);
        let second = score(&field, 10.0, 4, 4);
        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn halving_stops_at_one_pixel() {
        let field = field_from_fn(5, 3, |x, _| (x * 50) as f64);
        let breakdown = analyze(&field, &DecompositionParams::new(1.0, 20), 6);
        // 5x3 -> 2x1 -> 1x1
        assert_eq!(breakdown.scales, 3);
        assert_eq!(breakdown.pairs.len(), 2);
        assert!((0.0..=1.0).contains(&breakdown.score));
    }

    #[test]
    fn huge_max_level_is_bounded_by_the_field() {
        let field = field_from_fn(8, 8, |x, y| ((x * 31 + y * 17) % 256) as f64);
        let breakdown = analyze(&field, &DecompositionParams::new(10.0, 20), u32::MAX);
        // 8 -> 4 -> 2 -> 1
        assert_eq!(breakdown.scales, 4);
        assert!((0.0..=1.0).contains(&breakdown.score));
    }

    #[test]
    fn score_is_bounded_for_busy_images() {
        let field = field_from_fn(200, 120, |x, y| if (x / 3 + y / 7) % 2 == 0 { 10.0 } else { 240.0 });
        let value = score(&field, 5.0, 2, 4);
        assert!((0.0..=1.0).contains(&value), "{value}");
    }

    #[test]
    fn finer_pairs_weigh_more() {
        let pairs = [
            ScalePair { level: 0, similarity: 0.2, informative: true },
            ScalePair { level: 1, similarity: 0.8, informative: true },
            ScalePair { level: 2, similarity: 1.0, informative: false },
        ];
        // (1 * 0.2 + 0.5 * 0.8) / 1.5
        assert!((weighted_score(&pairs) - 0.4).abs() < 1e-12);
    }
}
