// Leaves first: each module only depends on the ones above it.
pub mod pixel;
pub mod block;
pub mod intensity_field;
pub mod quad_tree;
pub mod complexity;
pub mod symmetry;
pub mod self_similarity;
pub mod region;
pub mod detectors;
pub mod region_classifier;
pub mod color_metrics;
