// THEORY:
// This file is the main entry point for the `aesthetic_vision` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the public
// API that will be exposed to external consumers (like the `aesthetic_probe` runner).
//
// The primary goal is to export the `AestheticPipeline` and its associated data
// structures (`AnalysisConfig`, `AnalysisReport`, etc.) as the clean, high-level
// interface for the whole engine. The building blocks in `core_modules` stay
// public so that callers can run a single scorer (for example only the
// quad-tree) on their own intensity fields.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;
pub mod report;

pub use config::{AnalysisConfig, AnalysisMethod, MethodPlan, MetricThresholds};
pub use core_modules::detectors::{DetectorError, FaceDetector, FaceSummary, TextDetector};
pub use core_modules::region::{BoundingBox, LayoutSummary, Region, RegionKind};
pub use error::{AnalysisError, Result};
pub use parallel_pipeline::{ParallelPipeline, analyze_concurrently};
pub use pipeline::{AestheticPipeline, analyze};
pub use report::{AnalysisReport, Measurement, ReportBuilder};

#[cfg(feature = "rustface")]
pub use core_modules::detectors::RustfaceDetector;
