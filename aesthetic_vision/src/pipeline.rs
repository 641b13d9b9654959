// THEORY:
// The `pipeline` module is the top-level API of the aesthetics engine. It wraps
// the full stack (intensity field, quad-tree, scorers, region classifier, color
// metrics, detectors) behind one call: hand it an image, get back a report.
//
// Key architectural principles:
// 1.  **Resize once, upstream**: the working image is produced a single time and
//     every component sees exactly that raster. No component resizes on its own.
// 2.  **Method table, not ad-hoc flags**: which optional components run is read
//     from `AnalysisMethod::plan()`; the report builder checks the same plan.
// 3.  **Graceful collaborators**: detectors are optional capabilities. Failure
//     degrades the matching report field to `Unavailable` unless the config says
//     the detector is required, in which case the whole analysis fails.
// 4.  **Stateless**: the pipeline holds configuration and detector handles only.
//     It is `Clone` and can be shared freely across threads and tasks.
// 5.  **One tree per thresholds**: the working image is decomposed once and the
//     tree is handed to complexity and symmetry. Symmetry decomposes again only
//     when it has its own thresholds.

use crate::config::{AnalysisConfig, MetricThresholds};
use crate::core_modules::color_metrics;
use crate::core_modules::complexity::{self, ComplexityMetrics};
use crate::core_modules::detectors::{FaceDetector, FaceSummary, TextDetector};
use crate::core_modules::intensity_field::IntensityField;
use crate::core_modules::quad_tree::{DecompositionTree, decompose_with};
use crate::core_modules::region::LayoutSummary;
use crate::core_modules::region_classifier;
use crate::core_modules::self_similarity;
use crate::core_modules::symmetry;
use crate::error::{AnalysisError, Result};
use crate::report::{AnalysisReport, Measurement, ReportBuilder};
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const FACE_DETECTOR: &str = "face_detector";
pub const TEXT_DETECTOR: &str = "text_detector";

/// The main entry point of the engine.
#[derive(Clone)]
pub struct AestheticPipeline {
    config: AnalysisConfig,
    face_detector: Option<Arc<dyn FaceDetector>>,
    text_detector: Option<Arc<dyn TextDetector>>,
}

impl std::fmt::Debug for AestheticPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AestheticPipeline")
            .field("config", &self.config)
            .field("face_detector", &self.face_detector.is_some())
            .field("text_detector", &self.text_detector.is_some())
            .finish()
    }
}

impl AestheticPipeline {
    /// Validates `config` and builds a pipeline without detectors.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            face_detector: None,
            text_detector: None,
        })
    }

    pub fn with_face_detector(mut self, detector: Arc<dyn FaceDetector>) -> Self {
        self.face_detector = Some(detector);
        self
    }

    pub fn with_text_detector(mut self, detector: Arc<dyn TextDetector>) -> Self {
        self.text_detector = Some(detector);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Decodes `bytes` (any format the `image` crate reads) and analyzes them.
    pub fn analyze_bytes(&self, bytes: &[u8]) -> Result<AnalysisReport> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| AnalysisError::decode("could not decode image bytes", e))?;
        self.analyze(&image)
    }

    pub fn analyze_path(&self, path: impl AsRef<Path>) -> Result<AnalysisReport> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|e| AnalysisError::decode(format!("could not open {}", path.display()), e))?;
        self.analyze(&image)
    }

    pub fn analyze(&self, image: &DynamicImage) -> Result<AnalysisReport> {
        // Stage 1: Working image (the only resize)
        let working = self.working_image(image)?;
        let plan = self.config.method.plan();
        info!(
            method = %self.config.method,
            width = working.width(),
            height = working.height(),
            "starting aesthetic analysis"
        );
        let mut builder = ReportBuilder::new(self.config.method, working.dimensions());

        // Stage 2: Pixel statistics
        builder = builder
            .brightness(color_metrics::brightness(&working))
            .colorfulness(color_metrics::colorfulness(&working));
        if plan.runs_color_palette {
            builder = builder.color_distribution(color_metrics::color_distribution(&working));
        }

        // Stage 3: Structural decomposition
        let field = IntensityField::from_rgb(&working);
        let tree = self.shared_tree(&field);
        builder = builder
            .complexity(self.complexity(&tree))
            .symmetry(self.symmetry(&field, &tree));
        if plan.runs_self_similarity {
            builder = builder.self_similarity(self.self_similarity(&field));
        }

        // Stage 4: Layout
        if plan.runs_region_layout {
            builder = builder.layout(self.layout(&working));
        }

        // Stage 5: External detectors
        if plan.runs_external_detectors {
            builder = builder
                .faces(self.detect_faces(&working)?)
                .text(self.detect_text(&working)?);
        }

        builder.build()
    }

    /// Converts to RGB and resizes to the target size when configured.
    pub fn working_image(&self, image: &DynamicImage) -> Result<RgbImage> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(AnalysisError::invalid_input(format!(
                "image has a zero dimension ({width}x{height})"
            )));
        }
        let rgb = image.to_rgb8();
        let (target_width, target_height) = self.config.target_size;
        if self.config.resize && (width, height) != (target_width, target_height) {
            debug!(width, height, target_width, target_height, "resizing input");
            return Ok(imageops::resize(
                &rgb,
                target_width,
                target_height,
                FilterType::CatmullRom,
            ));
        }
        Ok(rgb)
    }

    /// The quad-tree of a working image under `thresholds` and this pipeline's depth cap.
    pub fn decompose(&self, working: &RgbImage, thresholds: MetricThresholds) -> DecompositionTree {
        decompose_with(
            &IntensityField::from_rgb(working),
            &self.config.params_for(thresholds),
        )
    }

    /// The tree complexity and symmetry share.
    pub(crate) fn shared_tree(&self, field: &IntensityField) -> DecompositionTree {
        decompose_with(field, &self.config.decomposition_params())
    }

    pub(crate) fn complexity(&self, tree: &DecompositionTree) -> ComplexityMetrics {
        let metrics = complexity::score(tree);
        debug!(
            leaf_count = metrics.leaf_count,
            depth_weighted_count = metrics.depth_weighted_count,
            max_depth = tree.max_depth(),
            "complexity measured"
        );
        metrics
    }

    /// `tree` is the shared decomposition of `field`.
    pub(crate) fn symmetry(&self, field: &IntensityField, tree: &DecompositionTree) -> f64 {
        let params = self.config.symmetry_params();
        let breakdown = if params == self.config.decomposition_params() {
            symmetry::analyze_tree(field, tree, &params)
        } else {
            symmetry::analyze(field, &params)
        };
        debug!(
            score = breakdown.score,
            aligned_fraction = breakdown.aligned_fraction,
            mean_abs_difference = breakdown.mean_abs_difference,
            "symmetry measured"
        );
        breakdown.score
    }

    pub(crate) fn self_similarity(&self, field: &IntensityField) -> f64 {
        let breakdown = self_similarity::analyze(
            field,
            &self.config.decomposition_params(),
            self.config.max_level,
        );
        debug!(
            score = breakdown.score,
            scales = breakdown.scales,
            pairs = ?breakdown.pairs,
            "self-similarity measured"
        );
        breakdown.score
    }

    pub(crate) fn layout(&self, working: &RgbImage) -> LayoutSummary {
        let regions = region_classifier::classify_with(
            working,
            &self.config.region_params(),
            self.text_detector.as_deref(),
        );
        let summary = LayoutSummary::from_regions(regions);
        debug!(
            regions = summary.region_count,
            text = summary.text_count,
            image = summary.image_count,
            ratio = summary.text_image_ratio,
            "layout classified"
        );
        summary
    }

    pub(crate) fn detect_faces(&self, working: &RgbImage) -> Result<Measurement<FaceSummary>> {
        let required = self.config.require_face_detection;
        let Some(detector) = &self.face_detector else {
            return degrade(FACE_DETECTOR, required, "no face detector configured".to_string());
        };
        match detector.detect_faces(working) {
            Ok(faces) => {
                debug!(num_faces = faces.len(), "faces detected");
                Ok(Measurement::available(FaceSummary::from(faces)))
            }
            Err(err) => degrade(FACE_DETECTOR, required, err.to_string()),
        }
    }

    pub(crate) fn detect_text(&self, working: &RgbImage) -> Result<Measurement<usize>> {
        let required = self.config.require_text_detection;
        let Some(detector) = &self.text_detector else {
            return degrade(TEXT_DETECTOR, required, "no text detector configured".to_string());
        };
        match detector.detect_text(working) {
            Ok(characters) => {
                debug!(characters, "text detected");
                Ok(Measurement::available(characters))
            }
            Err(err) => degrade(TEXT_DETECTOR, required, err.to_string()),
        }
    }
}

/// One-shot analysis without detectors.
pub fn analyze(image: &DynamicImage, config: &AnalysisConfig) -> Result<AnalysisReport> {
    AestheticPipeline::new(config.clone())?.analyze(image)
}

fn degrade<T>(collaborator: &'static str, required: bool, message: String) -> Result<Measurement<T>> {
    if required {
        return Err(AnalysisError::DependencyFailure {
            collaborator,
            message,
        });
    }
    warn!(collaborator, %message, "detector unavailable, continuing without it");
    Ok(Measurement::unavailable(message))
}
