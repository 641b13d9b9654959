// THEORY:
// The report is the single output of an analysis. It is written exactly once,
// through `ReportBuilder`, and is immutable afterwards.
//
// Key architectural principles:
// 1.  **Method-aware completeness**: the builder knows the `MethodPlan` it was
//     created for and refuses to `build()` until every metric that plan marks as
//     mandatory has been recorded. A missing component is a bug in the
//     orchestrator, reported as `IncompleteReport`, never a silent `null`.
// 2.  **Explicit unavailability**: detector-backed fields are `Measurement`s. A
//     detector that failed or was not supplied yields `Unavailable { reason }`,
//     which is distinguishable from "zero faces found".
// 3.  **Serializable**: the report is plain serde data for callers that ship it
//     elsewhere as JSON.

use crate::config::{AnalysisMethod, MethodPlan};
use crate::core_modules::color_metrics::{Brightness, ColorShare, Colorfulness};
use crate::core_modules::complexity::ComplexityMetrics;
use crate::core_modules::detectors::FaceSummary;
use crate::core_modules::region::LayoutSummary;
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// A value that a capability may fail to provide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Measurement<T> {
    Available { value: T },
    Unavailable { reason: String },
}

impl<T> Measurement<T> {
    pub fn available(value: T) -> Self {
        Measurement::Available { value }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Measurement::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Measurement::Available { value } => Some(value),
            Measurement::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Measurement::Available { .. })
    }
}

/// Every metric of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub method: AnalysisMethod,
    /// (width, height) of the image the components actually saw.
    pub working_size: (u32, u32),
    pub brightness: Brightness,
    pub colorfulness: Colorfulness,
    pub color_distribution: Option<Vec<ColorShare>>,
    pub faces: Measurement<FaceSummary>,
    /// Number of text characters found in the whole image.
    pub text: Measurement<usize>,
    pub complexity: ComplexityMetrics,
    /// In [0, 100].
    pub symmetry: f64,
    /// In [0, 1]; present for the complete method only.
    pub self_similarity: Option<f64>,
    pub layout: Option<LayoutSummary>,
}

/// Write-once accumulator for an [`AnalysisReport`].
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    method: AnalysisMethod,
    plan: MethodPlan,
    working_size: (u32, u32),
    brightness: Option<Brightness>,
    colorfulness: Option<Colorfulness>,
    color_distribution: Option<Vec<ColorShare>>,
    faces: Option<Measurement<FaceSummary>>,
    text: Option<Measurement<usize>>,
    complexity: Option<ComplexityMetrics>,
    symmetry: Option<f64>,
    self_similarity: Option<f64>,
    layout: Option<LayoutSummary>,
}

impl ReportBuilder {
    pub fn new(method: AnalysisMethod, working_size: (u32, u32)) -> Self {
        Self {
            method,
            plan: method.plan(),
            working_size,
            brightness: None,
            colorfulness: None,
            color_distribution: None,
            faces: None,
            text: None,
            complexity: None,
            symmetry: None,
            self_similarity: None,
            layout: None,
        }
    }

    pub fn plan(&self) -> MethodPlan {
        self.plan
    }

    pub fn brightness(mut self, value: Brightness) -> Self {
        self.brightness = Some(value);
        self
    }

    pub fn colorfulness(mut self, value: Colorfulness) -> Self {
        self.colorfulness = Some(value);
        self
    }

    pub fn color_distribution(mut self, value: Vec<ColorShare>) -> Self {
        self.color_distribution = Some(value);
        self
    }

    pub fn faces(mut self, value: Measurement<FaceSummary>) -> Self {
        self.faces = Some(value);
        self
    }

    pub fn text(mut self, value: Measurement<usize>) -> Self {
        self.text = Some(value);
        self
    }

    pub fn complexity(mut self, value: ComplexityMetrics) -> Self {
        self.complexity = Some(value);
        self
    }

    pub fn symmetry(mut self, value: f64) -> Self {
        self.symmetry = Some(value);
        self
    }

    pub fn self_similarity(mut self, value: f64) -> Self {
        self.self_similarity = Some(value);
        self
    }

    pub fn layout(mut self, value: LayoutSummary) -> Self {
        self.layout = Some(value);
        self
    }

    /// Finishes the report, failing if the plan's mandatory metrics are missing.
    pub fn build(self) -> Result<AnalysisReport> {
        let plan = self.plan;
        let brightness = require(self.brightness, "brightness")?;
        let colorfulness = require(self.colorfulness, "colorfulness")?;
        let complexity = require(self.complexity, "complexity")?;
        let symmetry = require(self.symmetry, "symmetry")?;

        let (faces, text) = if plan.runs_external_detectors {
            (require(self.faces, "faces")?, require(self.text, "text")?)
        } else {
            (
                self.faces
                    .unwrap_or_else(|| Measurement::unavailable("not run by this method")),
                self.text
                    .unwrap_or_else(|| Measurement::unavailable("not run by this method")),
            )
        };

        if plan.runs_self_similarity && self.self_similarity.is_none() {
            return Err(AnalysisError::IncompleteReport {
                metric: "self_similarity",
            });
        }
        if plan.runs_region_layout && self.layout.is_none() {
            return Err(AnalysisError::IncompleteReport { metric: "layout" });
        }
        if plan.runs_color_palette && self.color_distribution.is_none() {
            return Err(AnalysisError::IncompleteReport {
                metric: "color_distribution",
            });
        }

        Ok(AnalysisReport {
            method: self.method,
            working_size: self.working_size,
            brightness,
            colorfulness,
            color_distribution: self.color_distribution,
            faces,
            text,
            complexity,
            symmetry,
            self_similarity: self.self_similarity,
            layout: self.layout,
        })
    }
}

fn require<T>(value: Option<T>, metric: &'static str) -> Result<T> {
    value.ok_or(AnalysisError::IncompleteReport { metric })
}
