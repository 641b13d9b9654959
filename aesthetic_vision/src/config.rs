//! Analysis configuration.
//!
//! `AnalysisConfig` carries every tunable of one analysis. It deserializes from
//! JSON with missing fields taking their defaults, so a config file only needs
//! to name what it changes.

use crate::core_modules::quad_tree::DecompositionParams;
use crate::core_modules::region_classifier::RegionParams;
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Which set of metrics an analysis computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMethod {
    Fast,
    #[default]
    Complete,
}

/// The components a method runs beyond the always-on metrics
/// (brightness, colorfulness, complexity, symmetry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodPlan {
    pub runs_self_similarity: bool,
    pub runs_external_detectors: bool,
    pub runs_region_layout: bool,
    pub runs_color_palette: bool,
}

impl AnalysisMethod {
    pub fn plan(self) -> MethodPlan {
        match self {
            AnalysisMethod::Fast => MethodPlan {
                runs_self_similarity: false,
                runs_external_detectors: true,
                runs_region_layout: false,
                runs_color_palette: false,
            },
            AnalysisMethod::Complete => MethodPlan {
                runs_self_similarity: true,
                runs_external_detectors: true,
                runs_region_layout: true,
                runs_color_palette: true,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisMethod::Fast => "fast",
            AnalysisMethod::Complete => "complete",
        }
    }
}

impl fmt::Display for AnalysisMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisMethod {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(AnalysisMethod::Fast),
            "complete" => Ok(AnalysisMethod::Complete),
            other => Err(AnalysisError::invalid_parameter("method", other)),
        }
    }
}

/// Split thresholds for one metric that should not use the shared ones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricThresholds {
    pub min_std: f64,
    pub min_size: u32,
}

impl MetricThresholds {
    /// Symmetry measured on its own, outside a full analysis.
    pub const STANDALONE_SYMMETRY: Self = Self {
        min_std: 5.0,
        min_size: 20,
    };
    /// Leaf outlines drawn for inspection.
    pub const QUADTREE_OVERLAY: Self = Self {
        min_std: 15.0,
        min_size: 40,
    };

    pub fn new(min_std: f64, min_size: u32) -> Self {
        Self { min_std, min_size }
    }

    fn validate(&self, prefix: &str) -> Result<()> {
        if !self.min_std.is_finite() || self.min_std < 0.0 {
            return Err(AnalysisError::invalid_parameter(
                format!("{prefix}.min_std"),
                self.min_std,
            ));
        }
        if self.min_size < 1 {
            return Err(AnalysisError::invalid_parameter(
                format!("{prefix}.min_size"),
                self.min_size,
            ));
        }
        Ok(())
    }
}

/// Tunables for one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub method: AnalysisMethod,
    /// Resize to `target_size` before any component runs.
    pub resize: bool,
    /// (width, height) of the working image when `resize` is set.
    pub target_size: (u32, u32),
    /// Blocks with a standard deviation at or below this stay whole.
    pub min_std: f64,
    /// Blocks whose shorter side is at or below this stay whole.
    pub min_size: u32,
    /// Number of halvings compared by self-similarity.
    pub max_level: u32,
    /// Smallest layout region kept, in pixels.
    pub min_area: u64,
    pub max_depth: Option<u32>,
    /// Symmetry-only thresholds; `None` reuses `min_std` and `min_size`.
    pub symmetry_thresholds: Option<MetricThresholds>,
    /// Fail the analysis instead of reporting faces as unavailable.
    pub require_face_detection: bool,
    /// Fail the analysis instead of reporting text as unavailable.
    pub require_text_detection: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            method: AnalysisMethod::Complete,
            resize: true,
            target_size: (600, 400),
            min_std: 10.0,
            min_size: 20,
            max_level: 4,
            min_area: 100,
            max_depth: None,
            symmetry_thresholds: None,
            require_face_detection: false,
            require_text_detection: false,
        }
    }
}

impl AnalysisConfig {
    pub fn with_method(mut self, method: AnalysisMethod) -> Self {
        self.method = method;
        self
    }

    pub fn without_resize(mut self) -> Self {
        self.resize = false;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Checks every tunable against its documented range.
    pub fn validate(&self) -> Result<()> {
        if !self.min_std.is_finite() || self.min_std < 0.0 {
            return Err(AnalysisError::invalid_parameter("min_std", self.min_std));
        }
        if self.min_size < 1 {
            return Err(AnalysisError::invalid_parameter("min_size", self.min_size));
        }
        if let Some(thresholds) = &self.symmetry_thresholds {
            thresholds.validate("symmetry_thresholds")?;
        }
        if self.max_level < 1 {
            return Err(AnalysisError::invalid_parameter("max_level", self.max_level));
        }
        let (width, height) = self.target_size;
        if width < 1 || height < 1 {
            return Err(AnalysisError::invalid_parameter(
                "target_size",
                format!("{width}x{height}"),
            ));
        }
        Ok(())
    }

    pub fn thresholds(&self) -> MetricThresholds {
        MetricThresholds::new(self.min_std, self.min_size)
    }

    pub fn decomposition_params(&self) -> DecompositionParams {
        self.params_for(self.thresholds())
    }

    /// Decomposition with this config's depth cap and the given thresholds.
    pub fn params_for(&self, thresholds: MetricThresholds) -> DecompositionParams {
        DecompositionParams {
            min_std: thresholds.min_std,
            min_size: thresholds.min_size,
            max_depth: self.max_depth,
        }
    }

    pub fn symmetry_params(&self) -> DecompositionParams {
        self.params_for(self.symmetry_thresholds.unwrap_or_else(|| self.thresholds()))
    }

    /// Region parameters for an image that is already at its working size.
    pub fn region_params(&self) -> RegionParams {
        RegionParams {
            min_area: self.min_area,
            resize_to: None,
        }
    }
}
