//! Face and text detection capabilities.
//!
//! The engine never depends on a concrete detector. Callers plug in anything
//! that implements [`FaceDetector`] or [`TextDetector`]; tests use
//! deterministic doubles. With the `rustface` feature a SeetaFace-based
//! [`RustfaceDetector`] is available.

use crate::core_modules::region::BoundingBox;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by detector implementations.
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Failed to load detector model: {0}")]
    ModelLoad(String),

    #[error("Detection failed: {0}")]
    Detection(String),
}

/// Faces found in one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceSummary {
    pub faces: Vec<BoundingBox>,
    pub num_faces: usize,
}

impl From<Vec<BoundingBox>> for FaceSummary {
    fn from(faces: Vec<BoundingBox>) -> Self {
        Self {
            num_faces: faces.len(),
            faces,
        }
    }
}

/// Locates faces in an image.
pub trait FaceDetector: Send + Sync {
    fn detect_faces(&self, image: &RgbImage) -> Result<Vec<BoundingBox>, DetectorError>;
}

/// Counts text characters in an image.
pub trait TextDetector: Send + Sync {
    fn detect_text(&self, image: &RgbImage) -> Result<usize, DetectorError>;
}

#[cfg(feature = "rustface")]
pub use seeta::RustfaceDetector;

#[cfg(feature = "rustface")]
mod seeta {
    use super::{BoundingBox, DetectorError, FaceDetector};
    use image::{DynamicImage, RgbImage};
    use std::path::PathBuf;
    use tracing::debug;

    /// Face detector backed by a SeetaFace model file.
    ///
    /// A fresh detector is created per call because rustface detectors are
    /// stateful (`&mut self`) and this type must be shareable across threads.
    #[derive(Debug, Clone)]
    pub struct RustfaceDetector {
        pub model_path: PathBuf,
        pub min_face_size: u32,
        pub score_thresh: f64,
        pub pyramid_scale_factor: f32,
        pub slide_window_step: (u32, u32),
    }

    impl RustfaceDetector {
        pub fn new(model_path: impl Into<PathBuf>) -> Self {
            Self {
                model_path: model_path.into(),
                min_face_size: 40,
                score_thresh: 3.0,
                pyramid_scale_factor: 0.7,
                slide_window_step: (4, 4),
            }
        }

        pub fn with_min_face_size(mut self, size: u32) -> Self {
            self.min_face_size = size;
            self
        }

        pub fn with_score_thresh(mut self, thresh: f64) -> Self {
            self.score_thresh = thresh;
            self
        }
    }

    impl FaceDetector for RustfaceDetector {
        fn detect_faces(&self, image: &RgbImage) -> Result<Vec<BoundingBox>, DetectorError> {
            let path = self.model_path.to_str().ok_or_else(|| {
                DetectorError::ModelLoad(format!("non UTF-8 model path {:?}", self.model_path))
            })?;
            let mut detector = rustface::create_detector(path).map_err(|e| {
                DetectorError::ModelLoad(format!("Failed to load model from {path}: {e}"))
            })?;
            detector.set_min_face_size(self.min_face_size);
            detector.set_score_thresh(self.score_thresh);
            detector.set_pyramid_scale_factor(self.pyramid_scale_factor);
            detector.set_slide_window_step(self.slide_window_step.0, self.slide_window_step.1);

            let gray = DynamicImage::ImageRgb8(image.clone()).to_luma8();
            let (width, height) = gray.dimensions();
            let raw = gray.into_raw();
            let faces = detector.detect(&rustface::ImageData::new(&raw, width, height));
            debug!(faces = faces.len(), "rustface detection finished");

            Ok(faces
                .iter()
                .map(|face| {
                    let bbox = face.bbox();
                    let x = bbox.x().max(0) as u32;
                    let y = bbox.y().max(0) as u32;
                    BoundingBox::new(
                        x,
                        y,
                        bbox.width().min(width.saturating_sub(x)),
                        bbox.height().min(height.saturating_sub(y)),
                    )
                })
                .collect())
        }
    }
}

#[cfg(test)]
pub(crate) mod doubles {
    use super::*;

    /// Returns the same boxes for every image.
    pub struct FixedFaces(pub Vec<BoundingBox>);

    impl FaceDetector for FixedFaces {
        fn detect_faces(&self, _image: &RgbImage) -> Result<Vec<BoundingBox>, DetectorError> {
            Ok(self.0.clone())
        }
    }

    /// Counts one character per fully dark pixel column.
    pub struct DarkColumnText;

    impl TextDetector for DarkColumnText {
        fn detect_text(&self, image: &RgbImage) -> Result<usize, DetectorError> {
            let columns = (0..image.width())
                .filter(|&x| (0..image.height()).any(|y| image.get_pixel(x, y)[0] < 64))
                .count();
            Ok(columns)
        }
    }

    /// Always fails.
    pub struct Broken;

    impl FaceDetector for Broken {
        fn detect_faces(&self, _image: &RgbImage) -> Result<Vec<BoundingBox>, DetectorError> {
            Err(DetectorError::Detection("camera on fire".to_string()))
        }
    }

    impl TextDetector for Broken {
        fn detect_text(&self, _image: &RgbImage) -> Result<usize, DetectorError> {
            Err(DetectorError::Detection("ocr engine offline".to_string()))
        }
    }
}
