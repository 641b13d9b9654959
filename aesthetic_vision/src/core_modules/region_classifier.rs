// THEORY:
// The region classifier is the layout layer of the engine. It splits an image
// into candidate regions of content and decides, for each one, whether it holds
// text or picture content.
//
// Key architectural principles & algorithm steps:
// 1.  **Edge map**: the image is converted to gray (the same BT.601 gray the
//     quad-tree uses) and run through Canny. Content shows up as edges, flat
//     background does not.
// 2.  **Connected components**: 8-connected groups of edge pixels become candidate
//     regions, each summarised by its bounding box.
// 3.  **Disjoint boxes**: bounding boxes that share a pixel are replaced by their
//     union until no two overlap. Nested boxes (the inner outline of a frame, the
//     counter of a letter) are the simplest case. The text and image areas of a
//     layout therefore never count a pixel twice.
// 4.  **Noise filter**: boxes smaller than `min_area` pixels are dropped.
// 5.  **Classification**: a supplied `TextDetector` is asked about each crop. Without
//     one, or when it fails, a fixed shape heuristic decides: short boxes that
//     are dense with edges read as text, everything else as image.
// 6.  **Stateless utility**: identical image + parameters always produce the same
//     regions in the same order (top to bottom, then left to right).

use crate::core_modules::detectors::TextDetector;
use crate::core_modules::pixel::Pixel;
use crate::core_modules::region::{BoundingBox, Region, RegionKind};
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};
use imageproc::edges::canny;
use imageproc::region_labelling::{Connectivity, connected_components};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::{debug, warn};

pub const CANNY_LOW_THRESHOLD: f32 = 30.0;
pub const CANNY_HIGH_THRESHOLD: f32 = 150.0;
/// Text boxes are at most this share of the image height.
pub const TEXT_MAX_HEIGHT_FRACTION: f64 = 0.10;
/// Text boxes have at least this share of edge pixels.
pub const TEXT_MIN_EDGE_DENSITY: f64 = 0.15;

/// Tunables for one classification run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionParams {
    /// Boxes with fewer pixels than this are discarded.
    pub min_area: u64,
    /// Resize to (width, height) before segmenting.
    pub resize_to: Option<(u32, u32)>,
}

impl Default for RegionParams {
    fn default() -> Self {
        Self {
            min_area: 100,
            resize_to: None,
        }
    }
}

/// Running bounding box of one labelled component.
#[derive(Debug, Clone, Copy)]
struct Component {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl Component {
    fn at(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(
            self.min_x,
            self.min_y,
            self.max_x - self.min_x + 1,
            self.max_y - self.min_y + 1,
        )
    }
}

/// Segments and classifies `image` without a text detector.
pub fn classify(
    image: &RgbImage,
    min_area: u64,
    resized_dimensions: Option<(u32, u32)>,
) -> Vec<Region> {
    let params = RegionParams {
        min_area,
        resize_to: resized_dimensions,
    };
    classify_with(image, &params, None)
}

/// Segments and classifies `image`, consulting `text_detector` when given.
pub fn classify_with(
    image: &RgbImage,
    params: &RegionParams,
    text_detector: Option<&dyn TextDetector>,
) -> Vec<Region> {
    let working: Cow<'_, RgbImage> = match params.resize_to {
        Some((width, height))
            if width > 0 && height > 0 && (width, height) != image.dimensions() =>
        {
            Cow::Owned(imageops::resize(image, width, height, FilterType::CatmullRom))
        }
        _ => Cow::Borrowed(image),
    };
    if working.width() == 0 || working.height() == 0 {
        return Vec::new();
    }

    let gray = GrayImage::from_fn(working.width(), working.height(), |x, y| {
        Luma([Pixel::from(working.get_pixel(x, y)).gray().round() as u8])
    });
    let edges = canny(&gray, CANNY_LOW_THRESHOLD, CANNY_HIGH_THRESHOLD);

    let boxes = disjoint_boxes(&edges);
    let candidates = boxes.len();

    let mut regions: Vec<Region> = boxes
        .into_iter()
        .filter(|bounding_box| bounding_box.area() >= params.min_area)
        .map(|bounding_box| {
            let kind = classify_box(&working, &edges, &bounding_box, text_detector);
            Region {
                bounding_box,
                area_px: bounding_box.area(),
                kind,
            }
        })
        .collect();
    regions.sort_by_key(|region| (region.bounding_box.y, region.bounding_box.x));

    debug!(
        candidates,
        kept = regions.len(),
        min_area = params.min_area,
        "region segmentation finished"
    );
    regions
}

/// Labels edge pixels and returns the merged, pairwise disjoint component boxes.
fn disjoint_boxes(edges: &GrayImage) -> Vec<BoundingBox> {
    let labels = connected_components(edges, Connectivity::Eight, Luma([0u8]));

    let mut components: Vec<Option<Component>> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0] as usize;
        if label == 0 {
            continue;
        }
        if components.len() < label {
            components.resize(label, None);
        }
        match &mut components[label - 1] {
            Some(component) => component.include(x, y),
            slot @ None => *slot = Some(Component::at(x, y)),
        }
    }

    merge_overlapping(
        components
            .into_iter()
            .flatten()
            .map(|component| component.bounding_box()),
    )
}

/// Unions overlapping boxes until the result is pairwise disjoint.
fn merge_overlapping(boxes: impl IntoIterator<Item = BoundingBox>) -> Vec<BoundingBox> {
    // `merged` stays pairwise disjoint after every push.
    let mut merged: Vec<BoundingBox> = Vec::new();
    for mut candidate in boxes {
        while let Some(idx) = merged.iter().position(|kept| kept.overlaps(&candidate)) {
            candidate = candidate.union(&merged.swap_remove(idx));
        }
        merged.push(candidate);
    }
    merged
}

fn classify_box(
    image: &RgbImage,
    edges: &GrayImage,
    bounding_box: &BoundingBox,
    text_detector: Option<&dyn TextDetector>,
) -> RegionKind {
    if let Some(detector) = text_detector {
        let crop = imageops::crop_imm(
            image,
            bounding_box.x,
            bounding_box.y,
            bounding_box.width,
            bounding_box.height,
        )
        .to_image();
        match detector.detect_text(&crop) {
            Ok(characters) if characters > 0 => return RegionKind::Text,
            Ok(_) => return RegionKind::Image,
            Err(err) => warn!(?bounding_box, %err, "text detector failed, using shape heuristic"),
        }
    }

    let edge_pixels = count_edges(edges, bounding_box);
    if looks_like_text(bounding_box, edge_pixels, image.height()) {
        RegionKind::Text
    } else {
        RegionKind::Image
    }
}

fn count_edges(edges: &GrayImage, bounding_box: &BoundingBox) -> u64 {
    let mut count = 0u64;
    for y in bounding_box.y..bounding_box.y + bounding_box.height {
        for x in bounding_box.x..bounding_box.x + bounding_box.width {
            if edges.get_pixel(x, y)[0] > 0 {
                count += 1;
            }
        }
    }
    count
}

/// Short, edge-dense boxes read as text.
pub fn looks_like_text(bounding_box: &BoundingBox, edge_pixels: u64, image_height: u32) -> bool {
    let area = bounding_box.area();
    if area == 0 {
        return false;
    }
    let short = bounding_box.height as f64 <= TEXT_MAX_HEIGHT_FRACTION * image_height as f64;
    let density = edge_pixels as f64 / area as f64;
    short && density >= TEXT_MIN_EDGE_DENSITY
}
