// THEORY:
// A `Region` is one piece of an image's layout: a connected component of
// structure (edges) summarised by its bounding box and classified as either
// text or picture content. Like the other data containers it is "dumb": it is
// produced by the region classifier, never modified afterwards, and the layout
// summary only ever reads its area and kind.

use serde::{Deserialize, Serialize};

/// Value of `text_image_ratio` when a layout holds no image area at all.
pub const RATIO_SENTINEL: f64 = 0.0;

/// An axis-aligned box in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width <= self.x + self.width
            && other.y + other.height <= self.y + self.height
    }

    /// True when the two boxes share at least one pixel.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        BoundingBox::new(x, y, right - x, bottom - y)
    }
}

/// What a region holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    Text,
    Image,
}

/// A classified layout region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub bounding_box: BoundingBox,
    /// Area of the bounding box in pixels. Regions of one layout never overlap,
    /// so these areas add up without counting a pixel twice.
    pub area_px: u64,
    pub kind: RegionKind,
}

/// Aggregate text/image areas of a layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSummary {
    pub region_count: usize,
    pub image_count: usize,
    pub text_count: usize,
    pub text_area: u64,
    pub image_area: u64,
    /// `text_area / image_area`, or [`RATIO_SENTINEL`] when `image_area == 0`.
    pub text_image_ratio: f64,
    pub regions: Vec<Region>,
}

impl LayoutSummary {
    pub fn from_regions(regions: Vec<Region>) -> Self {
        let mut text_area = 0u64;
        let mut image_area = 0u64;
        let mut text_count = 0usize;
        let mut image_count = 0usize;

        for region in &regions {
            match region.kind {
                RegionKind::Text => {
                    text_area += region.area_px;
                    text_count += 1;
                }
                RegionKind::Image => {
                    image_area += region.area_px;
                    image_count += 1;
                }
            }
        }

        let text_image_ratio = if image_area == 0 {
            RATIO_SENTINEL
        } else {
            text_area as f64 / image_area as f64
        };

        Self {
            region_count: regions.len(),
            image_count,
            text_count,
            text_area,
            image_area,
            text_image_ratio,
            regions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(width: u32, height: u32, kind: RegionKind) -> Region {
        let bounding_box = BoundingBox::new(0, 0, width, height);
        Region {
            bounding_box,
            area_px: bounding_box.area(),
            kind,
        }
    }

    #[test]
    fn summary_splits_areas_by_kind() {
        let summary = LayoutSummary::from_regions(vec![
            region(10, 10, RegionKind::Text),
            region(20, 10, RegionKind::Image),
            region(5, 6, RegionKind::Text),
        ]);
        assert_eq!(summary.region_count, 3);
        assert_eq!(summary.image_count, 1);
        assert_eq!(summary.text_count, 2);
        assert_eq!(summary.text_area, 130);
        assert_eq!(summary.image_area, 200);
        assert!((summary.text_image_ratio - 0.65).abs() < 1e-12);
    }

    #[test]
    fn no_image_area_yields_the_sentinel() {
        let empty = LayoutSummary::from_regions(Vec::new());
        assert_eq!(empty.image_area, 0);
        assert_eq!(empty.text_image_ratio, RATIO_SENTINEL);

        let text_only = LayoutSummary::from_regions(vec![region(4, 4, RegionKind::Text)]);
        assert_eq!(text_only.text_image_ratio, RATIO_SENTINEL);
        assert!(text_only.text_image_ratio.is_finite());
    }

    #[test]
    fn overlap_needs_a_shared_pixel() {
        let a = BoundingBox::new(0, 0, 10, 10);
        assert!(a.overlaps(&BoundingBox::new(9, 9, 5, 5)));
        assert!(a.overlaps(&BoundingBox::new(2, 2, 3, 3)));
        assert!(!a.overlaps(&BoundingBox::new(10, 0, 5, 5)));
        assert!(!a.overlaps(&BoundingBox::new(0, 10, 5, 5)));
    }

    #[test]
    fn union_covers_both_boxes() {
        let a = BoundingBox::new(2, 5, 10, 4);
        let b = BoundingBox::new(8, 1, 3, 20);
        let both = a.union(&b);
        assert_eq!(both, BoundingBox::new(2, 1, 10, 20));
        assert!(both.contains(&a) && both.contains(&b));
    }
}
