// THEORY:
// The `IntensityField` is the bridge between a raw raster and the decomposition
// engine. It transforms a colour image into a single-channel grid of gray
// levels once, and never changes afterwards.
//
// Key architectural principles:
// 1.  **One conversion per image**: every decomposition-derived metric (complexity,
//     symmetry, self-similarity) reads the same field, so they all agree on what
//     "intensity" means.
// 2.  **O(1) block statistics**: alongside the values the field keeps two
//     summed-area tables (values and squared values). The mean and standard
//     deviation of any rectangle cost four lookups each, which keeps the
//     recursive splitting linear in the number of visited blocks instead of the
//     number of pixels.
// 3.  **Derived fields, not mutation**: the mirror and the downsampled copies are
//     new fields built from this one.

use crate::core_modules::block::{Block, BlockStats};
use crate::core_modules::pixel::Pixel;
use image::RgbImage;

/// Immutable row-major grid of gray levels with summed-area tables.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityField {
    width: u32,
    height: u32,
    values: Vec<f64>,
    /// (width + 1) x (height + 1) table; entry (x, y) is the sum of values[0..y][0..x].
    sums: Vec<f64>,
    squares: Vec<f64>,
}

impl IntensityField {
    /// Converts an RGB image to rounded BT.601 gray levels in 0..=255.
    pub fn from_rgb(image: &RgbImage) -> Self {
        let values = image
            .pixels()
            .map(|rgb| Pixel::from(rgb).gray().round())
            .collect();
        Self::from_values(image.width(), image.height(), values)
    }

    /// Builds a field from raw values.
    ///
    /// # Panics
    ///
    /// Panics if `values.len() != width * height`.
    pub fn from_values(width: u32, height: u32, values: Vec<f64>) -> Self {
        assert_eq!(
            values.len(),
            width as usize * height as usize,
            "field of {width}x{height} needs {} values",
            width as usize * height as usize
        );

        let stride = width as usize + 1;
        let mut sums = vec![0.0; stride * (height as usize + 1)];
        let mut squares = vec![0.0; stride * (height as usize + 1)];

        for y in 0..height as usize {
            let mut row_sum = 0.0;
            let mut row_squares = 0.0;
            for x in 0..width as usize {
                let value = values[y * width as usize + x];
                row_sum += value;
                row_squares += value * value;
                let idx = (y + 1) * stride + (x + 1);
                let above = y * stride + (x + 1);
                sums[idx] = sums[above] + row_sum;
                squares[idx] = squares[above] + row_squares;
            }
        }

        Self {
            width,
            height,
            values,
            sums,
            squares,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// The block spanning the whole field.
    pub fn bounds(&self) -> Block {
        Block::new(0, 0, self.width, self.height)
    }

    pub fn value(&self, x: u32, y: u32) -> Option<f64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.values[y as usize * self.width as usize + x as usize])
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    fn rect_sum(table: &[f64], stride: usize, block: &Block) -> f64 {
        let (x0, y0) = (block.x as usize, block.y as usize);
        let (x1, y1) = (block.right() as usize, block.bottom() as usize);
        table[y1 * stride + x1] - table[y0 * stride + x1] - table[y1 * stride + x0]
            + table[y0 * stride + x0]
    }

    /// Mean and population standard deviation of the values under `block`.
    ///
    /// Empty blocks report zero for both. The block must lie inside the field.
    pub fn block_stats(&self, block: &Block) -> BlockStats {
        debug_assert!(self.bounds().contains(block), "{block:?} outside field");
        if block.is_empty() {
            return BlockStats::default();
        }

        let stride = self.width as usize + 1;
        let count = block.area() as f64;
        let mean = Self::rect_sum(&self.sums, stride, block) / count;
        let mean_square = Self::rect_sum(&self.squares, stride, block) / count;
        let variance = (mean_square - mean * mean).max(0.0);

        BlockStats {
            mean,
            std_dev: variance.sqrt(),
        }
    }

    /// Horizontal mirror: column order reversed.
    pub fn mirrored(&self) -> Self {
        let width = self.width as usize;
        let mut values = Vec::with_capacity(self.values.len());
        for row in self.values.chunks(width.max(1)) {
            values.extend(row.iter().rev());
        }
        Self::from_values(self.width, self.height, values)
    }

    /// Halves both dimensions with a 2x2 box average.
    ///
    /// Odd trailing rows/columns are dropped; a side of 1 stays 1 so the
    /// result is never smaller than 1x1 for a non-empty field.
    pub fn downsampled(&self) -> Self {
        if self.is_empty() {
            return self.clone();
        }
        let new_width = (self.width / 2).max(1);
        let new_height = (self.height / 2).max(1);
        let step_x = if self.width >= 2 { 2 } else { 1 };
        let step_y = if self.height >= 2 { 2 } else { 1 };

        let mut values = Vec::with_capacity(new_width as usize * new_height as usize);
        for y in 0..new_height {
            for x in 0..new_width {
                let cell = Block::new(x * step_x, y * step_y, step_x, step_y);
                values.push(self.block_stats(&cell).mean);
            }
        }
        Self::from_values(new_width, new_height, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn ramp(width: u32, height: u32) -> IntensityField {
        let values = (0..width * height).map(|i| (i % width) as f64).collect();
        IntensityField::from_values(width, height, values)
    }

    #[test]
    fn rgb_conversion_uses_rounded_bt601_gray() {
        let image = RgbImage::from_pixel(2, 2, Rgb([255, 0, 0]));
        let field = IntensityField::from_rgb(&image);
        // 0.299 * 255 = 76.245
        assert_eq!(field.value(1, 1), Some(76.0));
    }

    #[test]
    fn block_stats_match_a_direct_computation() {
        let field = ramp(6, 4);
        let block = Block::new(1, 1, 3, 2);
        let stats = field.block_stats(&block);

        // Each row holds 1, 2, 3.
        assert!((stats.mean - 2.0).abs() < 1e-12);
        assert!((stats.std_dev - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn uniform_blocks_have_exactly_zero_deviation() {
        let field = IntensityField::from_values(16, 16, vec![128.0; 256]);
        let stats = field.block_stats(&Block::new(3, 4, 9, 7));
        assert_eq!(stats.mean, 128.0);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn mirror_reverses_columns() {
        let field = ramp(4, 2);
        let mirror = field.mirrored();
        assert_eq!(mirror.value(0, 0), Some(3.0));
        assert_eq!(mirror.value(3, 1), Some(0.0));
        assert_eq!(mirror.mirrored(), field);
    }

    #[test]
    fn downsampling_halves_and_stops_at_one_pixel() {
        let field = ramp(5, 3);
        let half = field.downsampled();
        assert_eq!((half.width(), half.height()), (2, 1));
        assert_eq!(half.value(0, 0), Some(0.5));

        let mut tiny = half;
        for _ in 0..4 {
            tiny = tiny.downsampled();
        }
        assert_eq!((tiny.width(), tiny.height()), (1, 1));
    }

    #[test]
    fn empty_field_reports_zero_stats() {
        let field = IntensityField::from_values(0, 7, Vec::new());
        assert!(field.is_empty());
        assert_eq!(field.block_stats(&field.bounds()), BlockStats::default());
    }
}
