// THEORY:
// Whole-image color statistics. None of these need neighbourhoods, so each one
// is a single pass over the pixels accumulating running sums, in the same way
// the block statistics accumulate over a rectangle.
//
// - Brightness: mean relative luminance on linear light, BT.601 and BT.709 weights.
// - Colorfulness (HSV): mean + standard deviation of HSV saturation (0..255).
// - Colorfulness (RGB): Hasler & Suesstrunk, on the rg / yb opponent channels.
// - Palette: share of pixels closest to each of the 16 W3C basic colors.

use crate::core_modules::pixel::Pixel;
use image::RgbImage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Brightness {
    pub bt601: f64,
    pub bt709: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Colorfulness {
    pub hsv: f64,
    pub rgb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorShare {
    pub color_name: String,
    pub percentage_of_pixels: f64,
}

/// The 16 W3C basic colors, in the order they are reported.
pub const W3C_BASIC_COLORS: [(&str, Pixel); 16] = [
    ("black", Pixel { red: 0, green: 0, blue: 0 }),
    ("silver", Pixel { red: 192, green: 192, blue: 192 }),
    ("gray", Pixel { red: 128, green: 128, blue: 128 }),
    ("white", Pixel { red: 255, green: 255, blue: 255 }),
    ("maroon", Pixel { red: 128, green: 0, blue: 0 }),
    ("red", Pixel { red: 255, green: 0, blue: 0 }),
    ("purple", Pixel { red: 128, green: 0, blue: 128 }),
    ("fuchsia", Pixel { red: 255, green: 0, blue: 255 }),
    ("green", Pixel { red: 0, green: 128, blue: 0 }),
    ("lime", Pixel { red: 0, green: 255, blue: 0 }),
    ("olive", Pixel { red: 128, green: 128, blue: 0 }),
    ("yellow", Pixel { red: 255, green: 255, blue: 0 }),
    ("navy", Pixel { red: 0, green: 0, blue: 128 }),
    ("blue", Pixel { red: 0, green: 0, blue: 255 }),
    ("teal", Pixel { red: 0, green: 128, blue: 128 }),
    ("aqua", Pixel { red: 0, green: 255, blue: 255 }),
];

/// Running mean / population standard deviation.
#[derive(Default)]
struct Moments {
    count: f64,
    sum: f64,
    sum_sq: f64,
}

impl Moments {
    fn push(&mut self, value: f64) {
        self.count += 1.0;
        self.sum += value;
        self.sum_sq += value * value;
    }

    fn mean(&self) -> f64 {
        if self.count == 0.0 {
            0.0
        } else {
            self.sum / self.count
        }
    }

    fn std_dev(&self) -> f64 {
        if self.count == 0.0 {
            return 0.0;
        }
        let mean = self.mean();
        (self.sum_sq / self.count - mean * mean).max(0.0).sqrt()
    }
}

/// Mean linear luminance in [0, 1]. An empty image is 0.
pub fn brightness(image: &RgbImage) -> Brightness {
    let mut bt601 = Moments::default();
    let mut bt709 = Moments::default();
    for rgb in image.pixels() {
        let pixel = Pixel::from(rgb);
        bt601.push(pixel.luminance_bt601());
        bt709.push(pixel.luminance_bt709());
    }
    Brightness {
        bt601: bt601.mean().clamp(0.0, 1.0),
        bt709: bt709.mean().clamp(0.0, 1.0),
    }
}

pub fn colorfulness(image: &RgbImage) -> Colorfulness {
    let mut saturation = Moments::default();
    let mut rg = Moments::default();
    let mut yb = Moments::default();
    for rgb in image.pixels() {
        let pixel = Pixel::from(rgb);
        saturation.push(pixel.saturation_hsv());
        let (opponent_rg, opponent_yb) = pixel.opponent_channels();
        rg.push(opponent_rg);
        yb.push(opponent_yb);
    }

    let spread = rg.std_dev().hypot(yb.std_dev());
    let offset = rg.mean().hypot(yb.mean());
    Colorfulness {
        hsv: saturation.mean() + saturation.std_dev(),
        rgb: spread + 0.3 * offset,
    }
}

/// Percentage of pixels nearest to each W3C basic color.
///
/// Ties go to the color listed first. All 16 colors are always reported; the
/// percentages of a non-empty image sum to 100.
pub fn color_distribution(image: &RgbImage) -> Vec<ColorShare> {
    let mut counts = [0u64; 16];
    for rgb in image.pixels() {
        counts[nearest_basic_color(&Pixel::from(rgb))] += 1;
    }
    let total = image.pixels().len() as f64;

    W3C_BASIC_COLORS
        .iter()
        .zip(counts)
        .map(|((name, _), count)| ColorShare {
            color_name: (*name).to_string(),
            percentage_of_pixels: if total > 0.0 {
                100.0 * count as f64 / total
            } else {
                0.0
            },
        })
        .collect()
}

fn nearest_basic_color(pixel: &Pixel) -> usize {
    let mut best = 0;
    let mut best_distance = u32::MAX;
    for (index, (_, reference)) in W3C_BASIC_COLORS.iter().enumerate() {
        let distance = pixel.distance_sq(reference);
        if distance < best_distance {
            best = index;
            best_distance = distance;
        }
    }
    best
}
