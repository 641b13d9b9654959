// THEORY (single-pixel heuristics):
// The `pixel` module is the smallest unit of the engine. A `Pixel` is a "dumb"
// container for one RGB sample plus the handful of metrics that can be computed
// from that sample alone. Anything that needs neighbours (block statistics,
// edges, regions) lives in higher modules.
//
// Channel forms:
// - raw bytes (0..255): used for gray levels and the RGB colorfulness index
// - linearized (0..1): sRGB gamma removed, used for relative luminance
//
// The sRGB -> linear conversion is a 256-entry `OnceLock` table, so the per-pixel
// cost of the brightness metrics is a lookup and a multiply, never a `powf`.

use image::Rgb;
use std::sync::OnceLock;

pub type Channel = u8;
pub type LinearChannel = f64;
pub type Luminance = f64;
pub type Gray = f64;
pub type Saturation = f64;

static SRGB_TO_LINEAR_LUT: OnceLock<[LinearChannel; 256]> = OnceLock::new();

/// sRGB byte to linear light in 0..1.
#[inline]
pub fn srgb_to_linear(value: Channel) -> LinearChannel {
    let table = SRGB_TO_LINEAR_LUT.get_or_init(|| {
        let mut table = [0.0f64; 256];
        for (i, slot) in table.iter_mut().enumerate() {
            let normalized = i as f64 / 255.0;
            *slot = if normalized <= 0.04045 {
                normalized / 12.92
            } else {
                ((normalized + 0.055) / 1.055).powf(2.4)
            };
        }
        table
    });
    table[value as usize]
}

/// A single RGB sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pixel {
    pub red: Channel,
    pub green: Channel,
    pub blue: Channel,
}

impl Pixel {
    pub fn new(red: Channel, green: Channel, blue: Channel) -> Self {
        Self { red, green, blue }
    }

    /// Rec. 601 luma on the raw 0..255 channels.
    ///
    /// This is the gray level every decomposition works on.
    #[inline]
    pub fn gray(&self) -> Gray {
        0.299 * self.red as f64 + 0.587 * self.green as f64 + 0.114 * self.blue as f64
    }

    /// Relative luminance with BT.601 weights on linear light, in 0..1.
    #[inline]
    pub fn luminance_bt601(&self) -> Luminance {
        0.299 * srgb_to_linear(self.red)
            + 0.587 * srgb_to_linear(self.green)
            + 0.114 * srgb_to_linear(self.blue)
    }

    /// Relative luminance with BT.709 weights on linear light, in 0..1.
    #[inline]
    pub fn luminance_bt709(&self) -> Luminance {
        0.2126 * srgb_to_linear(self.red)
            + 0.7152 * srgb_to_linear(self.green)
            + 0.0722 * srgb_to_linear(self.blue)
    }

    /// HSV saturation on the 0..255 scale: 255 * (max - min) / max.
    #[inline]
    pub fn saturation_hsv(&self) -> Saturation {
        let max = self.red.max(self.green).max(self.blue);
        if max == 0 {
            return 0.0;
        }
        let min = self.red.min(self.green).min(self.blue);
        255.0 * (max - min) as f64 / max as f64
    }

    /// Opponent channels (rg, yb) of the Hasler & Suesstrunk colorfulness metric.
    #[inline]
    pub fn opponent_channels(&self) -> (f64, f64) {
        let r = self.red as f64;
        let g = self.green as f64;
        let b = self.blue as f64;
        (r - g, 0.5 * (r + g) - b)
    }

    /// Squared Euclidean distance in RGB space.
    #[inline]
    pub fn distance_sq(&self, other: &Pixel) -> u32 {
        let dr = self.red as i32 - other.red as i32;
        let dg = self.green as i32 - other.green as i32;
        let db = self.blue as i32 - other.blue as i32;
        (dr * dr + dg * dg + db * db) as u32
    }
}

impl From<&Rgb<u8>> for Pixel {
    fn from(rgb: &Rgb<u8>) -> Self {
        Pixel::new(rgb[0], rgb[1], rgb[2])
    }
}

impl From<Pixel> for Rgb<u8> {
    fn from(pixel: Pixel) -> Self {
        Rgb([pixel.red, pixel.green, pixel.blue])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linearization_hits_both_ends() {
        assert_eq!(srgb_to_linear(0), 0.0);
        assert!((srgb_to_linear(255) - 1.0).abs() < 1e-12);
        // Mid gray is far darker than 0.5 in linear light.
        assert!(srgb_to_linear(128) < 0.25);
    }

    #[test]
    fn white_has_unit_luminance_in_both_standards() {
        let white = Pixel::new(255, 255, 255);
        assert!((white.luminance_bt601() - 1.0).abs() < 1e-9);
        assert!((white.luminance_bt709() - 1.0).abs() < 1e-9);
        assert!((white.gray() - 255.0).abs() < 1e-9);
    }

    #[test]
    fn saturation_is_zero_for_grays_and_full_for_primaries() {
        assert_eq!(Pixel::new(90, 90, 90).saturation_hsv(), 0.0);
        assert_eq!(Pixel::new(0, 0, 0).saturation_hsv(), 0.0);
        assert_eq!(Pixel::new(0, 200, 0).saturation_hsv(), 255.0);
    }

    #[test]
    fn opponent_channels_of_pure_red() {
        let (rg, yb) = Pixel::new(255, 0, 0).opponent_channels();
        assert_eq!(rg, 255.0);
        assert_eq!(yb, 127.5);
    }
}
