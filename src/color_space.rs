//! sRGB to CIELAB conversion and the CIE76 colour difference.
//!
//! All perceptual work in the crate (clustering, thread matching, dithering)
//! happens on [`LabColor`] values produced by [`rgb_to_lab`].

use serde::{Deserialize, Serialize};

/// Device RGB triple, 8 bits per channel.
pub type RgbColor = rgb::RGB8;

/// D65 reference white, XYZ scaled to 0..100.
const WHITE_X: f64 = 95.047;
const WHITE_Y: f64 = 100.0;
const WHITE_Z: f64 = 108.883;

const DELTA: f64 = 6.0 / 29.0;

/// A colour in CIELAB (L* 0..100, a*/b* roughly -128..127).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LabColor {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

impl LabColor {
    pub const fn new(l: f64, a: f64, b: f64) -> Self {
        Self { l, a, b }
    }

    /// CIE76 distance to `other`.
    #[inline]
    pub fn delta_e(&self, other: &LabColor) -> f64 {
        self.distance_sq(other).sqrt()
    }

    /// Squared CIE76 distance; cheaper when only ordering matters.
    #[inline]
    pub fn distance_sq(&self, other: &LabColor) -> f64 {
        let dl = self.l - other.l;
        let da = self.a - other.a;
        let db = self.b - other.b;
        dl * dl + da * da + db * db
    }
}

impl From<RgbColor> for LabColor {
    fn from(rgb: RgbColor) -> Self {
        rgb_to_lab(rgb)
    }
}

/// Undo the sRGB transfer curve for one channel in 0..=1.
#[inline]
fn linearize(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
fn lab_f(t: f64) -> f64 {
    if t > DELTA * DELTA * DELTA {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

/// Convert sRGB to CIE XYZ (D65), components scaled to 0..100.
pub fn rgb_to_xyz(rgb: RgbColor) -> (f64, f64, f64) {
    let r = linearize(rgb.r as f64 / 255.0) * 100.0;
    let g = linearize(rgb.g as f64 / 255.0) * 100.0;
    let b = linearize(rgb.b as f64 / 255.0) * 100.0;

    let x = r * 0.4124564 + g * 0.3575761 + b * 0.1804375;
    let y = r * 0.2126729 + g * 0.7151522 + b * 0.0721750;
    let z = r * 0.0193339 + g * 0.1191920 + b * 0.9503041;
    (x, y, z)
}

/// Convert XYZ (0..100 scale) to CIELAB relative to D65.
pub fn xyz_to_lab(x: f64, y: f64, z: f64) -> LabColor {
    let fx = lab_f(x / WHITE_X);
    let fy = lab_f(y / WHITE_Y);
    let fz = lab_f(z / WHITE_Z);

    LabColor {
        l: 116.0 * fy - 16.0,
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}

/// Convert an sRGB pixel to CIELAB via XYZ. Total over all inputs.
pub fn rgb_to_lab(rgb: RgbColor) -> LabColor {
    let (x, y, z) = rgb_to_xyz(rgb);
    xyz_to_lab(x, y, z)
}

/// CIE76 colour difference between two LAB colours.
#[inline]
pub fn delta_e(a: &LabColor, b: &LabColor) -> f64 {
    a.delta_e(b)
}

/// Format an RGB triple as `#rrggbb`.
pub fn rgb_to_hex(rgb: RgbColor) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb.r, rgb.g, rgb.b)
}
