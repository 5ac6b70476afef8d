//! Floyd-Steinberg error diffusion in CIELAB.
//!
//! ```text
//!        X   7
//!    3   5   1
//! ```
//!
//! Weights are sixteenths. Error is carried in LAB so diffusion stays
//! perceptual; each cell snaps to the nearest palette colour by ΔE.

use crate::color_space::LabColor;
use crate::quantizer::nearest_centroid;

/// Dither `pixels` (row-major `width` x `height`) onto `palette`, returning a
/// palette index per pixel. Returns an empty vector for an empty palette.
pub fn floyd_steinberg(pixels: &[LabColor], width: usize, height: usize, palette: &[LabColor]) -> Vec<usize> {
    if palette.is_empty() {
        return Vec::new();
    }

    let mut work: Vec<[f64; 3]> = pixels.iter().map(|p| [p.l, p.a, p.b]).collect();
    let mut indices = vec![0usize; width * height];

    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;
            let current = LabColor::new(work[i][0], work[i][1], work[i][2]);
            let idx = nearest_centroid(&current, palette);
            indices[i] = idx;

            let chosen = palette[idx];
            let err = [current.l - chosen.l, current.a - chosen.a, current.b - chosen.b];

            let mut spread = |nx: usize, ny: usize, weight: f64| {
                let j = ny * width + nx;
                for c in 0..3 {
                    work[j][c] += err[c] * weight;
                }
            };

            if x + 1 < width {
                spread(x + 1, y, 7.0 / 16.0);
            }
            if y + 1 < height {
                if x > 0 {
                    spread(x - 1, y + 1, 3.0 / 16.0);
                }
                spread(x, y + 1, 5.0 / 16.0);
                if x + 1 < width {
                    spread(x + 1, y + 1, 1.0 / 16.0);
                }
            }
        }
    }

    indices
}
