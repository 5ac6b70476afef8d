//! Sobel edge detection over CIELAB for outline patterns.
//!
//! The gradient is taken on all three LAB channels so that boundaries between
//! colours of similar lightness (red against blue, say) still register.

use crate::color_space::LabColor;

/// Gradient magnitude per cell, row-major.
#[derive(Debug, Clone)]
pub struct EdgeMap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f64>,
}

impl EdgeMap {
    pub fn is_edge(&self, idx: usize, threshold: f64) -> bool {
        self.data[idx] > threshold
    }
}

const SOBEL_X: [f64; 9] = [-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0];
const SOBEL_Y: [f64; 9] = [-1.0, -2.0, -1.0, 0.0, 0.0, 0.0, 1.0, 2.0, 1.0];

/// Sobel operator on each LAB channel; magnitude is the Euclidean norm of the
/// three channel gradients. Borders are handled by clamping coordinates.
pub fn detect_edges_sobel(pixels: &[LabColor], width: u32, height: u32) -> EdgeMap {
    let w = width as usize;
    let h = height as usize;
    let mut data = vec![0.0f64; w * h];

    for y in 0..h {
        for x in 0..w {
            let mut gx = [0.0f64; 3];
            let mut gy = [0.0f64; 3];

            for ky in 0..3usize {
                for kx in 0..3usize {
                    let px = (x + kx).saturating_sub(1).min(w - 1);
                    let py = (y + ky).saturating_sub(1).min(h - 1);
                    let p = pixels[py * w + px];
                    let k = ky * 3 + kx;
                    for (c, v) in [p.l, p.a, p.b].into_iter().enumerate() {
                        gx[c] += v * SOBEL_X[k];
                        gy[c] += v * SOBEL_Y[k];
                    }
                }
            }

            let sum_sq: f64 = (0..3).map(|c| gx[c] * gx[c] + gy[c] * gy[c]).sum();
            data[y * w + x] = sum_sq.sqrt();
        }
    }

    EdgeMap {
        width,
        height,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color_space::{rgb_to_lab, RgbColor};

    fn split_image(vertical: bool, left: RgbColor, right: RgbColor) -> Vec<LabColor> {
        let mut pixels = Vec::new();
        for y in 0..10 {
            for x in 0..10 {
                let first = if vertical { x < 5 } else { y < 5 };
                pixels.push(rgb_to_lab(if first { left } else { right }));
            }
        }
        pixels
    }

    #[test]
    fn test_sobel_detects_vertical_edge() {
        let pixels = split_image(true, RgbColor::new(0, 0, 0), RgbColor::new(255, 255, 255));
        let edges = detect_edges_sobel(&pixels, 10, 10);
        assert_eq!(edges.width, 10);
        assert_eq!(edges.height, 10);
        assert!(edges.data[5 * 10 + 5] > 0.0);
        assert!(edges.data[5 * 10 + 4] > 0.0);
        assert_eq!(edges.data[5 * 10 + 1], 0.0);
    }

    #[test]
    fn test_sobel_uniform_image_no_edges() {
        let pixels = vec![rgb_to_lab(RgbColor::new(128, 128, 128)); 100];
        let edges = detect_edges_sobel(&pixels, 10, 10);
        assert!(edges.data.iter().all(|&v| v.abs() < 1e-9));
    }

    #[test]
    fn test_sobel_horizontal_edge() {
        let pixels = split_image(false, RgbColor::new(0, 0, 0), RgbColor::new(255, 255, 255));
        let edges = detect_edges_sobel(&pixels, 10, 10);
        assert!(edges.is_edge(5 * 10 + 5, 10.0));
        assert!(!edges.is_edge(9 * 10 + 5, 10.0));
    }

    #[test]
    fn test_sobel_sees_chroma_edges() {
        // Similar lightness, very different hue
        let pixels = split_image(true, RgbColor::new(255, 0, 0), RgbColor::new(0, 0, 255));
        let edges = detect_edges_sobel(&pixels, 10, 10);
        assert!(edges.is_edge(3 * 10 + 5, 50.0));
    }

    #[test]
    fn test_single_pixel_image() {
        let pixels = vec![rgb_to_lab(RgbColor::new(1, 2, 3))];
        let edges = detect_edges_sobel(&pixels, 1, 1);
        assert_eq!(edges.data, vec![0.0]);
    }
}
