//! Image preprocessing before quantization
//!
//! Contrast-limited adaptive histogram equalization (CLAHE) on the L channel.
//! The image is split into a grid of tiles; each tile's lightness histogram is
//! clipped and equalized, and every pixel blends the mappings of the four
//! nearest tile centres. Chroma (a, b) is left untouched.

use crate::color_space::LabColor;
use rayon::prelude::*;

const BINS: usize = 256;

/// Preprocessing options
#[derive(Debug, Clone)]
pub struct PreprocessOptions {
    /// Equalize lightness with CLAHE (default: false)
    pub enhance_contrast: bool,
    /// Histogram clip limit relative to a flat histogram (default: 3.0)
    pub clip_limit: f64,
    /// Tiles per side (default: 8)
    pub tile_grid: u32,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            enhance_contrast: false,
            clip_limit: 3.0,
            tile_grid: 8,
        }
    }
}

/// Apply preprocessing to a row-major LAB image.
pub fn preprocess(pixels: &[LabColor], width: usize, height: usize, options: &PreprocessOptions) -> Vec<LabColor> {
    if !options.enhance_contrast {
        return pixels.to_vec();
    }
    equalize_lightness(pixels, width, height, options.clip_limit, options.tile_grid as usize)
}

#[inline]
fn bin_of(l: f64) -> usize {
    ((l.clamp(0.0, 100.0) / 100.0) * (BINS - 1) as f64).round() as usize
}

/// Lookup table from L bin to equalized L for one tile.
fn tile_mapping(
    pixels: &[LabColor],
    width: usize,
    (x0, x1): (usize, usize),
    (y0, y1): (usize, usize),
    clip_limit: f64,
) -> [f64; BINS] {
    let mut hist = [0.0f64; BINS];
    for y in y0..y1 {
        for p in &pixels[y * width + x0..y * width + x1] {
            hist[bin_of(p.l)] += 1.0;
        }
    }

    let area = ((x1 - x0) * (y1 - y0)) as f64;
    let limit = (clip_limit * area / BINS as f64).max(1.0);
    let mut excess = 0.0;
    for h in hist.iter_mut() {
        if *h > limit {
            excess += *h - limit;
            *h = limit;
        }
    }
    let bonus = excess / BINS as f64;

    let mut map = [0.0f64; BINS];
    let mut cdf = 0.0;
    for (slot, h) in map.iter_mut().zip(hist.iter()) {
        cdf += h + bonus;
        *slot = (cdf / area * 100.0).min(100.0);
    }
    map
}

/// Lower and upper tile index around `pos`, and the weight of the upper one.
#[inline]
fn neighbours(pos: usize, tile_size: f64, count: usize) -> (usize, usize, f64) {
    let f = ((pos as f64 + 0.5) / tile_size - 0.5).max(0.0);
    let lo = (f.floor() as usize).min(count - 1);
    let hi = (lo + 1).min(count - 1);
    (lo, hi, (f - lo as f64).clamp(0.0, 1.0))
}

/// CLAHE over the L channel with `tiles` x `tiles` tiles (fewer when the
/// image is smaller than that).
pub fn equalize_lightness(
    pixels: &[LabColor],
    width: usize,
    height: usize,
    clip_limit: f64,
    tiles: usize,
) -> Vec<LabColor> {
    if pixels.is_empty() || width == 0 || height == 0 || pixels.len() != width * height {
        return pixels.to_vec();
    }

    let tiles_x = tiles.clamp(1, width);
    let tiles_y = tiles.clamp(1, height);
    let coords: Vec<(usize, usize)> = (0..tiles_y)
        .flat_map(|ty| (0..tiles_x).map(move |tx| (tx, ty)))
        .collect();
    let maps: Vec<[f64; BINS]> = coords
        .par_iter()
        .map(|&(tx, ty)| {
            tile_mapping(
                pixels,
                width,
                (tx * width / tiles_x, (tx + 1) * width / tiles_x),
                (ty * height / tiles_y, (ty + 1) * height / tiles_y),
                clip_limit,
            )
        })
        .collect();

    let tile_w = width as f64 / tiles_x as f64;
    let tile_h = height as f64 / tiles_y as f64;

    pixels
        .par_iter()
        .enumerate()
        .map(|(i, p)| {
            let (tx0, tx1, wx) = neighbours(i % width, tile_w, tiles_x);
            let (ty0, ty1, wy) = neighbours(i / width, tile_h, tiles_y);
            let bin = bin_of(p.l);
            let at = |tx: usize, ty: usize| maps[ty * tiles_x + tx][bin];
            let top = at(tx0, ty0) * (1.0 - wx) + at(tx1, ty0) * wx;
            let bottom = at(tx0, ty1) * (1.0 - wx) + at(tx1, ty1) * wx;
            LabColor::new(top * (1.0 - wy) + bottom * wy, p.a, p.b)
        })
        .collect()
}
