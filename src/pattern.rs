//! Pattern building: resize, convert, quantize, match, assemble.
//!
//! [`PatternBuilder`] borrows a [`ThreadCatalog`] that the caller constructs
//! once and shares; each [`PatternBuilder::build`] call is self-contained and
//! either returns a complete [`PatternArtifact`] or an error.

use crate::artifact::{
    max_symbols, symbol_for, Dimensions, PaletteEntry, PatternArtifact, StitchGrid, UNSTITCHED,
};
use crate::catalog::{Brand, ThreadCatalog, ThreadEntry};
use crate::dither::floyd_steinberg;
use crate::edge_detector::detect_edges_sobel;
use crate::error::PatternError;
use crate::image_processor::ImageData;
use crate::matcher::{find_closest, MatchOptions};
use crate::preprocessor::{preprocess, PreprocessOptions};
use crate::quantizer::{quantize, QuantizeOptions};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Fabric counts (stitches per inch) a pattern can target.
pub const SUPPORTED_AIDA_COUNTS: [u32; 4] = [14, 16, 18, 20];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    /// Every cell is stitched
    #[default]
    CrossStitch,
    /// Only cells on colour boundaries are stitched
    Outline,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::CrossStitch => "cross_stitch",
            PatternType::Outline => "outline",
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for one conversion. Every field has a default, so a JSON config
/// file only needs the keys it changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub pattern_type: PatternType,
    /// Brand name as accepted by [`Brand`]'s `FromStr` (default: DMC)
    pub thread_brand: String,
    /// Upper bound on palette size (default: 16)
    pub max_colors: usize,
    /// Stitches per inch: 14, 16, 18 or 20 (default: 14)
    pub aida_count: u32,
    /// Floyd-Steinberg dithering of the cross-stitch grid
    pub enable_dithering: bool,
    /// Prefer threads from `inventory_ids` when matching
    pub use_inventory: bool,
    pub inventory_ids: HashSet<String>,
    /// Output width cap in stitches (default: 150)
    pub max_width: u32,
    /// Output height cap in stitches (default: 150)
    pub max_height: u32,
    /// Physical target width; overrides `max_width` when set
    pub target_width_cm: Option<f64>,
    /// K-means seed; random per call when unset
    pub seed: Option<u64>,
    /// Quantizer training sample cap
    pub sample_limit: Option<usize>,
    /// Outline sensitivity: minimum LAB gradient magnitude for a stitch
    pub edge_threshold: f64,
    /// Gaussian blur sigma applied before edge detection; 0 disables
    pub edge_blur_sigma: f32,
    /// Adaptive histogram equalization of lightness before quantizing
    pub enhance_contrast: bool,
    pub contrast_clip_limit: f64,
    /// Equalization tiles per side
    pub contrast_tiles: u32,
    pub seconds_per_stitch: f64,
    /// Thread-change overhead per palette colour
    pub minutes_per_color: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            pattern_type: PatternType::CrossStitch,
            thread_brand: Brand::Dmc.to_string(),
            max_colors: 16,
            aida_count: 14,
            enable_dithering: false,
            use_inventory: false,
            inventory_ids: HashSet::new(),
            max_width: 150,
            max_height: 150,
            target_width_cm: None,
            seed: None,
            sample_limit: Some(50_000),
            edge_threshold: 12.0,
            edge_blur_sigma: 1.0,
            enhance_contrast: false,
            contrast_clip_limit: 3.0,
            contrast_tiles: 8,
            seconds_per_stitch: 3.0,
            minutes_per_color: 5.0,
        }
    }
}

impl PatternConfig {
    pub fn validate(&self) -> Result<(), PatternError> {
        if self.max_colors == 0 || self.max_colors > max_symbols() {
            return Err(PatternError::InvalidConfig(format!(
                "max_colors must be between 1 and {}, got {}",
                max_symbols(),
                self.max_colors
            )));
        }
        if !SUPPORTED_AIDA_COUNTS.contains(&self.aida_count) {
            return Err(PatternError::InvalidConfig(format!(
                "aida_count must be one of {:?}, got {}",
                SUPPORTED_AIDA_COUNTS, self.aida_count
            )));
        }
        if self.max_width == 0 || self.max_height == 0 {
            return Err(PatternError::InvalidConfig(
                "max_width and max_height must be positive".to_string(),
            ));
        }
        if let Some(cm) = self.target_width_cm {
            if !(cm.is_finite() && cm > 0.0) {
                return Err(PatternError::InvalidConfig(format!(
                    "target_width_cm must be positive, got {}",
                    cm
                )));
            }
        }
        if !(self.edge_blur_sigma.is_finite() && self.edge_blur_sigma >= 0.0) {
            return Err(PatternError::InvalidConfig(format!(
                "edge_blur_sigma must be zero or positive, got {}",
                self.edge_blur_sigma
            )));
        }
        if !(self.contrast_clip_limit.is_finite() && self.contrast_clip_limit > 0.0) {
            return Err(PatternError::InvalidConfig(format!(
                "contrast_clip_limit must be positive, got {}",
                self.contrast_clip_limit
            )));
        }
        if self.contrast_tiles == 0 {
            return Err(PatternError::InvalidConfig("contrast_tiles must be positive".to_string()));
        }
        Ok(())
    }

    /// Width cap in stitches after applying `target_width_cm`.
    pub fn effective_max_width(&self) -> u32 {
        match self.target_width_cm {
            Some(cm) => ((cm * self.aida_count as f64 / 2.54).round() as u32).max(1),
            None => self.max_width,
        }
    }

    fn quantize_options(&self) -> QuantizeOptions {
        QuantizeOptions {
            seed: self.seed,
            sample_limit: self.sample_limit,
            ..Default::default()
        }
    }

    fn preprocess_options(&self) -> PreprocessOptions {
        PreprocessOptions {
            enhance_contrast: self.enhance_contrast,
            clip_limit: self.contrast_clip_limit,
            tile_grid: self.contrast_tiles,
        }
    }

    fn match_options(&self) -> MatchOptions {
        MatchOptions {
            prefer_inventory: self.use_inventory,
            inventory_ids: self.inventory_ids.clone(),
        }
    }
}

/// Rough stitching time: per-stitch time plus a thread-change overhead per
/// colour, rounded up to whole minutes.
pub fn estimate_minutes(stitches: usize, colors: usize, seconds_per_stitch: f64, minutes_per_color: f64) -> u32 {
    let minutes = stitches as f64 * seconds_per_stitch / 60.0 + colors as f64 * minutes_per_color;
    minutes.max(0.0).ceil() as u32
}

/// Clusters that matched the same thread, before compaction.
struct MergedColor<'a> {
    thread: &'a ThreadEntry,
    weighted_delta_e: f64,
    members: usize,
    delta_e_sum: f64,
    clusters: usize,
}

impl MergedColor<'_> {
    fn mean_delta_e(&self) -> f64 {
        if self.members > 0 {
            self.weighted_delta_e / self.members as f64
        } else {
            self.delta_e_sum / self.clusters.max(1) as f64
        }
    }
}

pub struct PatternBuilder<'a> {
    catalog: &'a ThreadCatalog,
}

impl<'a> PatternBuilder<'a> {
    pub fn new(catalog: &'a ThreadCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'a ThreadCatalog {
        self.catalog
    }

    /// Convert `image` into a stitch pattern.
    pub fn build(&self, image: &ImageData, config: &PatternConfig) -> Result<PatternArtifact, PatternError> {
        if image.width == 0 || image.height == 0 || image.pixels.is_empty() {
            return Err(PatternError::InvalidImage(format!(
                "empty image ({}x{})",
                image.width, image.height
            )));
        }
        if image.pixels.len() != image.width as usize * image.height as usize {
            return Err(PatternError::InvalidImage(format!(
                "{} pixels do not fill {}x{}",
                image.pixels.len(),
                image.width,
                image.height
            )));
        }
        config.validate()?;

        let brand: Brand = config
            .thread_brand
            .parse()
            .map_err(|_| PatternError::UnsupportedBrand(config.thread_brand.clone()))?;
        let candidates = self.catalog.by_brand(brand);
        if candidates.is_empty() {
            return Err(PatternError::UnsupportedBrand(brand.to_string()));
        }

        // Resize
        let resized = image.resize_to_fit(config.effective_max_width(), config.max_height);
        let width = resized.width as usize;
        let height = resized.height as usize;
        log::debug!(
            "Resized {}x{} to {}x{} stitches",
            image.width,
            image.height,
            width,
            height
        );

        // Convert
        let labs = preprocess(&resized.to_lab(), width, height, &config.preprocess_options());

        // Quantize
        let quantization = quantize(&labs, config.max_colors, &config.quantize_options())?;

        // Match and merge clusters that land on the same thread
        let match_options = config.match_options();
        let mut merged: Vec<MergedColor<'a>> = Vec::new();
        let mut merged_by_id: HashMap<&str, usize> = HashMap::new();
        let mut cluster_to_merged = Vec::with_capacity(quantization.clusters.len());

        for (ci, cluster) in quantization.clusters.iter().enumerate() {
            let m = find_closest(&cluster.centroid, &candidates, &match_options)?;
            let idx = *merged_by_id.entry(m.thread.thread_id.as_str()).or_insert_with(|| {
                merged.push(MergedColor {
                    thread: m.thread,
                    weighted_delta_e: 0.0,
                    members: 0,
                    delta_e_sum: 0.0,
                    clusters: 0,
                });
                merged.len() - 1
            });
            if merged[idx].clusters > 0 {
                log::debug!("Cluster {} merged into thread {}", ci, m.thread.thread_id);
            }
            let entry = &mut merged[idx];
            entry.weighted_delta_e += m.delta_e * cluster.member_count as f64;
            entry.members += cluster.member_count;
            entry.delta_e_sum += m.delta_e;
            entry.clusters += 1;
            cluster_to_merged.push(idx);
        }

        // Assemble
        let dithered = config.enable_dithering && config.pattern_type == PatternType::CrossStitch;
        let indices: Vec<usize> = if dithered {
            let palette_labs: Vec<_> = merged.iter().map(|m| m.thread.lab).collect();
            let indices = floyd_steinberg(&labs, width, height, &palette_labs);
            // Score each thread against the cells dithered onto it
            for entry in merged.iter_mut() {
                entry.weighted_delta_e = 0.0;
                entry.members = 0;
            }
            for (lab, &m) in labs.iter().zip(&indices) {
                let entry = &mut merged[m];
                entry.weighted_delta_e += lab.delta_e(&entry.thread.lab);
                entry.members += 1;
            }
            indices
        } else {
            quantization
                .assignments
                .iter()
                .map(|&c| cluster_to_merged[c])
                .collect()
        };

        let mut cells: Vec<i32> = indices.iter().map(|&i| i as i32).collect();
        if config.pattern_type == PatternType::Outline {
            let smoothed = resized.blurred(config.edge_blur_sigma).to_lab();
            let edges = detect_edges_sobel(&smoothed, resized.width, resized.height);
            for (i, cell) in cells.iter_mut().enumerate() {
                if !edges.is_edge(i, config.edge_threshold) {
                    *cell = UNSTITCHED;
                }
            }
        }

        // Compact: drop unused colours, order by usage
        let mut usage = vec![0usize; merged.len()];
        for &c in cells.iter().filter(|&&c| c != UNSTITCHED) {
            usage[c as usize] += 1;
        }
        let mut order: Vec<usize> = (0..merged.len()).filter(|&i| usage[i] > 0).collect();
        order.sort_by(|&a, &b| {
            usage[b]
                .cmp(&usage[a])
                .then_with(|| merged[a].thread.thread_id.cmp(&merged[b].thread.thread_id))
        });
        let mut remap = vec![UNSTITCHED; merged.len()];
        for (new_idx, &old_idx) in order.iter().enumerate() {
            remap[old_idx] = new_idx as i32;
        }
        for cell in cells.iter_mut().filter(|c| **c != UNSTITCHED) {
            *cell = remap[*cell as usize];
        }

        let color_palette: Vec<PaletteEntry> = order
            .iter()
            .enumerate()
            .map(|(new_idx, &old_idx)| PaletteEntry {
                thread: merged[old_idx].thread.clone(),
                symbol: symbol_for(new_idx),
                delta_e: merged[old_idx].mean_delta_e(),
                stitch_count: usage[old_idx],
            })
            .collect();

        let grid = StitchGrid {
            width: resized.width,
            height: resized.height,
            cells,
        };
        let dimensions = Dimensions::from_stitches(grid.width, grid.height, config.aida_count);
        let estimated_time_minutes = estimate_minutes(
            grid.stitched_count(),
            color_palette.len(),
            config.seconds_per_stitch,
            config.minutes_per_color,
        );
        let pattern_id = pattern_id(&grid, &color_palette, &dimensions, estimated_time_minutes, config);

        log::info!(
            "Built {} pattern {}: {}x{} stitches, {} colors ({} clusters), ~{} min",
            config.pattern_type,
            pattern_id,
            grid.width,
            grid.height,
            color_palette.len(),
            quantization.clusters.len(),
            estimated_time_minutes
        );

        Ok(PatternArtifact {
            pattern_id,
            pattern_type: config.pattern_type,
            grid,
            color_palette,
            dimensions,
            estimated_time_minutes,
        })
    }
}

const PATTERN_ID_VERSION: u8 = 1;

/// Content-derived id: SHA-256 over everything that ends up in the artifact,
/// so identical outputs share an id across runs and platforms.
fn pattern_id(
    grid: &StitchGrid,
    palette: &[PaletteEntry],
    dimensions: &Dimensions,
    estimated_time_minutes: u32,
    config: &PatternConfig,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update([PATTERN_ID_VERSION]);
    hasher.update(config.pattern_type.as_str().as_bytes());
    hasher.update(grid.width.to_le_bytes());
    hasher.update(grid.height.to_le_bytes());
    for cell in &grid.cells {
        hasher.update(cell.to_le_bytes());
    }
    for entry in palette {
        hasher.update(entry.thread.thread_id.as_bytes());
        hasher.update(b"|");
    }
    hasher.update(config.aida_count.to_le_bytes());
    hasher.update(dimensions.width_cm.to_le_bytes());
    hasher.update(dimensions.height_cm.to_le_bytes());
    hasher.update(config.seconds_per_stitch.to_le_bytes());
    hasher.update(config.minutes_per_color.to_le_bytes());
    hasher.update(estimated_time_minutes.to_le_bytes());
    let digest = hasher.finalize();
    let hex: String = digest[..8].iter().map(|b| format!("{:02x}", b)).collect();
    format!("pattern_{}", hex)
}
