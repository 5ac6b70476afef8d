//! The finished pattern and its JSON wire form.

use crate::catalog::ThreadEntry;
use crate::pattern::PatternType;
use serde::{Serialize, Serializer};

/// Value of an unstitched (background) grid cell.
pub const UNSTITCHED: i32 = -1;

const CM_PER_INCH: f64 = 2.54;

/// Printable glyphs assigned to palette entries, by palette index.
pub const SYMBOLS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+#%@*=&$?!~^<>/";

/// Most palette entries that still get unique symbols.
pub fn max_symbols() -> usize {
    SYMBOLS.chars().count()
}

/// Symbol for a palette index, cycling the alphabet.
pub fn symbol_for(index: usize) -> char {
    let n = max_symbols();
    SYMBOLS.chars().nth(index % n).unwrap_or('?')
}

/// Row-major grid of palette indices; `-1` marks an unstitched cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StitchGrid {
    pub width: u32,
    pub height: u32,
    pub cells: Vec<i32>,
}

impl StitchGrid {
    pub fn get(&self, x: u32, y: u32) -> i32 {
        self.cells[y as usize * self.width as usize + x as usize]
    }

    pub fn rows(&self) -> Vec<Vec<i32>> {
        self.cells
            .chunks(self.width.max(1) as usize)
            .map(|row| row.to_vec())
            .collect()
    }

    /// Cells that carry a stitch.
    pub fn stitched_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c != UNSTITCHED).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaletteEntry {
    pub thread: ThreadEntry,
    pub symbol: char,
    /// Mean ΔE to the thread over the pixels it represents: cluster members,
    /// or the cells it was dithered onto
    pub delta_e: f64,
    pub stitch_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dimensions {
    pub width_stitches: u32,
    pub height_stitches: u32,
    pub width_cm: f64,
    pub height_cm: f64,
}

impl Dimensions {
    /// Physical size on fabric with `aida_count` stitches per inch.
    pub fn from_stitches(width: u32, height: u32, aida_count: u32) -> Self {
        let cm_per_stitch = CM_PER_INCH / aida_count as f64;
        Self {
            width_stitches: width,
            height_stitches: height,
            width_cm: width as f64 * cm_per_stitch,
            height_cm: height as f64 * cm_per_stitch,
        }
    }
}

/// Output of one conversion. Immutable; the caller owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternArtifact {
    pub pattern_id: String,
    pub pattern_type: PatternType,
    pub grid: StitchGrid,
    pub color_palette: Vec<PaletteEntry>,
    pub dimensions: Dimensions,
    pub estimated_time_minutes: u32,
}

#[derive(Debug, Serialize)]
pub struct GridData {
    pub grid: Vec<Vec<i32>>,
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Serialize)]
pub struct PaletteColor {
    pub rgb: [u8; 3],
    pub thread_code: String,
    pub thread_brand: String,
    pub thread_name: String,
    pub symbol: String,
    pub delta_e: f64,
    pub stitch_count: usize,
}

/// Snake-case document the client consumes.
#[derive(Debug, Serialize)]
pub struct PatternDocument {
    pub pattern_id: String,
    pub grid_data: GridData,
    pub color_palette: Vec<PaletteColor>,
    pub dimensions: Dimensions,
    pub estimated_time: u32,
}

impl PatternArtifact {
    pub fn to_document(&self) -> PatternDocument {
        PatternDocument {
            pattern_id: self.pattern_id.clone(),
            grid_data: GridData {
                grid: self.grid.rows(),
                pattern_type: self.pattern_type,
                width: self.grid.width,
                height: self.grid.height,
            },
            color_palette: self
                .color_palette
                .iter()
                .map(|entry| PaletteColor {
                    rgb: [entry.thread.rgb.r, entry.thread.rgb.g, entry.thread.rgb.b],
                    thread_code: entry.thread.color_code.clone(),
                    thread_brand: entry.thread.brand.to_string(),
                    thread_name: entry.thread.display_name().to_string(),
                    symbol: entry.symbol.to_string(),
                    delta_e: (entry.delta_e * 100.0).round() / 100.0,
                    stitch_count: entry.stitch_count,
                })
                .collect(),
            dimensions: self.dimensions,
            estimated_time: self.estimated_time_minutes,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for PatternArtifact {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_document().serialize(serializer)
    }
}
