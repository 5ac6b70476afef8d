//! img2stitch - turn raster images into cross-stitch and outline patterns
//!
//! This library converts an image (PNG, JPEG, etc.) into a grid of stitches
//! drawn from a real embroidery thread catalog (DMC, Anchor, Madeira,
//! Ariadna), with a symbol-keyed palette and physical dimensions.
//!
//! ## Features
//!
//! - **CIELAB** colour handling with CIE76 ΔE matching
//! - **K-means++** palette quantization, seeded and reproducible
//! - **Thread inventory** preference with fallback to the full brand
//! - **Floyd-Steinberg** dithering and **Sobel** outline patterns
//! - Optional **CLAHE** lightness equalization before quantizing
//!
//! ## Example
//!
//! ```rust,no_run
//! use img2stitch::{convert, PatternConfig, ThreadCatalog};
//! use std::path::Path;
//!
//! let catalog = ThreadCatalog::builtin().expect("Built-in catalog");
//! let config = PatternConfig {
//!     max_colors: 12,
//!     aida_count: 16,
//!     ..Default::default()
//! };
//!
//! convert(Path::new("input.png"), Path::new("pattern.json"), &config, &catalog)
//!     .expect("Conversion failed");
//! ```

pub mod artifact;
pub mod catalog;
pub mod color_space;
pub mod dither;
pub mod edge_detector;
pub mod error;
pub mod image_processor;
pub mod matcher;
pub mod pattern;
pub mod preprocessor;
pub mod quantizer;

pub use anyhow::Result;
pub use artifact::{Dimensions, PaletteEntry, PatternArtifact, PatternDocument, StitchGrid, UNSTITCHED};
pub use catalog::{Brand, ThreadCatalog, ThreadEntry, ThreadRecord};
pub use color_space::{delta_e, rgb_to_lab, LabColor, RgbColor};
pub use error::{CatalogLoadError, MatchError, PatternError, QuantizeError};
pub use image_processor::{load_image, load_image_from_memory, ImageData};
pub use matcher::{convert_thread_brand, find_closest, MatchOptions, MatchQuality, ThreadMatch};
pub use pattern::{PatternBuilder, PatternConfig, PatternType};
pub use preprocessor::{preprocess, PreprocessOptions};
pub use quantizer::{quantize, QuantizeOptions};

/// Convert an image file to a pattern and write it as JSON
///
/// # Arguments
///
/// * `input_path` - Path to the input image file
/// * `output_path` - Path to the output JSON file
/// * `config` - Pattern options
/// * `catalog` - Thread catalog to match against
///
/// # Example
///
/// ```rust,no_run
/// use img2stitch::{convert, PatternConfig, ThreadCatalog};
/// use std::path::Path;
///
/// let catalog = ThreadCatalog::builtin()?;
/// let artifact = convert(
///     Path::new("input.png"),
///     Path::new("pattern.json"),
///     &PatternConfig::default(),
///     &catalog,
/// )?;
/// println!("{} colors", artifact.color_palette.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn convert(
    input_path: &std::path::Path,
    output_path: &std::path::Path,
    config: &PatternConfig,
    catalog: &ThreadCatalog,
) -> Result<PatternArtifact> {
    let image_data = load_image(input_path)?;
    let artifact = PatternBuilder::new(catalog).build(&image_data, config)?;
    std::fs::write(output_path, artifact.to_json_pretty()?)?;
    log::info!("Wrote {}", output_path.display());
    Ok(artifact)
}

/// Convert in-memory image data to the pattern's JSON document.
pub fn convert_to_json_string(
    image_data: &ImageData,
    config: &PatternConfig,
    catalog: &ThreadCatalog,
) -> Result<String> {
    let artifact = PatternBuilder::new(catalog).build(image_data, config)?;
    Ok(artifact.to_json()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_to_json_string() {
        let catalog = ThreadCatalog::builtin().unwrap();
        let red = RgbColor::new(220, 20, 30);
        let image = ImageData::new(3, 2, vec![red; 6]).unwrap();
        let config = PatternConfig {
            max_colors: 2,
            seed: Some(1),
            ..Default::default()
        };

        let json = convert_to_json_string(&image, &config, &catalog).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["grid_data"]["width"], 3);
        assert_eq!(value["grid_data"]["height"], 2);
        assert_eq!(value["grid_data"]["type"], "cross_stitch");
        assert_eq!(value["color_palette"].as_array().unwrap().len(), 1);
        assert_eq!(value["color_palette"][0]["symbol"], "A");
        assert_eq!(value["color_palette"][0]["stitch_count"], 6);
    }

    #[test]
    fn test_convert_to_json_string_reports_bad_brand() {
        let catalog = ThreadCatalog::builtin().unwrap();
        let image = ImageData::new(1, 1, vec![RgbColor::new(0, 0, 0)]).unwrap();
        let config = PatternConfig {
            thread_brand: "Nope".to_string(),
            ..Default::default()
        };
        let err = convert_to_json_string(&image, &config, &catalog).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PatternError>(),
            Some(PatternError::UnsupportedBrand(_))
        ));
    }
}
