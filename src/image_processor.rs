pub use anyhow::Result;
use crate::color_space::{rgb_to_lab, LabColor, RgbColor};
use crate::error::PatternError;
use image::imageops::FilterType;
use rayon::prelude::*;

/// Decoded source image, row-major.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<RgbColor>,
}

impl ImageData {
    /// Checked constructor: non-zero dimensions and a matching pixel count.
    pub fn new(width: u32, height: u32, pixels: Vec<RgbColor>) -> std::result::Result<Self, PatternError> {
        if width == 0 || height == 0 {
            return Err(PatternError::InvalidImage(format!(
                "zero dimension {}x{}",
                width, height
            )));
        }
        if pixels.len() != width as usize * height as usize {
            return Err(PatternError::InvalidImage(format!(
                "expected {} pixels for {}x{}, got {}",
                width as usize * height as usize,
                width,
                height,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build from a 2D array of rows. Rows must be non-empty and equally long.
    pub fn from_rows(rows: &[Vec<RgbColor>]) -> std::result::Result<Self, PatternError> {
        let height = rows.len();
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(PatternError::InvalidImage("image is empty".to_string()));
        }
        if let Some((y, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(PatternError::InvalidImage(format!(
                "row {} has {} pixels, expected {}",
                y,
                row.len(),
                width
            )));
        }
        let pixels = rows.iter().flatten().copied().collect();
        Self::new(width as u32, height as u32, pixels)
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> RgbColor {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// Convert every pixel to LAB.
    pub fn to_lab(&self) -> Vec<LabColor> {
        self.pixels.par_iter().map(|&p| rgb_to_lab(p)).collect()
    }

    /// Downsample to fit within `max_width` x `max_height`, keeping the aspect
    /// ratio. Never upscales; returns a copy when already small enough.
    pub fn resize_to_fit(&self, max_width: u32, max_height: u32) -> ImageData {
        let (w, h) = fit_dimensions(self.width, self.height, max_width, max_height);
        if w == self.width && h == self.height {
            return self.clone();
        }

        let Some(buffer) = self.to_rgb_image() else {
            return self.clone();
        };
        let resized = image::imageops::resize(&buffer, w, h, FilterType::Triangle);
        let pixels = resized
            .pixels()
            .map(|p| RgbColor::new(p[0], p[1], p[2]))
            .collect();

        ImageData {
            width: w,
            height: h,
            pixels,
        }
    }

    /// Gaussian blur with standard deviation `sigma` in pixels. A
    /// non-positive sigma returns an unblurred copy.
    pub fn blurred(&self, sigma: f32) -> ImageData {
        if sigma <= 0.0 {
            return self.clone();
        }
        let Some(buffer) = self.to_rgb_image() else {
            return self.clone();
        };
        let blurred = image::imageops::blur(&buffer, sigma);
        ImageData {
            width: self.width,
            height: self.height,
            pixels: blurred.pixels().map(|p| RgbColor::new(p[0], p[1], p[2])).collect(),
        }
    }

    fn to_rgb_image(&self) -> Option<image::RgbImage> {
        let raw: Vec<u8> = self.pixels.iter().flat_map(|p| [p.r, p.g, p.b]).collect();
        image::RgbImage::from_raw(self.width, self.height, raw)
    }
}

/// Largest size within the bounds that keeps the aspect ratio, at least 1x1.
pub fn fit_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    let max_width = max_width.max(1);
    let max_height = max_height.max(1);
    if width <= max_width && height <= max_height {
        return (width, height);
    }
    let scale = (max_width as f64 / width as f64).min(max_height as f64 / height as f64);
    let w = ((width as f64 * scale).round() as u32).clamp(1, max_width);
    let h = ((height as f64 * scale).round() as u32).clamp(1, max_height);
    (w, h)
}

/// Load an image file, compositing any transparency onto white.
pub fn load_image(path: &std::path::Path) -> Result<ImageData> {
    let img = image::open(path)?;
    Ok(from_dynamic_image(&img)?)
}

/// Decode an in-memory encoded image (PNG, JPEG, ...).
pub fn load_image_from_memory(bytes: &[u8]) -> Result<ImageData> {
    let img = image::load_from_memory(bytes)?;
    Ok(from_dynamic_image(&img)?)
}

fn from_dynamic_image(img: &image::DynamicImage) -> std::result::Result<ImageData, PatternError> {
    let rgba = img.to_rgba8();
    let pixels: Vec<RgbColor> = rgba
        .pixels()
        .map(|p| {
            let a = p[3] as f32 / 255.0;
            let blend = |c: u8| (c as f32 * a + 255.0 * (1.0 - a)).round() as u8;
            RgbColor::new(blend(p[0]), blend(p[1]), blend(p[2]))
        })
        .collect();

    ImageData::new(rgba.width(), rgba.height(), pixels)
}

#[cfg(test)]
mod tests {
    include!("image_processor_tests.rs");
}
