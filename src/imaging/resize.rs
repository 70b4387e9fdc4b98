//! Thumbnail sizing policies.
//!
//! Dimension math is kept pure so it can be tested without decoding images.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Frame};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{JunkyardError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeMode {
    /// Exact width x height, aspect ratio ignored
    FixedSize,
    /// Scale to the configured width, height follows the source aspect ratio
    AspectRatio,
    /// Scale to a percentage of the source width, aspect ratio preserved
    Ratio,
}

impl FromStr for ResizeMode {
    type Err = JunkyardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "fixed_size" | "fixed" => Ok(ResizeMode::FixedSize),
            "aspect_ratio" | "aspect" => Ok(ResizeMode::AspectRatio),
            "ratio" => Ok(ResizeMode::Ratio),
            _ => Err(JunkyardError::Config(format!(
                "Invalid resize mode '{}'. Valid modes: fixed-size, aspect-ratio, ratio",
                s
            ))),
        }
    }
}

/// Resolved resize request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeSpec {
    pub mode: ResizeMode,
    pub width: u32,
    pub height: u32,
    /// Percentage in (0, 100]
    pub ratio: f64,
}

impl ResizeSpec {
    /// Compute output dimensions for a source of `(width, height)`
    pub fn target_dimensions(&self, source: (u32, u32)) -> (u32, u32) {
        let (src_w, _) = source;
        let (w, h) = match self.mode {
            ResizeMode::FixedSize => (self.width, self.height),
            ResizeMode::AspectRatio => (self.width, scaled_height(source, self.width)),
            ResizeMode::Ratio => {
                let w = (src_w as f64 * self.ratio / 100.0) as u32;
                (w, scaled_height(source, w))
            }
        };
        (w.max(1), h.max(1))
    }

    pub fn apply(&self, image: &DynamicImage) -> DynamicImage {
        let (w, h) = self.target_dimensions((image.width(), image.height()));
        image.resize_exact(w, h, FilterType::Lanczos3)
    }

    /// Resize one animation frame, keeping its delay
    pub fn apply_to_frame(&self, frame: &Frame) -> Frame {
        let buffer = frame.buffer();
        let (w, h) = self.target_dimensions((buffer.width(), buffer.height()));
        let resized = imageops::resize(buffer, w, h, FilterType::Lanczos3);
        Frame::from_parts(resized, 0, 0, frame.delay())
    }
}

fn scaled_height(source: (u32, u32), width: u32) -> u32 {
    let (src_w, src_h) = source;
    if src_w == 0 {
        return 0;
    }
    (src_h as f64 * width as f64 / src_w as f64).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(mode: ResizeMode) -> ResizeSpec {
        ResizeSpec { mode, width: 200, height: 100, ratio: 50.0 }
    }

    #[test]
    fn test_fixed_size_ignores_aspect() {
        assert_eq!(spec(ResizeMode::FixedSize).target_dimensions((1000, 1000)), (200, 100));
    }

    #[test]
    fn test_aspect_ratio_follows_width() {
        assert_eq!(spec(ResizeMode::AspectRatio).target_dimensions((800, 600)), (200, 150));
        assert_eq!(spec(ResizeMode::AspectRatio).target_dimensions((400, 800)), (200, 400));
    }

    #[test]
    fn test_ratio_scales_source() {
        assert_eq!(spec(ResizeMode::Ratio).target_dimensions((640, 480)), (320, 240));
    }

    #[test]
    fn test_dimensions_never_zero() {
        let tiny = ResizeSpec { mode: ResizeMode::Ratio, width: 0, height: 0, ratio: 1.0 };
        assert_eq!(tiny.target_dimensions((10, 10)), (1, 1));
    }

    #[test]
    fn test_parse_resize_mode() {
        assert_eq!("fixed-size".parse::<ResizeMode>().unwrap(), ResizeMode::FixedSize);
        assert_eq!("ASPECT_RATIO".parse::<ResizeMode>().unwrap(), ResizeMode::AspectRatio);
        assert!("crop".parse::<ResizeMode>().is_err());
    }
}
