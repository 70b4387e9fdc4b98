use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use crate::error::{JunkyardError, Result};

/// Number of leading bytes needed to recognise every supported format.
const SNIFF_LEN: u64 = 32;

/// Image formats the toolbox can read and write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 4] = [
        ImageFormat::Jpeg,
        ImageFormat::Png,
        ImageFormat::Gif,
        ImageFormat::Webp,
    ];

    /// File extensions associated with the format, preferred one first
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            ImageFormat::Jpeg => &["jpg", "jpeg"],
            ImageFormat::Png => &["png"],
            ImageFormat::Gif => &["gif"],
            ImageFormat::Webp => &["webp"],
        }
    }

    pub fn primary_extension(&self) -> &'static str {
        self.extensions()[0]
    }

    /// Check whether the path carries one of this format's extensions (case-insensitive)
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    /// Detect the format from magic bytes
    pub fn detect(data: &[u8]) -> Option<Self> {
        match image::guess_format(data).ok()? {
            image::ImageFormat::Jpeg => Some(ImageFormat::Jpeg),
            image::ImageFormat::Png => Some(ImageFormat::Png),
            image::ImageFormat::Gif => Some(ImageFormat::Gif),
            image::ImageFormat::WebP => Some(ImageFormat::Webp),
            _ => None,
        }
    }

    /// Detect the format of a file by reading only its header
    pub fn detect_file<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let mut header = Vec::with_capacity(SNIFF_LEN as usize);
        std::fs::File::open(path.as_ref())?
            .take(SNIFF_LEN)
            .read_to_end(&mut header)?;
        Ok(Self::detect(&header))
    }

    pub(crate) fn to_image_crate(self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Gif => image::ImageFormat::Gif,
            ImageFormat::Webp => image::ImageFormat::WebP,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
        };
        f.write_str(name)
    }
}

impl FromStr for ImageFormat {
    type Err = JunkyardError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().trim_start_matches('.').to_lowercase();
        ImageFormat::ALL
            .into_iter()
            .find(|format| format.extensions().contains(&normalized.as_str()))
            .ok_or_else(|| JunkyardError::UnsupportedFormat(format!(
                "Invalid image format '{}'. Valid formats: jpeg, png, gif, webp",
                s
            )))
    }
}

/// Output choice for tools that may keep the source format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageOutputFormat {
    Jpeg,
    Png,
    Webp,
    Original,
}

impl ImageOutputFormat {
    /// Concrete format to encode with, given the source's detected format
    pub fn resolve(&self, source: ImageFormat) -> ImageFormat {
        match self {
            ImageOutputFormat::Jpeg => ImageFormat::Jpeg,
            ImageOutputFormat::Png => ImageFormat::Png,
            ImageOutputFormat::Webp => ImageFormat::Webp,
            ImageOutputFormat::Original => source,
        }
    }
}

impl FromStr for ImageOutputFormat {
    type Err = JunkyardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(ImageOutputFormat::Jpeg),
            "png" => Ok(ImageOutputFormat::Png),
            "webp" => Ok(ImageOutputFormat::Webp),
            "original" => Ok(ImageOutputFormat::Original),
            _ => Err(JunkyardError::UnsupportedFormat(format!(
                "Invalid output format '{}'. Valid formats: jpeg, png, webp, original",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_magic_bytes() {
        assert_eq!(ImageFormat::detect(b"\x89PNG\r\n\x1a\n0000"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::detect(b"GIF89a......"), Some(ImageFormat::Gif));
        assert_eq!(ImageFormat::detect(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::detect(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageFormat::Webp));
        assert_eq!(ImageFormat::detect(b"plain text"), None);
    }

    #[test]
    fn test_matches_extension_ignores_case() {
        assert!(ImageFormat::Jpeg.matches_extension(Path::new("a/photo.JPEG")));
        assert!(ImageFormat::Jpeg.matches_extension(Path::new("photo.jpg")));
        assert!(!ImageFormat::Jpeg.matches_extension(Path::new("photo.png")));
        assert!(!ImageFormat::Png.matches_extension(Path::new("png")));
    }

    #[test]
    fn test_parse_formats() {
        assert_eq!("JPG".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert_eq!(".webp".parse::<ImageFormat>().unwrap(), ImageFormat::Webp);
        assert!("bmp".parse::<ImageFormat>().is_err());
        assert_eq!(
            "original".parse::<ImageOutputFormat>().unwrap().resolve(ImageFormat::Gif),
            ImageFormat::Gif
        );
    }
}
