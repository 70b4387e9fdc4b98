use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{JunkyardError, Result};
use crate::imaging::{ImageFormat, ImageOutputFormat, ResizeMode, ResizeSpec};
use crate::media::{VideoCodec, VideoFormat};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub archive: ArchiveOptions,
    pub change_extension: ChangeExtensionOptions,
    pub image_convert: ImageConvertOptions,
    pub thumbnail: ThumbnailOptions,
    pub subtitle: SubtitleOptions,
    pub video: VideoOptions,
    pub encoder: EncoderConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveOptions {
    /// Recurse into each sub-directory and keep it as the entry prefix
    pub include_parent_directory: bool,
}

impl ArchiveOptions {
    pub fn toggle_parent_directory(&mut self) {
        self.include_parent_directory = !self.include_parent_directory;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeExtensionOptions {
    /// Extension to look for, without the dot
    pub from: String,
    /// Replacement extension, without the dot
    pub to: String,
    pub ignore_case: bool,
}

impl ChangeExtensionOptions {
    pub fn set_from(&mut self, value: &str) {
        self.from = normalize_extension(value);
    }

    pub fn set_to(&mut self, value: &str) {
        self.to = normalize_extension(value);
    }

    pub fn toggle_ignore_case(&mut self) {
        self.ignore_case = !self.ignore_case;
    }

    pub fn validate(&self) -> Result<()> {
        if self.from.is_empty() || self.to.is_empty() {
            return Err(JunkyardError::Config(
                "Both source and target extensions are required".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ChangeExtensionOptions {
    fn default() -> Self {
        Self {
            from: "jpeg".to_string(),
            to: "jpg".to_string(),
            ignore_case: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConvertOptions {
    pub from: ImageFormat,
    pub to: ImageFormat,
    /// Also convert images stored inside zip/cbz archives
    pub include_archive_files: bool,
}

impl Default for ImageConvertOptions {
    fn default() -> Self {
        Self {
            from: ImageFormat::Png,
            to: ImageFormat::Webp,
            include_archive_files: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailOptions {
    pub target_formats: Vec<ImageFormat>,
    pub output_format: ImageOutputFormat,
    pub resize_mode: ResizeMode,
    pub width: u32,
    pub height: u32,
    /// Percentage of the source width, in (0, 100]
    pub ratio: f64,
}

impl ThumbnailOptions {
    pub fn add_target_format(&mut self, format: ImageFormat) {
        if !self.target_formats.contains(&format) {
            self.target_formats.push(format);
        }
    }

    pub fn remove_target_format(&mut self, format: ImageFormat) {
        self.target_formats.retain(|f| *f != format);
    }

    /// Parse user input; unparseable input keeps the previous width
    pub fn set_width_input(&mut self, input: &str) {
        if let Ok(width) = input.trim().parse() {
            self.width = width;
        }
    }

    /// Parse user input; unparseable input keeps the previous height
    pub fn set_height_input(&mut self, input: &str) {
        if let Ok(height) = input.trim().parse() {
            self.height = height;
        }
    }

    /// Parse user input; only values in (0, 100] are accepted
    pub fn set_ratio_input(&mut self, input: &str) {
        if let Ok(ratio) = input.trim().parse::<f64>() {
            if ratio > 0.0 && ratio <= 100.0 {
                self.ratio = ratio;
            }
        }
    }

    pub fn resize_spec(&self) -> ResizeSpec {
        ResizeSpec {
            mode: self.resize_mode,
            width: self.width,
            height: self.height,
            ratio: self.ratio,
        }
    }
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self {
            target_formats: ImageFormat::ALL.to_vec(),
            output_format: ImageOutputFormat::Jpeg,
            resize_mode: ResizeMode::FixedSize,
            width: 200,
            height: 200,
            ratio: 50.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleOptions {
    /// Milliseconds added to every timestamp, may be negative
    pub shift_millis: i64,
}

impl SubtitleOptions {
    /// Parse user input; unparseable input keeps the previous shift
    pub fn set_shift_input(&mut self, input: &str) {
        if let Ok(shift) = input.trim().parse() {
            self.shift_millis = shift;
        }
    }

    pub fn increase_shift(&mut self) {
        self.shift_millis = self.shift_millis.saturating_add(1);
    }

    pub fn decrease_shift(&mut self) {
        self.shift_millis = self.shift_millis.saturating_sub(1);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoOptions {
    pub codec: VideoCodec,
    pub use_hardware_encoder: bool,
    pub target_format: VideoFormat,
}

impl VideoOptions {
    pub fn toggle_hardware_encoder(&mut self) {
        self.use_hardware_encoder = !self.use_hardware_encoder;
    }
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            codec: VideoCodec::H264,
            use_hardware_encoder: true,
            target_format: VideoFormat::All,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Encoder binary resolved through PATH when no bundle is found
    pub binary_path: String,
    /// Directory holding `<linux|macos|windows>/ffmpeg[.exe]`
    pub bundle_dir: Option<PathBuf>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            bundle_dir: None,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| JunkyardError::Config(format!("Failed to read config file: {}", e)))?;

        Ok(toml::from_str(&content)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| JunkyardError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| JunkyardError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

fn normalize_extension(value: &str) -> String {
    value.trim().trim_start_matches('.').to_string()
}
