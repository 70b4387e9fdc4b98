use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use super::{BinaryBundle, MediaCommandBuilder};
use crate::config::EncoderConfig;
use crate::error::{JunkyardError, Result};

/// Name of the encoder executable, without platform suffix
pub const ENCODER_BINARY: &str = "ffmpeg";

/// Operating system family, used for bundle layout and hardware encoders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Mac,
    Linux,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => Platform::Windows,
            "macos" => Platform::Mac,
            "linux" => Platform::Linux,
            _ => Platform::Other,
        }
    }

    /// Sub-directory of the bundle holding this platform's binaries
    pub fn bundle_directory(&self) -> Option<&'static str> {
        match self {
            Platform::Windows => Some("windows"),
            Platform::Mac => Some("macos"),
            Platform::Linux => Some("linux"),
            Platform::Other => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    H264,
    H265,
}

impl VideoCodec {
    /// Encoder name passed to `-c:v`.
    ///
    /// Hardware encoders: NVENC on Windows/Linux, VideoToolbox on macOS.
    /// Anything else, or hardware disabled, uses the software encoder.
    pub fn encoder_name(&self, platform: Platform, use_hardware_encoder: bool) -> &'static str {
        let hardware = if use_hardware_encoder {
            match (self, platform) {
                (VideoCodec::H264, Platform::Windows | Platform::Linux) => Some("h264_nvenc"),
                (VideoCodec::H264, Platform::Mac) => Some("h264_videotoolbox"),
                (VideoCodec::H265, Platform::Windows | Platform::Linux) => Some("hevc_nvenc"),
                (VideoCodec::H265, Platform::Mac) => Some("hevc_videotoolbox"),
                (_, Platform::Other) => None,
            }
        } else {
            None
        };

        hardware.unwrap_or(match self {
            VideoCodec::H264 => "libx264",
            VideoCodec::H265 => "libx265",
        })
    }
}

impl FromStr for VideoCodec {
    type Err = JunkyardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "h264" | "h.264" | "avc" => Ok(VideoCodec::H264),
            "h265" | "h.265" | "hevc" => Ok(VideoCodec::H265),
            _ => Err(JunkyardError::Config(format!(
                "Invalid video codec '{}'. Valid codecs: h264, h265",
                s
            ))),
        }
    }
}

/// Source-format filter for video conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    All,
    Avi,
    M4v,
    Ts,
    Webm,
    Wmv,
    Mov,
    Mpg,
}

impl VideoFormat {
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            VideoFormat::All => &["mp4", "avi", "m4v", "ts", "webm", "wmv", "mov", "mpg", "mpeg"],
            VideoFormat::Avi => &["avi"],
            VideoFormat::M4v => &["m4v"],
            VideoFormat::Ts => &["ts"],
            VideoFormat::Webm => &["webm"],
            VideoFormat::Wmv => &["wmv"],
            VideoFormat::Mov => &["mov"],
            VideoFormat::Mpg => &["mpg", "mpeg"],
        }
    }

    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

impl FromStr for VideoFormat {
    type Err = JunkyardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "all" => Ok(VideoFormat::All),
            "avi" => Ok(VideoFormat::Avi),
            "m4v" => Ok(VideoFormat::M4v),
            "ts" => Ok(VideoFormat::Ts),
            "webm" => Ok(VideoFormat::Webm),
            "wmv" => Ok(VideoFormat::Wmv),
            "mov" => Ok(VideoFormat::Mov),
            "mpg" | "mpeg" => Ok(VideoFormat::Mpg),
            _ => Err(JunkyardError::UnsupportedFormat(format!(
                "Invalid video format '{}'. Valid formats: all, avi, m4v, ts, webm, wmv, mov, mpg",
                s
            ))),
        }
    }
}

/// Main trait for video encoding
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoEncoder: Send + Sync {
    /// Transcode `input` to `output` (MP4 with AAC audio)
    async fn transcode(&self, input: &Path, output: &Path, codec: VideoCodec, use_hardware_encoder: bool) -> Result<()>;

    /// Check if the encoder can be executed
    async fn check_availability(&self) -> Result<()>;
}

/// FFmpeg-backed encoder, preferring a bundled binary over `PATH`
pub struct FfmpegEncoder {
    command_builder: MediaCommandBuilder,
    platform: Platform,
    // Keeps the materialized executable alive
    _bundle: Option<BinaryBundle>,
}

impl FfmpegEncoder {
    pub fn new(config: &EncoderConfig) -> Result<Self> {
        let platform = Platform::current();

        let bundled = config
            .bundle_dir
            .as_deref()
            .and_then(|dir| BinaryBundle::locate(dir, platform, ENCODER_BINARY));

        let (command_builder, bundle) = match bundled {
            Some(source) => {
                let bundle = BinaryBundle::materialize(&source)?;
                let mut builder = MediaCommandBuilder::new(bundle.executable());
                if platform == Platform::Linux {
                    if let Some(dir) = bundle.source_dir() {
                        builder = builder.with_env("LD_LIBRARY_PATH", library_path(dir));
                    }
                }
                (builder, Some(bundle))
            }
            None => {
                info!("Using encoder from PATH: {}", config.binary_path);
                (MediaCommandBuilder::new(PathBuf::from(&config.binary_path)), None)
            }
        };

        Ok(Self {
            command_builder,
            platform,
            _bundle: bundle,
        })
    }
}

/// Prepend `dir` to the inherited library search path
fn library_path(dir: &Path) -> String {
    match std::env::var("LD_LIBRARY_PATH") {
        Ok(existing) if !existing.is_empty() => format!("{}:{}", dir.display(), existing),
        _ => dir.display().to_string(),
    }
}

#[async_trait]
impl VideoEncoder for FfmpegEncoder {
    async fn transcode(&self, input: &Path, output: &Path, codec: VideoCodec, use_hardware_encoder: bool) -> Result<()> {
        let encoder_name = codec.encoder_name(self.platform, use_hardware_encoder);
        info!("Transcoding {} -> {} ({})", input.display(), output.display(), encoder_name);

        self.command_builder
            .transcode(input, output, encoder_name)
            .execute()
            .await?;

        info!("Transcoding completed");
        Ok(())
    }

    async fn check_availability(&self) -> Result<()> {
        self.command_builder.version_check().execute().await?;
        info!("Encoder is available");
        Ok(())
    }
}
