// Subtitle resynchronization
//
// One shifter per subtitle dialect, selected by file extension through the
// factory:
// - Smi: rewrites <SYNC Start=NNNN> markers
// - Srt: rewrites the timing line of each numbered caption block
//
// Shifted content always goes to a new `<name>.shifted.<ext>` sibling.

pub mod smi;
pub mod srt;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::error::{JunkyardError, Result};

/// Extensions accepted as subtitle targets
pub const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "smi"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    Smi,
    Srt,
}

impl SubtitleFormat {
    /// Resolve the dialect from a file extension (case-insensitive)
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "smi" => Ok(SubtitleFormat::Smi),
            "srt" => Ok(SubtitleFormat::Srt),
            _ => Err(JunkyardError::UnsupportedFormat(format!(
                "Not a subtitle file: {}",
                path.display()
            ))),
        }
    }
}

/// Main trait for subtitle time shifting
#[async_trait]
pub trait SubtitleShifter: Send + Sync {
    fn format(&self) -> SubtitleFormat;

    /// Shift every timestamp in `content` by `shift_millis`, clamping at zero
    fn shift_content(&self, content: &str, shift_millis: i64) -> Result<String>;

    /// Shift a subtitle file, returning the path of the written copy
    async fn shift_file(&self, file: &Path, shift_millis: i64) -> Result<PathBuf> {
        let output_path = shifted_output_path(file)?;
        info!("Shifting {} by {} ms -> {}", file.display(), shift_millis, output_path.display());

        let content = fs::read_to_string(file).await?;
        let shifted = self.shift_content(&content, shift_millis)?;
        fs::write(&output_path, shifted).await?;

        Ok(output_path)
    }
}

/// Factory for creating subtitle shifters
pub struct SubtitleShifterFactory;

impl SubtitleShifterFactory {
    pub fn create_shifter(format: SubtitleFormat) -> Box<dyn SubtitleShifter> {
        match format {
            SubtitleFormat::Smi => Box::new(smi::SmiShifter::new()),
            SubtitleFormat::Srt => Box::new(srt::SrtShifter::new()),
        }
    }

    /// Pick the shifter matching the file's extension
    pub fn for_path<P: AsRef<Path>>(path: P) -> Result<Box<dyn SubtitleShifter>> {
        Ok(Self::create_shifter(SubtitleFormat::from_path(path)?))
    }
}

/// `<name>.shifted.<ext>` next to the source
pub fn shifted_output_path(file: &Path) -> Result<PathBuf> {
    let stem = file
        .file_stem()
        .ok_or_else(|| JunkyardError::Subtitle(format!("Invalid subtitle filename: {}", file.display())))?
        .to_string_lossy();
    let extension = file
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(file.with_file_name(format!("{}.shifted.{}", stem, extension)))
}

/// Apply a signed shift to a timestamp, never going below zero
pub(crate) fn apply_shift(millis: u64, shift_millis: i64) -> u64 {
    let shifted = (millis as i128) + (shift_millis as i128);
    shifted.clamp(0, u64::MAX as i128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SubtitleFormat::from_path("movie.SRT").unwrap(), SubtitleFormat::Srt);
        assert_eq!(SubtitleFormat::from_path("movie.smi").unwrap(), SubtitleFormat::Smi);
        assert!(SubtitleFormat::from_path("movie.ass").is_err());
        assert_eq!(SubtitleShifterFactory::for_path("a.smi").unwrap().format(), SubtitleFormat::Smi);
    }

    #[test]
    fn test_shifted_output_path() {
        assert_eq!(
            shifted_output_path(Path::new("/subs/episode.01.srt")).unwrap(),
            PathBuf::from("/subs/episode.01.shifted.srt")
        );
    }

    #[test]
    fn test_apply_shift_clamps() {
        assert_eq!(apply_shift(500, -1000), 0);
        assert_eq!(apply_shift(500, 250), 750);
    }

    #[tokio::test]
    async fn test_shift_file_leaves_source_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("clip.srt");
        let original = "1\n00:00:01,000 --> 00:00:02,000\nHello\n";
        std::fs::write(&source, original).unwrap();

        let shifter = SubtitleShifterFactory::for_path(&source).unwrap();
        let output = shifter.shift_file(&source, 1500).await.unwrap();

        assert_eq!(output, tmp.path().join("clip.shifted.srt"));
        assert_eq!(std::fs::read_to_string(&source).unwrap(), original);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "1\n00:00:02,500 --> 00:00:03,500\nHello\n"
        );
    }
}
