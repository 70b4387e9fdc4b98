use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{blocking, direct_files, file_stem};
use crate::config::ThumbnailOptions;
use crate::engine::{BatchTool, TargetSelection};
use crate::error::{JunkyardError, Result};
use crate::imaging::{
    decode, encode, encode_animation, DecodedImage, ImageFormat, ImageOutputFormat, ResizeSpec,
};

/// Writes a resized `<name>_thumbnail.<ext>` copy of each image directly in the root
#[derive(Debug, Clone, Default)]
pub struct ThumbnailTool {
    pub options: ThumbnailOptions,
}

impl ThumbnailTool {
    pub fn new(options: ThumbnailOptions) -> Self {
        Self { options }
    }
}

fn is_target(path: &Path, formats: &[ImageFormat]) -> bool {
    formats.iter().any(|format| format.matches_extension(path))
        && matches!(ImageFormat::detect_file(path), Ok(Some(detected)) if formats.contains(&detected))
}

fn thumbnail_path(source: &Path, output_format: ImageOutputFormat, encoded_as: ImageFormat) -> PathBuf {
    let extension = match output_format {
        // Keep the source's own spelling, e.g. `jpeg` stays `jpeg`
        ImageOutputFormat::Original => source
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_else(|| encoded_as.primary_extension().to_string()),
        _ => encoded_as.primary_extension().to_string(),
    };
    source.with_file_name(format!("{}_thumbnail.{}", file_stem(source), extension))
}

fn create_thumbnail(source: &Path, output_format: ImageOutputFormat, spec: ResizeSpec) -> Result<PathBuf> {
    let data = fs::read(source)?;
    let format = ImageFormat::detect(&data).ok_or_else(|| {
        JunkyardError::UnsupportedFormat(format!("Unrecognised image: {}", source.display()))
    })?;
    let target_format = output_format.resolve(format);

    let encoded = match decode(&data, format)? {
        DecodedImage::Animated(frames) if output_format == ImageOutputFormat::Original => {
            encode_animation(frames.iter().map(|frame| spec.apply_to_frame(frame)).collect())?
        }
        decoded => encode(&spec.apply(&decoded.into_first_frame()?), target_format)?,
    };

    let output = thumbnail_path(source, output_format, target_format);
    fs::write(&output, encoded)?;
    Ok(output)
}

#[async_trait]
impl BatchTool for ThumbnailTool {
    fn name(&self) -> &'static str {
        "thumbnail"
    }

    fn selection(&self) -> TargetSelection {
        TargetSelection::directory()
    }

    async fn enumerate(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let root = root.to_path_buf();
        let formats = self.options.target_formats.clone();

        blocking(move || {
            Ok(direct_files(&root)?
                .into_iter()
                .filter(|path| is_target(path, &formats))
                .collect())
        })
        .await
    }

    async fn process_item(&self, item: &Path) -> Result<()> {
        let source = item.to_path_buf();
        let output_format = self.options.output_format;
        let spec = self.options.resize_spec();

        let output = blocking(move || create_thumbnail(&source, output_format, spec)).await?;
        info!("Created thumbnail {}", output.display());
        Ok(())
    }
}
