use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{blocking, has_extension, walk_files};
use crate::archive::{extract_zip, zip_directory};
use crate::config::ImageConvertOptions;
use crate::engine::{BatchTool, TargetSelection};
use crate::error::Result;
use crate::imaging::{decode, encode, encode_animation, encode_webp_animation, DecodedImage, ImageFormat};

/// Container extensions whose entries are converted when enabled
pub const CONTAINER_EXTENSIONS: &[&str] = &["zip", "cbz"];

/// Converts images from one format to another, replacing the originals
#[derive(Debug, Clone, Default)]
pub struct ImageConvertTool {
    pub options: ImageConvertOptions,
}

impl ImageConvertTool {
    pub fn new(options: ImageConvertOptions) -> Self {
        Self { options }
    }
}

fn is_container(path: &Path) -> bool {
    CONTAINER_EXTENSIONS
        .iter()
        .any(|ext| has_extension(path, ext, true))
}

/// Whether `path` is named and encoded as `format`
fn is_convertible(path: &Path, format: ImageFormat) -> bool {
    format.matches_extension(path)
        && matches!(ImageFormat::detect_file(path), Ok(Some(detected)) if detected == format)
}

/// Convert one image file in place.
///
/// Returns `Ok(None)` when the bytes are not actually `from`; the file is
/// then left alone.
fn convert_file(path: &Path, from: ImageFormat, to: ImageFormat) -> Result<Option<PathBuf>> {
    let data = fs::read(path)?;
    if ImageFormat::detect(&data) != Some(from) {
        debug!("Skipping {}: content is not {}", path.display(), from);
        return Ok(None);
    }

    let encoded = match decode(&data, from)? {
        DecodedImage::Animated(frames) if to == ImageFormat::Gif => encode_animation(frames)?,
        DecodedImage::Animated(frames) if to == ImageFormat::Webp && frames.len() > 1 => {
            encode_webp_animation(&frames)?
        }
        decoded => encode(&decoded.into_first_frame()?, to)?,
    };

    let output = path.with_extension(to.primary_extension());
    fs::write(&output, encoded)?;
    if output != path {
        fs::remove_file(path)?;
    }

    Ok(Some(output))
}

/// Convert every matching entry of a zip/cbz container and re-pack it.
///
/// Any failure fails the whole container. The original is only replaced once
/// the new archive is fully written; the scratch directory is always removed.
fn convert_container(archive: &Path, from: ImageFormat, to: ImageFormat) -> Result<usize> {
    let parent = archive
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let scratch = tempfile::Builder::new()
        .prefix(".junkyard-unzip")
        .tempdir_in(parent)?;

    extract_zip(archive, scratch.path())?;

    let mut converted = 0;
    for entry in walk_files(scratch.path())? {
        if from.matches_extension(&entry) && convert_file(&entry, from, to)?.is_some() {
            converted += 1;
        }
    }

    zip_directory(scratch.path(), archive)?;
    Ok(converted)
}

#[async_trait]
impl BatchTool for ImageConvertTool {
    fn name(&self) -> &'static str {
        "image-convert"
    }

    fn selection(&self) -> TargetSelection {
        TargetSelection::directory()
    }

    async fn enumerate(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let root = root.to_path_buf();
        let from = self.options.from;
        let include_containers = self.options.include_archive_files;

        blocking(move || {
            Ok(walk_files(&root)?
                .into_iter()
                .filter(|path| is_convertible(path, from) || (include_containers && is_container(path)))
                .collect())
        })
        .await
    }

    async fn process_item(&self, item: &Path) -> Result<()> {
        let path = item.to_path_buf();
        let ImageConvertOptions { from, to, .. } = self.options;

        if is_container(item) {
            let converted = blocking(move || convert_container(&path, from, to)).await?;
            info!("Converted {} entries inside {}", converted, item.display());
        } else if let Some(output) = blocking(move || convert_file(&path, from, to)).await? {
            info!("Converted {} -> {}", item.display(), output.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{collect_flat, write_zip};
    use crate::imaging::codec::tests::{sample_gif, sample_image};
    use crate::tools::test_support::run_job;
    use assert_fs::prelude::*;
    use std::fs::File;
    use zip::ZipArchive;

    fn png_bytes() -> Vec<u8> {
        encode(&sample_image(12, 12), ImageFormat::Png).unwrap()
    }

    fn options(from: ImageFormat, to: ImageFormat) -> ImageConvertOptions {
        ImageConvertOptions {
            from,
            to,
            include_archive_files: false,
        }
    }

    #[tokio::test]
    async fn test_png_to_jpeg_replaces_original() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("deep/cat.png").write_binary(&png_bytes()).unwrap();

        let tool = ImageConvertTool::new(options(ImageFormat::Png, ImageFormat::Jpeg));
        let summary = run_job(tool, tmp.path()).await.unwrap();

        assert_eq!(summary.processed_count, 1);
        assert!(!tmp.path().join("deep/cat.png").exists());
        let output = fs::read(tmp.path().join("deep/cat.jpg")).unwrap();
        assert_eq!(ImageFormat::detect(&output), Some(ImageFormat::Jpeg));
    }

    #[tokio::test]
    async fn test_mislabeled_file_is_excluded() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("photo.jpg").write_binary(&png_bytes()).unwrap();

        let tool = ImageConvertTool::new(options(ImageFormat::Jpeg, ImageFormat::Webp));
        let summary = run_job(tool, tmp.path()).await.unwrap();

        assert_eq!(summary.total_items, 0);
        assert_eq!(summary.processed_count, 0);
        assert_eq!(summary.failed_count, 0);
        assert_eq!(fs::read(tmp.path().join("photo.jpg")).unwrap(), png_bytes());
        assert!(!tmp.path().join("photo.webp").exists());
    }

    #[tokio::test]
    async fn test_png_to_webp() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("a.PNG").write_binary(&png_bytes()).unwrap();

        let tool = ImageConvertTool::default();
        let summary = run_job(tool, tmp.path()).await.unwrap();

        assert_eq!(summary.processed_count, 1);
        let output = fs::read(tmp.path().join("a.webp")).unwrap();
        assert_eq!(ImageFormat::detect(&output), Some(ImageFormat::Webp));
    }

    #[test]
    fn test_animated_gif_keeps_first_frame_only() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("anim.gif");
        fs::write(&path, sample_gif(3, 8, 8)).unwrap();

        let output = convert_file(&path, ImageFormat::Gif, ImageFormat::Png).unwrap().unwrap();
        let decoded = decode(&fs::read(&output).unwrap(), ImageFormat::Png).unwrap();
        assert!(matches!(decoded, DecodedImage::Still(ref image) if image.width() == 8));
    }

    #[tokio::test]
    async fn test_animated_gif_to_webp_keeps_frames() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("anim.gif").write_binary(&sample_gif(3, 8, 8)).unwrap();

        let tool = ImageConvertTool::new(options(ImageFormat::Gif, ImageFormat::Webp));
        let summary = run_job(tool, tmp.path()).await.unwrap();

        assert_eq!(summary.processed_count, 1);
        assert!(!tmp.path().join("anim.gif").exists());
        let output = fs::read(tmp.path().join("anim.webp")).unwrap();
        assert_eq!(ImageFormat::detect(&output), Some(ImageFormat::Webp));
        assert_eq!(webp::AnimDecoder::new(&output).decode().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_container_entries_are_converted() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let pages = tmp.child("pages");
        pages.child("001.png").write_binary(&png_bytes()).unwrap();
        pages.child("002.png").write_binary(&png_bytes()).unwrap();
        pages.child("notes.txt").write_str("keep").unwrap();

        let archive_path = tmp.path().join("book.cbz");
        write_zip(&archive_path, &collect_flat(pages.path()).unwrap()).unwrap();
        fs::remove_dir_all(pages.path()).unwrap();

        let mut opts = options(ImageFormat::Png, ImageFormat::Jpeg);
        opts.include_archive_files = true;
        let summary = run_job(ImageConvertTool::new(opts), tmp.path()).await.unwrap();
        assert_eq!(summary.total_items, 1);
        assert_eq!(summary.processed_count, 1);

        let archive = ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort();
        assert_eq!(names, vec!["001.jpg", "002.jpg", "notes.txt"]);

        let leftovers: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[tokio::test]
    async fn test_broken_container_is_one_failure() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("broken.zip").write_binary(b"not a zip").unwrap();

        let mut opts = options(ImageFormat::Png, ImageFormat::Jpeg);
        opts.include_archive_files = true;
        let summary = run_job(ImageConvertTool::new(opts), tmp.path()).await.unwrap();

        assert_eq!(summary.failed_count, 1);
        tmp.child("broken.zip").assert(&b"not a zip"[..]);
        let leftovers: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[tokio::test]
    async fn test_containers_ignored_unless_enabled() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("book.zip").write_binary(b"zip").unwrap();

        let summary = run_job(ImageConvertTool::default(), tmp.path()).await.unwrap();
        assert_eq!(summary.total_items, 0);
    }
}
