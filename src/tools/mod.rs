// Tool strategies
//
// One BatchTool per workflow, all driven by the shared engine:
// - Archive: zip every sub-directory of the root
// - RarToZip: re-pack RAR archives as ZIP
// - ChangeExtension: rename files by extension
// - ImageConvert: convert images, optionally inside zip/cbz containers
// - Thumbnail: write resized copies of images
// - ResyncSubtitle: shift subtitle timestamps
// - VideoConvert: transcode videos to MP4 through the encoder

pub mod archive;
pub mod change_extension;
pub mod image_convert;
pub mod rar_to_zip;
pub mod resync_subtitle;
pub mod thumbnail;
pub mod video_convert;

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub use archive::ArchiveTool;
pub use change_extension::ChangeExtensionTool;
pub use image_convert::ImageConvertTool;
pub use rar_to_zip::RarToZipTool;
pub use resync_subtitle::ResyncSubtitleTool;
pub use thumbnail::ThumbnailTool;
pub use video_convert::VideoConvertTool;

pub(crate) use crate::engine::blocking;
use crate::error::Result;

/// Regular files under `root`, recursively, in walk order
pub(crate) fn walk_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Regular files directly inside `root`
pub(crate) fn direct_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

pub(crate) fn has_extension(path: &Path, extension: &str, ignore_case: bool) -> bool {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ignore_case => ext.eq_ignore_ascii_case(extension),
        Some(ext) => ext == extension,
        None => false,
    }
}

/// File stem as a string, lossy for non UTF-8 names
pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}


#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_walk_files_is_recursive() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("a.txt").touch().unwrap();
        tmp.child("sub/b.txt").touch().unwrap();
        tmp.child("sub/deeper/c.txt").touch().unwrap();

        let mut names: Vec<_> = walk_files(tmp.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);

        let direct = direct_files(tmp.path()).unwrap();
        assert_eq!(direct, vec![tmp.path().join("a.txt")]);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(walk_files(&tmp.path().join("missing")).is_err());
    }

    #[test]
    fn test_has_extension_case_handling() {
        let path = Path::new("photo.JPEG");
        assert!(has_extension(path, "jpeg", true));
        assert!(!has_extension(path, "jpeg", false));
        assert!(has_extension(path, "JPEG", false));
        assert!(!has_extension(Path::new("README"), "md", true));
    }
}
