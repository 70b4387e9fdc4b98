use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{JunkyardError, Result};

/// A file on disk and the name it gets inside the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntrySource {
    pub path: PathBuf,
    pub name: String,
}

/// Write a ZIP archive containing `entries`.
///
/// The archive is assembled in a temporary sibling and renamed into place
/// only after it is complete, so an existing file at `zip_path` survives a
/// failed write.
pub fn write_zip<P: AsRef<Path>>(zip_path: P, entries: &[ZipEntrySource]) -> Result<()> {
    let zip_path = zip_path.as_ref();
    let parent = zip_path
        .parent()
        .ok_or_else(|| JunkyardError::Config(format!("No parent directory for {}", zip_path.display())))?;

    debug!("Writing {} entries to {}", entries.len(), zip_path.display());

    let staging = tempfile::Builder::new()
        .prefix(".junkyard-zip")
        .tempfile_in(parent)?;
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut writer = ZipWriter::new(staging.as_file());
    for entry in entries {
        writer.start_file(entry.name.as_str(), options)?;
        let mut source = File::open(&entry.path)?;
        io::copy(&mut source, &mut writer)?;
    }
    writer.finish()?;

    staging.persist(zip_path).map_err(|e| JunkyardError::Io(e.error))?;
    Ok(())
}

/// Every regular file under `dir` (recursive), named relative to `base`
pub fn collect_tree(dir: &Path, base: &Path) -> Result<Vec<ZipEntrySource>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(base).map_err(|_| {
            JunkyardError::Config(format!(
                "{} is not inside {}",
                entry.path().display(),
                base.display()
            ))
        })?;
        entries.push(ZipEntrySource {
            path: entry.path().to_path_buf(),
            name: entry_name(relative),
        });
    }
    Ok(entries)
}

/// Regular files directly inside `dir`, named by their bare file name
pub fn collect_flat(dir: &Path) -> Result<Vec<ZipEntrySource>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            entries.push(ZipEntrySource {
                path: entry.path().to_path_buf(),
                name: entry.file_name().to_string_lossy().into_owned(),
            });
        }
    }
    Ok(entries)
}

/// Zip the whole tree under `dir` with entry names relative to `dir`
pub fn zip_directory<P: AsRef<Path>, Q: AsRef<Path>>(dir: P, zip_path: Q) -> Result<()> {
    let dir = dir.as_ref();
    let entries = collect_tree(dir, dir)?;
    write_zip(zip_path, &entries)
}

/// Extract every entry of a ZIP archive under `destination`
pub fn extract_zip<P: AsRef<Path>, Q: AsRef<Path>>(zip_path: P, destination: Q) -> Result<()> {
    let destination = destination.as_ref();
    let mut archive = ZipArchive::new(File::open(zip_path.as_ref())?)?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;

        // Entries escaping the destination are skipped
        let outpath = match file.enclosed_name() {
            Some(path) => destination.join(path),
            None => continue,
        };

        if file.is_dir() {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&outpath)?;
            io::copy(&mut file, &mut outfile)?;
        }
    }

    Ok(())
}

/// ZIP entry names always use forward slashes
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn entry_names(zip_path: &Path) -> Vec<String> {
        let archive = ZipArchive::new(File::open(zip_path).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(|s| s.to_string()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_collect_tree_and_flat() {
        let tmp = tempfile::tempdir().unwrap();
        let sub = tmp.path().join("sub");
        fs::create_dir_all(sub.join("nested")).unwrap();
        fs::write(sub.join("a.txt"), "a").unwrap();
        fs::write(sub.join("nested").join("b.txt"), "b").unwrap();

        let tree: Vec<String> = collect_tree(&sub, tmp.path()).unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(tree, vec!["sub/a.txt", "sub/nested/b.txt"]);

        let flat: Vec<String> = collect_flat(&sub).unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(flat, vec!["a.txt"]);
    }

    #[test]
    fn test_zip_directory_then_extract() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source");
        fs::create_dir_all(source.join("deep")).unwrap();
        fs::write(source.join("one.txt"), "first").unwrap();
        fs::write(source.join("deep").join("two.txt"), "second").unwrap();

        let zip_path = tmp.path().join("out.zip");
        zip_directory(&source, &zip_path).unwrap();
        assert_eq!(entry_names(&zip_path), vec!["deep/two.txt", "one.txt"]);

        let restored = tmp.path().join("restored");
        extract_zip(&zip_path, &restored).unwrap();
        let mut content = String::new();
        File::open(restored.join("deep").join("two.txt"))
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "second");
    }

    #[test]
    fn test_failed_write_keeps_existing_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let zip_path = tmp.path().join("keep.zip");
        fs::write(&zip_path, "original").unwrap();

        let missing = vec![ZipEntrySource {
            path: tmp.path().join("does-not-exist"),
            name: "x".to_string(),
        }];
        assert!(write_zip(&zip_path, &missing).is_err());
        assert_eq!(fs::read_to_string(&zip_path).unwrap(), "original");
    }
}
