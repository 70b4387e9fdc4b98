use async_trait::async_trait;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use super::{blocking, file_stem, has_extension, walk_files};
use crate::archive::{zip_directory, RarExtractor, UnrarExtractor};
use crate::engine::{BatchTool, TargetSelection};
use crate::error::{JunkyardError, Result};

/// Re-packs every RAR archive under the root as a sibling ZIP
#[derive(Clone)]
pub struct RarToZipTool {
    extractor: Arc<dyn RarExtractor>,
}

impl RarToZipTool {
    pub fn new(extractor: Arc<dyn RarExtractor>) -> Self {
        Self { extractor }
    }
}

impl Default for RarToZipTool {
    fn default() -> Self {
        Self::new(Arc::new(UnrarExtractor))
    }
}

/// Temporary extraction folder `unrar_<filename>` next to the archive
fn extraction_dir(archive: &Path) -> Result<PathBuf> {
    let name = archive
        .file_name()
        .ok_or_else(|| JunkyardError::FileNotFound(archive.display().to_string()))?;
    Ok(archive.with_file_name(format!("unrar_{}", name.to_string_lossy())))
}

/// Extract `archive` into a fresh `unrar_<filename>` folder and zip it.
///
/// An existing folder of that name is never reused or removed.
fn convert(extractor: &dyn RarExtractor, archive: &Path) -> Result<PathBuf> {
    let temp_dir = extraction_dir(archive)?;
    fs::create_dir(&temp_dir).map_err(|e| match e.kind() {
        ErrorKind::AlreadyExists => JunkyardError::Rar(format!(
            "Extraction folder {} already exists",
            temp_dir.display()
        )),
        _ => e.into(),
    })?;

    let result = extractor
        .extract(archive, &temp_dir)
        .and_then(|()| {
            let zip_path = archive.with_file_name(format!("{}.zip", file_stem(archive)));
            zip_directory(&temp_dir, &zip_path)?;
            Ok(zip_path)
        });

    if let Err(e) = fs::remove_dir_all(&temp_dir) {
        warn!("Failed to remove {}: {}", temp_dir.display(), e);
    }

    result
}

#[async_trait]
impl BatchTool for RarToZipTool {
    fn name(&self) -> &'static str {
        "rar-to-zip"
    }

    fn selection(&self) -> TargetSelection {
        TargetSelection::directory()
    }

    async fn enumerate(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let root = root.to_path_buf();
        blocking(move || {
            Ok(walk_files(&root)?
                .into_iter()
                .filter(|path| has_extension(path, "rar", true))
                .collect())
        })
        .await
    }

    async fn process_item(&self, item: &Path) -> Result<()> {
        let extractor = Arc::clone(&self.extractor);
        let archive = item.to_path_buf();

        let zip_path = blocking(move || convert(&*extractor, &archive)).await?;
        info!("Converted {} -> {}", item.display(), zip_path.display());
        Ok(())
    }
}
