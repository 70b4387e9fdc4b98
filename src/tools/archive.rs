use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

use super::blocking;
use crate::archive::{collect_flat, collect_tree, write_zip};
use crate::config::ArchiveOptions;
use crate::engine::{BatchTool, TargetSelection};
use crate::error::{JunkyardError, Result};

/// Packs each immediate sub-directory of the root into `<root>/<name>.zip`
#[derive(Debug, Clone, Default)]
pub struct ArchiveTool {
    pub options: ArchiveOptions,
}

impl ArchiveTool {
    pub fn new(options: ArchiveOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl BatchTool for ArchiveTool {
    fn name(&self) -> &'static str {
        "archive"
    }

    fn selection(&self) -> TargetSelection {
        TargetSelection::directory()
    }

    async fn enumerate(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let root = root.to_path_buf();
        blocking(move || {
            let mut directories = Vec::new();
            for entry in WalkDir::new(&root).min_depth(1).max_depth(1) {
                let entry = entry?;
                if entry.file_type().is_dir() {
                    directories.push(entry.into_path());
                }
            }
            Ok(directories)
        })
        .await
    }

    async fn process_item(&self, item: &Path) -> Result<()> {
        let directory = item.to_path_buf();
        let include_parent = self.options.include_parent_directory;

        blocking(move || {
            let root = directory
                .parent()
                .ok_or_else(|| JunkyardError::FileNotFound(directory.display().to_string()))?;
            let name = directory
                .file_name()
                .ok_or_else(|| JunkyardError::FileNotFound(directory.display().to_string()))?
                .to_string_lossy();

            let entries = if include_parent {
                collect_tree(&directory, root)?
            } else {
                collect_flat(&directory)?
            };

            let zip_path = root.join(format!("{}.zip", name));
            write_zip(&zip_path, &entries)?;
            info!("Archived {} entries into {}", entries.len(), zip_path.display());
            Ok(())
        })
        .await
    }
}
