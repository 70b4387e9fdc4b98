use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::{blocking, file_stem, has_extension, walk_files};
use crate::config::ChangeExtensionOptions;
use crate::engine::{BatchTool, TargetSelection};
use crate::error::{JunkyardError, Result};

/// Renames files carrying the `from` extension to `<stem>.<to>`, in place
#[derive(Debug, Clone, Default)]
pub struct ChangeExtensionTool {
    pub options: ChangeExtensionOptions,
}

impl ChangeExtensionTool {
    pub fn new(options: ChangeExtensionOptions) -> Self {
        Self { options }
    }

    fn renamed_path(&self, file: &Path) -> PathBuf {
        file.with_file_name(format!("{}.{}", file_stem(file), self.options.to))
    }
}

#[async_trait]
impl BatchTool for ChangeExtensionTool {
    fn name(&self) -> &'static str {
        "change-extension"
    }

    fn selection(&self) -> TargetSelection {
        TargetSelection::directory()
    }

    async fn prepare(&self) -> Result<()> {
        self.options.validate()
    }

    async fn enumerate(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let root = root.to_path_buf();
        let from = self.options.from.clone();
        let ignore_case = self.options.ignore_case;

        blocking(move || {
            Ok(walk_files(&root)?
                .into_iter()
                .filter(|path| has_extension(path, &from, ignore_case))
                .collect())
        })
        .await
    }

    async fn process_item(&self, item: &Path) -> Result<()> {
        let target = self.renamed_path(item);
        if target == item {
            return Ok(());
        }
        if fs::try_exists(&target).await? {
            return Err(JunkyardError::Config(format!(
                "Refusing to overwrite {}",
                target.display()
            )));
        }

        fs::rename(item, &target).await?;
        debug!("Renamed {} -> {}", item.display(), target.display());
        Ok(())
    }
}
