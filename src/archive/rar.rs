use std::path::Path;
use tracing::debug;

use crate::error::{JunkyardError, Result};

/// Port over a RAR extraction library
#[cfg_attr(test, mockall::automock)]
pub trait RarExtractor: Send + Sync {
    /// Extract every file of `archive` under `destination`, keeping the stored tree
    fn extract(&self, archive: &Path, destination: &Path) -> Result<()>;
}

/// Extractor backed by the bundled unrar library
#[derive(Debug, Default, Clone, Copy)]
pub struct UnrarExtractor;

impl RarExtractor for UnrarExtractor {
    fn extract(&self, archive: &Path, destination: &Path) -> Result<()> {
        debug!("Extracting {} into {}", archive.display(), destination.display());

        let mut cursor = unrar::Archive::new(archive)
            .open_for_processing()
            .map_err(|e| JunkyardError::Rar(format!("Failed to open {}: {}", archive.display(), e)))?;

        while let Some(header) = cursor
            .read_header()
            .map_err(|e| JunkyardError::Rar(format!("Failed to read header: {}", e)))?
        {
            cursor = if header.entry().is_file() {
                header
                    .extract_with_base(destination)
                    .map_err(|e| JunkyardError::Rar(format!("Failed to extract entry: {}", e)))?
            } else {
                header
                    .skip()
                    .map_err(|e| JunkyardError::Rar(format!("Failed to skip entry: {}", e)))?
            };
        }

        Ok(())
    }
}
