use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::SubtitleOptions;
use crate::engine::{BatchTool, TargetSelection};
use crate::error::{JunkyardError, Result};
use crate::subtitle::{SubtitleShifterFactory, SUBTITLE_EXTENSIONS};

/// Shifts every timestamp of one subtitle file into a `.shifted` copy
#[derive(Debug, Clone, Default)]
pub struct ResyncSubtitleTool {
    pub options: SubtitleOptions,
}

impl ResyncSubtitleTool {
    pub fn new(options: SubtitleOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl BatchTool for ResyncSubtitleTool {
    fn name(&self) -> &'static str {
        "resync-subtitle"
    }

    fn selection(&self) -> TargetSelection {
        TargetSelection::file(SUBTITLE_EXTENSIONS.iter().copied())
    }

    /// The target file is the only item
    async fn enumerate(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !tokio::fs::metadata(root).await?.is_file() {
            return Err(JunkyardError::FileNotFound(format!(
                "Subtitle target is not a file: {}",
                root.display()
            )));
        }
        Ok(vec![root.to_path_buf()])
    }

    async fn process_item(&self, item: &Path) -> Result<()> {
        let shifter = SubtitleShifterFactory::for_path(item)?;
        let output = shifter.shift_file(item, self.options.shift_millis).await?;
        info!("Wrote {}", output.display());
        Ok(())
    }
}
