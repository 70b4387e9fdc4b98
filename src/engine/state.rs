use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::Result;

/// How a tool's target is chosen: a directory to walk, or a single file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    Directory,
    File,
}

/// Selection rules a tool declares for pickers and drops
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSelection {
    pub mode: SelectionMode,
    /// Accepted file extensions, only consulted in `File` mode
    pub extensions: Vec<String>,
}

impl TargetSelection {
    pub fn directory() -> Self {
        Self {
            mode: SelectionMode::Directory,
            extensions: Vec::new(),
        }
    }

    pub fn file<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: SelectionMode::File,
            extensions: extensions.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether a filesystem entry is an acceptable target
    pub fn accepts(&self, path: &Path) -> bool {
        match self.mode {
            SelectionMode::Directory => path.is_dir(),
            SelectionMode::File => {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
                        .unwrap_or(false)
            }
        }
    }
}

/// Snapshot of a job's progress, published to observers after every change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    pub job_id: Option<Uuid>,
    pub is_running: bool,
    pub processed_count: usize,
    pub failed_count: usize,
    pub current_index: usize,
    pub total_items: usize,
    pub current_item: Option<String>,
}

impl JobState {
    pub(crate) fn started(job_id: Uuid) -> Self {
        Self {
            job_id: Some(job_id),
            is_running: true,
            ..Self::default()
        }
    }

    /// Fraction of items dispatched, in [0, 1]
    pub fn progress(&self) -> f32 {
        if self.total_items == 0 {
            return 0.0;
        }
        (self.current_index as f32 / self.total_items as f32).clamp(0.0, 1.0)
    }
}

/// Final outcome of one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: Uuid,
    pub root: PathBuf,
    pub total_items: usize,
    pub processed_count: usize,
    pub failed_count: usize,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobSummary {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_ratio() {
        let mut state = JobState::default();
        assert_eq!(state.progress(), 0.0);

        state.total_items = 4;
        state.current_index = 1;
        assert_eq!(state.progress(), 0.25);

        state.current_index = 4;
        assert_eq!(state.progress(), 1.0);
    }

    #[test]
    fn test_file_selection_checks_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let srt = tmp.path().join("movie.SRT");
        let txt = tmp.path().join("notes.txt");
        std::fs::write(&srt, "").unwrap();
        std::fs::write(&txt, "").unwrap();

        let selection = TargetSelection::file(["srt", "smi"]);
        assert!(selection.accepts(&srt));
        assert!(!selection.accepts(&txt));
        assert!(!selection.accepts(tmp.path()));

        assert!(TargetSelection::directory().accepts(tmp.path()));
        assert!(!TargetSelection::directory().accepts(&srt));
    }

    #[test]
    fn test_summary_json_fields() {
        let summary = JobSummary {
            job_id: Uuid::nil(),
            root: PathBuf::from("/photos"),
            total_items: 3,
            processed_count: 2,
            failed_count: 1,
            cancelled: false,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };

        let value: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
        assert_eq!(value["processed_count"], 2);
        assert_eq!(value["failed_count"], 1);
        assert_eq!(value["root"], "/photos");
    }
}
