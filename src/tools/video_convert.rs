use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};

use super::{blocking, file_stem, has_extension, walk_files};
use crate::config::VideoOptions;
use crate::engine::{BatchTool, TargetSelection};
use crate::error::Result;
use crate::media::VideoEncoder;

const OUTPUT_EXTENSION: &str = "mp4";

/// Transcodes videos under the root to MP4, removing each source once encoded
#[derive(Clone)]
pub struct VideoConvertTool {
    pub options: VideoOptions,
    encoder: Arc<dyn VideoEncoder>,
}

impl VideoConvertTool {
    pub fn new(options: VideoOptions, encoder: Arc<dyn VideoEncoder>) -> Self {
        Self { options, encoder }
    }
}

async fn remove_if_present(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}

#[async_trait]
impl BatchTool for VideoConvertTool {
    fn name(&self) -> &'static str {
        "video-convert"
    }

    fn selection(&self) -> TargetSelection {
        TargetSelection::directory()
    }

    /// Fail fast when the encoder cannot run at all
    async fn prepare(&self) -> Result<()> {
        self.encoder.check_availability().await
    }

    async fn enumerate(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let root = root.to_path_buf();
        let filter = self.options.target_format;

        blocking(move || {
            Ok(walk_files(&root)?
                .into_iter()
                .filter(|path| filter.matches(path))
                .collect())
        })
        .await
    }

    async fn process_item(&self, item: &Path) -> Result<()> {
        let output = item.with_file_name(format!("{}.{}", file_stem(item), OUTPUT_EXTENSION));
        // An MP4 source cannot be the encoder's output, so encode beside it first
        let in_place = has_extension(item, OUTPUT_EXTENSION, true);
        let destination = if in_place {
            item.with_file_name(format!("{}.junkyard-tmp.{}", file_stem(item), OUTPUT_EXTENSION))
        } else {
            output.clone()
        };

        let VideoOptions {
            codec,
            use_hardware_encoder,
            ..
        } = self.options;

        if let Err(e) = self
            .encoder
            .transcode(item, &destination, codec, use_hardware_encoder)
            .await
        {
            remove_if_present(&destination).await;
            return Err(e);
        }

        fs::remove_file(item).await?;
        if in_place {
            fs::rename(&destination, &output).await?;
        }

        info!("Converted {} -> {}", item.display(), output.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JunkyardError;
    use crate::media::{MockVideoEncoder, VideoCodec, VideoFormat};
    use crate::tools::test_support::run_job;
    use assert_fs::prelude::*;
    use mockall::predicate::*;
    use std::fs as std_fs;

    fn available_encoder() -> MockVideoEncoder {
        let mut encoder = MockVideoEncoder::new();
        encoder.expect_check_availability().returning(|| Ok(()));
        encoder
    }

    fn writes_output(encoder: &mut MockVideoEncoder) {
        encoder
            .expect_transcode()
            .returning(|_input: &Path, output: &Path, _codec, _hw| {
                std_fs::write(output, b"encoded")?;
                Ok(())
            });
    }

    #[tokio::test]
    async fn test_source_deleted_after_success() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("clip.avi").write_str("avi").unwrap();
        tmp.child("sub/other.MOV").write_str("mov").unwrap();
        tmp.child("readme.txt").write_str("text").unwrap();

        let mut encoder = available_encoder();
        writes_output(&mut encoder);

        let tool = VideoConvertTool::new(VideoOptions::default(), Arc::new(encoder));
        let summary = run_job(tool, tmp.path()).await.unwrap();

        assert_eq!(summary.total_items, 2);
        assert_eq!(summary.processed_count, 2);
        assert!(!tmp.path().join("clip.avi").exists());
        assert!(!tmp.path().join("sub/other.MOV").exists());
        tmp.child("clip.mp4").assert("encoded");
        tmp.child("sub/other.mp4").assert("encoded");
        tmp.child("readme.txt").assert("text");
    }

    #[tokio::test]
    async fn test_failed_encode_keeps_source() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("clip.wmv").write_str("wmv").unwrap();

        let mut encoder = available_encoder();
        encoder
            .expect_transcode()
            .times(1)
            .returning(|_, output: &Path, _, _| {
                std_fs::write(output, b"partial")?;
                Err(JunkyardError::Encoder("exit status 1".to_string()))
            });

        let tool = VideoConvertTool::new(VideoOptions::default(), Arc::new(encoder));
        let summary = run_job(tool, tmp.path()).await.unwrap();

        assert_eq!(summary.failed_count, 1);
        tmp.child("clip.wmv").assert("wmv");
        assert!(!tmp.path().join("clip.mp4").exists());
    }

    #[tokio::test]
    async fn test_mp4_source_is_replaced() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("clip.mp4").write_str("original").unwrap();

        let mut encoder = available_encoder();
        writes_output(&mut encoder);

        let tool = VideoConvertTool::new(VideoOptions::default(), Arc::new(encoder));
        let summary = run_job(tool, tmp.path()).await.unwrap();

        assert_eq!(summary.processed_count, 1);
        tmp.child("clip.mp4").assert("encoded");
        assert!(!tmp.path().join("clip.junkyard-tmp.mp4").exists());
    }

    #[tokio::test]
    async fn test_codec_settings_are_forwarded() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("a.webm").touch().unwrap();
        tmp.child("b.avi").touch().unwrap();

        let mut encoder = available_encoder();
        encoder
            .expect_transcode()
            .with(always(), always(), eq(VideoCodec::H265), eq(false))
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let options = VideoOptions {
            codec: VideoCodec::H265,
            use_hardware_encoder: false,
            target_format: VideoFormat::Webm,
        };
        let summary = run_job(VideoConvertTool::new(options, Arc::new(encoder)), tmp.path())
            .await
            .unwrap();

        assert_eq!(summary.total_items, 1);
        assert!(tmp.path().join("b.avi").exists());
    }

    #[tokio::test]
    async fn test_missing_encoder_fails_job() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("a.avi").touch().unwrap();

        let mut encoder = MockVideoEncoder::new();
        encoder
            .expect_check_availability()
            .returning(|| Err(JunkyardError::Encoder("ffmpeg not found".to_string())));
        encoder.expect_transcode().never();

        let tool = VideoConvertTool::new(VideoOptions::default(), Arc::new(encoder));
        let result = run_job(tool, tmp.path()).await;

        assert!(matches!(result, Err(JunkyardError::Encoder(_))));
        assert!(tmp.path().join("a.avi").exists());
    }
}
