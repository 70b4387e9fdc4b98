// External encoder bridge
//
// This module wraps the video encoder subprocess:
// - Commands: command builder and execution
// - Bundle: locating and materializing a bundled encoder binary
// - Encoder: codec lookup tables and the VideoEncoder trait

pub mod bundle;
pub mod commands;
pub mod encoder;

use std::sync::Arc;

pub use bundle::*;
pub use commands::*;
pub use encoder::*;

use crate::config::EncoderConfig;
use crate::error::Result;

/// Factory for creating encoder instances
pub struct EncoderFactory;

impl EncoderFactory {
    /// Create the default encoder implementation (FFmpeg-based)
    pub fn create_encoder(config: &EncoderConfig) -> Result<Arc<dyn VideoEncoder>> {
        Ok(Arc::new(FfmpegEncoder::new(config)?))
    }
}
