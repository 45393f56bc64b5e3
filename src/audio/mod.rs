//! Audio processing utilities.

mod export;

pub use export::{export_wav, path_with_prepended, prepend_tool_dir, WAV_SAMPLE_RATE};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for converting recorded clips into WAV.
#[async_trait]
pub trait WavExporter: Send + Sync {
    async fn export(&self, source: &Path, dest: &Path) -> Result<()>;
}

/// Exporter backed by the ffmpeg command-line tool.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegExporter;

#[async_trait]
impl WavExporter for FfmpegExporter {
    async fn export(&self, source: &Path, dest: &Path) -> Result<()> {
        export_wav(source, dest).await
    }
}
