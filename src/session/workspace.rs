//! Per-session scratch directory for audio artifacts.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// File name of the exported voice recording.
pub const VOICE_WAV: &str = "voice_input.wav";

/// File name of the synthesized answer.
pub const ANSWER_AUDIO: &str = "answer.mp3";

/// A directory owned by one session. It is deleted when the workspace is dropped.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh workspace under `root`.
    pub fn create(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new().prefix("session-").tempdir_in(root)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path for the raw recording, keeping the uploaded container's extension.
    pub fn voice_input(&self, filename: &str) -> PathBuf {
        let ext: String = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .take(8)
            .collect();
        let ext = if ext.is_empty() { "webm".to_string() } else { ext.to_lowercase() };

        // Never collide with the exported WAV
        let stem = if ext == "wav" { "voice_recording" } else { "voice_input" };
        self.dir.path().join(format!("{}.{}", stem, ext))
    }

    pub fn voice_wav(&self) -> PathBuf {
        self.dir.path().join(VOICE_WAV)
    }

    pub fn answer_audio(&self) -> PathBuf {
        self.dir.path().join(ANSWER_AUDIO)
    }
}
