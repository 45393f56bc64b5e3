//! Audio conversion via ffmpeg.
//!
//! Recorded clips arrive in whatever container the browser produced (webm, ogg, mp4...).
//! They are normalized to 16 kHz mono PCM WAV before transcription.

use crate::error::{Result, SvarError};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Sample rate used for exported WAV files.
pub const WAV_SAMPLE_RATE: u32 = 16_000;

/// Build a PATH value with `dir` in front of `current`.
pub fn path_with_prepended(dir: &Path, current: Option<OsString>) -> Result<OsString> {
    let mut paths: Vec<PathBuf> = vec![dir.to_path_buf()];
    if let Some(current) = current {
        paths.extend(std::env::split_paths(&current).filter(|p| p != dir));
    }
    std::env::join_paths(paths)
        .map_err(|e| SvarError::Config(format!("Invalid tool directory {:?}: {}", dir, e)))
}

/// Prepend a tool directory to the process PATH so ffmpeg can be found.
///
/// A missing directory is not an error here; export fails later when ffmpeg is needed.
/// Mutates the process environment, so call it before starting the async runtime.
pub fn prepend_tool_dir(dir: &Path) -> Result<()> {
    let value = path_with_prepended(dir, std::env::var_os("PATH"))?;
    std::env::set_var("PATH", value);
    info!("Added {} to PATH", dir.display());
    Ok(())
}

/// Convert any audio file ffmpeg understands into a mono PCM WAV file.
#[instrument(skip_all, fields(source = %source.display()))]
pub async fn export_wav(source: &Path, dest: &Path) -> Result<()> {
    debug!("Exporting {:?} to WAV", source);

    let result = Command::new("ffmpeg")
        .arg("-i").arg(source)
        .arg("-vn")
        .arg("-ac").arg("1")
        .arg("-ar").arg(WAV_SAMPLE_RATE.to_string())
        .arg("-c:a").arg("pcm_s16le")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(SvarError::AudioExport(format!("ffmpeg conversion failed: {}", err.trim())))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SvarError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(SvarError::AudioExport(format!("ffmpeg error: {e}"))),
    }
}
