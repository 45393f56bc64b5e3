//! Speech-to-text for spoken questions.
//!
//! A transcription has three outcomes: recognized text, unintelligible audio, or a service
//! failure. The first two are values of [`Recognition`]; the third is
//! `SvarError::SpeechServiceUnavailable`.

mod whisper;

pub use whisper::WhisperTranscriber;

use crate::error::Result;
use async_trait::async_trait;

/// Outcome of transcribing a clip that reached the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    /// Speech was recognized.
    Recognized(String),
    /// The service answered but found no intelligible speech.
    Unintelligible,
}

impl Recognition {
    /// Classify raw service text.
    pub fn from_text(text: &str) -> Self {
        let text = text.trim();
        if text.chars().any(char::is_alphanumeric) {
            Recognition::Recognized(text.to_string())
        } else {
            Recognition::Unintelligible
        }
    }
}

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe WAV audio bytes.
    async fn transcribe(&self, wav: &[u8]) -> Result<Recognition>;
}
