//! Text-to-speech for spoken answers.

mod openai;

pub use openai::OpenAISpeech;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for speech synthesis services.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` and return encoded audio bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;

    /// MIME type of the returned audio.
    fn mime_type(&self) -> &'static str {
        "audio/mpeg"
    }
}
