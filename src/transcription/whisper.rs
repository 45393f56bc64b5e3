//! OpenAI Whisper transcription implementation.

use super::{Recognition, Transcriber};
use crate::config::TranscriptionSettings;
use crate::error::{Result, SvarError};
use crate::openai::create_client;
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// OpenAI Whisper-based transcriber.
pub struct WhisperTranscriber {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    language: Option<String>,
}

impl WhisperTranscriber {
    /// Create a new Whisper transcriber with custom configuration.
    pub fn with_config(settings: &TranscriptionSettings) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: settings.model.clone(),
            language: settings.language.clone().filter(|l| !l.is_empty()),
        })
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    #[instrument(skip(self, wav), fields(model = %self.model, len = wav.len()))]
    async fn transcribe(&self, wav: &[u8]) -> Result<Recognition> {
        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(AudioInput::from_vec_u8("voice_input.wav".to_string(), wav.to_vec()))
            .model(&self.model)
            .response_format(AudioResponseFormat::Json);

        if let Some(lang) = &self.language {
            request_builder.language(lang);
        }

        let request = request_builder.build().map_err(|e| {
            SvarError::SpeechServiceUnavailable(format!("Failed to build request: {}", e))
        })?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| SvarError::SpeechServiceUnavailable(format!("Whisper API error: {}", e)))?;

        debug!("Transcribed {} characters", response.text.len());
        Ok(Recognition::from_text(&response.text))
    }
}
