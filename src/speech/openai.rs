//! OpenAI text-to-speech implementation.

use super::Synthesizer;
use crate::config::SpeechSettings;
use crate::error::{Result, SvarError};
use crate::openai::create_client;
use async_openai::types::{CreateSpeechRequestArgs, SpeechModel, SpeechResponseFormat, Voice};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// OpenAI speech synthesizer producing MP3.
pub struct OpenAISpeech {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: SpeechModel,
    voice: Voice,
}

impl OpenAISpeech {
    /// Create a synthesizer from settings.
    pub fn with_config(settings: &SpeechSettings) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: parse_model(&settings.model),
            voice: parse_voice(&settings.voice)?,
        })
    }
}

fn parse_model(name: &str) -> SpeechModel {
    match name {
        "tts-1" => SpeechModel::Tts1,
        "tts-1-hd" => SpeechModel::Tts1Hd,
        other => SpeechModel::Other(other.to_string()),
    }
}

fn parse_voice(name: &str) -> Result<Voice> {
    match name.to_lowercase().as_str() {
        "alloy" => Ok(Voice::Alloy),
        "echo" => Ok(Voice::Echo),
        "fable" => Ok(Voice::Fable),
        "onyx" => Ok(Voice::Onyx),
        "nova" => Ok(Voice::Nova),
        "shimmer" => Ok(Voice::Shimmer),
        other => Err(SvarError::Config(format!("Unknown speech voice: {}", other))),
    }
}

#[async_trait]
impl Synthesizer for OpenAISpeech {
    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let request = CreateSpeechRequestArgs::default()
            .input(text)
            .model(self.model.clone())
            .voice(self.voice.clone())
            .response_format(SpeechResponseFormat::Mp3)
            .build()
            .map_err(|e| SvarError::Synthesis(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .speech(request)
            .await
            .map_err(|e| SvarError::Synthesis(format!("Speech API error: {}", e)))?;

        debug!("Synthesized {} bytes", response.bytes.len());
        Ok(response.bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_voice() {
        assert!(matches!(parse_voice("Nova"), Ok(Voice::Nova)));
        assert!(matches!(parse_voice("robot"), Err(SvarError::Config(_))));
    }

    #[test]
    fn test_parse_model() {
        assert!(matches!(parse_model("tts-1-hd"), SpeechModel::Tts1Hd));
        assert!(matches!(parse_model("gpt-4o-mini-tts"), SpeechModel::Other(m) if m == "gpt-4o-mini-tts"));
    }
}
