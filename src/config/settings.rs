//! Configuration settings for Svar.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub wikipedia: WikipediaSettings,
    pub qa: QaSettings,
    pub transcription: TranscriptionSettings,
    pub speech: SpeechSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory under which per-session workspaces are created.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Directory holding ffmpeg, prepended to PATH at startup.
    pub ffmpeg_dir: Option<String>,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            temp_dir: "/tmp/svar".to_string(),
            log_level: "info".to_string(),
            ffmpeg_dir: None,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Largest accepted document or voice upload, in bytes.
    pub max_upload_bytes: usize,
    /// Sessions unused for this many minutes are dropped with their files.
    pub session_idle_minutes: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            max_upload_bytes: 25 * 1024 * 1024,
            session_idle_minutes: 30,
        }
    }
}

/// Wikipedia lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WikipediaSettings {
    /// MediaWiki Action API endpoint. `{lang}` is replaced by `language`.
    pub api_url: String,
    pub language: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
    /// Limit the extract to the first N sentences (None = full article).
    pub max_sentences: Option<u32>,
}

impl Default for WikipediaSettings {
    fn default() -> Self {
        Self {
            api_url: "https://{lang}.wikipedia.org/w/api.php".to_string(),
            language: "en".to_string(),
            user_agent: concat!("svar/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_seconds: 30,
            max_sentences: None,
        }
    }
}

impl WikipediaSettings {
    /// Endpoint with the language substituted.
    pub fn endpoint(&self) -> String {
        self.api_url.replace("{lang}", &self.language)
    }
}

/// Question-answering model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QaSettings {
    /// Base URL of the hosted inference API; the model name is appended.
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API token (optional).
    pub token_env: String,
    pub timeout_seconds: u64,
}

impl Default for QaSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api-inference.huggingface.co/models".to_string(),
            model: "distilbert-base-uncased-distilled-squad".to_string(),
            token_env: "HF_API_TOKEN".to_string(),
            timeout_seconds: 120,
        }
    }
}

impl QaSettings {
    /// Full model URL.
    pub fn model_url(&self) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), self.model)
    }

    /// API token read from the configured environment variable.
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env).ok().filter(|t| !t.is_empty())
    }
}

/// Speech-to-text settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    pub model: String,
    /// Language hint passed to the transcription service.
    pub language: Option<String>,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            language: Some("en".to_string()),
        }
    }
}

/// Text-to-speech settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub model: String,
    pub voice: String,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::SvarError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("svar")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded ffmpeg directory, if configured.
    pub fn ffmpeg_dir(&self) -> Option<PathBuf> {
        self.general
            .ffmpeg_dir
            .as_deref()
            .filter(|d| !d.is_empty())
            .map(Self::expand_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.qa.model, "distilbert-base-uncased-distilled-squad");
        assert_eq!(settings.wikipedia.endpoint(), "https://en.wikipedia.org/w/api.php");
        assert_eq!(
            settings.qa.model_url(),
            "https://api-inference.huggingface.co/models/distilbert-base-uncased-distilled-squad"
        );
        assert!(settings.ffmpeg_dir().is_none());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let settings: Settings = toml::from_str(
            r#"
            [general]
            ffmpeg_dir = "/opt/ffmpeg/bin"

            [wikipedia]
            language = "no"
            max_sentences = 5
            "#,
        )
        .unwrap();

        assert_eq!(settings.wikipedia.endpoint(), "https://no.wikipedia.org/w/api.php");
        assert_eq!(settings.wikipedia.max_sentences, Some(5));
        assert_eq!(settings.ffmpeg_dir(), Some(PathBuf::from("/opt/ffmpeg/bin")));
        // Untouched sections keep their defaults
        assert_eq!(settings.server.port, 8501);
        assert_eq!(settings.server.session_idle_minutes, 30);
        assert_eq!(settings.speech.voice, "alloy");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.server.port = 9000;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.server.port, 9000);
    }
}
