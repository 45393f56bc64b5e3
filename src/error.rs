//! Error types for Svar.

use thiserror::Error;

/// Library-level error type for Svar operations.
#[derive(Error, Debug)]
pub enum SvarError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Page id \"{0}\" does not match any pages. Try another id!")]
    TopicNotFound(String),

    #[error("\"{topic}\" may refer to: {}", .options.join(", "))]
    TopicAmbiguous { topic: String, options: Vec<String> },

    #[error("Lookup failed: {0}")]
    Lookup(String),

    #[error("Unsupported document type: {0}. Upload a .txt or .pdf file.")]
    UnsupportedDocument(String),

    #[error("Could not extract document text: {0}")]
    DocumentExtraction(String),

    #[error("Audio export failed: {0}")]
    AudioExport(String),

    #[error("Speech service unavailable: {0}")]
    SpeechServiceUnavailable(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),
}

/// Result type alias for Svar operations.
pub type Result<T> = std::result::Result<T, SvarError>;
