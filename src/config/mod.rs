//! Configuration module for Svar.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    GeneralSettings, QaSettings, ServerSettings, Settings, SpeechSettings, TranscriptionSettings,
    WikipediaSettings,
};
