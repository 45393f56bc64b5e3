//! Svar - Ask questions about any text
//!
//! A small question-answering app. Pick a context, ask a question by keyboard or by voice,
//! and get the answer as text and as speech.
//!
//! The name "Svar" is Norwegian for "answer."
//!
//! # Overview
//!
//! Svar allows you to:
//! - Load a context from a Wikipedia article, typed text, or a .txt/.pdf document
//! - Ask questions by typing or by recording your voice
//! - Get an extracted answer with a confidence score, read aloud
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `context` - Wikipedia lookup and document text extraction
//! - `audio` - Conversion of recordings to WAV
//! - `transcription` - Speech-to-text for spoken questions
//! - `qa` - Extractive question answering
//! - `speech` - Text-to-speech for answers
//! - `session` - Per-user interactive state
//! - `app` - Applies user events to sessions
//!
//! # Example
//!
//! ```rust,no_run
//! use svar::app::App;
//! use svar::config::Settings;
//! use svar::context::ContextSource;
//! use svar::session::Event;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::new(Settings::load()?)?;
//!     let id = app.create_session().await?.session_id;
//!
//!     app.apply(&id, Event::EnterText("Paris is the capital of France.".into())).await?;
//!     app.apply(&id, Event::SelectSource(ContextSource::EnteredText)).await?;
//!     app.apply(&id, Event::TypeQuestion("What is the capital of France?".into())).await?;
//!
//!     let view = app.apply(&id, Event::GetAnswer).await?;
//!     if let Some(answer) = view.answer {
//!         println!("{} ({})", answer.text, answer.confidence);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod audio;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod openai;
pub mod qa;
pub mod session;
pub mod speech;
pub mod transcription;

pub use error::{Result, SvarError};
