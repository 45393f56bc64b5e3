//! Context acquisition for Svar.
//!
//! A context is the passage a question is answered against. It comes from one of three
//! independent sources: a Wikipedia article, text the user enters, or an uploaded document.

pub mod document;
mod wikipedia;

pub use document::{extract_text, DocumentKind};
pub use wikipedia::{Article, WikipediaClient};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The three places a context can come from. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextSource {
    #[default]
    Wikipedia,
    EnteredText,
    UploadedFile,
}

impl ContextSource {
    /// All sources in display order.
    pub const ALL: [ContextSource; 3] = [
        ContextSource::Wikipedia,
        ContextSource::EnteredText,
        ContextSource::UploadedFile,
    ];

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ContextSource::Wikipedia => "Wikipedia",
            ContextSource::EnteredText => "Entered Text",
            ContextSource::UploadedFile => "Uploaded File",
        }
    }
}

impl std::fmt::Display for ContextSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextSource::Wikipedia => write!(f, "wikipedia"),
            ContextSource::EnteredText => write!(f, "entered_text"),
            ContextSource::UploadedFile => write!(f, "uploaded_file"),
        }
    }
}

/// Trait for topic-to-article lookup services.
#[async_trait]
pub trait TopicLookup: Send + Sync {
    /// Fetch the plain-text article for a topic.
    ///
    /// Fails with `TopicNotFound` or `TopicAmbiguous` when the topic does not resolve to a
    /// single article.
    async fn lookup(&self, topic: &str) -> Result<Article>;
}
