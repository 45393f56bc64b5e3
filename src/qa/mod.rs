//! Extractive question answering.
//!
//! The model is consumed as a black box: given a question and a context it returns the
//! answer span and a confidence score. One model handle is shared by the whole process and
//! created the first time it is needed.

mod hosted;

pub use hosted::HostedQaModel;

use crate::config::QaSettings;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

/// An extracted answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// The answer span, a substring of the context.
    #[serde(rename = "answer")]
    pub text: String,
    /// Confidence in [0, 1].
    pub score: f64,
    /// Character offset of the span start in the context.
    #[serde(default)]
    pub start: usize,
    /// Character offset of the span end in the context.
    #[serde(default)]
    pub end: usize,
}

impl Answer {
    /// Confidence formatted with two decimals.
    pub fn confidence(&self) -> String {
        format!("{:.2}", self.score)
    }
}

/// Trait for extractive question-answering models.
#[async_trait]
pub trait AnswerModel: Send + Sync {
    /// Answer a question against a context.
    async fn answer(&self, question: &str, context: &str) -> Result<Answer>;

    /// Model identifier for display.
    fn name(&self) -> &str;
}

type ModelFactory = Box<dyn Fn() -> Result<Arc<dyn AnswerModel>> + Send + Sync>;

/// Lazily-initialized, process-wide model handle.
///
/// Initialization runs at most once, even when several sessions ask for the model at the
/// same time. A failed initialization is not cached, so the next request tries again.
pub struct SharedModel {
    cell: OnceCell<Arc<dyn AnswerModel>>,
    factory: ModelFactory,
}

impl SharedModel {
    /// Create a handle that builds the model with `factory` on first use.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn AnswerModel>> + Send + Sync + 'static,
    {
        Self {
            cell: OnceCell::new(),
            factory: Box::new(factory),
        }
    }

    /// Create a handle for the hosted model described by settings.
    pub fn from_settings(settings: QaSettings) -> Self {
        Self::new(move || {
            let model = HostedQaModel::new(&settings)?;
            Ok(Arc::new(model) as Arc<dyn AnswerModel>)
        })
    }

    /// Create a handle around an already-built model.
    pub fn preloaded(model: Arc<dyn AnswerModel>) -> Self {
        Self {
            cell: OnceCell::new_with(Some(model)),
            factory: Box::new(|| {
                Err(crate::error::SvarError::Config(
                    "preloaded model handle has no factory".to_string(),
                ))
            }),
        }
    }

    /// Get the model, initializing it on first use.
    pub async fn get(&self) -> Result<Arc<dyn AnswerModel>> {
        let model = self
            .cell
            .get_or_try_init(|| async {
                let model = (self.factory)()?;
                info!("Loaded question-answering model: {}", model.name());
                Ok::<_, crate::error::SvarError>(model)
            })
            .await?;
        Ok(Arc::clone(model))
    }

    /// Whether the model has been initialized.
    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SvarError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoModel;

    #[async_trait]
    impl AnswerModel for EchoModel {
        async fn answer(&self, question: &str, _context: &str) -> Result<Answer> {
            Ok(Answer {
                text: question.to_string(),
                score: 1.0,
                start: 0,
                end: question.len(),
            })
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_initializes_once_under_concurrency() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let shared = Arc::new(SharedModel::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(EchoModel) as Arc<dyn AnswerModel>)
        }));

        assert!(!shared.is_loaded());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let shared = shared.clone();
                tokio::spawn(async move { shared.get().await.map(|m| m.name().to_string()) })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "echo");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(shared.is_loaded());
    }

    #[tokio::test]
    async fn test_failed_initialization_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let shared = SharedModel::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(SvarError::Config("first attempt fails".to_string()))
            } else {
                Ok(Arc::new(EchoModel) as Arc<dyn AnswerModel>)
            }
        });

        assert!(shared.get().await.is_err());
        assert!(shared.get().await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_preloaded() {
        let shared = SharedModel::preloaded(Arc::new(EchoModel));
        assert!(shared.is_loaded());
        let answer = shared.get().await.unwrap().answer("hi", "ctx").await.unwrap();
        assert_eq!(answer.text, "hi");
    }

    #[test]
    fn test_confidence_formatting() {
        let answer = Answer {
            text: "Paris".to_string(),
            score: 0.98765,
            start: 0,
            end: 5,
        };
        assert_eq!(answer.confidence(), "0.99");
    }
}
