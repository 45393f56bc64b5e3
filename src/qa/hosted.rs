//! Hosted extractive QA model (Hugging Face inference API).

use super::{Answer, AnswerModel};
use crate::config::QaSettings;
use crate::error::{Result, SvarError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// QA model served over HTTP.
pub struct HostedQaModel {
    http: reqwest::Client,
    url: String,
    model: String,
    token: Option<String>,
}

impl HostedQaModel {
    /// Create a client for the model named in settings.
    pub fn new(settings: &QaSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| SvarError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: settings.model_url(),
            model: settings.model.clone(),
            token: settings.token(),
        })
    }
}

#[derive(Serialize)]
struct QaRequest<'a> {
    inputs: QaInputs<'a>,
    options: QaOptions,
}

#[derive(Serialize)]
struct QaInputs<'a> {
    question: &'a str,
    context: &'a str,
}

#[derive(Serialize)]
struct QaOptions {
    wait_for_model: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QaResponse {
    Single(Answer),
    Ranked(Vec<Answer>),
    Error { error: String },
}

/// Pick the answer out of a response body.
fn parse_response(body: &str) -> Result<Answer> {
    let response: QaResponse = serde_json::from_str(body)
        .map_err(|e| SvarError::Inference(format!("Unexpected model response: {}", e)))?;

    let mut answer = match response {
        QaResponse::Single(answer) => answer,
        QaResponse::Ranked(answers) => answers
            .into_iter()
            .next()
            .ok_or_else(|| SvarError::Inference("Model returned no answers".to_string()))?,
        QaResponse::Error { error } => return Err(SvarError::Inference(error)),
    };

    answer.score = answer.score.clamp(0.0, 1.0);
    Ok(answer)
}

#[async_trait]
impl AnswerModel for HostedQaModel {
    #[instrument(skip(self, context), fields(model = %self.model, context_len = context.len()))]
    async fn answer(&self, question: &str, context: &str) -> Result<Answer> {
        let request = QaRequest {
            inputs: QaInputs { question, context },
            options: QaOptions {
                wait_for_model: true,
            },
        };

        let mut builder = self.http.post(&self.url).json(&request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SvarError::Inference(format!("Model request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SvarError::Inference(format!("Failed to read model response: {}", e)))?;

        if !status.is_success() {
            // Error bodies usually carry {"error": "..."}
            let detail = match parse_response(&body) {
                Err(SvarError::Inference(msg)) => msg,
                _ => body.chars().take(200).collect(),
            };
            return Err(SvarError::Inference(format!(
                "Model returned {}: {}",
                status, detail
            )));
        }

        let answer = parse_response(&body)?;
        debug!("Answer '{}' with score {:.3}", answer.text, answer.score);
        Ok(answer)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
