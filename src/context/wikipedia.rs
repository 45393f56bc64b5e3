//! Wikipedia topic lookup over the MediaWiki Action API.

use super::TopicLookup;
use crate::config::WikipediaSettings;
use crate::error::{Result, SvarError};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Number of alternatives reported for an ambiguous topic.
const MAX_OPTIONS: usize = 10;

/// A resolved article.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    /// Canonical title after redirects.
    pub title: String,
    /// Plain-text article body.
    pub content: String,
}

/// Wikipedia client.
pub struct WikipediaClient {
    http: reqwest::Client,
    endpoint: String,
    max_sentences: Option<u32>,
}

impl WikipediaClient {
    /// Create a client from settings.
    pub fn new(settings: &WikipediaSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(&settings.user_agent)
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| SvarError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: settings.endpoint(),
            max_sentences: settings.max_sentences,
        })
    }

    /// Fetch a page by exact title, following redirects.
    #[instrument(skip(self))]
    async fn fetch_page(&self, title: &str) -> Result<Article> {
        let mut params: Vec<(&str, String)> = vec![
            ("action", "query".into()),
            ("format", "json".into()),
            ("formatversion", "2".into()),
            ("prop", "extracts|pageprops|links".into()),
            ("explaintext", "1".into()),
            ("redirects", "1".into()),
            ("ppprop", "disambiguation".into()),
            ("plnamespace", "0".into()),
            ("pllimit", MAX_OPTIONS.to_string()),
            ("titles", title.to_string()),
        ];
        if let Some(n) = self.max_sentences {
            params.push(("exsentences", n.to_string()));
        }

        let body = self.get(&params).await?;
        parse_page_response(title, &body)
    }

    /// Find the best matching title for a free-text query.
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Option<String>> {
        let params: Vec<(&str, String)> = vec![
            ("action", "query".into()),
            ("format", "json".into()),
            ("formatversion", "2".into()),
            ("list", "search".into()),
            ("srlimit", "1".into()),
            ("srsearch", query.to_string()),
        ];

        let body = self.get(&params).await?;
        parse_search_response(&body)
    }

    async fn get(&self, params: &[(&str, String)]) -> Result<String> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(params)
            .send()
            .await
            .map_err(|e| SvarError::Lookup(format!("Wikipedia request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(SvarError::Lookup(format!("Wikipedia returned {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| SvarError::Lookup(format!("Failed to read Wikipedia response: {}", e)))
    }
}

#[async_trait]
impl TopicLookup for WikipediaClient {
    #[instrument(skip(self))]
    async fn lookup(&self, topic: &str) -> Result<Article> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(SvarError::InvalidInput("Topic is empty".to_string()));
        }

        match self.fetch_page(topic).await {
            Err(SvarError::TopicNotFound(_)) => {
                debug!("No exact title match, searching");
                match self.search(topic).await? {
                    Some(suggestion) if suggestion != topic => {
                        info!("Using suggested title: {}", suggestion);
                        self.fetch_page(&suggestion).await
                    }
                    _ => Err(SvarError::TopicNotFound(topic.to_string())),
                }
            }
            other => other,
        }
    }
}

// === MediaWiki response shapes ===

#[derive(Debug, Deserialize)]
struct QueryResponse {
    query: Option<Query>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    info: String,
}

#[derive(Debug, Default, Deserialize)]
struct Query {
    #[serde(default)]
    pages: Vec<Page>,
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    extract: Option<String>,
    pageprops: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    title: String,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

fn parse_query(body: &str) -> Result<Query> {
    let response: QueryResponse = serde_json::from_str(body)
        .map_err(|e| SvarError::Lookup(format!("Invalid Wikipedia response: {}", e)))?;

    if let Some(err) = response.error {
        return Err(SvarError::Lookup(format!("{}: {}", err.code, err.info)));
    }

    Ok(response.query.unwrap_or_default())
}

/// Turn a page query response into an article or a lookup error.
fn parse_page_response(topic: &str, body: &str) -> Result<Article> {
    let query = parse_query(body)?;

    let page = query
        .pages
        .into_iter()
        .next()
        .ok_or_else(|| SvarError::TopicNotFound(topic.to_string()))?;

    if page.missing || page.invalid {
        return Err(SvarError::TopicNotFound(topic.to_string()));
    }

    let is_disambiguation = page
        .pageprops
        .as_ref()
        .is_some_and(|props| props.contains_key("disambiguation"));

    if is_disambiguation {
        return Err(SvarError::TopicAmbiguous {
            topic: page.title,
            options: page.links.into_iter().map(|l| l.title).collect(),
        });
    }

    let content = page.extract.unwrap_or_default();
    if content.trim().is_empty() {
        return Err(SvarError::TopicNotFound(topic.to_string()));
    }

    Ok(Article {
        title: page.title,
        content,
    })
}

fn parse_search_response(body: &str) -> Result<Option<String>> {
    let query = parse_query(body)?;
    Ok(query.search.into_iter().next().map(|hit| hit.title))
}
