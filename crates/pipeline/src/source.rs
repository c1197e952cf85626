//! HTTP client for the upstream transaction feed.
//!
//! The feed is a single `GET` returning a JSON array of transactions. There
//! is no pagination; the whole batch arrives in one response.

use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client};
use solomon_core::{PipelineError, SourceConfig, TransactionRecord, TransactionSource};
use std::time::Duration;

/// Longest slice of an error body kept in error messages.
const MAX_ERROR_BODY: usize = 256;

/// Fetches transaction batches over HTTP.
pub struct HttpTransactionSource {
    url: String,
    timeout: Duration,
    http: Client,
}

impl std::fmt::Debug for HttpTransactionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransactionSource")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpTransactionSource {
    /// Creates a source from the `[source]` configuration section.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: &SourceConfig) -> Result<Self, PipelineError> {
        Self::with_timeout(&config.url, Duration::from_secs(config.timeout_secs))
    }

    /// Creates a source for `url` with an explicit request deadline.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, PipelineError> {
        let http = Client::builder().timeout(timeout).build().map_err(|e| {
            PipelineError::SourceUnavailable(format!("failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            url: url.into(),
            timeout,
            http,
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetches and decodes the current batch.
    ///
    /// # Errors
    /// - `Timeout` if the request exceeds the configured deadline
    /// - `SourceUnavailable` on connection failure or a non-2xx status
    /// - `SourceFormatInvalid` if the body is not an array of transactions
    pub async fn fetch(&self) -> Result<Vec<TransactionRecord>, PipelineError> {
        tracing::debug!(url = %self.url, "GET transaction feed");

        let response = self
            .http
            .get(&self.url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::SourceUnavailable(format!(
                "{} answered {}: {}",
                self.url,
                status.as_u16(),
                truncate(&text, MAX_ERROR_BODY)
            )));
        }

        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        serde_json::from_slice::<Vec<TransactionRecord>>(&body)
            .map_err(|e| PipelineError::SourceFormatInvalid(e.to_string()))
    }

    fn classify(&self, err: reqwest::Error) -> PipelineError {
        if err.is_timeout() {
            PipelineError::Timeout(format!(
                "transaction feed did not answer within {}ms",
                self.timeout.as_millis()
            ))
        } else if err.is_connect() {
            PipelineError::SourceUnavailable(format!("connection failed: {err}"))
        } else {
            PipelineError::SourceUnavailable(err.to_string())
        }
    }
}

#[async_trait]
impl TransactionSource for HttpTransactionSource {
    async fn fetch_transactions(&self) -> Result<Vec<TransactionRecord>, PipelineError> {
        self.fetch().await
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
