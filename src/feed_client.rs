use crate::config::redact_query;
use crate::errors::AppError;
use crate::feed_parser::parse_feed;
use crate::models::ParsedFeed;
use reqwest;
use std::time::Duration;
use tracing;

/// Client for one XML property feed.
#[derive(Clone)]
pub struct FeedClient {
    client: reqwest::Client,
    url: String,
    label: String,
}

/// Body and parse result of one successful fetch.
#[derive(Debug, Clone)]
pub struct FetchedFeed {
    pub body: String,
    pub parsed: ParsedFeed,
}

impl FeedClient {
    /// Creates a new `FeedClient`.
    ///
    /// # Arguments
    ///
    /// * `url` - Full feed URL, query string included.
    /// * `label` - Short name used in logs and as each record's `source`.
    /// * `timeout` - Whole-request timeout.
    pub fn new(url: String, label: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("property-feed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create feed client: {}", e))
            })?;

        Ok(Self {
            client,
            url,
            label: label.into(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Downloads the raw feed body.
    ///
    /// Transport errors and non-2xx answers are both `FeedUnavailable`.
    pub async fn fetch_raw(&self) -> Result<String, AppError> {
        tracing::info!(
            "Fetching {} feed: {}",
            self.label,
            redact_query(&self.url)
        );

        let response = self.client.get(&self.url).send().await.map_err(|e| {
            AppError::FeedUnavailable(format!("{} feed request failed: {}", self.label, e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::FeedUnavailable(format!(
                "{} feed returned {}",
                self.label, status
            )));
        }

        let body = response.text().await.map_err(|e| {
            AppError::FeedUnavailable(format!("Failed to read {} feed body: {}", self.label, e))
        })?;

        tracing::debug!("{} feed body: {} bytes", self.label, body.len());
        Ok(body)
    }

    /// Downloads and parses the feed.
    pub async fn fetch(&self) -> Result<FetchedFeed, AppError> {
        let body = self.fetch_raw().await?;
        let parsed = parse_feed(&body, &self.label)?;
        Ok(FetchedFeed { body, parsed })
    }
}
