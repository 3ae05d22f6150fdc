use serde::Deserialize;
use std::time::Duration;

/// Default revalidation window: one hour.
pub const DEFAULT_REVALIDATE_SECS: u64 = 3600;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub feed_url: String,
    pub secondary_feed_url: Option<String>,
    pub feed_revalidate_secs: u64,
    pub feed_timeout_secs: u64,
    pub taxonomy_path: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            feed_url: std::env::var("FEED_URL")
                .map_err(|_| anyhow::anyhow!("FEED_URL environment variable required"))
                .and_then(|url| validate_feed_url("FEED_URL", url))?,
            secondary_feed_url: match std::env::var("SECONDARY_FEED_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
            {
                Some(url) => Some(validate_feed_url("SECONDARY_FEED_URL", url)?),
                None => None,
            },
            feed_revalidate_secs: parse_secs("FEED_REVALIDATE_SECS", DEFAULT_REVALIDATE_SECS)?,
            feed_timeout_secs: parse_secs("FEED_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            taxonomy_path: std::env::var("TAXONOMY_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        };

        // Log successful configuration load
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Feed URL: {}", redact_query(&config.feed_url));
        if let Some(ref secondary) = config.secondary_feed_url {
            tracing::info!("Secondary feed configured: {}", redact_query(secondary));
        }
        tracing::debug!("Revalidation window: {}s", config.feed_revalidate_secs);
        if let Some(ref path) = config.taxonomy_path {
            tracing::info!("Taxonomy override: {}", path);
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// Config for a single feed with defaults everywhere else.
    pub fn for_feed(feed_url: impl Into<String>) -> Self {
        Self {
            port: 3000,
            feed_url: feed_url.into(),
            secondary_feed_url: None,
            feed_revalidate_secs: DEFAULT_REVALIDATE_SECS,
            feed_timeout_secs: DEFAULT_TIMEOUT_SECS,
            taxonomy_path: None,
        }
    }

    pub fn revalidate_window(&self) -> Duration {
        Duration::from_secs(self.feed_revalidate_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_secs)
    }
}

fn validate_feed_url(name: &str, url: String) -> anyhow::Result<String> {
    if url.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }
    let parsed = url::Url::parse(url.trim())
        .map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(url.trim().to_string())
}

fn parse_secs(name: &str, default: u64) -> anyhow::Result<u64> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("{} must be a whole number of seconds", name))?;
            if secs == 0 {
                anyhow::bail!("{} must be greater than zero", name);
            }
            Ok(secs)
        }
        _ => Ok(default),
    }
}

/// Feed URLs carry access tokens in the query string; keep them out of logs.
pub fn redact_query(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) if parsed.query().is_some() => {
            parsed.set_query(Some("[REDACTED]"));
            parsed.to_string()
        }
        Ok(parsed) => parsed.to_string(),
        Err(_) => "[invalid url]".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_feed_url_rejects_other_schemes() {
        assert!(validate_feed_url("FEED_URL", "ftp://feeds.example.com/x.xml".into()).is_err());
        assert!(validate_feed_url("FEED_URL", "   ".into()).is_err());
        assert!(validate_feed_url("FEED_URL", "not a url".into()).is_err());
    }

    #[test]
    fn test_validate_feed_url_trims() {
        let url = validate_feed_url("FEED_URL", " https://xml.example.com/kyero.xml ".into());
        assert_eq!(url.unwrap(), "https://xml.example.com/kyero.xml");
    }

    #[test]
    fn test_redact_query_hides_token() {
        let redacted = redact_query("https://feeds.example.com/export?security_token=abc&id=19");
        assert!(!redacted.contains("abc"));
        assert!(redacted.contains("REDACTED"));
        assert_eq!(
            redact_query("https://feeds.example.com/kyero.xml"),
            "https://feeds.example.com/kyero.xml"
        );
    }

    #[test]
    fn test_for_feed_defaults() {
        let config = Config::for_feed("http://localhost/feed.xml");
        assert_eq!(config.revalidate_window(), Duration::from_secs(3600));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(30));
        assert!(config.secondary_feed_url.is_none());
    }
}
