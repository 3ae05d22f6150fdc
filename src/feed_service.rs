//! Cached, merged access to the configured feeds.
//!
//! One snapshot is kept in a `moka` cache whose time-to-live is the
//! revalidation window. Concurrent readers inside the window share the
//! cached snapshot; a cold cache with nothing fetched yet triggers exactly
//! one fetch that all waiting readers join.
//!
//! Once a snapshot has been fetched, readers never wait on the network
//! again: an expired cache serves the last good snapshot immediately and
//! revalidates in a background task. A failed revalidation is not retried
//! until a short cooldown has passed.

use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::feed_client::{FeedClient, FetchedFeed};
use crate::models::{FeedSnapshot, PropertyRecord, SourceStats};
use chrono::Utc;
use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;

/// Upper bound on how long a failed revalidation blocks the next attempt.
const MAX_RETRY_COOLDOWN: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct FeedService {
    /// Primary feed first; its records win on reference collisions.
    sources: Arc<Vec<FeedClient>>,
    cache: Cache<(), Arc<FeedSnapshot>>,
    last_good: Arc<RwLock<Option<Arc<FeedSnapshot>>>>,
    /// Held while a background revalidation runs; stores the last failure.
    revalidation: Arc<Mutex<Option<Instant>>>,
    revalidate: Duration,
}

impl FeedService {
    pub fn new(sources: Vec<FeedClient>, revalidate: Duration) -> Self {
        let cache = Cache::builder()
            .time_to_live(revalidate)
            .max_capacity(1)
            .build();

        Self {
            sources: Arc::new(sources),
            cache,
            last_good: Arc::new(RwLock::new(None)),
            revalidation: Arc::new(Mutex::new(None)),
            revalidate,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let timeout = config.fetch_timeout();
        let mut sources = vec![FeedClient::new(config.feed_url.clone(), "primary", timeout)?];
        if let Some(ref secondary) = config.secondary_feed_url {
            sources.push(FeedClient::new(secondary.clone(), "secondary", timeout)?);
        }
        Ok(Self::new(sources, config.revalidate_window()))
    }

    pub fn revalidate_window(&self) -> Duration {
        self.revalidate
    }

    /// Current snapshot: cached, the last good one, or freshly fetched.
    ///
    /// Only the very first read waits for the network. After that an
    /// expired cache hands back the last good snapshot and revalidates in
    /// the background. Errors only when nothing was ever fetched.
    pub async fn snapshot(&self) -> Result<Arc<FeedSnapshot>, AppError> {
        if let Some(cached) = self.cache.get(&()).await {
            return Ok(cached);
        }
        if let Some(previous) = self.last_good().await {
            tracing::debug!(
                "Feed cache expired, serving snapshot from {} while revalidating",
                previous.fetched_at
            );
            self.revalidate_in_background();
            return Ok(previous);
        }
        self.cached_or_fetch().await
    }

    /// Like [`snapshot`](Self::snapshot), with failure logged and dropped.
    pub async fn try_snapshot(&self) -> Option<Arc<FeedSnapshot>> {
        match self.snapshot().await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::error!("Feed unavailable and nothing cached: {}", e);
                None
            }
        }
    }

    /// All records, or an empty list when no feed data is available.
    pub async fn properties_or_empty(&self) -> Vec<PropertyRecord> {
        self.try_snapshot()
            .await
            .map(|s| s.properties.clone())
            .unwrap_or_default()
    }

    /// Drops the cached snapshot so the next read revalidates.
    pub async fn invalidate(&self) {
        self.cache.invalidate(&()).await;
    }

    /// Forces a fetch now and waits for it.
    ///
    /// Unlike [`snapshot`](Self::snapshot) this reports the fetch error; the
    /// last good snapshot stays in place for readers either way.
    pub async fn refresh(&self) -> Result<Arc<FeedSnapshot>, AppError> {
        self.invalidate().await;
        self.cached_or_fetch().await.context("manual refresh")
    }

    pub async fn last_good(&self) -> Option<Arc<FeedSnapshot>> {
        self.last_good.read().await.clone()
    }

    /// Starts at most one background revalidation.
    ///
    /// Skipped while another one runs, and for a cooldown of
    /// `min(window, 30s)` after a failed one.
    fn revalidate_in_background(&self) {
        let Ok(mut gate) = self.revalidation.clone().try_lock_owned() else {
            return;
        };
        let cooldown = self.revalidate.min(MAX_RETRY_COOLDOWN);
        if gate.is_some_and(|failed_at| failed_at.elapsed() < cooldown) {
            return;
        }

        let service = self.clone();
        tokio::spawn(async move {
            match service.cached_or_fetch().await {
                Ok(_) => *gate = None,
                Err(e) => {
                    tracing::warn!(
                        "Background feed revalidation failed, retrying in {:?}: {}",
                        cooldown,
                        e
                    );
                    *gate = Some(Instant::now());
                }
            }
        });
    }

    async fn cached_or_fetch(&self) -> Result<Arc<FeedSnapshot>, AppError> {
        self.cache
            .try_get_with((), self.fetch_all())
            .await
            .map_err(|e| e.as_ref().clone())
    }

    /// Fetches every source concurrently and merges in priority order.
    async fn fetch_all(&self) -> Result<Arc<FeedSnapshot>, AppError> {
        let mut tasks = JoinSet::new();
        for (index, source) in self.sources.iter().enumerate() {
            let source = source.clone();
            tasks.spawn(async move { (index, source.label().to_string(), source.fetch().await) });
        }

        let mut results = Vec::with_capacity(self.sources.len());
        while let Some(joined) = tasks.join_next().await {
            let (index, label, result) = joined.map_err(|e| {
                AppError::InternalError(format!("Feed fetch task failed: {}", e))
            })?;
            if let Err(ref e) = result {
                tracing::warn!("{} feed failed: {}", label, e);
            }
            results.push((index, label, result));
        }
        results.sort_by_key(|(index, _, _)| *index);

        let merged = merge_feeds(
            results
                .into_iter()
                .map(|(_, label, result)| (label, result))
                .collect(),
        )?;
        let snapshot = Arc::new(merged);
        tracing::info!(
            "Feed snapshot {} ready: {} properties, {} skipped",
            &snapshot.digest[..12],
            snapshot.properties.len(),
            snapshot.skipped
        );

        *self.last_good.write().await = Some(snapshot.clone());
        Ok(snapshot)
    }
}

/// Merges per-source results in priority order.
///
/// Records are keyed by upper-cased reference and the first source to
/// supply a reference keeps it. Fails only when every source failed.
pub fn merge_feeds(
    results: Vec<(String, Result<FetchedFeed, AppError>)>,
) -> Result<FeedSnapshot, AppError> {
    let mut hasher = Sha256::new();
    let mut seen = HashSet::new();
    let mut properties = Vec::new();
    let mut skipped = 0;
    let mut sources = Vec::with_capacity(results.len());
    let mut errors = Vec::new();

    for (label, result) in results {
        match result {
            Ok(fetched) => {
                hasher.update(fetched.body.as_bytes());
                skipped += fetched.parsed.skipped;
                let mut fetched_count = 0;
                for record in fetched.parsed.properties {
                    if seen.insert(record.reference.to_uppercase()) {
                        properties.push(record);
                        fetched_count += 1;
                    } else {
                        tracing::debug!(
                            "{} already supplied by a higher-priority feed, dropping {} copy",
                            record.reference,
                            label
                        );
                    }
                }
                sources.push(SourceStats {
                    source: label,
                    fetched: fetched_count,
                    ok: true,
                });
            }
            Err(e) => {
                errors.push(format!("{}: {}", label, e));
                sources.push(SourceStats {
                    source: label,
                    fetched: 0,
                    ok: false,
                });
            }
        }
    }

    if sources.iter().all(|s| !s.ok) {
        return Err(AppError::FeedUnavailable(if errors.is_empty() {
            "no feeds configured".to_string()
        } else {
            errors.join("; ")
        }));
    }

    Ok(FeedSnapshot {
        fetched_at: Utc::now(),
        digest: hex::encode(hasher.finalize()),
        properties,
        skipped,
        sources,
    })
}
