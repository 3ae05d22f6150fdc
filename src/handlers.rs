use crate::catalog;
use crate::classifier::tag_all;
use crate::config::Config;
use crate::errors::AppError;
use crate::feed_service::FeedService;
use crate::models::*;
use crate::normalizer::{slugify, title_case};
use crate::taxonomy::Taxonomy;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use moka::future::Cache;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const DEFAULT_FEATURED: usize = 6;
const MAX_FEATURED: usize = 48;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Cached, merged feed access.
    pub feed: Arc<FeedService>,
    /// Keyword tables, loaded once at startup.
    pub taxonomy: Arc<Taxonomy>,
    /// Tagged listings per snapshot digest, so tagging runs once per fetch.
    pub tagged_cache: Cache<String, Arc<Vec<TaggedProperty>>>,
}

impl AppState {
    pub fn new(config: Config, feed: Arc<FeedService>, taxonomy: Arc<Taxonomy>) -> Self {
        let tagged_cache = Cache::builder().max_capacity(4).build();
        Self {
            config,
            feed,
            taxonomy,
            tagged_cache,
        }
    }

    /// Tagged listings for the current snapshot, `None` when no feed data
    /// is available at all.
    pub async fn listings(&self) -> Option<Arc<Vec<TaggedProperty>>> {
        let snapshot = self.feed.try_snapshot().await?;
        let taxonomy = self.taxonomy.clone();
        let tagged = self
            .tagged_cache
            .get_with(snapshot.digest.clone(), async move {
                Arc::new(tag_all(&snapshot.properties, &taxonomy))
            })
            .await;
        Some(tagged)
    }
}

/// Routes under `/api/v1`, without middleware.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/properties", get(list_properties))
        .route("/api/v1/properties/:reference", get(get_property))
        .route("/api/v1/towns", get(list_towns))
        .route("/api/v1/towns/:town", get(get_town))
        .route("/api/v1/areas/:group", get(get_area_group))
        .route("/api/v1/tags/beach", get(beach_groups))
        .route("/api/v1/developments", get(list_developments))
        .route("/api/v1/featured", get(featured))
        .route("/api/v1/feed/status", get(feed_status))
        .route("/api/v1/feed/refresh", post(refresh_feed))
}

/// Health check endpoint.
///
/// Does not touch the feed, so it stays green while the upstream is down.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// GET /api/v1/properties
///
/// Filtered listing. An unreachable feed with nothing cached gives an empty
/// page with `feed_available: false`, not an error.
pub async fn list_properties(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<PropertyFilters>,
) -> Result<Json<PropertyListResponse>, AppError> {
    tracing::info!("GET /properties - filters: {:?}", filters);

    let Some(listings) = state.listings().await else {
        return Ok(Json(PropertyListResponse {
            properties: Vec::new(),
            total: 0,
            feed_available: false,
        }));
    };

    let properties = catalog::search(&listings, &filters)?;
    Ok(Json(PropertyListResponse {
        total: properties.len(),
        properties,
        feed_available: true,
    }))
}

/// GET /api/v1/properties/:reference
///
/// 503 rather than 404 when there is no feed data to look in.
pub async fn get_property(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
) -> Result<Json<TaggedProperty>, AppError> {
    tracing::info!("GET /properties/{}", reference);

    let listings = state.listings().await.ok_or_else(|| {
        AppError::FeedUnavailable(format!("Cannot look up {}: no feed data", reference))
    })?;
    catalog::find_by_reference(&listings, &reference)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Property {} not found", reference)))
}

/// GET /api/v1/towns
pub async fn list_towns(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let (listings, available) = listings_or_empty(&state).await;
    let towns = catalog::town_summaries(&listings);
    Json(json!({
        "total": towns.len(),
        "towns": towns,
        "feed_available": available,
    }))
}

/// GET /api/v1/towns/:town
pub async fn get_town(
    State(state): State<Arc<AppState>>,
    Path(town): Path<String>,
) -> Json<serde_json::Value> {
    tracing::info!("GET /towns/{}", town);

    let (listings, available) = listings_or_empty(&state).await;
    let properties = catalog::in_town(&listings, &town);
    let slug = slugify(&town);
    Json(json!({
        "name": title_case(&slug.replace('-', " ")),
        "slug": slug,
        "total": properties.len(),
        "properties": properties,
        "feed_available": available,
    }))
}

/// GET /api/v1/areas/:group
pub async fn get_area_group(
    State(state): State<Arc<AppState>>,
    Path(group): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let area = AreaGroup::parse(&group)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown area group: {}", group)))?;

    let (listings, available) = listings_or_empty(&state).await;
    let properties = catalog::in_area_group(&listings, area);
    Ok(Json(json!({
        "area": area,
        "total": properties.len(),
        "properties": properties,
        "feed_available": available,
    })))
}

/// GET /api/v1/tags/beach
pub async fn beach_groups(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let (listings, available) = listings_or_empty(&state).await;
    Json(json!({
        "groups": catalog::group_by_beach_distance(&listings),
        "feed_available": available,
    }))
}

/// GET /api/v1/developments
pub async fn list_developments(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let (listings, available) = listings_or_empty(&state).await;
    let developments = catalog::group_by_development(&listings);
    Json(json!({
        "total": developments.len(),
        "developments": developments,
        "feed_available": available,
    }))
}

#[derive(Debug, Deserialize)]
pub struct FeaturedParams {
    pub limit: Option<usize>,
}

/// GET /api/v1/featured
pub async fn featured(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FeaturedParams>,
) -> Json<serde_json::Value> {
    let limit = params.limit.unwrap_or(DEFAULT_FEATURED).min(MAX_FEATURED);
    let (listings, available) = listings_or_empty(&state).await;
    Json(json!({
        "properties": catalog::featured(&listings, limit),
        "feed_available": available,
    }))
}

/// GET /api/v1/feed/status
///
/// 503 when no snapshot can be produced.
pub async fn feed_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let snapshot = state.feed.snapshot().await?;
    Ok(Json(snapshot_status(&state, &snapshot)))
}

/// POST /api/v1/feed/refresh
///
/// Bypasses the revalidation window. A failed refresh answers 503 but
/// leaves the previous snapshot in service.
pub async fn refresh_feed(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!("POST /feed/refresh");
    let snapshot = state.feed.refresh().await?;
    Ok(Json(snapshot_status(&state, &snapshot)))
}

fn snapshot_status(state: &AppState, snapshot: &FeedSnapshot) -> serde_json::Value {
    let age = Utc::now()
        .signed_duration_since(snapshot.fetched_at)
        .num_seconds()
        .max(0);
    json!({
        "fetched_at": snapshot.fetched_at,
        "age_secs": age,
        "revalidate_secs": state.feed.revalidate_window().as_secs(),
        "digest": snapshot.digest,
        "properties": snapshot.properties.len(),
        "skipped": snapshot.skipped,
        "sources": snapshot.sources,
    })
}

async fn listings_or_empty(state: &AppState) -> (Arc<Vec<TaggedProperty>>, bool) {
    match state.listings().await {
        Some(listings) => (listings, true),
        None => (Arc::new(Vec::new()), false),
    }
}
