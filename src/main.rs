use axum::{routing::get, Router};
use property_feed::config::Config;
use property_feed::feed_service::FeedService;
use property_feed::handlers::{self, AppState};
use property_feed::taxonomy::Taxonomy;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// Initializes logging, configuration, the taxonomy tables and the feed
/// service, warms the feed cache in the background and starts the Axum
/// server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "property_feed=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let taxonomy = Arc::new(Taxonomy::load(config.taxonomy_path.as_deref())?);
    tracing::info!(
        "Taxonomy ready: {} beach zones, {} golf zones, {} price brackets",
        taxonomy.beach_zones.len(),
        taxonomy.golf_zones.len(),
        taxonomy.price_brackets.len()
    );

    let feed = Arc::new(FeedService::from_config(&config)?);
    tracing::info!(
        "Feed service initialized ({}s revalidation window)",
        config.feed_revalidate_secs
    );

    // Warm the cache so the first request does not pay for the fetch
    let warm = feed.clone();
    tokio::spawn(async move {
        match warm.snapshot().await {
            Ok(snapshot) => tracing::info!(
                "✓ Feed warmed: {} properties",
                snapshot.properties.len()
            ),
            Err(e) => tracing::warn!("Initial feed fetch failed: {}", e),
        }
    });

    let app_state = Arc::new(AppState::new(config.clone(), feed, taxonomy));

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let protected_routes = handlers::api_routes().layer(
        ServiceBuilder::new()
            // Only POST /feed/refresh takes a body, and an empty one
            .layer(RequestBodyLimitLayer::new(64 * 1024))
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Peer address is the rate-limit key when no proxy header is present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
