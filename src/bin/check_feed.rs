//! Utility to fetch a feed once and print what the service would make of it.
//!
//! Uses `FEED_URL` from the environment unless a URL is passed as the first
//! argument.

use property_feed::catalog;
use property_feed::classifier::tag_all;
use property_feed::config::{redact_query, DEFAULT_TIMEOUT_SECS};
use property_feed::feed_client::FeedClient;
use property_feed::models::RegionKey;
use property_feed::taxonomy::Taxonomy;
use std::collections::BTreeMap;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "property_feed=info".into()),
        )
        .init();

    let url = match std::env::args().nth(1) {
        Some(url) => url,
        None => std::env::var("FEED_URL")
            .map_err(|_| anyhow::anyhow!("Pass a feed URL or set FEED_URL"))?,
    };
    let taxonomy = Taxonomy::load(std::env::var("TAXONOMY_PATH").ok().as_deref())?;

    println!("Fetching {}...", redact_query(&url));
    let client = FeedClient::new(url, "check", Duration::from_secs(DEFAULT_TIMEOUT_SECS))?;
    let fetched = client.fetch().await?;
    println!("Feed fetched, size: {} bytes", fetched.body.len());
    println!(
        "Total properties: {} ({} skipped)",
        fetched.parsed.properties.len(),
        fetched.parsed.skipped
    );

    let tagged = tag_all(&fetched.parsed.properties, &taxonomy);

    if let Some(first) = tagged.first() {
        println!("\n=== FIRST PROPERTY ===");
        println!("{}", serde_json::to_string_pretty(first)?);
    }

    println!("\n=== TOWNS ===");
    for summary in catalog::town_summaries(&tagged) {
        println!(
            "{:<32} {:>5}  {}",
            summary.name,
            summary.property_count,
            summary.region.map(|r| r.label()).unwrap_or("(no region)")
        );
    }
    let unnamed = tagged.iter().filter(|t| t.tags.canonical_town.is_empty()).count();
    if unnamed > 0 {
        println!("{:<32} {:>5}", "(no town)", unnamed);
    }

    println!("\n=== REGIONS ===");
    let mut regions: BTreeMap<Option<RegionKey>, usize> = BTreeMap::new();
    for item in &tagged {
        *regions.entry(item.tags.region).or_default() += 1;
    }
    for (region, count) in regions {
        println!(
            "{:<32} {:>5}",
            region.map(|r| r.label()).unwrap_or("(unmatched)"),
            count
        );
    }

    println!("\n=== TAGS ===");
    let key_ready = tagged.iter().filter(|t| t.tags.is_key_ready).count();
    let pool = tagged.iter().filter(|t| t.tags.has_pool).count();
    let golf = tagged.iter().filter(|t| t.tags.golf.is_some()).count();
    println!("key-ready: {}", key_ready);
    println!("pool:      {}", pool);
    println!("golf:      {}", golf);
    for (label, count) in [
        ("sea view", tagged.iter().filter(|t| t.tags.has_sea_view).count()),
        ("golf view", tagged.iter().filter(|t| t.tags.has_golf_view).count()),
        ("garden", tagged.iter().filter(|t| t.tags.has_garden).count()),
        ("terrace", tagged.iter().filter(|t| t.tags.has_terrace).count()),
        ("parking", tagged.iter().filter(|t| t.tags.has_parking).count()),
    ] {
        println!("{:<10} {}", format!("{}:", label), count);
    }
    for (distance, listings) in catalog::group_by_beach_distance(&tagged) {
        println!("beach {:<11} {}", format!("{}:", distance), listings.len());
    }

    Ok(())
}
