use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============ Feed Models ============

/// One listed unit or development, as parsed from a feed.
///
/// Numeric fields stay `None` when the feed omits them or sends something
/// that does not parse; a missing price means "price on request".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PropertyRecord {
    /// Reference id, unique within one fetch.
    pub reference: String,
    /// Asking price in EUR.
    pub price: Option<f64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    /// Built size in m².
    pub built_size: Option<f64>,
    /// Plot size in m².
    pub plot_size: Option<f64>,
    /// Town exactly as the feed spells it.
    pub town: String,
    /// Zone / urbanisation exactly as the feed spells it.
    pub zone: String,
    pub province: String,
    pub property_type: String,
    /// Free-text status.
    pub status: String,
    /// Free-text description (English where the feed offers a choice).
    pub description: String,
    pub images: Vec<String>,
    pub features: Vec<String>,
    pub development: String,
    pub developer: String,
    pub coordinates: Option<Coordinates>,
    /// Label of the feed this record came from.
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Result of parsing one feed document.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub properties: Vec<PropertyRecord>,
    /// Listings dropped as malformed or duplicate.
    pub skipped: usize,
}

/// One merged fetch across all configured feeds.
#[derive(Debug, Clone, Serialize)]
pub struct FeedSnapshot {
    pub fetched_at: DateTime<Utc>,
    /// SHA-256 over the raw feed bodies, hex encoded.
    pub digest: String,
    pub properties: Vec<PropertyRecord>,
    pub skipped: usize,
    pub sources: Vec<SourceStats>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SourceStats {
    pub source: String,
    pub fetched: usize,
    pub ok: bool,
}

// ============ Classification Models ============

/// Proximity of a listing to the coastline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BeachDistance {
    Beachfront,
    Walking,
    ShortDrive,
}

impl BeachDistance {
    pub fn as_str(&self) -> &'static str {
        match self {
            BeachDistance::Beachfront => "beachfront",
            BeachDistance::Walking => "walking",
            BeachDistance::ShortDrive => "short-drive",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "beachfront" => Some(BeachDistance::Beachfront),
            "walking" => Some(BeachDistance::Walking),
            "short-drive" | "short_drive" => Some(BeachDistance::ShortDrive),
            _ => None,
        }
    }
}

impl fmt::Display for BeachDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeachTag {
    pub beach: String,
    pub distance: BeachDistance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GolfDistance {
    OnCourse,
    Walking,
    ShortDrive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GolfTag {
    pub course: String,
    pub distance: GolfDistance,
    pub holes: u32,
}

/// Marketing regions the towns are sorted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionKey {
    CostaBlancaNorth,
    CostaBlancaNorthInland,
    CostaBlancaSouth,
    CostaBlancaSouthInland,
    CostaCalida,
    CostaCalidaInland,
}

impl RegionKey {
    pub const ALL: [RegionKey; 6] = [
        RegionKey::CostaBlancaNorth,
        RegionKey::CostaBlancaNorthInland,
        RegionKey::CostaBlancaSouth,
        RegionKey::CostaBlancaSouthInland,
        RegionKey::CostaCalida,
        RegionKey::CostaCalidaInland,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RegionKey::CostaBlancaNorth => "Costa Blanca North",
            RegionKey::CostaBlancaNorthInland => "Costa Blanca North Inland",
            RegionKey::CostaBlancaSouth => "Costa Blanca South",
            RegionKey::CostaBlancaSouthInland => "Costa Blanca South Inland",
            RegionKey::CostaCalida => "Costa Calida",
            RegionKey::CostaCalidaInland => "Costa Calida Inland",
        }
    }

    pub fn is_inland(&self) -> bool {
        matches!(
            self,
            RegionKey::CostaBlancaNorthInland
                | RegionKey::CostaBlancaSouthInland
                | RegionKey::CostaCalidaInland
        )
    }

    pub fn slug(&self) -> &'static str {
        match self {
            RegionKey::CostaBlancaNorth => "costa-blanca-north",
            RegionKey::CostaBlancaNorthInland => "costa-blanca-north-inland",
            RegionKey::CostaBlancaSouth => "costa-blanca-south",
            RegionKey::CostaBlancaSouthInland => "costa-blanca-south-inland",
            RegionKey::CostaCalida => "costa-calida",
            RegionKey::CostaCalidaInland => "costa-calida-inland",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        RegionKey::ALL.into_iter().find(|r| r.slug() == slug)
    }
}

/// Fixed keyword groups used for page sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaGroup {
    South,
    North,
    Golf,
    Inland,
}

impl AreaGroup {
    pub const ALL: [AreaGroup; 4] = [
        AreaGroup::South,
        AreaGroup::North,
        AreaGroup::Golf,
        AreaGroup::Inland,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "south" => Some(AreaGroup::South),
            "north" => Some(AreaGroup::North),
            "golf" => Some(AreaGroup::Golf),
            "inland" => Some(AreaGroup::Inland),
            _ => None,
        }
    }
}

/// Delivery state derived from the free-text status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListingStatus {
    KeyReady,
    #[serde(rename = "completion-3-months")]
    CompletionThreeMonths,
    UnderConstruction,
    OffPlan,
    Sold,
}

/// Derived, non-persisted tags for one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyTags {
    pub is_key_ready: bool,
    pub has_pool: bool,
    pub has_sea_view: bool,
    pub has_golf_view: bool,
    pub has_garden: bool,
    pub has_terrace: bool,
    pub has_parking: bool,
    pub beach: Option<BeachTag>,
    pub golf: Option<GolfTag>,
    pub region: Option<RegionKey>,
    pub area_groups: Vec<AreaGroup>,
    pub price_bracket: Option<String>,
    pub status: ListingStatus,
    pub property_type: String,
    /// Alias-resolved grouping key for the town.
    pub canonical_town: String,
}

impl PropertyTags {
    pub fn beach_distance(&self) -> Option<BeachDistance> {
        self.beach.as_ref().map(|b| b.distance)
    }
}

/// A record together with its tags, as handed to consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedProperty {
    #[serde(flatten)]
    pub record: PropertyRecord,
    pub tags: PropertyTags,
}

// ============ Query Models ============

/// Search filters accepted by the listing endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyFilters {
    pub town: Option<String>,
    pub region: Option<String>,
    #[serde(rename = "type")]
    pub property_type: Option<String>,
    pub min_bedrooms: Option<u32>,
    pub max_bedrooms: Option<u32>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub pool: Option<bool>,
    pub sea_view: Option<bool>,
    pub golf_view: Option<bool>,
    pub garden: Option<bool>,
    pub terrace: Option<bool>,
    pub parking: Option<bool>,
    pub key_ready: Option<bool>,
    pub beach: Option<String>,
    pub area: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

/// Per-town aggregate for area pages.
#[derive(Debug, Clone, Serialize)]
pub struct TownSummary {
    pub name: String,
    pub slug: String,
    pub region: Option<RegionKey>,
    pub property_count: usize,
    pub property_types: Vec<String>,
    pub price_range: Option<PriceRange>,
}

/// Listings sharing a development name.
#[derive(Debug, Clone, Serialize)]
pub struct DevelopmentSummary {
    pub slug: String,
    pub name: String,
    pub developer: String,
    pub town: String,
    pub property_count: usize,
    pub price_from: Option<f64>,
    pub price_to: Option<f64>,
    pub types: Vec<String>,
    pub bedroom_range: Option<(u32, u32)>,
    pub references: Vec<String>,
}

/// Paged listing response.
#[derive(Debug, Serialize)]
pub struct PropertyListResponse {
    pub properties: Vec<TaggedProperty>,
    pub total: usize,
    /// False when the feed could not be reached and nothing was cached.
    pub feed_available: bool,
}
