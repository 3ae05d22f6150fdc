//! Display tags derived from a record's free-text fields.
//!
//! Every function here is total: empty or unknown text yields the negative
//! classification, never an error.

use crate::matcher::{area_groups, region_for_town};
use crate::models::{
    BeachDistance, BeachTag, GolfDistance, GolfTag, ListingStatus, PropertyRecord, PropertyTags,
    TaggedProperty,
};
use crate::normalizer::{normalize_town_name, strip_accents};
use crate::taxonomy::{BeachZone, GolfZone, Taxonomy};

/// Immediate availability, from description or status wording.
pub fn is_key_ready(record: &PropertyRecord, taxonomy: &Taxonomy) -> bool {
    let description = record.description.to_lowercase();
    let status = record.status.to_lowercase();

    taxonomy
        .key_ready_phrases
        .iter()
        .any(|phrase| description.contains(phrase.as_str()) || status.contains(phrase.as_str()))
        || taxonomy
            .key_ready_status_phrases
            .iter()
            .any(|phrase| status.contains(phrase.as_str()))
}

pub fn has_pool(record: &PropertyRecord, taxonomy: &Taxonomy) -> bool {
    let description = record.description.to_lowercase();
    let features = record.features.join(" ").to_lowercase();

    taxonomy
        .pool_keywords
        .iter()
        .any(|k| description.contains(k.as_str()) || features.contains(k.as_str()))
}

/// Lowercase, accent-free feature list, one entry per element.
fn feature_entries(record: &PropertyRecord) -> Vec<String> {
    record
        .features
        .iter()
        .map(|f| strip_accents(&f.to_lowercase()))
        .filter(|f| !f.trim().is_empty())
        .collect()
}

fn features_mention(record: &PropertyRecord, keywords: &[String]) -> bool {
    feature_entries(record)
        .iter()
        .any(|entry| keywords.iter().any(|k| entry.contains(k.as_str())))
}

pub fn has_sea_view(record: &PropertyRecord, taxonomy: &Taxonomy) -> bool {
    features_mention(record, &taxonomy.feature_keywords.sea_view)
}

/// A single feature naming both the course and the view ("Golf views").
pub fn has_golf_view(record: &PropertyRecord, taxonomy: &Taxonomy) -> bool {
    let keywords = &taxonomy.feature_keywords.golf_view;
    feature_entries(record).iter().any(|entry| {
        keywords.course.iter().any(|k| entry.contains(k.as_str()))
            && keywords.outlook.iter().any(|k| entry.contains(k.as_str()))
    })
}

pub fn has_garden(record: &PropertyRecord, taxonomy: &Taxonomy) -> bool {
    features_mention(record, &taxonomy.feature_keywords.garden)
}

pub fn has_terrace(record: &PropertyRecord, taxonomy: &Taxonomy) -> bool {
    features_mention(record, &taxonomy.feature_keywords.terrace)
}

pub fn has_parking(record: &PropertyRecord, taxonomy: &Taxonomy) -> bool {
    features_mention(record, &taxonomy.feature_keywords.parking)
}

/// Beach proximity from the beach-zone table.
///
/// The normalized zone is looked up first. Feeds with thin zone data fall
/// back to the town: exact key, then containment either way.
pub fn beach_tag(record: &PropertyRecord, taxonomy: &Taxonomy) -> Option<BeachTag> {
    let to_tag = |zone: &BeachZone| BeachTag {
        beach: zone.beach.clone(),
        distance: zone.distance,
    };

    let zone = normalize_town_name(&record.zone);
    if !zone.is_empty() {
        if let Some(found) = taxonomy.beach_zone(&zone) {
            return Some(to_tag(found));
        }
    }

    let town = normalize_town_name(&record.town);
    if town.is_empty() {
        return None;
    }
    if let Some(found) = taxonomy.beach_zone(&town) {
        return Some(to_tag(found));
    }
    taxonomy
        .beach_zones
        .iter()
        .find(|z| town.contains(z.zone.as_str()) || z.zone.contains(town.as_str()))
        .map(to_tag)
}

pub fn beach_distance(record: &PropertyRecord, taxonomy: &Taxonomy) -> Option<BeachDistance> {
    beach_tag(record, taxonomy).map(|t| t.distance)
}

/// Golf proximity from the golf-zone table, with the same town fallback.
pub fn golf_tag(record: &PropertyRecord, taxonomy: &Taxonomy) -> Option<GolfTag> {
    let to_tag = |zone: &GolfZone| GolfTag {
        course: zone.course.clone(),
        distance: zone.distance,
        holes: zone.holes,
    };

    let zone = normalize_town_name(&record.zone);
    if !zone.is_empty() {
        if let Some(found) = taxonomy.golf_zone(&zone) {
            return Some(to_tag(found));
        }
        if zone.contains("golf") {
            return Some(GolfTag {
                course: record.zone.trim().to_string(),
                distance: GolfDistance::OnCourse,
                holes: 18,
            });
        }
    }

    let town = normalize_town_name(&record.town);
    if town.is_empty() {
        return None;
    }
    if let Some(found) = taxonomy.golf_zone(&town) {
        return Some(to_tag(found));
    }
    taxonomy
        .golf_zones
        .iter()
        .find(|z| town.contains(z.zone.as_str()) || z.zone.contains(town.as_str()))
        .map(to_tag)
}

/// Maps free-text status onto the fixed delivery states.
pub fn listing_status(status: &str) -> ListingStatus {
    let status = status.to_lowercase();
    if status.trim().is_empty() {
        return ListingStatus::UnderConstruction;
    }

    if status.contains("key") || status.contains("ready") || status.contains("llave") {
        ListingStatus::KeyReady
    } else if status.contains("sold") || status.contains("vendido") {
        ListingStatus::Sold
    } else if status.contains("off-plan") || status.contains("off plan") || status.contains("plano") {
        ListingStatus::OffPlan
    } else if status.contains("3 month") || status.contains("próxima") || status.contains("proxima") {
        ListingStatus::CompletionThreeMonths
    } else {
        ListingStatus::UnderConstruction
    }
}

/// First rule whose keyword appears in the raw type wins.
pub fn normalize_property_type(raw: &str, taxonomy: &Taxonomy) -> String {
    let lower = raw.to_lowercase();
    taxonomy
        .property_types
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| lower.contains(k.as_str())))
        .map(|rule| rule.label.clone())
        .unwrap_or_else(|| {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                "Property".to_string()
            } else {
                trimmed.to_string()
            }
        })
}

pub fn price_bracket(price: Option<f64>, taxonomy: &Taxonomy) -> Option<String> {
    let price = price?;
    taxonomy
        .price_brackets
        .iter()
        .find(|b| b.contains(price))
        .map(|b| b.id.clone())
}

/// All tags for one record.
pub fn tag(record: &PropertyRecord, taxonomy: &Taxonomy) -> PropertyTags {
    let mut status = listing_status(&record.status);
    let is_key_ready = is_key_ready(record, taxonomy);
    if is_key_ready && status == ListingStatus::UnderConstruction {
        status = ListingStatus::KeyReady;
    }

    PropertyTags {
        is_key_ready,
        has_pool: has_pool(record, taxonomy),
        has_sea_view: has_sea_view(record, taxonomy),
        has_golf_view: has_golf_view(record, taxonomy),
        has_garden: has_garden(record, taxonomy),
        has_terrace: has_terrace(record, taxonomy),
        has_parking: has_parking(record, taxonomy),
        beach: beach_tag(record, taxonomy),
        golf: golf_tag(record, taxonomy),
        region: region_for_town(&record.town, taxonomy),
        area_groups: area_groups(record, taxonomy),
        price_bracket: price_bracket(record.price, taxonomy),
        status,
        property_type: normalize_property_type(&record.property_type, taxonomy),
        canonical_town: taxonomy.canonical_town(&record.town),
    }
}

pub fn tag_all(records: &[PropertyRecord], taxonomy: &Taxonomy) -> Vec<TaggedProperty> {
    records
        .iter()
        .map(|record| TaggedProperty {
            tags: tag(record, taxonomy),
            record: record.clone(),
        })
        .collect()
}
