//! Fuzzy area matching for town and zone strings.
//!
//! Feed towns are inconsistent ("Moraira_Teulada", "Orihuela-Costa",
//! "Jávea Xàbia"), so membership is decided by substring and token
//! containment rather than equality. False positives and negatives are
//! expected; the checks below are the whole contract.

use crate::models::{AreaGroup, PropertyRecord, RegionKey};
use crate::normalizer::normalize_town_name;
use crate::taxonomy::Taxonomy;
use regex::Regex;
use std::sync::LazyLock;

static TOKEN_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_\-]+").expect("static regex"));

/// Does `town` belong to `area`?
///
/// Checks, in order, stopping at the first hit:
/// 1. containment either way on the lowercased strings;
/// 2. the same after accent normalization;
/// 3. containment between any token of `town` and `area`;
/// 4. token containment after accent normalization.
///
/// An empty town or area never matches.
pub fn matches_area(town: &str, area: &str) -> bool {
    let town_lower = town.trim().to_lowercase();
    let area_lower = area.trim().to_lowercase();
    if town_lower.is_empty() || area_lower.is_empty() {
        return false;
    }

    if contains_either(&town_lower, &area_lower) {
        return true;
    }

    let town_norm = normalize_town_name(town);
    let area_norm = normalize_town_name(area);
    if !town_norm.is_empty() && !area_norm.is_empty() && contains_either(&town_norm, &area_norm) {
        return true;
    }

    if tokens_match(&town_lower, &area_lower) {
        return true;
    }

    !area_norm.is_empty() && tokens_match(&town_norm, &area_norm)
}

/// [`matches_area`] against a listing: the town first, then the zone.
///
/// Feeds often put the neighbourhood ("La Zenia") in the zone and the
/// municipality ("Orihuela Costa") in the town, so either can match.
pub fn matches_record_area(record: &PropertyRecord, area: &str) -> bool {
    matches_area(&record.town, area) || matches_area(&record.zone, area)
}

fn contains_either(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

fn tokens_match(town: &str, area: &str) -> bool {
    TOKEN_SEPARATORS
        .split(town)
        .filter(|part| !part.is_empty())
        .any(|part| contains_either(part, area))
}

/// True when `town` contains any of the (already normalized) keywords.
pub fn matches_any(town: &str, keywords: &[String]) -> bool {
    let town_norm = normalize_town_name(town);
    if town_norm.is_empty() {
        return false;
    }
    keywords
        .iter()
        .any(|k| !k.is_empty() && town_norm.contains(k.as_str()))
}

/// Which of the fixed page sections a record falls into.
///
/// The raw town and its alias-resolved form are both checked. Golf also
/// picks up listings whose description mentions golf.
pub fn area_groups(record: &PropertyRecord, taxonomy: &Taxonomy) -> Vec<AreaGroup> {
    let canonical = taxonomy.canonical_town(&record.town);
    let hit = |keywords: &[String]| {
        matches_any(&record.town, keywords) || matches_any(&canonical, keywords)
    };

    let groups = &taxonomy.area_groups;
    let mut out = Vec::new();
    if hit(&groups.south) {
        out.push(AreaGroup::South);
    }
    if hit(&groups.north) {
        out.push(AreaGroup::North);
    }
    if hit(&groups.golf) || record.description.to_lowercase().contains("golf") {
        out.push(AreaGroup::Golf);
    }
    if hit(&groups.inland) {
        out.push(AreaGroup::Inland);
    }
    out
}

/// Region for a raw town name.
///
/// Alias-resolved exact match first, then the plain normalized name, then
/// containment either way against the table in file order.
pub fn region_for_town(town: &str, taxonomy: &Taxonomy) -> Option<RegionKey> {
    let normalized = normalize_town_name(town);
    if normalized.is_empty() {
        return None;
    }

    let canonical = taxonomy.canonical_town(town);
    if let Some(region) = taxonomy.region_of(&canonical) {
        return Some(region);
    }
    if let Some(region) = taxonomy.region_of(&normalized) {
        return Some(region);
    }

    taxonomy
        .region_entries()
        .find(|(known, _)| contains_either(&normalized, known))
        .map(|(_, region)| region)
}

pub fn is_inland_town(town: &str, taxonomy: &Taxonomy) -> bool {
    region_for_town(town, taxonomy).is_some_and(|r| r.is_inland())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compound_town_matches_part() {
        assert!(matches_area("Moraira_Teulada", "Moraira"));
        assert!(matches_area("Moraira_Teulada", "teulada"));
    }

    #[test]
    fn test_unrelated_towns_do_not_match() {
        assert!(!matches_area("Torrevieja", "Benidorm"));
        assert!(!matches_area("Calpe", "Altea"));
    }

    #[test]
    fn test_accent_insensitive() {
        assert!(matches_area("Jávea", "javea"));
        assert!(matches_area("Xàbia-Jávea", "Javea"));
        assert!(matches_area("DÉNIA", "Denia"));
    }

    #[test]
    fn test_containment_both_directions() {
        assert!(matches_area("Orihuela Costa", "orihuela"));
        assert!(matches_area("Orihuela", "Orihuela Costa"));
    }

    #[test]
    fn test_empty_never_matches() {
        assert!(!matches_area("", "Moraira"));
        assert!(!matches_area("Moraira", ""));
        assert!(!matches_area("  ", "  "));
    }

    #[test]
    fn test_record_matches_on_zone_when_town_differs() {
        let record = PropertyRecord {
            town: "Orihuela Costa".to_string(),
            zone: "La Zenia".to_string(),
            ..Default::default()
        };
        assert!(matches_record_area(&record, "La Zenia"));
        assert!(matches_record_area(&record, "orihuela"));
        assert!(!matches_record_area(&record, "Benidorm"));
    }

    #[test]
    fn test_record_with_no_town_or_zone_never_matches() {
        let record = PropertyRecord::default();
        assert!(!matches_record_area(&record, "La Zenia"));
        assert!(!matches_record_area(&record, ""));

        let zone_only = PropertyRecord {
            zone: "Cabo Roig".to_string(),
            ..Default::default()
        };
        assert!(matches_record_area(&zone_only, "cabo roig"));
    }

    #[test]
    fn test_region_for_town() {
        let taxonomy = Taxonomy::builtin().unwrap();
        assert_eq!(
            region_for_town("Xàbia", &taxonomy),
            Some(RegionKey::CostaBlancaNorth)
        );
        assert_eq!(
            region_for_town("Ciudad Quesada", &taxonomy),
            Some(RegionKey::CostaBlancaSouthInland)
        );
        assert_eq!(
            region_for_town("Playa Honda (Cartagena)", &taxonomy),
            Some(RegionKey::CostaCalida)
        );
        assert_eq!(region_for_town("", &taxonomy), None);
        assert!(is_inland_town("Algorfa", &taxonomy));
        assert!(!is_inland_town("Torrevieja", &taxonomy));
    }

    #[test]
    fn test_area_groups() {
        let taxonomy = Taxonomy::builtin().unwrap();
        let record = PropertyRecord {
            town: "Algorfa".to_string(),
            ..Default::default()
        };
        let groups = area_groups(&record, &taxonomy);
        assert!(groups.contains(&AreaGroup::Golf));
        assert!(groups.contains(&AreaGroup::Inland));
        assert!(!groups.contains(&AreaGroup::North));

        let record = PropertyRecord {
            town: "Calpe".to_string(),
            description: "Walk to the golf club".to_string(),
            ..Default::default()
        };
        let groups = area_groups(&record, &taxonomy);
        assert_eq!(groups, vec![AreaGroup::North, AreaGroup::Golf]);
    }
}
