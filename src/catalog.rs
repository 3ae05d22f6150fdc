//! Read-side queries over tagged properties.
//!
//! Everything here works on a slice of [`TaggedProperty`] and returns owned
//! results, so callers can hold a snapshot behind an `Arc` and query it from
//! many handlers at once.

use crate::errors::AppError;
use crate::matcher::matches_record_area;
use crate::models::{
    AreaGroup, BeachDistance, DevelopmentSummary, PriceRange, PropertyFilters, RegionKey,
    TaggedProperty, TownSummary,
};
use crate::normalizer::{normalize_town_name, slugify, title_case};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Key-ready listings may take at most this share of featured slots.
const FEATURED_KEY_READY_SHARE: usize = 2;

/// Listings above this price get a point in [`feature_score`].
const PREMIUM_PRICE: f64 = 300_000.0;

/// Applies every filter that is set. Unknown region, beach or area
/// values are rejected rather than silently matching nothing.
pub fn search(
    items: &[TaggedProperty],
    filters: &PropertyFilters,
) -> Result<Vec<TaggedProperty>, AppError> {
    let region = match filters.region.as_deref() {
        Some(slug) => Some(
            RegionKey::from_slug(slug.trim())
                .ok_or_else(|| AppError::BadRequest(format!("Unknown region: {}", slug)))?,
        ),
        None => None,
    };
    let beach = match filters.beach.as_deref() {
        Some(raw) => Some(
            BeachDistance::parse(raw)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown beach distance: {}", raw)))?,
        ),
        None => None,
    };
    let area = match filters.area.as_deref() {
        Some(raw) => Some(
            AreaGroup::parse(raw)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown area group: {}", raw)))?,
        ),
        None => None,
    };
    let property_type = filters
        .property_type
        .as_deref()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty());

    let matched = items.iter().filter(|item| {
        let record = &item.record;
        let tags = &item.tags;

        if let Some(ref town) = filters.town {
            if !matches_record_area(record, town) {
                return false;
            }
        }
        if region.is_some() && tags.region != region {
            return false;
        }
        if let Some(ref wanted) = property_type {
            if tags.property_type.to_lowercase() != *wanted
                && !record.property_type.to_lowercase().contains(wanted.as_str())
            {
                return false;
            }
        }
        if let Some(min) = filters.min_bedrooms {
            if record.bedrooms.map_or(true, |b| b < min) {
                return false;
            }
        }
        if let Some(max) = filters.max_bedrooms {
            if record.bedrooms.map_or(true, |b| b > max) {
                return false;
            }
        }
        if let Some(min) = filters.min_price {
            if record.price.map_or(true, |p| p < min) {
                return false;
            }
        }
        if let Some(max) = filters.max_price {
            if record.price.map_or(true, |p| p > max) {
                return false;
            }
        }
        let flags = [
            (filters.pool, tags.has_pool),
            (filters.sea_view, tags.has_sea_view),
            (filters.golf_view, tags.has_golf_view),
            (filters.garden, tags.has_garden),
            (filters.terrace, tags.has_terrace),
            (filters.parking, tags.has_parking),
        ];
        if flags
            .iter()
            .any(|(wanted, actual)| wanted.is_some_and(|w| w != *actual))
        {
            return false;
        }
        if filters.key_ready.is_some_and(|wanted| tags.is_key_ready != wanted) {
            return false;
        }
        if beach.is_some() && tags.beach_distance() != beach {
            return false;
        }
        if let Some(group) = area {
            if !tags.area_groups.contains(&group) {
                return false;
            }
        }
        true
    });

    let limit = filters.limit.unwrap_or(usize::MAX);
    Ok(matched.take(limit).cloned().collect())
}

/// Canonical town -> listings. Listings without a town group under `""`.
pub fn group_by_town(items: &[TaggedProperty]) -> BTreeMap<String, Vec<TaggedProperty>> {
    let mut groups: BTreeMap<String, Vec<TaggedProperty>> = BTreeMap::new();
    for item in items {
        groups
            .entry(item.tags.canonical_town.clone())
            .or_default()
            .push(item.clone());
    }
    groups
}

/// One summary per named town, busiest first.
pub fn town_summaries(items: &[TaggedProperty]) -> Vec<TownSummary> {
    let mut summaries: Vec<TownSummary> = group_by_town(items)
        .into_iter()
        .filter(|(town, _)| !town.is_empty())
        .map(|(town, listings)| {
            let property_types: BTreeSet<String> = listings
                .iter()
                .map(|l| l.tags.property_type.clone())
                .collect();
            TownSummary {
                name: title_case(&town),
                slug: slugify(&town),
                region: listings.iter().find_map(|l| l.tags.region),
                property_count: listings.len(),
                property_types: property_types.into_iter().collect(),
                price_range: price_range(listings.iter().filter_map(|l| l.record.price)),
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.property_count
            .cmp(&a.property_count)
            .then_with(|| a.name.cmp(&b.name))
    });
    summaries
}

/// Listings for a town page, addressed by slug.
///
/// Exact slug match on the canonical town first; compound town names and
/// zone-only areas fall back to the area matcher.
pub fn in_town(items: &[TaggedProperty], slug: &str) -> Vec<TaggedProperty> {
    let slug = slugify(slug);
    if slug.is_empty() {
        return Vec::new();
    }

    let exact: Vec<TaggedProperty> = items
        .iter()
        .filter(|item| slugify(&item.tags.canonical_town) == slug)
        .cloned()
        .collect();
    if !exact.is_empty() {
        return exact;
    }

    let area = normalize_town_name(&slug);
    items
        .iter()
        .filter(|item| matches_record_area(&item.record, &area))
        .cloned()
        .collect()
}

pub fn in_area_group(items: &[TaggedProperty], group: AreaGroup) -> Vec<TaggedProperty> {
    items
        .iter()
        .filter(|item| item.tags.area_groups.contains(&group))
        .cloned()
        .collect()
}

/// Beach-distance bucket -> listings. Listings with no beach tag are left out.
pub fn group_by_beach_distance(
    items: &[TaggedProperty],
) -> BTreeMap<&'static str, Vec<TaggedProperty>> {
    let mut groups: BTreeMap<&'static str, Vec<TaggedProperty>> = BTreeMap::new();
    for item in items {
        if let Some(distance) = item.tags.beach_distance() {
            groups.entry(distance.as_str()).or_default().push(item.clone());
        }
    }
    groups
}

/// Listings sharing a development name, grouped by its slug.
pub fn group_by_development(items: &[TaggedProperty]) -> Vec<DevelopmentSummary> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&TaggedProperty>> = HashMap::new();
    for item in items {
        let slug = slugify(&item.record.development);
        if slug.is_empty() {
            continue;
        }
        if !groups.contains_key(&slug) {
            order.push(slug.clone());
        }
        groups.entry(slug).or_default().push(item);
    }

    let mut developments: Vec<DevelopmentSummary> = order
        .into_iter()
        .filter_map(|slug| {
            let listings = groups.remove(&slug)?;
            let first = listings.first()?;
            let prices: Vec<f64> = listings.iter().filter_map(|l| l.record.price).collect();
            let bedrooms: Vec<u32> = listings.iter().filter_map(|l| l.record.bedrooms).collect();
            let types: BTreeSet<String> = listings
                .iter()
                .map(|l| l.tags.property_type.clone())
                .collect();

            Some(DevelopmentSummary {
                name: first.record.development.trim().to_string(),
                developer: listings
                    .iter()
                    .map(|l| l.record.developer.trim())
                    .find(|d| !d.is_empty())
                    .unwrap_or_default()
                    .to_string(),
                town: first.record.town.trim().to_string(),
                property_count: listings.len(),
                price_from: prices.iter().copied().reduce(f64::min),
                price_to: prices.iter().copied().reduce(f64::max),
                types: types.into_iter().collect(),
                bedroom_range: bedrooms
                    .iter()
                    .min()
                    .zip(bedrooms.iter().max())
                    .map(|(min, max)| (*min, *max)),
                references: listings.iter().map(|l| l.record.reference.clone()).collect(),
                slug,
            })
        })
        .collect();

    developments.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    developments
}

/// How attractive a listing is for a front page.
///
/// Pool 2, sea view 3, golf view 2, garden 1, terrace 1, more than five
/// images 1, price above 300k 1.
pub fn feature_score(item: &TaggedProperty) -> u32 {
    let tags = &item.tags;
    let points = [
        (tags.has_pool, 2),
        (tags.has_sea_view, 3),
        (tags.has_golf_view, 2),
        (tags.has_garden, 1),
        (tags.has_terrace, 1),
        (item.record.images.len() > 5, 1),
        (item.record.price.is_some_and(|p| p > PREMIUM_PRICE), 1),
    ];
    points.iter().filter(|(hit, _)| *hit).map(|(_, p)| p).sum()
}

/// Up to `n` listings for a front page.
///
/// Key-ready listings go first but take at most half the slots; the rest
/// are filled from the other listings, topping up with key-ready ones if
/// the feed has nothing else. Within each group the highest
/// [`feature_score`] comes first and ties keep feed order.
pub fn featured(items: &[TaggedProperty], n: usize) -> Vec<TaggedProperty> {
    let key_ready_cap = n / FEATURED_KEY_READY_SHARE;
    let (mut key_ready, mut others): (Vec<&TaggedProperty>, Vec<&TaggedProperty>) =
        items.iter().partition(|item| item.tags.is_key_ready);
    key_ready.sort_by_key(|item| std::cmp::Reverse(feature_score(item)));
    others.sort_by_key(|item| std::cmp::Reverse(feature_score(item)));

    let mut picked: Vec<TaggedProperty> = key_ready
        .iter()
        .take(key_ready_cap)
        .map(|item| (*item).clone())
        .collect();
    let remaining = n.saturating_sub(picked.len());
    picked.extend(others.iter().take(remaining).map(|item| (*item).clone()));

    if picked.len() < n {
        let missing = n - picked.len();
        picked.extend(
            key_ready
                .iter()
                .skip(key_ready_cap)
                .take(missing)
                .map(|item| (*item).clone()),
        );
    }
    picked
}

/// Case-insensitive reference lookup.
pub fn find_by_reference<'a>(
    items: &'a [TaggedProperty],
    reference: &str,
) -> Option<&'a TaggedProperty> {
    let wanted = reference.trim();
    if wanted.is_empty() {
        return None;
    }
    items
        .iter()
        .find(|item| item.record.reference.eq_ignore_ascii_case(wanted))
}

fn price_range(prices: impl Iterator<Item = f64>) -> Option<PriceRange> {
    prices.fold(None, |range, price| match range {
        None => Some(PriceRange {
            min: price,
            max: price,
        }),
        Some(r) => Some(PriceRange {
            min: r.min.min(price),
            max: r.max.max(price),
        }),
    })
}
