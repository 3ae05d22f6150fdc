//! Keyword and lookup tables used by the matcher and classifier.
//!
//! The tables are data, not code: a default copy is compiled in from
//! `data/taxonomy.json` and `TAXONOMY_PATH` can point at a replacement.
//! All keys are run through [`normalize_town_name`] once at load time so
//! lookups only ever compare canonical strings.

use crate::errors::AppError;
use crate::models::{BeachDistance, GolfDistance, RegionKey};
use crate::normalizer::{normalize_town_name, strip_accents};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

const BUILTIN_TAXONOMY: &str = include_str!("../data/taxonomy.json");

#[derive(Debug, Clone, Deserialize)]
pub struct BeachZone {
    pub zone: String,
    pub beach: String,
    pub distance: BeachDistance,
    pub town: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GolfZone {
    pub zone: String,
    pub course: String,
    pub distance: GolfDistance,
    pub holes: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AreaGroups {
    #[serde(default)]
    pub south: Vec<String>,
    #[serde(default)]
    pub north: Vec<String>,
    #[serde(default)]
    pub golf: Vec<String>,
    #[serde(default)]
    pub inland: Vec<String>,
}

/// Amenity keywords matched against a listing's feature list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureKeywords {
    #[serde(default)]
    pub sea_view: Vec<String>,
    #[serde(default)]
    pub golf_view: GolfViewKeywords,
    #[serde(default)]
    pub garden: Vec<String>,
    #[serde(default)]
    pub terrace: Vec<String>,
    #[serde(default)]
    pub parking: Vec<String>,
}

/// A golf view needs a course word and a view word in the same feature text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GolfViewKeywords {
    #[serde(default)]
    pub course: Vec<String>,
    #[serde(default)]
    pub outlook: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceBracket {
    pub id: String,
    pub name: String,
    pub min: f64,
    /// Open-ended when absent.
    pub max: Option<f64>,
}

impl PriceBracket {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && self.max.map_or(true, |max| price < max)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertyTypeRule {
    pub label: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Taxonomy {
    pub key_ready_phrases: Vec<String>,
    #[serde(default)]
    pub key_ready_status_phrases: Vec<String>,
    pub pool_keywords: Vec<String>,
    #[serde(default)]
    pub feature_keywords: FeatureKeywords,
    #[serde(default)]
    pub area_groups: AreaGroups,
    #[serde(default)]
    pub town_aliases: HashMap<String, String>,
    #[serde(default)]
    pub town_regions: BTreeMap<RegionKey, Vec<String>>,
    #[serde(default)]
    pub beach_zones: Vec<BeachZone>,
    #[serde(default)]
    pub golf_zones: Vec<GolfZone>,
    #[serde(default)]
    pub price_brackets: Vec<PriceBracket>,
    #[serde(default)]
    pub property_types: Vec<PropertyTypeRule>,

    #[serde(skip)]
    beach_index: HashMap<String, usize>,
    #[serde(skip)]
    golf_index: HashMap<String, usize>,
    #[serde(skip)]
    region_index: HashMap<String, RegionKey>,
}

impl Taxonomy {
    /// The tables compiled into the binary.
    pub fn builtin() -> Result<Self, AppError> {
        Self::from_json(BUILTIN_TAXONOMY)
    }

    /// Loads `path` when given, the built-in tables otherwise.
    pub fn load(path: Option<&str>) -> Result<Self, AppError> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    AppError::ConfigError(format!("Cannot read taxonomy file {}: {}", path, e))
                })?;
                let taxonomy = Self::from_json(&raw)?;
                tracing::info!(
                    "Loaded taxonomy from {} ({} beach zones, {} golf zones)",
                    path,
                    taxonomy.beach_zones.len(),
                    taxonomy.golf_zones.len()
                );
                Ok(taxonomy)
            }
            None => Self::builtin(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let taxonomy: Taxonomy = serde_json::from_str(raw)
            .map_err(|e| AppError::ConfigError(format!("Invalid taxonomy JSON: {}", e)))?;
        Ok(taxonomy.prepared())
    }

    /// Normalizes every key and builds the lookup indexes.
    fn prepared(mut self) -> Self {
        let lower_all = |list: &mut Vec<String>| {
            for item in list.iter_mut() {
                *item = item.trim().to_lowercase();
            }
            list.retain(|item| !item.is_empty());
        };
        lower_all(&mut self.key_ready_phrases);
        lower_all(&mut self.key_ready_status_phrases);
        lower_all(&mut self.pool_keywords);

        // Feature text is compared accent-free ("jardín" == "jardin").
        let plain_all = |list: &mut Vec<String>| {
            lower_all(list);
            for item in list.iter_mut() {
                *item = strip_accents(item);
            }
        };
        let features = &mut self.feature_keywords;
        plain_all(&mut features.sea_view);
        plain_all(&mut features.golf_view.course);
        plain_all(&mut features.golf_view.outlook);
        plain_all(&mut features.garden);
        plain_all(&mut features.terrace);
        plain_all(&mut features.parking);

        let normalize_all = |list: &mut Vec<String>| {
            for item in list.iter_mut() {
                *item = normalize_town_name(item);
            }
            list.retain(|item| !item.is_empty());
        };
        normalize_all(&mut self.area_groups.south);
        normalize_all(&mut self.area_groups.north);
        normalize_all(&mut self.area_groups.golf);
        normalize_all(&mut self.area_groups.inland);
        for towns in self.town_regions.values_mut() {
            normalize_all(towns);
        }

        self.town_aliases = self
            .town_aliases
            .iter()
            .map(|(from, to)| (normalize_town_name(from), normalize_town_name(to)))
            .filter(|(from, to)| !from.is_empty() && !to.is_empty())
            .collect();

        for zone in self.beach_zones.iter_mut() {
            zone.zone = normalize_town_name(&zone.zone);
        }
        for zone in self.golf_zones.iter_mut() {
            zone.zone = normalize_town_name(&zone.zone);
        }

        // First entry wins when a key repeats after normalization.
        self.beach_index.clear();
        for (i, zone) in self.beach_zones.iter().enumerate() {
            self.beach_index.entry(zone.zone.clone()).or_insert(i);
        }
        self.golf_index.clear();
        for (i, zone) in self.golf_zones.iter().enumerate() {
            self.golf_index.entry(zone.zone.clone()).or_insert(i);
        }
        self.region_index.clear();
        for (region, towns) in &self.town_regions {
            for town in towns {
                self.region_index.entry(town.clone()).or_insert(*region);
            }
        }

        self
    }

    /// Canonical grouping key: normalized name with aliases applied.
    pub fn canonical_town(&self, raw: &str) -> String {
        let normalized = normalize_town_name(raw);
        match self.town_aliases.get(&normalized) {
            Some(alias) => alias.clone(),
            None => normalized,
        }
    }

    /// Exact lookup by an already-normalized zone key.
    pub fn beach_zone(&self, key: &str) -> Option<&BeachZone> {
        self.beach_index.get(key).map(|&i| &self.beach_zones[i])
    }

    /// Exact lookup by an already-normalized zone key.
    pub fn golf_zone(&self, key: &str) -> Option<&GolfZone> {
        self.golf_index.get(key).map(|&i| &self.golf_zones[i])
    }

    /// Exact lookup by an already-normalized town key.
    pub fn region_of(&self, key: &str) -> Option<RegionKey> {
        self.region_index.get(key).copied()
    }

    /// `(town, region)` pairs in table order, for containment scans.
    pub fn region_entries(&self) -> impl Iterator<Item = (&str, RegionKey)> {
        self.town_regions
            .iter()
            .flat_map(|(region, towns)| towns.iter().map(move |t| (t.as_str(), *region)))
    }

    pub fn towns_in_region(&self, region: RegionKey) -> &[String] {
        self.town_regions
            .get(&region)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_taxonomy_loads() {
        let taxonomy = Taxonomy::builtin().unwrap();
        assert!(!taxonomy.key_ready_phrases.is_empty());
        assert!(!taxonomy.beach_zones.is_empty());
        assert_eq!(taxonomy.price_brackets.len(), 5);
        assert!(taxonomy.towns_in_region(RegionKey::CostaCalida).contains(&"la manga".to_string()));
    }

    #[test]
    fn test_keys_are_normalized_at_load() {
        let taxonomy = Taxonomy::builtin().unwrap();
        // "doña pepa" is stored accented in the file
        assert!(taxonomy.golf_zone("dona pepa").is_some());
        assert_eq!(
            taxonomy.beach_zone("playa los locos").map(|z| z.distance),
            Some(BeachDistance::Beachfront)
        );
    }

    #[test]
    fn test_feature_keywords_are_lowercased_and_accent_free() {
        let taxonomy = Taxonomy::from_json(
            r#"{
                "key_ready_phrases": [],
                "pool_keywords": [],
                "feature_keywords": { "garden": [" Jardín "], "parking": ["GARAGE", ""] }
            }"#,
        )
        .unwrap();
        assert_eq!(taxonomy.feature_keywords.garden, vec!["jardin"]);
        assert_eq!(taxonomy.feature_keywords.parking, vec!["garage"]);
        assert!(taxonomy.feature_keywords.sea_view.is_empty());

        let builtin = Taxonomy::builtin().unwrap();
        assert!(builtin.feature_keywords.sea_view.contains(&"vista mar".to_string()));
        assert_eq!(builtin.feature_keywords.golf_view.course, vec!["golf"]);
    }

    #[test]
    fn test_canonical_town_applies_aliases() {
        let taxonomy = Taxonomy::builtin().unwrap();
        assert_eq!(taxonomy.canonical_town("Xàbia"), "javea");
        assert_eq!(taxonomy.canonical_town("Moraira_Teulada"), "moraira");
        assert_eq!(taxonomy.canonical_town("Torrevieja"), "torrevieja");
        assert_eq!(taxonomy.canonical_town(""), "");
    }

    #[test]
    fn test_region_lookup() {
        let taxonomy = Taxonomy::builtin().unwrap();
        assert_eq!(taxonomy.region_of("algorfa"), Some(RegionKey::CostaBlancaSouthInland));
        assert_eq!(taxonomy.region_of("atlantis"), None);
    }

    #[test]
    fn test_price_bracket_bounds() {
        let taxonomy = Taxonomy::builtin().unwrap();
        let ultra = taxonomy.price_brackets.last().unwrap();
        assert!(ultra.contains(5_000_000.0));
        let budget = &taxonomy.price_brackets[0];
        assert!(budget.contains(0.0));
        assert!(!budget.contains(175_000.0));
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = Taxonomy::from_json("{ not json").unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
