/// Unit tests for listing classification
/// Tests tagging against the built-in tables and against a replacement taxonomy
use property_feed::classifier::{beach_distance, has_pool, is_key_ready, tag, tag_all};
use property_feed::models::{
    AreaGroup, BeachDistance, ListingStatus, PropertyRecord, RegionKey,
};
use property_feed::taxonomy::Taxonomy;

fn record(town: &str, zone: &str, description: &str) -> PropertyRecord {
    PropertyRecord {
        reference: "R1".to_string(),
        town: town.to_string(),
        zone: zone.to_string(),
        description: description.to_string(),
        ..Default::default()
    }
}

#[cfg(test)]
mod key_ready_tests {
    use super::*;

    #[test]
    fn test_ready_to_move_in() {
        let taxonomy = Taxonomy::builtin().unwrap();
        assert!(is_key_ready(
            &record("Torrevieja", "", "Ready to move in"),
            &taxonomy
        ));
    }

    #[test]
    fn test_no_phrase_is_not_key_ready() {
        let taxonomy = Taxonomy::builtin().unwrap();
        assert!(!is_key_ready(
            &record("Torrevieja", "", "Brand new villas, delivery spring 2027"),
            &taxonomy
        ));
        assert!(!is_key_ready(&record("", "", ""), &taxonomy));
    }

    #[test]
    fn test_status_field_counts() {
        let taxonomy = Taxonomy::builtin().unwrap();
        let mut r = record("Calpe", "", "");
        r.status = "Llave en mano".to_string();
        assert!(is_key_ready(&r, &taxonomy));
        assert_eq!(tag(&r, &taxonomy).status, ListingStatus::KeyReady);
    }
}

#[cfg(test)]
mod beach_tests {
    use super::*;

    #[test]
    fn test_configured_beachfront_zone() {
        let taxonomy = Taxonomy::builtin().unwrap();
        assert_eq!(
            beach_distance(&record("Torrevieja", "Playa Los Locos", ""), &taxonomy),
            Some(BeachDistance::Beachfront)
        );
    }

    #[test]
    fn test_zone_lookup_ignores_accents_and_case() {
        let taxonomy = Taxonomy::builtin().unwrap();
        assert_eq!(
            beach_distance(&record("", "PLAYA LOS LOCOS", ""), &taxonomy),
            beach_distance(&record("", "playa los locos", ""), &taxonomy)
        );
    }

    #[test]
    fn test_unrelated_zone_has_no_beach() {
        let taxonomy = Taxonomy::builtin().unwrap();
        assert_eq!(
            beach_distance(&record("", "Polígono Industrial", ""), &taxonomy),
            None
        );
    }
}

#[cfg(test)]
mod replacement_taxonomy_tests {
    use super::*;

    const CUSTOM: &str = r#"{
        "key_ready_phrases": ["Sofort Bezugsfertig"],
        "pool_keywords": ["Schwimmbad"],
        "area_groups": { "north": ["Villa Nova"] },
        "town_aliases": { "Vila Nova": "Villa Nova" },
        "town_regions": { "costa-calida": ["Villa Nova"] },
        "beach_zones": [
            { "zone": "Praia Grande", "beach": "Praia Grande", "distance": "beachfront", "town": "Villa Nova" }
        ],
        "price_brackets": [ { "id": "any", "name": "Any", "min": 0 } ],
        "property_types": [ { "label": "Chalet", "keywords": ["haus"] } ]
    }"#;

    #[test]
    fn test_tables_drive_every_tag() {
        let taxonomy = Taxonomy::from_json(CUSTOM).unwrap();
        let mut r = record("Vila-Nova", "Praia Grande", "Sofort bezugsfertig, mit Schwimmbad");
        r.property_type = "Reihenhaus".to_string();
        r.price = Some(1.0);

        let tags = tag(&r, &taxonomy);
        assert!(tags.is_key_ready);
        assert!(tags.has_pool);
        assert_eq!(tags.beach_distance(), Some(BeachDistance::Beachfront));
        assert_eq!(tags.canonical_town, "villa nova");
        assert_eq!(tags.region, Some(RegionKey::CostaCalida));
        assert_eq!(tags.area_groups, vec![AreaGroup::North]);
        assert_eq!(tags.property_type, "Chalet");
        assert_eq!(tags.price_bracket.as_deref(), Some("any"));
    }

    #[test]
    fn test_builtin_phrases_do_not_leak_into_replacement() {
        let taxonomy = Taxonomy::from_json(CUSTOM).unwrap();
        let r = record("Torrevieja", "", "Ready to move in, private pool");
        assert!(!is_key_ready(&r, &taxonomy));
        assert!(!has_pool(&r, &taxonomy));
    }
}

#[cfg(test)]
mod batch_tests {
    use super::*;

    #[test]
    fn test_tag_all_preserves_order_and_records() {
        let taxonomy = Taxonomy::builtin().unwrap();
        let records = vec![
            record("Torrevieja", "", "Communal pool"),
            record("", "", ""),
            record("Jávea", "", "Key ready"),
        ];
        let tagged = tag_all(&records, &taxonomy);

        assert_eq!(tagged.len(), 3);
        for (item, original) in tagged.iter().zip(&records) {
            assert_eq!(&item.record, original);
        }
        assert!(tagged[0].tags.has_pool);
        assert_eq!(tagged[1].tags.canonical_town, "");
        assert_eq!(tagged[2].tags.canonical_town, "javea");
        assert_eq!(tagged[2].tags.region, Some(RegionKey::CostaBlancaNorth));
    }
}
