/// Property-based tests using proptest
/// Tests invariants of town normalization, area matching and tagging for arbitrary inputs
use proptest::prelude::*;
use property_feed::classifier::tag;
use property_feed::feed_parser::parse_feed;
use property_feed::matcher::matches_area;
use property_feed::models::PropertyRecord;
use property_feed::normalizer::{normalize_town_name, slugify};
use property_feed::taxonomy::Taxonomy;

// Property: normalization is total and idempotent
proptest! {
    #[test]
    fn normalize_never_panics(raw in "\\PC*") {
        let _ = normalize_town_name(&raw);
    }

    #[test]
    fn normalize_is_idempotent(raw in "[a-zA-Z áéíóúàèüñçÁÉÍÓÚÑ_\\-]{0,40}") {
        let once = normalize_town_name(&raw);
        prop_assert_eq!(normalize_town_name(&once), once);
    }

    #[test]
    fn normalized_output_is_trimmed_and_collapsed(raw in "[a-zA-Z _\\-\\t]{0,40}") {
        let normalized = normalize_town_name(&raw);
        prop_assert_eq!(normalized.trim(), normalized.as_str());
        prop_assert!(!normalized.contains("  "));
        prop_assert!(!normalized.contains('_'));
        prop_assert!(!normalized.contains('-'));
        prop_assert!(!normalized.chars().any(|c| c.is_uppercase()));
    }

    #[test]
    fn accents_and_case_do_not_change_the_key(
        word in "[a-z]{1,12}",
        accents in proptest::collection::vec(proptest::bool::ANY, 12),
        upper in proptest::bool::ANY
    ) {
        let mut decorated = String::new();
        for (i, c) in word.chars().enumerate() {
            decorated.push(if upper { c.to_ascii_uppercase() } else { c });
            if accents[i] {
                decorated.push('\u{301}');
            }
        }
        prop_assert_eq!(normalize_town_name(&decorated), word);
    }

    #[test]
    fn slug_contains_only_safe_characters(raw in "\\PC{0,40}") {
        let slug = slugify(&raw);
        prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
    }
}

// Property: matcher is total, never matches empty input, and is reflexive
proptest! {
    #[test]
    fn matches_area_never_panics(town in "\\PC*", area in "\\PC*") {
        let _ = matches_area(&town, &area);
    }

    #[test]
    fn empty_area_never_matches(town in "\\PC*", blank in "[ \\t]{0,4}") {
        prop_assert!(!matches_area(&town, &blank));
        prop_assert!(!matches_area(&blank, &town));
    }

    #[test]
    fn town_matches_itself(town in "[a-zA-Z]{1,10}([ _\\-][a-zA-Z]{1,10}){0,2}") {
        prop_assert!(matches_area(&town, &town));
    }

    #[test]
    fn compound_town_matches_each_part(
        first in "[a-z]{3,10}",
        second in "[a-z]{3,10}",
        sep in "[ _\\-]"
    ) {
        let town = format!("{}{}{}", first, sep, second);
        prop_assert!(matches_area(&town, &first));
        prop_assert!(matches_area(&town, &second));
    }
}

// Property: tagging and parsing never fail on arbitrary text
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn tagging_is_total(
        town in "\\PC{0,30}",
        zone in "\\PC{0,30}",
        description in "\\PC{0,80}",
        status in "\\PC{0,20}"
    ) {
        let taxonomy = Taxonomy::builtin().unwrap();
        let record = PropertyRecord {
            reference: "P1".to_string(),
            town,
            zone,
            description,
            status,
            ..Default::default()
        };
        let _ = tag(&record, &taxonomy);
    }

    #[test]
    fn parser_never_panics(xml in "\\PC{0,200}") {
        let _ = parse_feed(&xml, "fuzz");
    }
}
