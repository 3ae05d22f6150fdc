//! XML feed parsing.
//!
//! Feeds come in several dialects (Kyero v3, the REDSP export, Sooprema).
//! Rather than binding one schema, the parser walks the document, flattens
//! every `<property>`/`<listing>` element into `path -> text` pairs and
//! then reads fields through alias lists. Unknown elements are ignored and
//! missing fields degrade to empty values.

use crate::errors::AppError;
use crate::models::{Coordinates, ParsedFeed, PropertyRecord};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashSet;

const LISTING_ELEMENTS: [&str; 2] = ["property", "listing"];
const LANGUAGE_ATTRIBUTES: [&str; 2] = ["language", "lang"];
const PREFERRED_LANGUAGE: &str = "en";

/// Child text of one listing element, keyed by path relative to it.
#[derive(Debug, Default)]
struct RawListing {
    entries: Vec<(String, String)>,
}

impl RawListing {
    fn push(&mut self, key: String, value: String) {
        self.entries.push((key, value));
    }

    /// First non-empty value under any of `keys`, in key priority order.
    fn first(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| {
            self.entries
                .iter()
                .find(|(k, v)| k.as_str() == *key && !v.is_empty())
                .map(|(_, v)| v.as_str())
        })
    }

    /// Like [`first`](Self::first), but also accepts per-language children
    /// (`<description><en>…</en></description>`), preferring English.
    fn first_localized(&self, keys: &[&str]) -> Option<&str> {
        if let Some(value) = self.first(keys) {
            return Some(value);
        }
        for key in keys {
            let english = format!("{}/{}", key, PREFERRED_LANGUAGE);
            if let Some(value) = self.first(&[english.as_str()]) {
                return Some(value);
            }
        }
        keys.iter().find_map(|key| {
            let prefix = format!("{}/", key);
            self.entries
                .iter()
                .find(|(k, v)| {
                    k.starts_with(&prefix) && !k[prefix.len()..].contains('/') && !v.is_empty()
                })
                .map(|(_, v)| v.as_str())
        })
    }

    fn all(&self, keys: &[&str]) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(k, v)| keys.contains(&k.as_str()) && !v.is_empty())
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

/// Parses a whole feed document.
///
/// Fails with `FeedUnavailable` only when the document itself is not
/// well-formed XML. Listings without a reference, or repeating a reference
/// already seen in this document, are skipped and counted.
pub fn parse_feed(xml: &str, source: &str) -> Result<ParsedFeed, AppError> {
    let listings = collect_listings(xml)?;

    let mut seen = HashSet::new();
    let mut parsed = ParsedFeed::default();
    for raw in &listings {
        match build_record(raw, source) {
            Ok(record) => {
                if seen.insert(record.reference.to_uppercase()) {
                    parsed.properties.push(record);
                } else {
                    tracing::warn!(
                        "Duplicate reference {} in {} feed, keeping the first",
                        record.reference,
                        source
                    );
                    parsed.skipped += 1;
                }
            }
            Err(e) => {
                tracing::debug!("Skipping listing from {}: {}", source, e);
                parsed.skipped += 1;
            }
        }
    }

    tracing::info!(
        "Parsed {} properties from {} feed ({} skipped)",
        parsed.properties.len(),
        source,
        parsed.skipped
    );
    Ok(parsed)
}

fn collect_listings(xml: &str) -> Result<Vec<RawListing>, AppError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut listing_depth: Option<usize> = None;
    let mut current: Option<RawListing> = None;
    let mut listings = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = element_name(&e);
                if current.is_none() && LISTING_ELEMENTS.contains(&name.as_str()) {
                    listing_depth = Some(path.len());
                    current = Some(RawListing::default());
                    path.push(name);
                } else {
                    path.push(path_segment(&e, name));
                }
            }
            Event::Empty(e) => {
                // A self-closing listing carries no fields at all.
                if current.is_none() && LISTING_ELEMENTS.contains(&element_name(&e).as_str()) {
                    listings.push(RawListing::default());
                }
            }
            Event::End(_) => {
                path.pop();
                if listing_depth == Some(path.len()) {
                    if let Some(done) = current.take() {
                        listings.push(done);
                    }
                    listing_depth = None;
                }
            }
            Event::Text(t) => {
                if let (Some(listing), Some(depth)) = (current.as_mut(), listing_depth) {
                    let value = t.unescape()?.trim().to_string();
                    push_value(listing, &path, depth, value);
                }
            }
            Event::CData(c) => {
                if let (Some(listing), Some(depth)) = (current.as_mut(), listing_depth) {
                    let value = String::from_utf8_lossy(&c.into_inner()).trim().to_string();
                    push_value(listing, &path, depth, value);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if current.is_some() {
        return Err(AppError::FeedUnavailable(
            "XML parse error: document ended inside a listing".to_string(),
        ));
    }
    Ok(listings)
}

fn push_value(listing: &mut RawListing, path: &[String], depth: usize, value: String) {
    let relative = &path[depth + 1..];
    if relative.is_empty() || value.is_empty() {
        return;
    }
    listing.push(relative.join("/"), value);
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase()
}

/// `<desc language="en">` is addressed as `desc/en`, same as `<desc><en>`.
fn path_segment(e: &BytesStart<'_>, name: String) -> String {
    for attr_name in LANGUAGE_ATTRIBUTES {
        if let Ok(Some(attr)) = e.try_get_attribute(attr_name) {
            if let Ok(lang) = attr.unescape_value() {
                let lang = lang.trim().to_lowercase();
                if !lang.is_empty() {
                    return format!("{}/{}", name, lang);
                }
            }
        }
    }
    name
}

fn build_record(raw: &RawListing, source: &str) -> Result<PropertyRecord, AppError> {
    let reference = raw
        .first(&["reference", "ref", "id"])
        .map(str::to_string)
        .ok_or_else(|| AppError::MalformedRecord("listing has no reference".to_string()))?;

    let text = |keys: &[&str]| raw.first_localized(keys).unwrap_or_default().to_string();

    let latitude = raw.first(&["latitude", "location/latitude", "lat"]).and_then(parse_number);
    let longitude = raw
        .first(&["longitude", "location/longitude", "lng", "lon"])
        .and_then(parse_number);
    let coordinates = match (latitude, longitude) {
        (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
        _ => None,
    };

    Ok(PropertyRecord {
        reference,
        price: raw.first(&["price"]).and_then(parse_number).filter(|p| *p > 0.0),
        bedrooms: raw.first(&["bedrooms", "beds"]).and_then(parse_count),
        bathrooms: raw.first(&["bathrooms", "baths"]).and_then(parse_count),
        built_size: raw
            .first(&["built_size", "surface_area/built", "built", "size"])
            .and_then(parse_number)
            .filter(|s| *s > 0.0),
        plot_size: raw
            .first(&["plot_size", "surface_area/plot", "plot"])
            .and_then(parse_number)
            .filter(|s| *s > 0.0),
        town: text(&["town", "city", "location"]),
        zone: text(&["zone", "location_detail", "area"]),
        province: text(&["province"]),
        property_type: text(&["type", "property_type"]),
        status: text(&["status", "sale_status"]),
        description: text(&["description", "desc"]),
        images: collect_images(raw),
        features: raw
            .all(&["features/feature"])
            .into_iter()
            .map(str::to_string)
            .collect(),
        development: text(&["development", "development_name", "project"]),
        developer: text(&["developer", "builder"]),
        coordinates,
        source: source.to_string(),
    })
}

fn collect_images(raw: &RawListing) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.all(&[
        "images/image/url",
        "images/image",
        "images/photo",
        "photos/photo",
        "image/url",
    ])
    .into_iter()
    .filter(|url| url.starts_with("http"))
    .filter(|url| seen.insert(*url))
    .map(str::to_string)
    .collect()
}

/// Lenient number parsing: "250000", "250000.00", "250,000".
fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .or_else(|| trimmed.replace(',', "").parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

fn parse_count(raw: &str) -> Option<u32> {
    parse_number(raw)
        .filter(|n| *n >= 0.0 && *n <= u32::MAX as f64)
        .map(|n| n.trunc() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KYERO_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<root>
  <kyero><feed_version>3</feed_version></kyero>
  <property>
    <id>N8535</id>
    <price>289000</price>
    <type>Detached villa</type>
    <town>Orihuela Costa</town>
    <location_detail>Lomas de Cabo Roig</location_detail>
    <province>Alicante</province>
    <beds>3</beds>
    <baths>2</baths>
    <surface_area><built>120</built><plot>400</plot></surface_area>
    <location><latitude>37.9211</latitude><longitude>-0.7322</longitude></location>
    <desc><es><![CDATA[Villa con piscina]]></es><en><![CDATA[Villa with private pool & garden]]></en></desc>
    <features><feature>Private pool</feature><feature>Garden</feature></features>
    <images>
      <image id="1"><url>https://img.example.com/1.jpg</url></image>
      <image id="2"><url>https://img.example.com/2.jpg</url></image>
    </images>
  </property>
</root>"#;

    #[test]
    fn test_parses_kyero_listing() {
        let parsed = parse_feed(KYERO_SAMPLE, "redsp").unwrap();
        assert_eq!(parsed.properties.len(), 1);
        assert_eq!(parsed.skipped, 0);

        let p = &parsed.properties[0];
        assert_eq!(p.reference, "N8535");
        assert_eq!(p.price, Some(289000.0));
        assert_eq!(p.bedrooms, Some(3));
        assert_eq!(p.bathrooms, Some(2));
        assert_eq!(p.built_size, Some(120.0));
        assert_eq!(p.plot_size, Some(400.0));
        assert_eq!(p.town, "Orihuela Costa");
        assert_eq!(p.zone, "Lomas de Cabo Roig");
        assert_eq!(p.description, "Villa with private pool & garden");
        assert_eq!(p.features, vec!["Private pool", "Garden"]);
        assert_eq!(p.images.len(), 2);
        assert_eq!(
            p.coordinates,
            Some(Coordinates {
                lat: 37.9211,
                lng: -0.7322
            })
        );
        assert_eq!(p.source, "redsp");
    }

    #[test]
    fn test_flat_dialect_with_entities() {
        let xml = r#"<properties>
            <property>
              <reference>BP-77</reference>
              <price></price>
              <bedrooms>two</bedrooms>
              <town>Jal&#243;n</town>
              <zone>Montesol</zone>
              <development>Residencial &amp; Spa</development>
              <status>Key ready</status>
              <images><image>https://img.example.com/a.jpg</image><image>/relative.jpg</image></images>
            </property>
          </properties>"#;
        let parsed = parse_feed(xml, "background").unwrap();
        let p = &parsed.properties[0];
        assert_eq!(p.reference, "BP-77");
        assert_eq!(p.price, None);
        assert_eq!(p.bedrooms, None);
        assert_eq!(p.bathrooms, None);
        assert_eq!(p.town, "Jalón");
        assert_eq!(p.development, "Residencial & Spa");
        assert_eq!(p.status, "Key ready");
        assert_eq!(p.images, vec!["https://img.example.com/a.jpg"]);
    }

    #[test]
    fn test_language_attribute_description() {
        let xml = r#"<feed><listing><ref>L1</ref>
            <desc language="de">Schöne Wohnung</desc>
            <desc language="en">Lovely apartment, ready to move in</desc>
            </listing></feed>"#;
        let parsed = parse_feed(xml, "kyero").unwrap();
        assert_eq!(
            parsed.properties[0].description,
            "Lovely apartment, ready to move in"
        );
    }

    #[test]
    fn test_missing_reference_is_skipped_not_fatal() {
        let xml = r#"<root>
            <property><town>Torrevieja</town></property>
            <property><reference>OK-1</reference></property>
            <property/>
          </root>"#;
        let parsed = parse_feed(xml, "redsp").unwrap();
        assert_eq!(parsed.properties.len(), 1);
        assert_eq!(parsed.properties[0].reference, "OK-1");
        assert_eq!(parsed.skipped, 2);
    }

    #[test]
    fn test_duplicate_reference_keeps_first() {
        let xml = r#"<root>
            <property><reference>N1</reference><town>Calpe</town></property>
            <property><reference>n1</reference><town>Altea</town></property>
          </root>"#;
        let parsed = parse_feed(xml, "redsp").unwrap();
        assert_eq!(parsed.properties.len(), 1);
        assert_eq!(parsed.properties[0].town, "Calpe");
        assert_eq!(parsed.skipped, 1);
    }

    #[test]
    fn test_malformed_xml_is_feed_unavailable() {
        let err = parse_feed("<root><property><reference>N1</town></property>", "redsp")
            .unwrap_err();
        assert!(err.is_feed_unavailable());
    }

    #[test]
    fn test_empty_document_yields_no_records() {
        let parsed = parse_feed("<root></root>", "redsp").unwrap();
        assert!(parsed.properties.is_empty());
        assert_eq!(parsed.skipped, 0);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("250,000"), Some(250000.0));
        assert_eq!(parse_number(" 99.5 "), Some(99.5));
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_count("2.0"), Some(2));
        assert_eq!(parse_count("-1"), None);
    }
}
