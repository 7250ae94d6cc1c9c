//! Structured-data layer: embedded machine-readable event metadata.
//!
//! Parses JSON-LD event objects first, then falls back to microdata and
//! RDFa-style attributes found on the same document. JSON-LD is
//! self-describing, so it carries the highest base confidence; the
//! attribute-based variants are shaded down.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::LayerResult;
use crate::traits::Document;
use crate::types::{Coordinates, LayerId, LayerOutput, Organizer, Scored};

use super::text_patterns::normalize_datetime;
use super::Layer;

const JSONLD_CONFIDENCE: u8 = 90;
const MICRODATA_CONFIDENCE: u8 = 75;
const RDFA_CONFIDENCE: u8 = 70;

/// Recognized event type tags, with or without a vocabulary prefix.
const EVENT_TYPES: &[&str] = &[
    "Event",
    "MusicEvent",
    "Festival",
    "TheaterEvent",
    "ComedyEvent",
    "SocialEvent",
    "DanceEvent",
    "ExhibitionEvent",
    "ScreeningEvent",
    "SportsEvent",
    "FoodEvent",
    "EducationEvent",
    "BusinessEvent",
    "ChildrensEvent",
    "VisualArtsEvent",
];

/// Layer 1: embedded machine-readable metadata.
#[derive(Debug, Default)]
pub struct StructuredDataLayer;

impl StructuredDataLayer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Layer for StructuredDataLayer {
    fn id(&self) -> LayerId {
        LayerId::StructuredData
    }

    async fn extract(&self, doc: &dyn Document) -> LayerResult<LayerOutput> {
        let mut out = LayerOutput::empty(self.id());

        let scripts = doc
            .select(r#"script[type="application/ld+json"]"#)
            .await?;
        let mut events_seen = 0usize;
        for script in &scripts {
            let parsed: Value = match serde_json::from_str(script.text.trim()) {
                Ok(v) => v,
                // A malformed block is common in the wild; keep scanning
                Err(_) => continue,
            };
            for event in find_event_objects(&parsed) {
                events_seen += 1;
                apply_event_object(&mut out, event, JSONLD_CONFIDENCE);
            }
        }
        debug!(events = events_seen, "json-ld scan complete");

        if out.title.is_none() || out.date.is_none() {
            self.extract_microdata(doc, &mut out).await?;
        }
        if out.title.is_none() || out.date.is_none() {
            self.extract_rdfa(doc, &mut out).await?;
        }

        Ok(out)
    }
}

impl StructuredDataLayer {
    async fn extract_microdata(&self, doc: &dyn Document, out: &mut LayerOutput) -> LayerResult<()> {
        let scopes = doc.select(r#"[itemtype*="Event"]"#).await?;
        if scopes.is_empty() {
            return Ok(());
        }

        let prop_value = |el: &crate::traits::ElementSnapshot| -> Option<String> {
            el.attr("content")
                .or_else(|| el.attr("datetime"))
                .map(str::to_string)
                .or_else(|| non_empty(&el.text))
        };

        if out.title.is_none() {
            if let Some(el) = doc
                .select(r#"[itemtype*="Event"] [itemprop="name"]"#)
                .await?
                .first()
            {
                if let Some(v) = prop_value(el) {
                    out.title = Some(Scored::new(v, MICRODATA_CONFIDENCE));
                }
            }
        }
        if out.date.is_none() {
            if let Some(el) = doc
                .select(r#"[itemtype*="Event"] [itemprop="startDate"]"#)
                .await?
                .first()
            {
                if let Some((date, time)) = prop_value(el).as_deref().and_then(normalize_datetime) {
                    out.date = Some(Scored::new(date, MICRODATA_CONFIDENCE));
                    if let Some(time) = time {
                        out.start_time = Some(Scored::new(time, MICRODATA_CONFIDENCE));
                    }
                }
            }
        }
        if out.venue.is_none() {
            if let Some(el) = doc
                .select(r#"[itemprop="location"] [itemprop="name"]"#)
                .await?
                .first()
            {
                if let Some(v) = prop_value(el) {
                    out.venue = Some(Scored::new(v, MICRODATA_CONFIDENCE));
                }
            }
        }
        if out.address.is_none() {
            let street = doc
                .select(r#"[itemprop="streetAddress"]"#)
                .await?
                .first()
                .and_then(prop_value);
            let locality = doc
                .select(r#"[itemprop="addressLocality"]"#)
                .await?
                .first()
                .and_then(prop_value);
            let address = join_present(&[street, locality]);
            if !address.is_empty() {
                out.address = Some(Scored::new(address, MICRODATA_CONFIDENCE));
            }
        }
        if out.image_urls.is_none() {
            if let Some(el) = doc
                .select(r#"[itemtype*="Event"] [itemprop="image"]"#)
                .await?
                .first()
            {
                let src = el
                    .attr("src")
                    .or_else(|| el.attr("content"))
                    .or_else(|| el.attr("href"));
                if let Some(src) = src {
                    out.image_urls =
                        Some(Scored::new(vec![src.to_string()], MICRODATA_CONFIDENCE));
                }
            }
        }
        if out.price.is_none() {
            if let Some(el) = doc.select(r#"[itemprop="price"]"#).await?.first() {
                if let Some(price) = prop_value(el).as_deref().and_then(parse_price) {
                    out.price = Some(Scored::new(price, MICRODATA_CONFIDENCE));
                    if price == 0.0 {
                        out.free = Some(Scored::new(true, MICRODATA_CONFIDENCE));
                    }
                }
            }
        }

        Ok(())
    }

    async fn extract_rdfa(&self, doc: &dyn Document, out: &mut LayerOutput) -> LayerResult<()> {
        let scopes = doc.select(r#"[typeof*="Event"]"#).await?;
        if scopes.is_empty() {
            return Ok(());
        }

        if out.title.is_none() {
            if let Some(el) = doc
                .select(r#"[typeof*="Event"] [property="name"]"#)
                .await?
                .first()
            {
                if let Some(v) = el.attr("content").map(str::to_string).or_else(|| non_empty(&el.text)) {
                    out.title = Some(Scored::new(v, RDFA_CONFIDENCE));
                }
            }
        }
        if out.date.is_none() {
            if let Some(el) = doc
                .select(r#"[typeof*="Event"] [property="startDate"]"#)
                .await?
                .first()
            {
                let raw = el
                    .attr("content")
                    .or_else(|| el.attr("datetime"))
                    .map(str::to_string)
                    .or_else(|| non_empty(&el.text));
                if let Some((date, time)) = raw.as_deref().and_then(normalize_datetime) {
                    out.date = Some(Scored::new(date, RDFA_CONFIDENCE));
                    if let Some(time) = time {
                        out.start_time = Some(Scored::new(time, RDFA_CONFIDENCE));
                    }
                }
            }
        }
        if out.description.is_none() {
            if let Some(el) = doc
                .select(r#"[typeof*="Event"] [property="description"]"#)
                .await?
                .first()
            {
                if let Some(v) = non_empty(&el.text) {
                    out.description = Some(Scored::new(v, RDFA_CONFIDENCE));
                }
            }
        }

        Ok(())
    }
}

/// Collect every event-typed object, unwrapping `@graph` arrays and
/// `mainEntity` wrapping.
fn find_event_objects(value: &Value) -> Vec<&serde_json::Map<String, Value>> {
    let mut found = Vec::new();
    collect_events(value, &mut found, 0);
    found
}

fn collect_events<'a>(
    value: &'a Value,
    found: &mut Vec<&'a serde_json::Map<String, Value>>,
    depth: usize,
) {
    // Nesting past this depth is noise, not data
    if depth > 6 {
        return;
    }
    match value {
        Value::Array(items) => {
            for item in items {
                collect_events(item, found, depth + 1);
            }
        }
        Value::Object(obj) => {
            if is_event_type(obj) {
                found.push(obj);
            }
            for key in ["@graph", "mainEntity", "mainEntityOfPage"] {
                if let Some(inner) = obj.get(key) {
                    collect_events(inner, found, depth + 1);
                }
            }
        }
        _ => {}
    }
}

fn is_event_type(obj: &serde_json::Map<String, Value>) -> bool {
    let matches_tag = |tag: &str| {
        let bare = tag.rsplit(['/', ':']).next().unwrap_or(tag);
        EVENT_TYPES.contains(&bare)
    };
    match obj.get("@type") {
        Some(Value::String(s)) => matches_tag(s),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .any(matches_tag),
        _ => false,
    }
}

fn apply_event_object(out: &mut LayerOutput, obj: &serde_json::Map<String, Value>, conf: u8) {
    if out.title.is_none() {
        if let Some(name) = obj.get("name").and_then(string_value) {
            out.title = Some(Scored::new(name, conf));
        }
    }
    if out.description.is_none() {
        if let Some(desc) = obj.get("description").and_then(string_value) {
            out.description = Some(Scored::new(desc, conf));
        }
    }
    if out.date.is_none() {
        if let Some((date, time)) = obj
            .get("startDate")
            .and_then(string_value)
            .as_deref()
            .and_then(normalize_datetime)
        {
            out.date = Some(Scored::new(date, conf));
            if let Some(time) = time {
                out.start_time = Some(Scored::new(time, conf));
            }
        }
    }
    if out.end_date.is_none() {
        if let Some((date, time)) = obj
            .get("endDate")
            .and_then(string_value)
            .as_deref()
            .and_then(normalize_datetime)
        {
            out.end_date = Some(Scored::new(date, conf));
            if let Some(time) = time {
                out.end_time = Some(Scored::new(time, conf));
            }
        }
    }

    if let Some(location) = first_object(obj.get("location")) {
        if out.venue.is_none() {
            if let Some(name) = location.get("name").and_then(string_value) {
                out.venue = Some(Scored::new(name, conf));
            }
        }
        if out.address.is_none() {
            match location.get("address") {
                Some(Value::String(s)) if !s.trim().is_empty() => {
                    out.address = Some(Scored::new(s.trim().to_string(), conf));
                }
                Some(Value::Object(addr)) => {
                    let address = join_present(&[
                        addr.get("streetAddress").and_then(string_value),
                        addr.get("addressLocality").and_then(string_value),
                        addr.get("addressRegion").and_then(string_value),
                        addr.get("postalCode").and_then(string_value),
                    ]);
                    if !address.is_empty() {
                        out.address = Some(Scored::new(address, conf));
                    }
                }
                _ => {}
            }
        }
        if out.coordinates.is_none() {
            if let Some(geo) = first_object(location.get("geo")) {
                let lat = geo.get("latitude").and_then(number_value);
                let lng = geo.get("longitude").and_then(number_value);
                if let (Some(lat), Some(lng)) = (lat, lng) {
                    out.coordinates = Some(Scored::new(Coordinates::new(lat, lng), conf));
                }
            }
        }
    }

    if out.image_urls.is_none() {
        let images = collect_image_urls(obj.get("image"));
        if !images.is_empty() {
            out.image_urls = Some(Scored::new(images, conf));
        }
    }

    if out.categories.is_none() {
        let mut categories = collect_strings(obj.get("keywords"));
        categories.extend(collect_strings(obj.get("genre")));
        categories.dedup();
        if !categories.is_empty() {
            out.categories = Some(Scored::new(categories, conf));
        }
    }

    apply_offers(out, obj.get("offers"), conf);

    if out.organizer.is_none() {
        let candidate = obj.get("organizer").or_else(|| obj.get("performer"));
        if let Some(organizer) = parse_organizer(candidate) {
            out.organizer = Some(Scored::new(organizer, conf));
        }
    }
}

fn apply_offers(out: &mut LayerOutput, offers: Option<&Value>, conf: u8) {
    let offer_list: Vec<&serde_json::Map<String, Value>> = match offers {
        Some(Value::Object(o)) => vec![o],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
        _ => return,
    };

    let mut lowest: Option<f64> = None;
    for offer in &offer_list {
        let price = offer
            .get("lowPrice")
            .or_else(|| offer.get("price"))
            .and_then(|v| match v {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => parse_price(s),
                _ => None,
            });
        if let Some(p) = price {
            lowest = Some(lowest.map_or(p, |cur: f64| cur.min(p)));
        }

        if out.sold_out.is_none() {
            if let Some(avail) = offer.get("availability").and_then(Value::as_str) {
                if avail.contains("SoldOut") {
                    out.sold_out = Some(Scored::new(true, conf));
                }
            }
        }
        if out.tickets_link.is_none() {
            if let Some(url) = offer.get("url").and_then(string_value) {
                out.tickets_link = Some(Scored::new(url, conf));
            }
        }
    }

    if let Some(price) = lowest {
        if out.price.is_none() {
            out.price = Some(Scored::new(price, conf));
        }
        if out.free.is_none() {
            out.free = Some(Scored::new(price == 0.0, conf));
        }
    }
}

fn parse_organizer(value: Option<&Value>) -> Option<Organizer> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(Organizer::named(s.trim())),
        Value::Object(obj) => {
            let organizer = Organizer {
                name: obj.get("name").and_then(string_value),
                url: obj.get("url").and_then(string_value),
            };
            (!organizer.is_empty()).then_some(organizer)
        }
        Value::Array(items) => parse_organizer(items.first()),
        _ => None,
    }
}

/// Image data appears as a bare string, an array of strings or objects,
/// or an ImageObject.
fn collect_image_urls(value: Option<&Value>) -> Vec<String> {
    let mut urls = Vec::new();
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => urls.push(s.trim().to_string()),
        Some(Value::Array(items)) => {
            for item in items {
                match item {
                    Value::String(s) if !s.trim().is_empty() => urls.push(s.trim().to_string()),
                    Value::Object(obj) => {
                        if let Some(url) = obj.get("url").and_then(string_value) {
                            urls.push(url);
                        }
                    }
                    _ => {}
                }
            }
        }
        Some(Value::Object(obj)) => {
            if let Some(url) = obj.get("url").and_then(string_value) {
                urls.push(url);
            }
        }
        _ => {}
    }
    urls.dedup();
    urls
}

/// Keyword and genre data appears as a comma-separated string or an
/// array of strings.
fn collect_strings(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn first_object(value: Option<&Value>) -> Option<&serde_json::Map<String, Value>> {
    match value? {
        Value::Object(obj) => Some(obj),
        Value::Array(items) => items.iter().find_map(Value::as_object),
        _ => None,
    }
}

fn string_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        // "Free" phrasing in a price slot means zero
        return raw.to_lowercase().contains("free").then_some(0.0);
    }
    cleaned.parse().ok()
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn join_present(parts: &[Option<String>]) -> String {
    parts
        .iter()
        .flatten()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDocument;
    use crate::traits::ElementSnapshot;

    fn jsonld_doc(payload: &str) -> MockDocument {
        MockDocument::new("https://example.com/events/jazz-night").with_elements(
            r#"script[type="application/ld+json"]"#,
            vec![ElementSnapshot::new(payload)],
        )
    }

    #[tokio::test]
    async fn test_basic_event_object() {
        let doc = jsonld_doc(
            r#"{
                "@context": "https://schema.org",
                "@type": "Event",
                "name": "Jazz Night",
                "startDate": "2025-06-01T19:00:00",
                "location": {
                    "@type": "Place",
                    "name": "Blue Note",
                    "address": {
                        "streetAddress": "131 W 3rd St",
                        "addressLocality": "New York"
                    }
                }
            }"#,
        );

        let out = StructuredDataLayer::new().extract(&doc).await.unwrap();

        assert_eq!(out.title.as_ref().unwrap().value, "Jazz Night");
        assert_eq!(out.title.as_ref().unwrap().confidence.get(), 90);
        assert_eq!(
            out.date.as_ref().unwrap().value,
            "2025-06-01T19:00:00.000Z"
        );
        assert_eq!(out.start_time.as_ref().unwrap().value, "19:00:00");
        assert_eq!(out.venue.as_ref().unwrap().value, "Blue Note");
        assert_eq!(
            out.address.as_ref().unwrap().value,
            "131 W 3rd St, New York"
        );
    }

    #[tokio::test]
    async fn test_graph_wrapping_and_subtype() {
        let doc = jsonld_doc(
            r#"{
                "@context": "https://schema.org",
                "@graph": [
                    {"@type": "WebSite", "name": "Venue Site"},
                    {
                        "@type": "MusicEvent",
                        "name": "Synth Showcase",
                        "startDate": "2025-07-04",
                        "image": ["https://cdn.example.com/a.jpg", {"url": "https://cdn.example.com/b.jpg"}]
                    }
                ]
            }"#,
        );

        let out = StructuredDataLayer::new().extract(&doc).await.unwrap();

        assert_eq!(out.title.as_ref().unwrap().value, "Synth Showcase");
        assert_eq!(out.date.as_ref().unwrap().value, "2025-07-04");
        assert!(out.start_time.is_none());
        assert_eq!(
            out.image_urls.as_ref().unwrap().value,
            vec![
                "https://cdn.example.com/a.jpg".to_string(),
                "https://cdn.example.com/b.jpg".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_offers_and_sold_out() {
        let doc = jsonld_doc(
            r#"{
                "@type": "Event",
                "name": "Gala",
                "offers": [
                    {"price": "45.00", "url": "https://tickets.example.com/gala"},
                    {"price": 30, "availability": "https://schema.org/SoldOut"}
                ]
            }"#,
        );

        let out = StructuredDataLayer::new().extract(&doc).await.unwrap();

        assert_eq!(out.price.as_ref().unwrap().value, 30.0);
        assert_eq!(out.free.as_ref().unwrap().value, false);
        assert_eq!(out.sold_out.as_ref().unwrap().value, true);
        assert_eq!(
            out.tickets_link.as_ref().unwrap().value,
            "https://tickets.example.com/gala"
        );
    }

    #[tokio::test]
    async fn test_zero_price_means_free() {
        let doc = jsonld_doc(r#"{"@type": "Event", "name": "Open Mic", "offers": {"price": 0}}"#);
        let out = StructuredDataLayer::new().extract(&doc).await.unwrap();
        assert_eq!(out.free.as_ref().unwrap().value, true);
    }

    #[tokio::test]
    async fn test_geo_coordinates() {
        let doc = jsonld_doc(
            r#"{
                "@type": "Event",
                "name": "Lakeside Concert",
                "location": {"geo": {"latitude": 44.97, "longitude": -93.26}}
            }"#,
        );

        let out = StructuredDataLayer::new().extract(&doc).await.unwrap();
        let coords = out.coordinates.as_ref().unwrap().value;
        assert_eq!(coords.lat, 44.97);
        assert_eq!(coords.lng, -93.26);
    }

    #[tokio::test]
    async fn test_microdata_fallback() {
        let doc = MockDocument::new("https://example.com")
            .with_elements(
                r#"[itemtype*="Event"]"#,
                vec![ElementSnapshot::new("")],
            )
            .with_elements(
                r#"[itemtype*="Event"] [itemprop="name"]"#,
                vec![ElementSnapshot::new("Makers Market")],
            )
            .with_elements(
                r#"[itemtype*="Event"] [itemprop="startDate"]"#,
                vec![ElementSnapshot::new("").with_attr("content", "2025-09-12T10:00:00")],
            );

        let out = StructuredDataLayer::new().extract(&doc).await.unwrap();

        assert_eq!(out.title.as_ref().unwrap().value, "Makers Market");
        assert_eq!(out.title.as_ref().unwrap().confidence.get(), 75);
        assert_eq!(
            out.date.as_ref().unwrap().value,
            "2025-09-12T10:00:00.000Z"
        );
    }

    #[tokio::test]
    async fn test_malformed_jsonld_is_skipped() {
        let doc = jsonld_doc("{not json");
        let out = StructuredDataLayer::new().extract(&doc).await.unwrap();
        assert!(out.title.is_none());
        assert!(!out.is_failed());
    }

    #[tokio::test]
    async fn test_keywords_become_categories() {
        let doc = jsonld_doc(
            r#"{"@type": "MusicEvent", "name": "Friday Beats", "keywords": "Hip Hop, Concert"}"#,
        );
        let out = StructuredDataLayer::new().extract(&doc).await.unwrap();
        assert_eq!(
            out.categories.unwrap().value,
            vec!["Hip Hop".to_string(), "Concert".to_string()]
        );
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("$12.50"), Some(12.5));
        assert_eq!(parse_price("30"), Some(30.0));
        assert_eq!(parse_price("Free"), Some(0.0));
        assert_eq!(parse_price("TBD"), None);
    }
}
