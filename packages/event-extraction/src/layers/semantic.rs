//! Semantic-pattern layer: ranked structural selectors.
//!
//! Walks a per-field catalog of selectors ordered from most to least
//! specific. Matches must pass field-specific sanity rules before
//! acceptance, and the base confidence is nudged by selector
//! specificity.

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::error::LayerResult;
use crate::traits::{Document, ElementSnapshot};
use crate::types::{Confidence, LayerId, LayerOutput, Scored};

use super::text_patterns::normalize_datetime;
use super::Layer;

const TITLE_SELECTORS: &[(&str, u8)] = &[
    (r#"[class*="event-title"]"#, 85),
    (r#"[class*="event-name"]"#, 85),
    (r#"[class*="event"] h1"#, 75),
    (r#"h1[class*="title"]"#, 75),
    ("h1", 55),
];

const VENUE_SELECTORS: &[(&str, u8)] = &[
    (r#"[class*="venue-name"]"#, 85),
    (r#"[class*="venue"]"#, 75),
    (r#"[class*="location"] [class*="name"]"#, 70),
    (r#"[class*="location-name"]"#, 70),
];

const ADDRESS_SELECTORS: &[(&str, u8)] = &[
    (r#"[class*="event-address"]"#, 80),
    ("address", 75),
    (r#"[class*="address"]"#, 70),
    (r#"[class*="location"]"#, 50),
];

const DATE_SELECTORS: &[(&str, u8)] = &[
    ("time[datetime]", 85),
    (r#"[class*="event-date"]"#, 70),
    (r#"[class*="date"]"#, 55),
];

const PRICE_SELECTORS: &[(&str, u8)] = &[
    (r#"[class*="ticket"] [class*="price"]"#, 80),
    (r#"[class*="price"]"#, 70),
    (r#"[class*="cost"]"#, 65),
];

const IMAGE_SELECTORS: &[(&str, u8)] = &[
    (r#"[class*="poster"] img"#, 80),
    (r#"img[class*="event"]"#, 75),
    (r#"img[class*="hero"]"#, 75),
    (r#"img[class*="banner"]"#, 70),
    ("img", 45),
];

const TICKETS_SELECTORS: &[(&str, u8)] = &[
    (r#"a[href*="ticket"]"#, 80),
    (r#"a[class*="ticket"]"#, 75),
    (r#"a[href*="eventbrite"]"#, 80),
];

/// Layer 3: ranked structural selectors with sanity validation.
pub struct SemanticLayer {
    image_shape: Regex,
    price_shape: Regex,
}

impl SemanticLayer {
    pub fn new() -> Self {
        Self {
            image_shape: Regex::new(
                r"(?i)\.(?:jpe?g|png|webp|gif|avif)(?:\?|$)|/(?:image|img|photo|media|upload)s?/",
            )
            .unwrap(),
            price_shape: Regex::new(r"(?i)\d|[$€£]|\bfree\b").unwrap(),
        }
    }

    /// First selector whose first match passes the sanity rule.
    async fn first_match<F>(
        &self,
        doc: &dyn Document,
        selectors: &[(&str, u8)],
        accept: F,
    ) -> LayerResult<Option<Scored<String>>>
    where
        F: Fn(&ElementSnapshot) -> Option<String>,
    {
        for (selector, base) in selectors {
            let elements = doc.select(selector).await?;
            for el in &elements {
                if let Some(value) = accept(el) {
                    let confidence =
                        Confidence::new(*base).adjust(specificity_nudge(selector));
                    return Ok(Some(Scored::new(value, confidence)));
                }
            }
        }
        Ok(None)
    }
}

impl Default for SemanticLayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Layer for SemanticLayer {
    fn id(&self) -> LayerId {
        LayerId::Semantic
    }

    async fn extract(&self, doc: &dyn Document) -> LayerResult<LayerOutput> {
        let mut out = LayerOutput::empty(self.id());

        out.title = self
            .first_match(doc, TITLE_SELECTORS, |el| text_in_bounds(el, 3, 200))
            .await?;
        out.venue = self
            .first_match(doc, VENUE_SELECTORS, |el| text_in_bounds(el, 2, 100))
            .await?;
        out.address = self
            .first_match(doc, ADDRESS_SELECTORS, |el| text_in_bounds(el, 5, 160))
            .await?;

        if let Some(date) = self
            .first_match(doc, DATE_SELECTORS, |el| {
                // Machine-readable attribute preferred, text as fallback
                el.attr("datetime")
                    .map(str::to_string)
                    .or_else(|| text_in_bounds(el, 4, 60))
                    .filter(|raw| normalize_datetime(raw).is_some())
            })
            .await?
        {
            // Accepted values were already normalizable
            if let Some((iso, time)) = normalize_datetime(&date.value) {
                out.date = Some(Scored::new(iso, date.confidence));
                if let Some(time) = time {
                    out.start_time = Some(Scored::new(time, date.confidence));
                }
            }
        }

        if let Some(price) = self
            .first_match(doc, PRICE_SELECTORS, |el| {
                text_in_bounds(el, 1, 40).filter(|t| self.price_shape.is_match(t))
            })
            .await?
        {
            let lowered = price.value.to_lowercase();
            if lowered.contains("free") {
                out.price = Some(Scored::new(0.0, price.confidence));
                out.free = Some(Scored::new(true, price.confidence));
            } else if let Some(amount) = parse_amount(&price.value) {
                out.price = Some(Scored::new(amount, price.confidence));
                out.free = Some(Scored::new(amount == 0.0, price.confidence));
            }
        }

        let mut images = Vec::new();
        let mut image_confidence = Confidence::MIN;
        for (selector, base) in IMAGE_SELECTORS {
            let elements = doc.select(selector).await?;
            for el in &elements {
                let src = match el.attr("src").or_else(|| el.attr("data-src")) {
                    Some(src) if self.image_shape.is_match(src) => src.to_string(),
                    _ => continue,
                };
                if !images.contains(&src) {
                    images.push(src);
                    let c = Confidence::new(*base).adjust(specificity_nudge(selector));
                    image_confidence = image_confidence.max(c);
                }
            }
            if !images.is_empty() {
                break;
            }
        }
        if !images.is_empty() {
            out.image_urls = Some(Scored::new(images, image_confidence));
        }

        out.tickets_link = self
            .first_match(doc, TICKETS_SELECTORS, |el| {
                el.attr("href").map(str::to_string).filter(|h| !h.is_empty())
            })
            .await?;

        debug!(fields = out.present_fields().len(), "selector walk complete");
        Ok(out)
    }
}

/// Attribute-hinted selectors are nudged up, bare element selectors
/// down.
fn specificity_nudge(selector: &str) -> i16 {
    if !selector.contains('[') && !selector.contains(' ') {
        -10
    } else if selector.contains("*=") {
        5
    } else {
        0
    }
}

fn text_in_bounds(el: &ElementSnapshot, min: usize, max: usize) -> Option<String> {
    let text = el.text.trim();
    let len = text.chars().count();
    (len >= min && len <= max).then(|| text.to_string())
}

fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse().ok()
}
