//! Content-analysis layer: heuristics for documents nothing else can
//! read.
//!
//! Runs last in the sequential group and tolerates document errors on
//! every probe, so it can still synthesize low-confidence defaults when
//! the snapshot is badly degraded. The defaults keep the pipeline from
//! ever returning nothing.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Utc};
use regex::Regex;
use tracing::debug;

use crate::error::LayerResult;
use crate::traits::{Document, ElementSnapshot};
use crate::types::{LayerId, LayerOutput, Scored};

use super::Layer;

const DEFAULT_DATE_CONFIDENCE: u8 = 25;
const DEFAULT_TITLE_CONFIDENCE: u8 = 30;

/// Words that suggest a heading names an event.
const EVENT_KEYWORDS: &[&str] = &[
    "concert",
    "show",
    "festival",
    "fest",
    "party",
    "night",
    "live",
    "presents",
    "tour",
    "event",
    "celebration",
    "gala",
    "showcase",
    "premiere",
    "opening",
];

/// Layer 5: fallback heuristics and last-resort defaults.
pub struct ContentAnalysisLayer {
    reference_time: Option<DateTime<Utc>>,
    venue_label: Regex,
    venue_adjacency: Regex,
}

impl ContentAnalysisLayer {
    pub fn new(reference_time: Option<DateTime<Utc>>) -> Self {
        Self {
            reference_time,
            venue_label: Regex::new(r"(?i)\bvenue:\s*([^\n.,]{2,60})").unwrap(),
            venue_adjacency: Regex::new(r"\bat (?:the )?([A-Z][A-Za-z0-9&' ]{2,60})").unwrap(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.reference_time.unwrap_or_else(Utc::now)
    }

    /// Probe a selector, treating any document error as no match.
    async fn probe(&self, doc: &dyn Document, selector: &str) -> Vec<ElementSnapshot> {
        doc.select(selector).await.unwrap_or_default()
    }

    async fn best_title(&self, doc: &dyn Document) -> Option<Scored<String>> {
        // Candidate plus whether it carries an event keyword; keyword
        // bearers win confidence ties
        let mut candidates: Vec<(Scored<String>, bool)> = Vec::new();

        for (selector, base) in [("h1", 55u8), ("h2", 45), ("h3", 38)] {
            for el in self.probe(doc, selector).await {
                if let Some(text) = bounded(&el.text, 3, 120) {
                    let keyword = has_event_keyword(&text);
                    let bonus = if keyword { 10 } else { 0 };
                    candidates.push((Scored::new(text, base + bonus), keyword));
                }
            }
        }

        // Visually prominent blocks stand in for a font-size scan
        for el in self
            .probe(
                doc,
                r#"[class*="hero"], [class*="banner"], [class*="headline"]"#,
            )
            .await
        {
            if let Some(text) = bounded(&el.text, 3, 120) {
                let keyword = has_event_keyword(&text);
                candidates.push((Scored::new(text, 40), keyword));
            }
        }

        if let Ok(Some(title)) = doc.title().await {
            if let Some(cleaned) = strip_site_suffix(&title) {
                let keyword = has_event_keyword(&cleaned);
                candidates.push((Scored::new(cleaned, 45), keyword));
            }
        }

        candidates
            .into_iter()
            .max_by_key(|(c, keyword)| (c.confidence, *keyword))
            .map(|(c, _)| c)
    }

    async fn best_description(&self, doc: &dyn Document) -> Option<Scored<String>> {
        let main = doc.region_text("main").await.ok().flatten();
        let text = match main {
            Some(t) if !t.trim().is_empty() => t,
            _ => doc.body_text().await.unwrap_or_default(),
        };

        for chunk in text.split('\n') {
            if let Some(paragraph) = bounded(chunk, 40, 600) {
                return Some(Scored::new(paragraph, 40));
            }
        }

        for el in self.probe(doc, "p").await {
            if let Some(paragraph) = bounded(&el.text, 40, 600) {
                return Some(Scored::new(paragraph, 40));
            }
        }

        None
    }

    fn venue_from_text(&self, text: &str) -> Option<Scored<String>> {
        if let Some(caps) = self.venue_label.captures(text) {
            if let Some(venue) = bounded(&caps[1], 2, 60) {
                return Some(Scored::new(venue, 50));
            }
        }
        if let Some(caps) = self.venue_adjacency.captures(text) {
            if let Some(venue) = bounded(&caps[1], 2, 60) {
                return Some(Scored::new(venue, 40));
            }
        }
        None
    }

    fn title_from_origin(&self, url: &str) -> Option<String> {
        let parsed = url::Url::parse(url).ok()?;
        let host = parsed.host_str()?.trim_start_matches("www.");
        let name = host.split('.').next()?;
        if name.is_empty() {
            return None;
        }
        let words: Vec<String> = name
            .split(['-', '_'])
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect();
        Some(format!("{} Event", words.join(" ")))
    }
}

impl Default for ContentAnalysisLayer {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl Layer for ContentAnalysisLayer {
    fn id(&self) -> LayerId {
        LayerId::ContentAnalysis
    }

    async fn extract(&self, doc: &dyn Document) -> LayerResult<LayerOutput> {
        let mut out = LayerOutput::empty(self.id());

        out.title = self.best_title(doc).await;
        out.description = self.best_description(doc).await;

        let body = doc.body_text().await.unwrap_or_default();
        out.venue = self.venue_from_text(&body);

        if out.title.is_none() {
            if let Some(title) = self.title_from_origin(doc.url()) {
                out.title = Some(Scored::new(title, DEFAULT_TITLE_CONFIDENCE));
            }
        }

        // This layer has no date heuristics of its own, so the default
        // always fires here; higher layers outrank it whenever they
        // found a real date
        let (date, time) = near_future_default(self.now());
        out.date = Some(Scored::new(date, DEFAULT_DATE_CONFIDENCE));
        out.start_time = Some(Scored::new(time, DEFAULT_DATE_CONFIDENCE));

        debug!(fields = out.present_fields().len(), "heuristic scan complete");
        Ok(out)
    }
}

/// A near-future Friday evening, the least-wrong guess for an undated
/// event page. Shared with the validator's last-resort defaults.
pub(crate) fn near_future_default(now: DateTime<Utc>) -> (String, String) {
    let today = now.date_naive();
    let weekday = today.weekday().num_days_from_monday();
    let mut ahead = (4 + 7 - weekday) % 7;
    if ahead == 0 {
        ahead = 7;
    }
    let date = today + Duration::days(ahead as i64);
    (
        format!("{}T19:00:00.000Z", date.format("%Y-%m-%d")),
        "19:00:00".to_string(),
    )
}

fn bounded(text: &str, min: usize, max: usize) -> Option<String> {
    let trimmed = text.trim();
    let len = trimmed.chars().count();
    (len >= min && len <= max).then(|| trimmed.to_string())
}

fn has_event_keyword(text: &str) -> bool {
    let lowered = text.to_lowercase();
    EVENT_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Strip a trailing site-name suffix from a document title.
fn strip_site_suffix(title: &str) -> Option<String> {
    for separator in [" | ", " - ", " — ", " – "] {
        if let Some((head, _tail)) = title.split_once(separator) {
            return bounded(head, 3, 120);
        }
    }
    bounded(title, 3, 120)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDocument;
    use chrono::TimeZone;

    fn pinned() -> DateTime<Utc> {
        // A Wednesday
        Utc.with_ymd_and_hms(2025, 6, 4, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_heading_with_event_keyword_beats_plain_h1() {
        let doc = MockDocument::new("https://example.com")
            .with_elements(
                "h1",
                vec![ElementSnapshot::new("Welcome to our website")],
            )
            .with_elements(
                "h2",
                vec![ElementSnapshot::new("Midsummer Festival 2025")],
            );

        let layer = ContentAnalysisLayer::new(Some(pinned()));
        let out = layer.extract(&doc).await.unwrap();

        // h2 at 45 plus the keyword bonus outranks the generic h1 at 55
        let title = out.title.unwrap();
        assert_eq!(title.value, "Midsummer Festival 2025");
        assert_eq!(title.confidence.get(), 55);
    }

    #[tokio::test]
    async fn test_site_suffix_stripped_from_document_title() {
        let doc =
            MockDocument::new("https://example.com").with_title("Jazz Night | The Blue Note");

        let layer = ContentAnalysisLayer::new(Some(pinned()));
        let out = layer.extract(&doc).await.unwrap();
        assert_eq!(out.title.unwrap().value, "Jazz Night");
    }

    #[tokio::test]
    async fn test_default_date_is_next_friday() {
        let doc = MockDocument::new("https://example.com");
        let layer = ContentAnalysisLayer::new(Some(pinned()));
        let out = layer.extract(&doc).await.unwrap();

        let date = out.date.unwrap();
        assert_eq!(date.value, "2025-06-06T19:00:00.000Z");
        assert_eq!(date.confidence.get(), 25);
        assert_eq!(out.start_time.unwrap().value, "19:00:00");
    }

    #[tokio::test]
    async fn test_title_from_origin_as_last_resort() {
        let doc = MockDocument::new("https://first-avenue.com/some/page");
        let layer = ContentAnalysisLayer::new(Some(pinned()));
        let out = layer.extract(&doc).await.unwrap();

        let title = out.title.unwrap();
        assert_eq!(title.value, "First Avenue Event");
        assert_eq!(title.confidence.get(), 30);
    }

    #[tokio::test]
    async fn test_description_paragraph_bounds() {
        let doc = MockDocument::new("https://example.com").with_body(
            "Short line\nJoin us for an unforgettable evening of live music, food trucks, and local art in the heart of downtown.\nTickets",
        );

        let layer = ContentAnalysisLayer::new(Some(pinned()));
        let out = layer.extract(&doc).await.unwrap();

        let description = out.description.unwrap();
        assert!(description.value.starts_with("Join us"));
        assert_eq!(description.confidence.get(), 40);
    }

    #[tokio::test]
    async fn test_venue_adjacency() {
        let doc = MockDocument::new("https://example.com")
            .with_body("Live this Friday at the Turf Club. Doors at 8.");

        let layer = ContentAnalysisLayer::new(Some(pinned()));
        let out = layer.extract(&doc).await.unwrap();
        assert_eq!(out.venue.unwrap().value, "Turf Club");
    }

    #[tokio::test]
    async fn test_survives_document_errors() {
        let doc = MockDocument::new("https://venue.com")
            .with_select_error()
            .with_body_error()
            .with_title_error();

        let layer = ContentAnalysisLayer::new(Some(pinned()));
        let out = layer.extract(&doc).await.unwrap();

        // Defaults still fire
        assert!(out.date.is_some());
        assert_eq!(out.title.unwrap().value, "Venue Event");
    }
}
