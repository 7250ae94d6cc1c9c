//! Text-pattern layer: regular expressions over visible text.
//!
//! Every match is normalized to a canonical representation before being
//! reported: dates to ISO strings, times to `HH:MM:SS`, prices to a
//! number plus a free flag. The compiled catalog is shared with the
//! image-text layer, which runs it over recognized text.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use tracing::debug;

use crate::error::LayerResult;
use crate::traits::Document;
use crate::types::{LayerId, LayerOutput, Scored};

use super::Layer;

/// Window after a date match inspected for end-date phrasing.
const END_DATE_WINDOW: usize = 200;

/// Window before a time match inspected for doors/show context.
const TIME_CONTEXT_WINDOW: usize = 40;

/// Normalize a machine-readable date or datetime string.
///
/// Returns the canonical date representation plus the time component
/// when one is present. Datetimes render as `YYYY-MM-DDTHH:MM:SS.mmmZ`,
/// bare dates as `YYYY-MM-DD`.
pub(crate) fn normalize_datetime(raw: &str) -> Option<(String, Option<String>)> {
    let raw = raw.trim();

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        let utc = dt.with_timezone(&Utc);
        return Some((
            utc.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            Some(utc.format("%H:%M:%S").to_string()),
        ));
    }

    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some((
                format!("{}.000Z", naive.format("%Y-%m-%dT%H:%M:%S")),
                Some(naive.format("%H:%M:%S").to_string()),
            ));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some((date.format("%Y-%m-%d").to_string(), None));
    }

    None
}

/// A date found in running text, before context adjustment.
#[derive(Debug, Clone)]
struct DateMatch {
    iso: String,
    confidence: u8,
    start: usize,
    end: usize,
}

/// A time found in running text.
#[derive(Debug, Clone)]
struct TimeMatch {
    hms: String,
    confidence: u8,
    start: usize,
    end: usize,
    is_doors: bool,
    is_show: bool,
}

/// Everything the pattern catalog recovered from one text.
#[derive(Debug, Default)]
pub(crate) struct PatternFindings {
    pub date: Option<Scored<String>>,
    pub end_date: Option<Scored<String>>,
    pub start_time: Option<Scored<String>>,
    pub end_time: Option<Scored<String>>,
    pub price: Option<Scored<f64>>,
    pub free: Option<Scored<bool>>,
    pub phone: Option<Scored<String>>,
    pub email: Option<Scored<String>>,
    pub address: Option<Scored<String>>,
}

impl PatternFindings {
    /// Fill unpopulated fields of a layer output.
    pub(crate) fn apply_to(self, out: &mut LayerOutput) {
        out.date = out.date.take().or(self.date);
        out.end_date = out.end_date.take().or(self.end_date);
        out.start_time = out.start_time.take().or(self.start_time);
        out.end_time = out.end_time.take().or(self.end_time);
        out.price = out.price.take().or(self.price);
        out.free = out.free.take().or(self.free);
        out.phone = out.phone.take().or(self.phone);
        out.email = out.email.take().or(self.email);
        out.address = out.address.take().or(self.address);
    }
}

/// The compiled pattern catalog.
pub(crate) struct TextPatterns {
    iso_date: Regex,
    us_date: Regex,
    verbose_date: Regex,
    time: Regex,
    time_24h: Regex,
    price_range: Regex,
    price: Regex,
    free: Regex,
    phone: Regex,
    email: Regex,
    street_address: Regex,
    end_marker: Regex,
    range_separator: Regex,
}

impl TextPatterns {
    pub(crate) fn new() -> Self {
        Self {
            iso_date: Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap(),
            us_date: Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").unwrap(),
            verbose_date: Regex::new(
                r"(?i)\b(?:(monday|tuesday|wednesday|thursday|friday|saturday|sunday),?\s+)?(january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec)\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b",
            )
            .unwrap(),
            time: Regex::new(r"(?i)\b(\d{1,2})(?::(\d{2}))?\s*(am|pm)\b").unwrap(),
            time_24h: Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)(?::([0-5]\d))?\b").unwrap(),
            price_range: Regex::new(
                r"[$€£]\s*(\d+(?:\.\d{1,2})?)\s*(?:-|–|—|to)\s*[$€£]?\s*(\d+(?:\.\d{1,2})?)",
            )
            .unwrap(),
            price: Regex::new(r"[$€£]\s*(\d+(?:\.\d{1,2})?)").unwrap(),
            free: Regex::new(
                r"(?i)\b(?:free admission|admission is free|free entry|free event|free to attend|no cover)\b",
            )
            .unwrap(),
            phone: Regex::new(r"\(?\d{3}\)?[-.\s]\d{3}[-.\s]\d{4}").unwrap(),
            email: Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap(),
            street_address: Regex::new(
                r"\b\d{1,5}\s+(?:[NSEW]\.?\s+)?(?:[A-Z0-9][A-Za-z0-9']*\.?\s+){1,4}(?:Street|St|Avenue|Ave|Boulevard|Blvd|Road|Rd|Drive|Dr|Lane|Ln|Way|Place|Pl|Court|Ct|Parkway|Pkwy)\b\.?(,\s*[A-Z][A-Za-z]+(?:\s+[A-Z][A-Za-z]+)*)?",
            )
            .unwrap(),
            end_marker: Regex::new(r"(?i)\b(?:until|through|thru|to)\b|[-–—]").unwrap(),
            range_separator: Regex::new(r"(?i)^\s*(?:-|–|—|to|until)\s*$").unwrap(),
        }
    }

    /// Run the whole catalog over one text.
    pub(crate) fn scan(&self, text: &str) -> PatternFindings {
        let mut findings = PatternFindings::default();

        let dates = self.find_dates(text);
        if let Some(best) = dates.first() {
            let mut confidence = best.confidence;
            let mut end_date = None;

            // A later date shortly after the first, joined by range
            // phrasing, means a date range was found
            for candidate in dates.iter().skip(1) {
                if candidate.start >= best.end
                    && candidate.start <= best.end + END_DATE_WINDOW
                    && candidate.iso > best.iso
                {
                    let between = &text[best.end..candidate.start];
                    if self.end_marker.is_match(between) {
                        confidence = confidence.saturating_add(5).min(100);
                        end_date = Some(Scored::new(candidate.iso.clone(), candidate.confidence));
                        break;
                    }
                }
            }

            findings.date = Some(Scored::new(best.iso.clone(), confidence));
            findings.end_date = end_date;
        }

        let times = self.find_times(text);
        let (start, end) = self.choose_times(text, &times);
        findings.start_time = start.map(|t| Scored::new(t.hms.clone(), t.confidence));
        findings.end_time = end.map(|t| Scored::new(t.hms.clone(), t.confidence));

        if let Some(m) = self.price_range.captures(text) {
            // Ranges keep the low end, the general-admission price
            if let Ok(low) = m[1].parse::<f64>() {
                findings.price = Some(Scored::new(low, 70));
                findings.free = Some(Scored::new(low == 0.0, 70));
            }
        } else if let Some(m) = self.price.captures(text) {
            if let Ok(value) = m[1].parse::<f64>() {
                findings.price = Some(Scored::new(value, 75));
                findings.free = Some(Scored::new(value == 0.0, 75));
            }
        }
        if self.free.is_match(text) {
            findings.price = findings.price.or(Some(Scored::new(0.0, 80)));
            findings.free = Some(Scored::new(true, 80));
        }

        if let Some(m) = self.phone.find(text) {
            findings.phone = Some(Scored::new(m.as_str().to_string(), 75));
        }
        if let Some(m) = self.email.find(text) {
            findings.email = Some(Scored::new(m.as_str().to_string(), 80));
        }
        if let Some(caps) = self.street_address.captures(text) {
            let has_city = caps.get(1).is_some();
            let confidence = if has_city { 75 } else { 70 };
            findings.address = Some(Scored::new(caps[0].trim().to_string(), confidence));
        }

        findings
    }

    fn find_dates(&self, text: &str) -> Vec<DateMatch> {
        let mut dates = Vec::new();

        for m in self.iso_date.captures_iter(text) {
            if let Some(iso) = ymd_checked(&m[1], &m[2], &m[3]) {
                let whole = m.get(0).unwrap();
                dates.push(DateMatch {
                    iso,
                    confidence: 85,
                    start: whole.start(),
                    end: whole.end(),
                });
            }
        }
        for m in self.us_date.captures_iter(text) {
            if let Some(iso) = ymd_checked(&m[3], &m[1], &m[2]) {
                let whole = m.get(0).unwrap();
                dates.push(DateMatch {
                    iso,
                    confidence: 70,
                    start: whole.start(),
                    end: whole.end(),
                });
            }
        }
        for m in self.verbose_date.captures_iter(text) {
            let month = match month_number(&m[2]) {
                Some(n) => n,
                None => continue,
            };
            let day: u32 = match m[3].parse() {
                Ok(d) => d,
                Err(_) => continue,
            };
            let year: i32 = match m[4].parse() {
                Ok(y) => y,
                Err(_) => continue,
            };
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                let whole = m.get(0).unwrap();
                let confidence = if m.get(1).is_some() { 80 } else { 78 };
                dates.push(DateMatch {
                    iso: date.format("%Y-%m-%d").to_string(),
                    confidence,
                    start: whole.start(),
                    end: whole.end(),
                });
            }
        }

        // Best first: confidence, then document order
        dates.sort_by(|a, b| b.confidence.cmp(&a.confidence).then(a.start.cmp(&b.start)));
        dates
    }

    fn find_times(&self, text: &str) -> Vec<TimeMatch> {
        let mut times = Vec::new();

        for m in self.time.captures_iter(text) {
            let hour: u32 = match m[1].parse() {
                Ok(h) if h >= 1 && h <= 12 => h,
                _ => continue,
            };
            let minute: u32 = m
                .get(2)
                .and_then(|v| v.as_str().parse().ok())
                .unwrap_or(0);
            if minute > 59 {
                continue;
            }
            let pm = m[3].eq_ignore_ascii_case("pm");
            let hour24 = match (hour, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            };
            let whole = m.get(0).unwrap();
            let confidence = if m.get(2).is_some() { 75 } else { 60 };
            times.push(self.time_match(
                text,
                format!("{hour24:02}:{minute:02}:00"),
                confidence,
                whole.start(),
                whole.end(),
            ));
        }

        for m in self.time_24h.captures_iter(text) {
            let whole = m.get(0).unwrap();
            // Skip anything the 12-hour pass already covered
            if times
                .iter()
                .any(|t| whole.start() >= t.start && whole.start() < t.end)
            {
                continue;
            }
            // A colon-separated pair inside an ISO datetime is the
            // datetime's own time, already handled by date parsing;
            // accept it anyway since the value is identical
            let hour: u32 = m[1].parse().unwrap_or(0);
            let minute: u32 = m[2].parse().unwrap_or(0);
            let second: u32 = m
                .get(3)
                .and_then(|v| v.as_str().parse().ok())
                .unwrap_or(0);
            times.push(self.time_match(
                text,
                format!("{hour:02}:{minute:02}:{second:02}"),
                65,
                whole.start(),
                whole.end(),
            ));
        }

        times.sort_by_key(|t| t.start);
        times
    }

    fn time_match(
        &self,
        text: &str,
        hms: String,
        confidence: u8,
        start: usize,
        end: usize,
    ) -> TimeMatch {
        let mut context_start = start.saturating_sub(TIME_CONTEXT_WINDOW);
        while !text.is_char_boundary(context_start) {
            context_start += 1;
        }
        let context = text[context_start..start].to_lowercase();
        TimeMatch {
            hms,
            confidence,
            start,
            end,
            is_doors: context.contains("doors"),
            is_show: context.contains("show") || context.contains("performance"),
        }
    }

    /// Pick start and end times from the matches.
    ///
    /// A "show" time is the ticketed start and beats an earlier "doors"
    /// time. Two adjacent times joined by a range separator are a start
    /// and end pair.
    fn choose_times<'a>(
        &self,
        text: &str,
        times: &'a [TimeMatch],
    ) -> (Option<&'a TimeMatch>, Option<&'a TimeMatch>) {
        if times.is_empty() {
            return (None, None);
        }

        // Adjacent pair forming an explicit range
        for pair in times.windows(2) {
            let between = &text[pair[0].end..pair[1].start];
            if between.len() <= 8 && self.range_separator.is_match(between) {
                return (Some(&pair[0]), Some(&pair[1]));
            }
        }

        if let Some(show) = times.iter().find(|t| t.is_show) {
            return (Some(show), None);
        }
        if times.len() >= 2 && times[0].is_doors {
            return (Some(&times[1]), None);
        }
        (Some(&times[0]), None)
    }
}

fn ymd_checked(year: &str, month: &str, day: &str) -> Option<String> {
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string())
}

fn month_number(name: &str) -> Option<u32> {
    let n = match name.to_lowercase().as_str() {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sept" | "sep" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(n)
}

/// Layer 4: regular expressions over the document's visible text.
pub struct TextPatternsLayer {
    patterns: TextPatterns,
}

impl TextPatternsLayer {
    pub fn new() -> Self {
        Self {
            patterns: TextPatterns::new(),
        }
    }
}

impl Default for TextPatternsLayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Layer for TextPatternsLayer {
    fn id(&self) -> LayerId {
        LayerId::TextPatterns
    }

    async fn extract(&self, doc: &dyn Document) -> LayerResult<LayerOutput> {
        let mut out = LayerOutput::empty(self.id());
        let body = doc.body_text().await?;
        let findings = self.patterns.scan(&body);
        findings.apply_to(&mut out);
        debug!(fields = out.present_fields().len(), "text pattern scan complete");
        Ok(out)
    }
}
