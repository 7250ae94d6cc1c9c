//! Confidence calculator: score fields and the whole extraction.
//!
//! Per-field confidence is a layer-weighted average over exactly the
//! layers whose value matches the merged value; layers that reported
//! something else never contribute. The merger's decisions say which
//! layers those are. Field-specific adjustments then shade the result,
//! and the overall score is a weighted mean with the critical fields
//! counted twice.

use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;

use crate::types::{Confidence, Field, LayerId, LayerOutput, MergeDecision, MergedRecord};

/// Tokens in an image path that mark it as image-like.
const IMAGE_PATH_TOKENS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".webp", ".gif", ".avif", "/image", "/img", "/photo", "/media",
    "/upload", "flyer", "poster",
];

/// Per-layer scoring weights.
///
/// Fixed except for the image-text entry, which callers may tune.
#[derive(Debug, Clone)]
pub struct LayerWeights {
    image_text: f32,
}

impl Default for LayerWeights {
    fn default() -> Self {
        Self {
            image_text: LayerId::ImageText.weight(),
        }
    }
}

impl LayerWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the image-text weight.
    pub fn with_image_text(image_text: f32) -> Self {
        Self {
            image_text: image_text.clamp(0.0, 1.0),
        }
    }

    /// Weight of one layer.
    pub fn weight(&self, layer: LayerId) -> f32 {
        match layer {
            LayerId::ImageText => self.image_text,
            other => other.weight(),
        }
    }
}

/// Score every merged field from the layers that back it.
///
/// Each decision's winners are the layers whose value matches the
/// merged one; their reported confidences are averaged under the layer
/// weights, then shaded by the field-specific adjustments.
pub fn score_fields(
    outputs: &[LayerOutput],
    merged: &MergedRecord,
    decisions: &[MergeDecision],
    weights: &LayerWeights,
    now: DateTime<Utc>,
) -> IndexMap<Field, Confidence> {
    let mut scores = IndexMap::new();
    for decision in decisions {
        let agreeing: Vec<(LayerId, Confidence)> = outputs
            .iter()
            .filter(|o| decision.winners.contains(&o.layer))
            .filter_map(|o| o.confidence_of(decision.field).map(|c| (o.layer, c)))
            .collect();
        if let Some(base) = weighted_average(&agreeing, weights) {
            scores.insert(
                decision.field,
                adjust_for_field(decision.field, base, merged, now),
            );
        }
    }
    scores
}

/// Overall confidence: weighted mean over present fields, critical
/// fields counted twice.
pub fn overall(confidences: &IndexMap<Field, Confidence>) -> Confidence {
    if confidences.is_empty() {
        return Confidence::MIN;
    }
    let mut weighted_sum = 0.0f32;
    let mut weight_total = 0.0f32;
    for (field, confidence) in confidences {
        let weight = if field.is_critical() { 2.0 } else { 1.0 };
        weighted_sum += confidence.get() as f32 * weight;
        weight_total += weight;
    }
    Confidence::new((weighted_sum / weight_total).round() as u8)
}

/// Layer-weighted average of agreeing confidences.
fn weighted_average(
    agreeing: &[(LayerId, Confidence)],
    weights: &LayerWeights,
) -> Option<Confidence> {
    if agreeing.is_empty() {
        return None;
    }
    let mut weighted_sum = 0.0f32;
    let mut weight_total = 0.0f32;
    for (layer, confidence) in agreeing {
        let weight = weights.weight(*layer);
        weighted_sum += confidence.get() as f32 * weight;
        weight_total += weight;
    }
    if weight_total == 0.0 {
        return None;
    }
    Some(Confidence::new((weighted_sum / weight_total).round() as u8))
}

/// Field-specific shading of the derived score.
fn adjust_for_field(
    field: Field,
    base: Confidence,
    merged: &MergedRecord,
    now: DateTime<Utc>,
) -> Confidence {
    match field {
        Field::Title => {
            let len = merged
                .title
                .as_deref()
                .map(|t| t.chars().count())
                .unwrap_or(0);
            if !(3..=200).contains(&len) {
                base.adjust(-30)
            } else if !(5..=120).contains(&len) {
                base.adjust(-15)
            } else {
                base
            }
        }
        Field::Date => match merged.date.as_deref().and_then(parse_iso_date) {
            Some(date) => {
                let delta = date.signed_duration_since(now.date_naive()).num_days();
                if (-30..=365).contains(&delta) {
                    base.adjust(10)
                } else {
                    base.adjust(-20)
                }
            }
            None => base.adjust(-40),
        },
        Field::Address => {
            if merged.address.as_deref().is_some_and(|a| a.contains(',')) {
                base.adjust(10)
            } else {
                base
            }
        }
        Field::ImageUrls => {
            let image_like = merged.image_urls.as_ref().is_some_and(|urls| {
                urls.iter().any(|u| {
                    let lowered = u.to_lowercase();
                    IMAGE_PATH_TOKENS.iter().any(|t| lowered.contains(t))
                })
            });
            if image_like {
                base.adjust(5)
            } else {
                base
            }
        }
        _ => base,
    }
}

fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.date_naive())
}
