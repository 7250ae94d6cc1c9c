//! Metadata-tag layer: social-sharing and standard document metadata.
//!
//! Tag families are tried in priority order: social-sharing tags first,
//! secondary social tags next, generic document metadata after that, and
//! the document title as a last resort.

use async_trait::async_trait;
use tracing::debug;

use crate::error::LayerResult;
use crate::traits::Document;
use crate::types::{Coordinates, LayerId, LayerOutput, Scored};

use super::text_patterns::normalize_datetime;
use super::Layer;

const OG_CONFIDENCE: u8 = 85;
const TWITTER_CONFIDENCE: u8 = 75;
const GENERIC_CONFIDENCE: u8 = 65;
const TITLE_TAG_CONFIDENCE: u8 = 60;
const EVENT_TAG_CONFIDENCE: u8 = 80;

/// Layer 2: document metadata tags.
#[derive(Debug, Default)]
pub struct MetaTagsLayer;

impl MetaTagsLayer {
    pub fn new() -> Self {
        Self
    }

    /// First non-empty value among keys, with that key's confidence.
    async fn first_meta(
        &self,
        doc: &dyn Document,
        keys: &[(&str, u8)],
    ) -> LayerResult<Option<Scored<String>>> {
        for (key, conf) in keys {
            if let Some(value) = doc.meta(key).await? {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    return Ok(Some(Scored::new(trimmed.to_string(), *conf)));
                }
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl Layer for MetaTagsLayer {
    fn id(&self) -> LayerId {
        LayerId::MetaTags
    }

    async fn extract(&self, doc: &dyn Document) -> LayerResult<LayerOutput> {
        let mut out = LayerOutput::empty(self.id());

        out.title = self
            .first_meta(
                doc,
                &[
                    ("og:title", OG_CONFIDENCE),
                    ("twitter:title", TWITTER_CONFIDENCE),
                ],
            )
            .await?;
        if out.title.is_none() {
            if let Some(title) = doc.title().await? {
                let trimmed = title.trim();
                if !trimmed.is_empty() {
                    out.title = Some(Scored::new(trimmed.to_string(), TITLE_TAG_CONFIDENCE));
                }
            }
        }

        out.description = self
            .first_meta(
                doc,
                &[
                    ("og:description", OG_CONFIDENCE),
                    ("twitter:description", TWITTER_CONFIDENCE),
                    ("description", GENERIC_CONFIDENCE),
                ],
            )
            .await?;

        // Every distinct image tag contributes; og first
        let mut images = Vec::new();
        for key in ["og:image", "og:image:secure_url", "twitter:image"] {
            if let Some(value) = doc.meta(key).await? {
                let trimmed = value.trim().to_string();
                if !trimmed.is_empty() && !images.contains(&trimmed) {
                    images.push(trimmed);
                }
            }
        }
        if !images.is_empty() {
            out.image_urls = Some(Scored::new(images, OG_CONFIDENCE));
        }

        if let Some(start) = self
            .first_meta(
                doc,
                &[
                    ("event:start_time", EVENT_TAG_CONFIDENCE),
                    ("og:start_time", EVENT_TAG_CONFIDENCE),
                ],
            )
            .await?
        {
            if let Some((date, time)) = normalize_datetime(&start.value) {
                out.date = Some(Scored::new(date, start.confidence));
                if let Some(time) = time {
                    out.start_time = Some(Scored::new(time, start.confidence));
                }
            }
        }
        if let Some(end) = self
            .first_meta(
                doc,
                &[
                    ("event:end_time", EVENT_TAG_CONFIDENCE),
                    ("og:end_time", EVENT_TAG_CONFIDENCE),
                ],
            )
            .await?
        {
            if let Some((date, time)) = normalize_datetime(&end.value) {
                out.end_date = Some(Scored::new(date, end.confidence));
                if let Some(time) = time {
                    out.end_time = Some(Scored::new(time, end.confidence));
                }
            }
        }

        // Paired geo tags combine into one coordinate field; an unpaired
        // half is dropped
        let lat = doc.meta("place:location:latitude").await?;
        let lng = doc.meta("place:location:longitude").await?;
        if let (Some(lat), Some(lng)) = (
            lat.and_then(|v| v.trim().parse::<f64>().ok()),
            lng.and_then(|v| v.trim().parse::<f64>().ok()),
        ) {
            out.coordinates = Some(Scored::new(
                Coordinates::new(lat, lng),
                EVENT_TAG_CONFIDENCE,
            ));
        }

        debug!(fields = out.present_fields().len(), "meta tag scan complete");
        Ok(out)
    }
}
