//! Image-text layer: text recognition over prominent images.
//!
//! The expensive strategy. It only runs when the orchestrator's
//! preliminary confidence falls below the trigger threshold, inspects a
//! bounded number of large images (flyers and posters), and re-applies
//! the text-pattern catalog to whatever the recognizer returns.
//! Recognized text is noisy, so every reported confidence is capped
//! below the structural layers' ceiling.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::LayerResult;
use crate::traits::{Document, TextRecognizer};
use crate::types::{Confidence, LayerId, LayerOutput, Scored};

use super::text_patterns::TextPatterns;
use super::Layer;

/// Ceiling for anything this layer reports.
const CONFIDENCE_CAP: u8 = 75;

/// Minimum intrinsic edge for an image to count as prominent.
const MIN_EDGE: u32 = 200;

/// Widest aspect ratio still plausible for a flyer.
const MAX_ASPECT: f64 = 3.0;

/// Layer 6: conditional text recognition over prominent images.
pub struct ImageTextLayer<R: TextRecognizer> {
    recognizer: Arc<R>,
    max_images: usize,
    patterns: TextPatterns,
}

impl<R: TextRecognizer> ImageTextLayer<R> {
    pub fn new(recognizer: Arc<R>, max_images: usize) -> Self {
        Self {
            recognizer,
            max_images,
            patterns: TextPatterns::new(),
        }
    }
}

#[async_trait]
impl<R: TextRecognizer> Layer for ImageTextLayer<R> {
    fn id(&self) -> LayerId {
        LayerId::ImageText
    }

    async fn extract(&self, doc: &dyn Document) -> LayerResult<LayerOutput> {
        let mut out = LayerOutput::empty(self.id());

        let mut images: Vec<_> = doc
            .select("img")
            .await?
            .into_iter()
            .filter_map(|el| {
                let src = el.attr("src").or_else(|| el.attr("data-src"))?.to_string();
                let area = el.area()?;
                let (w, h) = (el.natural_width?, el.natural_height?);
                if w < MIN_EDGE || h < MIN_EDGE {
                    return None;
                }
                let aspect = w.max(h) as f64 / w.min(h) as f64;
                if aspect > MAX_ASPECT {
                    return None;
                }
                Some((src, area))
            })
            .collect();

        // Largest first, bounded to keep worst-case latency flat
        images.sort_by(|a, b| b.1.cmp(&a.1));
        images.truncate(self.max_images);

        if images.is_empty() {
            debug!("no prominent images to inspect");
            return Ok(out);
        }

        let mut recognized = String::new();
        let mut inspected = Vec::new();
        let mut factor_sum = 0.0f32;
        let mut factor_count = 0u32;

        for (src, _) in &images {
            let resolved = resolve_url(doc.url(), src);
            let bytes = match doc.image_bytes(&resolved).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(image = %resolved, error = %e, "image fetch failed");
                    continue;
                }
            };

            let recognition = self.recognizer.recognize(&bytes).await?;
            if recognition.has_text() {
                if !recognized.is_empty() {
                    recognized.push('\n');
                }
                recognized.push_str(recognition.text.trim());
                factor_sum += recognition.confidence.unwrap_or(1.0);
                factor_count += 1;
            }
            inspected.push(resolved);
        }

        if !inspected.is_empty() {
            out.image_urls = Some(Scored::new(
                inspected,
                Confidence::new(65).cap(Confidence::new(CONFIDENCE_CAP)),
            ));
        }

        if recognized.is_empty() {
            debug!(inspected = images.len(), "no text recognized");
            return Ok(out);
        }

        let factor = if factor_count > 0 {
            factor_sum / factor_count as f32
        } else {
            1.0
        };

        let findings = self.patterns.scan(&recognized);
        out.date = shade(findings.date, factor);
        out.end_date = shade(findings.end_date, factor);
        out.start_time = shade(findings.start_time, factor);
        out.end_time = shade(findings.end_time, factor);
        out.price = shade(findings.price, factor);
        out.free = shade(findings.free, factor);
        out.phone = shade(findings.phone, factor);
        out.email = shade(findings.email, factor);
        out.address = shade(findings.address, factor);

        // On a flyer the first substantial line is usually the title
        if let Some(line) = recognized
            .lines()
            .map(str::trim)
            .find(|l| l.chars().count() >= 3 && l.chars().count() <= 80)
        {
            out.title = shade(Some(Scored::new(line.to_string(), 60)), factor);
        }

        debug!(
            fields = out.present_fields().len(),
            chars = recognized.len(),
            "recognized text scanned"
        );
        Ok(out)
    }
}

/// Shade a finding by the recognizer's own confidence, then cap it.
fn shade<T>(scored: Option<Scored<T>>, factor: f32) -> Option<Scored<T>> {
    scored.map(|s| Scored {
        confidence: s.confidence.scale(factor).cap(Confidence::new(CONFIDENCE_CAP)),
        value: s.value,
    })
}

fn resolve_url(base: &str, src: &str) -> String {
    match url::Url::parse(base).and_then(|b| b.join(src)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => src.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockDocument, MockRecognizer};
    use crate::traits::ElementSnapshot;

    fn flyer(src: &str, w: u32, h: u32) -> ElementSnapshot {
        ElementSnapshot::new("").with_attr("src", src).with_dimensions(w, h)
    }

    #[tokio::test]
    async fn test_recognizes_flyer_text() {
        let doc = MockDocument::new("https://venue.com/events")
            .with_elements("img", vec![flyer("/flyers/june.png", 800, 1200)])
            .with_image("https://venue.com/flyers/june.png", vec![1, 2, 3]);
        let recognizer = MockRecognizer::new()
            .with_text(vec![1, 2, 3], "SUMMER BASH\nJune 6, 2025\nDoors 7pm show 8pm\n$15");

        let layer = ImageTextLayer::new(Arc::new(recognizer), 3);
        let out = layer.extract(&doc).await.unwrap();

        assert_eq!(out.title.as_ref().unwrap().value, "SUMMER BASH");
        assert_eq!(out.date.as_ref().unwrap().value, "2025-06-06");
        assert_eq!(out.start_time.as_ref().unwrap().value, "20:00:00");
        assert_eq!(out.price.as_ref().unwrap().value, 15.0);
    }

    #[tokio::test]
    async fn test_confidence_capped() {
        let doc = MockDocument::new("https://venue.com")
            .with_elements("img", vec![flyer("/f.png", 500, 500)])
            .with_image("https://venue.com/f.png", vec![9]);
        let recognizer = MockRecognizer::new().with_text(vec![9], "Event on 2025-06-06");

        let layer = ImageTextLayer::new(Arc::new(recognizer), 3);
        let out = layer.extract(&doc).await.unwrap();

        // Raw pattern confidence 85, capped at the layer ceiling
        assert_eq!(out.date.unwrap().confidence.get(), 75);
    }

    #[tokio::test]
    async fn test_small_and_skinny_images_skipped() {
        let doc = MockDocument::new("https://venue.com").with_elements(
            "img",
            vec![
                flyer("/icon.png", 64, 64),
                flyer("/divider.png", 1200, 40),
            ],
        );
        let recognizer = MockRecognizer::new();

        let layer = ImageTextLayer::new(Arc::new(recognizer), 3);
        let out = layer.extract(&doc).await.unwrap();

        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_image_cap_bounds_inspection() {
        let doc = MockDocument::new("https://venue.com")
            .with_elements(
                "img",
                vec![
                    flyer("/a.png", 1000, 1000),
                    flyer("/b.png", 900, 900),
                    flyer("/c.png", 800, 800),
                ],
            )
            .with_image("https://venue.com/a.png", vec![1])
            .with_image("https://venue.com/b.png", vec![2])
            .with_image("https://venue.com/c.png", vec![3]);
        let recognizer = MockRecognizer::new();

        let layer = ImageTextLayer::new(Arc::new(recognizer.clone()), 2);
        let _ = layer.extract(&doc).await.unwrap();

        assert_eq!(recognizer.call_count(), 2);
    }

    #[tokio::test]
    async fn test_recognizer_outage_surfaces_as_layer_error() {
        use crate::error::RecognizerError;
        use crate::traits::recognizer::MockTextRecognizer;

        let doc = MockDocument::new("https://venue.com")
            .with_elements("img", vec![flyer("/f.png", 500, 500)])
            .with_image("https://venue.com/f.png", vec![9]);
        let mut recognizer = MockTextRecognizer::new();
        recognizer
            .expect_recognize()
            .returning(|_| Err(RecognizerError::Unavailable("backend down".into())));

        let layer = ImageTextLayer::new(Arc::new(recognizer), 3);

        // The runner turns this into a failure marker; the layer itself
        // reports the error
        assert!(layer.extract(&doc).await.is_err());
    }

    #[tokio::test]
    async fn test_recognizer_confidence_shades_fields() {
        let doc = MockDocument::new("https://venue.com")
            .with_elements("img", vec![flyer("/f.png", 500, 500)])
            .with_image("https://venue.com/f.png", vec![9]);
        let recognizer = MockRecognizer::new().with_recognition(
            vec![9],
            crate::traits::Recognition::new("show 2025-06-06").with_confidence(0.5),
        );

        let layer = ImageTextLayer::new(Arc::new(recognizer), 3);
        let out = layer.extract(&doc).await.unwrap();

        // 85 scaled by 0.5, rounded
        assert_eq!(out.date.unwrap().confidence.get(), 43);
    }
}
