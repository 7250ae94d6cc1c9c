//! Pipeline configuration.

use chrono::{DateTime, Utc};
use std::time::Duration;

use super::field::Confidence;
use super::layer::LayerId;

/// Configuration for one extractor instance.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Layers the orchestrator may run. Default: all six.
    pub enabled_layers: Vec<LayerId>,

    /// Hard deadline per layer invocation. Default: 10 seconds.
    pub layer_timeout: Duration,

    /// The conditional image-text layer runs only when the preliminary
    /// overall confidence is below this. Default: 70.
    pub trigger_threshold: Confidence,

    /// Maximum images the conditional layer inspects. Default: 3.
    pub max_images: usize,

    /// Scoring weight for the image-text layer. The documented baseline
    /// is 0.5; callers may tune it without changing the contract.
    pub image_text_weight: f32,

    /// Apply business-rule validation to the merged record. Default: on.
    pub validate: bool,

    /// Reference time for the date sanity window and synthesized
    /// defaults. `None` means wall-clock now; tests pin it.
    pub reference_time: Option<DateTime<Utc>>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            enabled_layers: LayerId::ALL.to_vec(),
            layer_timeout: Duration::from_secs(10),
            trigger_threshold: Confidence::new(70),
            max_images: 3,
            image_text_weight: LayerId::ImageText.weight(),
            validate: true,
            reference_time: None,
        }
    }
}

impl ExtractOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict which layers run.
    pub fn with_layers(mut self, layers: impl IntoIterator<Item = LayerId>) -> Self {
        self.enabled_layers = layers.into_iter().collect();
        self
    }

    /// Set the per-layer deadline.
    pub fn with_layer_timeout(mut self, timeout: Duration) -> Self {
        self.layer_timeout = timeout;
        self
    }

    /// Set the conditional-layer trigger threshold.
    pub fn with_trigger_threshold(mut self, threshold: impl Into<Confidence>) -> Self {
        self.trigger_threshold = threshold.into();
        self
    }

    /// Cap the number of images the conditional layer inspects.
    pub fn with_max_images(mut self, max: usize) -> Self {
        self.max_images = max;
        self
    }

    /// Override the image-text layer weight.
    pub fn with_image_text_weight(mut self, weight: f32) -> Self {
        self.image_text_weight = weight.clamp(0.0, 1.0);
        self
    }

    /// Skip business-rule validation.
    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }

    /// Pin the reference time.
    pub fn with_reference_time(mut self, now: DateTime<Utc>) -> Self {
        self.reference_time = Some(now);
        self
    }

    /// Whether a layer is enabled.
    pub fn layer_enabled(&self, layer: LayerId) -> bool {
        self.enabled_layers.contains(&layer)
    }

    /// The effective reference time.
    pub fn now(&self) -> DateTime<Utc> {
        self.reference_time.unwrap_or_else(Utc::now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ExtractOptions::default();
        assert_eq!(options.enabled_layers.len(), 6);
        assert_eq!(options.trigger_threshold, Confidence::new(70));
        assert_eq!(options.max_images, 3);
        assert!(options.validate);
    }

    #[test]
    fn test_builder() {
        let options = ExtractOptions::new()
            .with_layers([LayerId::StructuredData, LayerId::MetaTags])
            .with_layer_timeout(Duration::from_secs(2))
            .with_trigger_threshold(50)
            .without_validation();

        assert!(options.layer_enabled(LayerId::MetaTags));
        assert!(!options.layer_enabled(LayerId::ImageText));
        assert_eq!(options.layer_timeout, Duration::from_secs(2));
        assert!(!options.validate);
    }

    #[test]
    fn test_image_text_weight_clamped() {
        let options = ExtractOptions::new().with_image_text_weight(1.8);
        assert_eq!(options.image_text_weight, 1.0);
    }
}
