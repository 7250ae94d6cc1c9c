//! Text recognition trait for the conditional image-text layer.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::RecognizerResult;

/// Text recognized from one image, plus whatever metadata the backend
/// exposes.
#[derive(Debug, Clone, Default)]
pub struct Recognition {
    /// Recognized text, line breaks preserved
    pub text: String,

    /// Backend-reported confidence in 0.0 to 1.0, if any
    pub confidence: Option<f32>,

    /// Backend-specific metadata (engine name, language, timings)
    pub metadata: HashMap<String, String>,
}

impl Recognition {
    /// Create a recognition result with text only.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Set the backend confidence.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    /// Add a metadata key-value pair.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Check whether any text was recognized.
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Optical text recognition over image bytes.
///
/// Invoked only by the conditional layer, only when the cheaper layers
/// leave overall confidence below the trigger threshold.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognize text in one image.
    async fn recognize(&self, image: &[u8]) -> RecognizerResult<Recognition>;

    /// Backend name for logging.
    fn name(&self) -> &str {
        "unknown"
    }
}

/// A recognizer that never recognizes anything.
///
/// Useful when image-text recognition is disabled but the pipeline type
/// still needs a recognizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecognizer;

#[async_trait]
impl TextRecognizer for NoopRecognizer {
    async fn recognize(&self, _image: &[u8]) -> RecognizerResult<Recognition> {
        Ok(Recognition::default())
    }

    fn name(&self) -> &str {
        "noop"
    }
}
