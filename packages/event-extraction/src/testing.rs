//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the pipeline
//! without a real browser or recognition backend.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{DocumentError, DocumentResult, RecognizerResult};
use crate::traits::{Document, ElementSnapshot, Recognition, TextRecognizer};

/// A canned document snapshot.
///
/// Selectors, metadata tags, text regions, and image bytes are all
/// configured up front with builder methods; anything not configured
/// reads as absent, matching a page that simply lacks the data.
///
/// # Example
///
/// ```rust
/// use event_extraction::testing::MockDocument;
/// use event_extraction::ElementSnapshot;
///
/// let doc = MockDocument::new("https://example.com/events/1")
///     .with_title("Jazz Night | Blue Note")
///     .with_meta("og:title", "Jazz Night")
///     .with_elements("h1", vec![ElementSnapshot::new("Jazz Night")]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockDocument {
    url: String,
    title: Option<String>,
    body: String,
    regions: HashMap<String, String>,
    metas: HashMap<String, String>,
    selections: HashMap<String, Vec<ElementSnapshot>>,
    images: HashMap<String, Vec<u8>>,
    fail_select: bool,
    fail_body: bool,
    fail_meta: bool,
    fail_title: bool,
}

impl MockDocument {
    /// Create an empty document at a URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the visible body text.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the text of a region selector.
    pub fn with_region(mut self, selector: impl Into<String>, text: impl Into<String>) -> Self {
        self.regions.insert(selector.into(), text.into());
        self
    }

    /// Set a metadata tag.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metas.insert(key.into(), value.into());
        self
    }

    /// Set the elements a selector matches.
    pub fn with_elements(
        mut self,
        selector: impl Into<String>,
        elements: Vec<ElementSnapshot>,
    ) -> Self {
        self.selections.insert(selector.into(), elements);
        self
    }

    /// Set the bytes served for an image URL.
    pub fn with_image(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.images.insert(url.into(), bytes);
        self
    }

    /// Make every selector query fail.
    pub fn with_select_error(mut self) -> Self {
        self.fail_select = true;
        self
    }

    /// Make body and region reads fail.
    pub fn with_body_error(mut self) -> Self {
        self.fail_body = true;
        self
    }

    /// Make metadata reads fail.
    pub fn with_meta_error(mut self) -> Self {
        self.fail_meta = true;
        self
    }

    /// Make title reads fail.
    pub fn with_title_error(mut self) -> Self {
        self.fail_title = true;
        self
    }
}

#[async_trait]
impl Document for MockDocument {
    fn url(&self) -> &str {
        &self.url
    }

    async fn title(&self) -> DocumentResult<Option<String>> {
        if self.fail_title {
            return Err(DocumentError::Unavailable("title read failed".into()));
        }
        Ok(self.title.clone())
    }

    async fn body_text(&self) -> DocumentResult<String> {
        if self.fail_body {
            return Err(DocumentError::Unavailable("body read failed".into()));
        }
        Ok(self.body.clone())
    }

    async fn region_text(&self, selector: &str) -> DocumentResult<Option<String>> {
        if self.fail_body {
            return Err(DocumentError::Unavailable("region read failed".into()));
        }
        Ok(self.regions.get(selector).cloned())
    }

    async fn meta(&self, key: &str) -> DocumentResult<Option<String>> {
        if self.fail_meta {
            return Err(DocumentError::Unavailable("meta read failed".into()));
        }
        Ok(self.metas.get(key).cloned())
    }

    async fn select(&self, selector: &str) -> DocumentResult<Vec<ElementSnapshot>> {
        if self.fail_select {
            return Err(DocumentError::BadSelector(format!(
                "selector query failed: {selector}"
            )));
        }
        Ok(self.selections.get(selector).cloned().unwrap_or_default())
    }

    async fn image_bytes(&self, url: &str) -> DocumentResult<Vec<u8>> {
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| DocumentError::Io(format!("no such image: {url}")))
    }
}

/// A canned text recognizer with call tracking.
///
/// Recognitions are keyed by the exact image bytes; unknown bytes
/// recognize as empty text.
#[derive(Debug, Clone, Default)]
pub struct MockRecognizer {
    recognitions: Arc<RwLock<HashMap<Vec<u8>, Recognition>>>,
    calls: Arc<RwLock<usize>>,
}

impl MockRecognizer {
    /// Create a recognizer that recognizes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add recognized text for an image.
    pub fn with_text(self, image: Vec<u8>, text: impl Into<String>) -> Self {
        self.recognitions
            .write()
            .unwrap()
            .insert(image, Recognition::new(text));
        self
    }

    /// Add a full recognition result for an image.
    pub fn with_recognition(self, image: Vec<u8>, recognition: Recognition) -> Self {
        self.recognitions.write().unwrap().insert(image, recognition);
        self
    }

    /// Number of recognize calls made.
    pub fn call_count(&self) -> usize {
        *self.calls.read().unwrap()
    }
}

#[async_trait]
impl TextRecognizer for MockRecognizer {
    async fn recognize(&self, image: &[u8]) -> RecognizerResult<Recognition> {
        *self.calls.write().unwrap() += 1;
        Ok(self
            .recognitions
            .read()
            .unwrap()
            .get(image)
            .cloned()
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_document_canned_values() {
        let doc = MockDocument::new("https://example.com")
            .with_title("Title")
            .with_body("Body text")
            .with_meta("og:title", "Meta Title")
            .with_elements("h1", vec![ElementSnapshot::new("Heading")]);

        assert_eq!(doc.url(), "https://example.com");
        assert_eq!(doc.title().await.unwrap().as_deref(), Some("Title"));
        assert_eq!(doc.body_text().await.unwrap(), "Body text");
        assert_eq!(
            doc.meta("og:title").await.unwrap().as_deref(),
            Some("Meta Title")
        );
        assert_eq!(doc.select("h1").await.unwrap().len(), 1);
        assert!(doc.select("h2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mock_document_failures() {
        let doc = MockDocument::new("https://example.com")
            .with_select_error()
            .with_body_error();

        assert!(doc.select("h1").await.is_err());
        assert!(doc.body_text().await.is_err());
        assert!(doc.meta("og:title").await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_recognizer_tracking() {
        let recognizer = MockRecognizer::new().with_text(vec![1], "FLYER TEXT");

        let hit = recognizer.recognize(&[1]).await.unwrap();
        let miss = recognizer.recognize(&[2]).await.unwrap();

        assert_eq!(hit.text, "FLYER TEXT");
        assert!(!miss.has_text());
        assert_eq!(recognizer.call_count(), 2);
    }
}
