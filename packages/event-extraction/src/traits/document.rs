//! Document trait for read-only access to a rendered page snapshot.
//!
//! The pipeline never navigates, waits, or renders. A browser-automation
//! collaborator owns the page lifecycle and hands the pipeline an
//! immutable snapshot behind this interface. Layers are pure functions
//! over it, so concurrent layer invocations never contend.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::DocumentResult;

/// A snapshot of one element matched by a structural selector.
///
/// Carries the element's visible text, its attributes, and (for images)
/// intrinsic dimensions as reported by the rendering engine.
#[derive(Debug, Clone, Default)]
pub struct ElementSnapshot {
    /// Visible text content, whitespace-collapsed
    pub text: String,

    /// Attribute name to value
    pub attributes: HashMap<String, String>,

    /// Intrinsic width in pixels, images only
    pub natural_width: Option<u32>,

    /// Intrinsic height in pixels, images only
    pub natural_height: Option<u32>,
}

impl ElementSnapshot {
    /// Create a snapshot with text content only.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Set an attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set intrinsic dimensions.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.natural_width = Some(width);
        self.natural_height = Some(height);
        self
    }

    /// Get an attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Pixel area from intrinsic dimensions, if both are known.
    pub fn area(&self) -> Option<u64> {
        match (self.natural_width, self.natural_height) {
            (Some(w), Some(h)) => Some(w as u64 * h as u64),
            _ => None,
        }
    }
}

/// Read-only interface over a rendered document.
///
/// Implemented by the browser-automation collaborator. Every method may
/// suspend on I/O against the live snapshot; the pipeline wraps each
/// layer invocation in a deadline, so implementations do not need their
/// own timeout handling.
#[async_trait]
pub trait Document: Send + Sync {
    /// The document's canonical URL.
    fn url(&self) -> &str;

    /// The document title, if the page has one.
    async fn title(&self) -> DocumentResult<Option<String>>;

    /// Visible text content of the whole document.
    async fn body_text(&self) -> DocumentResult<String>;

    /// Visible text content of the first element matching `selector`.
    async fn region_text(&self, selector: &str) -> DocumentResult<Option<String>>;

    /// Value of a metadata tag by key.
    ///
    /// Keys cover both `name` and `property` style tags, e.g. `og:title`,
    /// `twitter:image`, `description`.
    async fn meta(&self, key: &str) -> DocumentResult<Option<String>>;

    /// All elements matching a structural selector.
    async fn select(&self, selector: &str) -> DocumentResult<Vec<ElementSnapshot>>;

    /// Raw bytes of an image referenced by the document.
    async fn image_bytes(&self, url: &str) -> DocumentResult<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_snapshot_builder() {
        let el = ElementSnapshot::new("Jazz Night")
            .with_attr("class", "event-title")
            .with_dimensions(640, 480);

        assert_eq!(el.text, "Jazz Night");
        assert_eq!(el.attr("class"), Some("event-title"));
        assert_eq!(el.area(), Some(640 * 480));
    }

    #[test]
    fn test_area_requires_both_dimensions() {
        let mut el = ElementSnapshot::new("img");
        el.natural_width = Some(800);
        assert_eq!(el.area(), None);
    }
}
