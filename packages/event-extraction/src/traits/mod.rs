//! Collaborator trait abstractions.
//!
//! The pipeline consumes external services through two narrow interfaces:
//!
//! - [`document::Document`] - read-only access to a rendered document
//!   snapshot (text, metadata tags, structural selectors, image bytes)
//! - [`recognizer::TextRecognizer`] - optical text recognition over image
//!   bytes, used only by the conditional layer
//!
//! Navigation, rendering, waiting, storage, and network policy all live
//! behind these seams and are not this crate's concern.

pub mod document;
pub mod recognizer;

pub use document::{Document, ElementSnapshot};
pub use recognizer::{NoopRecognizer, Recognition, TextRecognizer};
