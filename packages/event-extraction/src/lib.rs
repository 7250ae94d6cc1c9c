//! Confidence-Weighted Multi-Layer Event Extraction
//!
//! Extracts structured event records (title, date, venue, address,
//! price, images, categories) from arbitrary web documents where no
//! single data source on the page is reliable or complete.
//!
//! # Design Philosophy
//!
//! **"Every layer is a witness, none is an oracle"**
//!
//! - Six independent strategies read the same document and report
//!   per-field confidence
//! - A pure merger fuses their answers; confidence reflects agreement,
//!   not attempts
//! - The expensive image-text strategy runs only when the cheap ones
//!   fall short
//! - Layer failure degrades confidence, never the call
//!
//! # Usage
//!
//! ```rust,ignore
//! use event_extraction::{ExtractOptions, Extractor, NoopRecognizer};
//!
//! // Wire in your browser-automation Document and an OCR backend
//! let extractor = Extractor::with_options(
//!     my_recognizer,
//!     ExtractOptions::new().with_trigger_threshold(70),
//! );
//!
//! let result = extractor.extract(&document).await;
//! println!("{} @ {}", result.record.title, result.record.venue);
//! println!("overall confidence: {}", result.overall_confidence);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator abstractions (Document, TextRecognizer)
//! - [`types`] - Field, layer, session, and record types
//! - [`layers`] - The six extraction strategies
//! - [`pipeline`] - Merger, confidence model, validator, orchestrator
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod layers;
pub mod pipeline;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{DocumentError, LayerError, RecognizerError};
pub use traits::{
    document::{Document, ElementSnapshot},
    recognizer::{NoopRecognizer, Recognition, TextRecognizer},
};
pub use types::{
    field::{Confidence, Coordinates, Field, Organizer, Scored},
    layer::{FailureKind, LayerFailure, LayerId, LayerOutput},
    options::ExtractOptions,
    record::{EventRecord, MergedRecord, ValidationOutcome},
    session::{ExtractionResult, ExtractionSession, MergeDecision, MergeStrategy, SessionState},
};

// Re-export the orchestrator and the pure pipeline stages
pub use pipeline::{
    merge, overall, score_fields, validate, Extractor, LayerWeights, CATEGORY_WHITELIST,
    FALLBACK_CATEGORY,
};

// Re-export the layer implementations
pub use layers::{
    run_layer, ContentAnalysisLayer, ImageTextLayer, Layer, MetaTagsLayer, SemanticLayer,
    StructuredDataLayer, TextPatternsLayer,
};

// Re-export testing utilities
pub use testing::{MockDocument, MockRecognizer};
