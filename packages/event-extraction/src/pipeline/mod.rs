//! The extraction pipeline: merge, score, validate, orchestrate.

pub mod confidence;
pub mod extractor;
pub mod merge;
pub mod validate;

pub use confidence::{overall, score_fields, LayerWeights};
pub use extractor::Extractor;
pub use merge::merge;
pub use validate::{assemble, validate, CATEGORY_WHITELIST, FALLBACK_CATEGORY};
