//! Pipeline data types.

pub mod field;
pub mod layer;
pub mod options;
pub mod record;
pub mod session;

pub use field::{Confidence, Coordinates, Field, Organizer, Scored};
pub use layer::{FailureKind, LayerFailure, LayerId, LayerOutput};
pub use options::ExtractOptions;
pub use record::{EventRecord, MergedRecord, ValidationOutcome};
pub use session::{
    ExtractionResult, ExtractionSession, MergeDecision, MergeStrategy, SessionState,
};
