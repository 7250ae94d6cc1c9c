//! Extraction session aggregate and the public result type.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::field::{Confidence, Field};
use super::layer::{LayerId, LayerOutput};
use super::record::{EventRecord, MergedRecord, ValidationOutcome};

/// Progress of one extraction session.
///
/// Advances strictly forward; `Done` is reached even when every layer
/// fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Init,
    RunningParallel,
    RunningSequential,
    PreliminaryMerge,
    ConditionalDecision,
    RunningConditional,
    ConditionalSkipped,
    FinalMerge,
    Scoring,
    Validating,
    Done,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Init => "init",
            SessionState::RunningParallel => "running-parallel",
            SessionState::RunningSequential => "running-sequential",
            SessionState::PreliminaryMerge => "preliminary-merge",
            SessionState::ConditionalDecision => "conditional-decision",
            SessionState::RunningConditional => "running-conditional",
            SessionState::ConditionalSkipped => "conditional-skipped",
            SessionState::FinalMerge => "final-merge",
            SessionState::Scoring => "scoring",
            SessionState::Validating => "validating",
            SessionState::Done => "done",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a field's final value was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeStrategy {
    /// Single highest-confidence contributor won
    HighestConfidence,

    /// Entries from all contributors were unioned
    CollectionUnion,

    /// Winner's struct, gaps filled from lower-ranked contributors
    GapFill,
}

/// Transient record of which layers contributed a field's winning value.
///
/// Consumed by the confidence calculator; not persisted beyond the
/// session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeDecision {
    pub field: Field,

    /// Layers whose value matches the merged value, in priority order
    pub winners: Vec<LayerId>,

    pub strategy: MergeStrategy,
}

/// The aggregate for one document's extraction.
///
/// Created at the start of `extract()`, mutated only by the
/// orchestrator as stages complete, terminal once validation finishes.
#[derive(Debug)]
pub struct ExtractionSession {
    pub id: Uuid,
    pub url: String,
    pub state: SessionState,

    /// Collected layer outputs, in execution order
    pub outputs: Vec<LayerOutput>,

    pub merged: MergedRecord,
    pub decisions: Vec<MergeDecision>,
    pub confidence: IndexMap<Field, Confidence>,
    pub overall: Confidence,
    pub validation: ValidationOutcome,
}

impl ExtractionSession {
    /// Start a session for a document URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            state: SessionState::Init,
            outputs: Vec::new(),
            merged: MergedRecord::default(),
            decisions: Vec::new(),
            confidence: IndexMap::new(),
            overall: Confidence::MIN,
            validation: ValidationOutcome::default(),
        }
    }

    /// Advance to the next stage.
    pub fn advance(&mut self, state: SessionState) {
        tracing::debug!(session = %self.id, from = %self.state, to = %state, "session advanced");
        self.state = state;
    }

    /// Record one layer's output.
    pub fn record(&mut self, output: LayerOutput) {
        self.outputs.push(output);
    }

    /// Layers invoked so far, in execution order.
    pub fn layers_used(&self) -> Vec<LayerId> {
        self.outputs.iter().map(|o| o.layer).collect()
    }

    /// Whether every invoked layer failed.
    pub fn all_failed(&self) -> bool {
        !self.outputs.is_empty() && self.outputs.iter().all(|o| o.is_failed())
    }
}

/// The result of one `extract()` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub session_id: Uuid,
    pub url: String,

    /// The validated (or assembled) output record
    pub record: EventRecord,

    /// Final per-field confidence
    pub confidence: IndexMap<Field, Confidence>,

    pub overall_confidence: Confidence,

    /// Layers invoked for this session, in execution order
    pub layers_used: Vec<LayerId>,

    pub validation: ValidationOutcome,
}

impl ExtractionResult {
    /// Confidence for one field, if it was scored.
    pub fn field_confidence(&self, field: Field) -> Option<Confidence> {
        self.confidence.get(&field).copied()
    }

    /// Whether a layer ran during this session.
    pub fn used_layer(&self, layer: LayerId) -> bool {
        self.layers_used.contains(&layer)
    }
}
