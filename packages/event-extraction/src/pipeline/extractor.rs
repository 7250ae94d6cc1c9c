//! Extraction orchestrator.
//!
//! Drives one session through its states: the metadata layers run in
//! parallel, the structural layers run in a fixed sequence, and the
//! expensive image-text layer runs only when the preliminary confidence
//! says the cheaper layers were not enough. A session always reaches
//! `Done`; layer failures degrade confidence, never the call.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info};

use crate::layers::{
    run_layer, ContentAnalysisLayer, ImageTextLayer, Layer, MetaTagsLayer, SemanticLayer,
    StructuredDataLayer, TextPatternsLayer,
};
use crate::traits::{Document, TextRecognizer};
use crate::types::{ExtractOptions, ExtractionResult, ExtractionSession, LayerId, SessionState};

use super::confidence::{overall, score_fields, LayerWeights};
use super::merge::merge;
use super::validate::{assemble, validate};

/// The pipeline entry point.
///
/// Holds the layer stack and configuration; sessions share no mutable
/// state, so one extractor can serve concurrent `extract` calls.
///
/// # Example
///
/// ```rust,ignore
/// use event_extraction::{Extractor, ExtractOptions, NoopRecognizer};
///
/// let extractor = Extractor::new(NoopRecognizer);
/// let result = extractor.extract(&document).await;
/// println!("{} ({})", result.record.title, result.overall_confidence);
/// ```
pub struct Extractor {
    options: ExtractOptions,
    weights: LayerWeights,

    /// Layers 1 and 2: static metadata readers, safe to run together
    parallel: Vec<Arc<dyn Layer>>,

    /// Layers 3 through 5: structural probes, fixed order
    sequential: Vec<Arc<dyn Layer>>,

    /// Layer 6: runs only below the trigger threshold
    conditional: Option<Arc<dyn Layer>>,
}

impl Extractor {
    /// Create an extractor with default options.
    pub fn new<R: TextRecognizer + 'static>(recognizer: R) -> Self {
        Self::with_options(recognizer, ExtractOptions::default())
    }

    /// Create an extractor with custom options.
    pub fn with_options<R: TextRecognizer + 'static>(
        recognizer: R,
        options: ExtractOptions,
    ) -> Self {
        let recognizer = Arc::new(recognizer);

        let mut parallel: Vec<Arc<dyn Layer>> = Vec::new();
        if options.layer_enabled(LayerId::StructuredData) {
            parallel.push(Arc::new(StructuredDataLayer::new()));
        }
        if options.layer_enabled(LayerId::MetaTags) {
            parallel.push(Arc::new(MetaTagsLayer::new()));
        }

        let mut sequential: Vec<Arc<dyn Layer>> = Vec::new();
        if options.layer_enabled(LayerId::Semantic) {
            sequential.push(Arc::new(SemanticLayer::new()));
        }
        if options.layer_enabled(LayerId::TextPatterns) {
            sequential.push(Arc::new(TextPatternsLayer::new()));
        }
        if options.layer_enabled(LayerId::ContentAnalysis) {
            sequential.push(Arc::new(ContentAnalysisLayer::new(options.reference_time)));
        }

        let conditional: Option<Arc<dyn Layer>> = options
            .layer_enabled(LayerId::ImageText)
            .then(|| {
                Arc::new(ImageTextLayer::new(recognizer, options.max_images)) as Arc<dyn Layer>
            });

        let weights = LayerWeights::with_image_text(options.image_text_weight);

        Self {
            options,
            weights,
            parallel,
            sequential,
            conditional,
        }
    }

    /// The active options.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract an event record from one document.
    ///
    /// Infallible by design: every failure mode inside the pipeline
    /// degrades the result instead of aborting it.
    pub async fn extract(&self, doc: &dyn Document) -> ExtractionResult {
        let mut session = ExtractionSession::new(doc.url());
        let deadline = self.options.layer_timeout;
        info!(session = %session.id, url = %session.url, "extraction started");

        session.advance(SessionState::RunningParallel);
        let outputs = join_all(
            self.parallel
                .iter()
                .map(|layer| run_layer(layer.as_ref(), doc, deadline)),
        )
        .await;
        for output in outputs {
            session.record(output);
        }

        session.advance(SessionState::RunningSequential);
        for layer in &self.sequential {
            let output = run_layer(layer.as_ref(), doc, deadline).await;
            session.record(output);
        }

        session.advance(SessionState::PreliminaryMerge);
        let (preliminary, preliminary_decisions) = merge(&session.outputs);
        let preliminary_scores = score_fields(
            &session.outputs,
            &preliminary,
            &preliminary_decisions,
            &self.weights,
            self.options.now(),
        );
        let preliminary_overall = overall(&preliminary_scores);

        session.advance(SessionState::ConditionalDecision);
        let triggered = preliminary_overall < self.options.trigger_threshold;
        match (&self.conditional, triggered) {
            (Some(layer), true) => {
                debug!(
                    preliminary = %preliminary_overall,
                    threshold = %self.options.trigger_threshold,
                    "image-text layer triggered"
                );
                session.advance(SessionState::RunningConditional);
                let output = run_layer(layer.as_ref(), doc, deadline).await;
                session.record(output);
            }
            _ => {
                debug!(
                    preliminary = %preliminary_overall,
                    threshold = %self.options.trigger_threshold,
                    "image-text layer skipped"
                );
                session.advance(SessionState::ConditionalSkipped);
            }
        }

        session.advance(SessionState::FinalMerge);
        let (merged, decisions) = merge(&session.outputs);
        session.merged = merged;
        session.decisions = decisions;

        session.advance(SessionState::Scoring);
        session.confidence = score_fields(
            &session.outputs,
            &session.merged,
            &session.decisions,
            &self.weights,
            self.options.now(),
        );
        session.overall = overall(&session.confidence);

        session.advance(SessionState::Validating);
        let (record, validation) = if self.options.validate {
            validate(&session.merged, self.options.now())
        } else {
            assemble(&session.merged)
        };
        session.validation = validation;

        session.advance(SessionState::Done);
        if session.all_failed() {
            info!(session = %session.id, "every layer failed, returning defaults");
        }
        info!(
            session = %session.id,
            overall = %session.overall,
            layers = session.outputs.len(),
            "extraction finished"
        );

        ExtractionResult {
            session_id: session.id,
            url: session.url,
            record,
            confidence: session.confidence,
            overall_confidence: session.overall,
            layers_used: session.outputs.iter().map(|o| o.layer).collect(),
            validation: session.validation,
        }
    }
}
