//! Extraction layers.
//!
//! Each layer is one independent strategy that reads the same document
//! snapshot with a different technique and reports a partial field map
//! with per-field confidence. Layers are stateless and side-effect-free;
//! [`run_layer`] guarantees that neither a timeout nor an internal error
//! escapes a layer's boundary.

pub mod content_analysis;
pub mod image_text;
pub mod meta_tags;
pub mod semantic;
pub mod structured_data;
pub mod text_patterns;

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::LayerResult;
use crate::traits::Document;
use crate::types::{LayerFailure, LayerId, LayerOutput};

pub use content_analysis::ContentAnalysisLayer;
pub use image_text::ImageTextLayer;
pub use meta_tags::MetaTagsLayer;
pub use semantic::SemanticLayer;
pub use structured_data::StructuredDataLayer;
pub use text_patterns::TextPatternsLayer;

/// One extraction strategy.
///
/// The uniform signature keeps orchestration independent of any single
/// layer: adding or reordering layers never touches the scheduler.
#[async_trait]
pub trait Layer: Send + Sync {
    /// This layer's identity.
    fn id(&self) -> LayerId;

    /// Read the document and report a partial field map.
    ///
    /// May return `Err` for internal failures; the runner converts those
    /// into an empty output with a failure marker.
    async fn extract(&self, doc: &dyn Document) -> LayerResult<LayerOutput>;
}

/// Run one layer under a deadline, absorbing failure.
///
/// Timeout or internal error yields an empty output with a failure
/// marker; the session always continues.
pub async fn run_layer(layer: &dyn Layer, doc: &dyn Document, deadline: Duration) -> LayerOutput {
    let id = layer.id();
    match tokio::time::timeout(deadline, layer.extract(doc)).await {
        Ok(Ok(output)) => {
            debug!(
                layer = %id,
                fields = output.present_fields().len(),
                "layer completed"
            );
            output
        }
        Ok(Err(e)) => {
            warn!(layer = %id, error = %e, "layer failed");
            LayerOutput::failed(id, LayerFailure::internal(e.to_string()))
        }
        Err(_) => {
            warn!(layer = %id, deadline_ms = deadline.as_millis() as u64, "layer timed out");
            LayerOutput::failed(id, LayerFailure::timeout(deadline))
        }
    }
}
