//! Layer identity and per-layer output types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::field::{Confidence, Coordinates, Field, Organizer, Scored};

/// Identity of one extraction layer.
///
/// Declaration order is also the merge tie-break priority: when two
/// layers report a field at equal confidence, the earlier layer wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(into = "u8", try_from = "u8")]
pub enum LayerId {
    /// Embedded machine-readable metadata (JSON-LD, microdata, RDFa)
    StructuredData,

    /// Social-sharing and standard document metadata tags
    MetaTags,

    /// Ranked structural selectors with sanity validation
    Semantic,

    /// Regular-expression catalog over visible text
    TextPatterns,

    /// Fallback heuristics and last-resort defaults
    ContentAnalysis,

    /// Conditional text recognition over prominent images
    ImageText,
}

impl LayerId {
    /// All layers, in priority order.
    pub const ALL: [LayerId; 6] = [
        LayerId::StructuredData,
        LayerId::MetaTags,
        LayerId::Semantic,
        LayerId::TextPatterns,
        LayerId::ContentAnalysis,
        LayerId::ImageText,
    ];

    /// Numeric id, 1 through 6.
    pub fn number(self) -> u8 {
        match self {
            LayerId::StructuredData => 1,
            LayerId::MetaTags => 2,
            LayerId::Semantic => 3,
            LayerId::TextPatterns => 4,
            LayerId::ContentAnalysis => 5,
            LayerId::ImageText => 6,
        }
    }

    /// Scoring weight of this layer.
    ///
    /// Image text sits above the heuristic fallback: recognized text is
    /// noisy but still more informative than guessing.
    pub fn weight(self) -> f32 {
        match self {
            LayerId::StructuredData => 1.0,
            LayerId::MetaTags => 0.8,
            LayerId::Semantic => 0.7,
            LayerId::TextPatterns => 0.6,
            LayerId::ContentAnalysis => 0.4,
            LayerId::ImageText => 0.5,
        }
    }

    /// Short name for logging.
    pub fn as_str(self) -> &'static str {
        match self {
            LayerId::StructuredData => "structured-data",
            LayerId::MetaTags => "meta-tags",
            LayerId::Semantic => "semantic",
            LayerId::TextPatterns => "text-patterns",
            LayerId::ContentAnalysis => "content-analysis",
            LayerId::ImageText => "image-text",
        }
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<LayerId> for u8 {
    fn from(id: LayerId) -> u8 {
        id.number()
    }
}

impl TryFrom<u8> for LayerId {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        LayerId::ALL
            .into_iter()
            .find(|id| id.number() == value)
            .ok_or_else(|| format!("unknown layer id: {value}"))
    }
}

/// Why a layer produced no usable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The layer exceeded its deadline
    Timeout,

    /// The layer's own logic raised internally
    Internal,
}

/// Failure marker recorded on a layer's output.
///
/// Non-fatal by contract: a failed layer contributes an empty output and
/// the session continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl LayerFailure {
    /// Deadline expiry.
    pub fn timeout(deadline: Duration) -> Self {
        Self {
            kind: FailureKind::Timeout,
            detail: format!("deadline of {}ms exceeded", deadline.as_millis()),
        }
    }

    /// Internal error caught at the layer boundary.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Internal,
            detail: detail.into(),
        }
    }
}

/// Output of one layer invocation.
///
/// A partial field map: every populated field carries its own confidence
/// through [`Scored`], so a value without a score cannot exist. Created
/// fresh per invocation, immutable once returned, discarded after merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerOutput {
    pub layer: LayerId,

    pub title: Option<Scored<String>>,
    pub description: Option<Scored<String>>,
    pub venue: Option<Scored<String>>,
    pub address: Option<Scored<String>>,
    pub date: Option<Scored<String>>,
    pub end_date: Option<Scored<String>>,
    pub start_time: Option<Scored<String>>,
    pub end_time: Option<Scored<String>>,
    pub price: Option<Scored<f64>>,
    pub free: Option<Scored<bool>>,
    pub sold_out: Option<Scored<bool>>,
    pub categories: Option<Scored<Vec<String>>>,
    pub coordinates: Option<Scored<Coordinates>>,
    pub image_urls: Option<Scored<Vec<String>>>,
    pub tickets_link: Option<Scored<String>>,
    pub phone: Option<Scored<String>>,
    pub email: Option<Scored<String>>,
    pub organizer: Option<Scored<Organizer>>,

    /// Set when the invocation timed out or errored
    pub failure: Option<LayerFailure>,
}

impl LayerOutput {
    /// An output with no fields.
    pub fn empty(layer: LayerId) -> Self {
        Self {
            layer,
            title: None,
            description: None,
            venue: None,
            address: None,
            date: None,
            end_date: None,
            start_time: None,
            end_time: None,
            price: None,
            free: None,
            sold_out: None,
            categories: None,
            coordinates: None,
            image_urls: None,
            tickets_link: None,
            phone: None,
            email: None,
            organizer: None,
            failure: None,
        }
    }

    /// An empty output carrying a failure marker.
    pub fn failed(layer: LayerId, failure: LayerFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::empty(layer)
        }
    }

    /// Whether this invocation failed.
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Whether no field was populated.
    pub fn is_empty(&self) -> bool {
        self.present_fields().is_empty()
    }

    /// Fields populated by this output, with their confidences.
    pub fn field_confidences(&self) -> Vec<(Field, Confidence)> {
        let mut out = Vec::new();
        let mut push = |field: Field, c: Option<Confidence>| {
            if let Some(c) = c {
                out.push((field, c));
            }
        };
        push(Field::Title, self.title.as_ref().map(|s| s.confidence));
        push(
            Field::Description,
            self.description.as_ref().map(|s| s.confidence),
        );
        push(Field::Venue, self.venue.as_ref().map(|s| s.confidence));
        push(Field::Address, self.address.as_ref().map(|s| s.confidence));
        push(Field::Date, self.date.as_ref().map(|s| s.confidence));
        push(Field::EndDate, self.end_date.as_ref().map(|s| s.confidence));
        push(
            Field::StartTime,
            self.start_time.as_ref().map(|s| s.confidence),
        );
        push(Field::EndTime, self.end_time.as_ref().map(|s| s.confidence));
        push(Field::Price, self.price.as_ref().map(|s| s.confidence));
        push(Field::Free, self.free.as_ref().map(|s| s.confidence));
        push(Field::SoldOut, self.sold_out.as_ref().map(|s| s.confidence));
        push(
            Field::Categories,
            self.categories.as_ref().map(|s| s.confidence),
        );
        push(
            Field::Coordinates,
            self.coordinates.as_ref().map(|s| s.confidence),
        );
        push(
            Field::ImageUrls,
            self.image_urls.as_ref().map(|s| s.confidence),
        );
        push(
            Field::TicketsLink,
            self.tickets_link.as_ref().map(|s| s.confidence),
        );
        push(Field::Phone, self.phone.as_ref().map(|s| s.confidence));
        push(Field::Email, self.email.as_ref().map(|s| s.confidence));
        push(
            Field::Organizer,
            self.organizer.as_ref().map(|s| s.confidence),
        );
        out
    }

    /// Fields populated by this output.
    pub fn present_fields(&self) -> Vec<Field> {
        self.field_confidences().into_iter().map(|(f, _)| f).collect()
    }

    /// Confidence this layer reported for one field, if populated.
    pub fn confidence_of(&self, field: Field) -> Option<Confidence> {
        self.field_confidences()
            .into_iter()
            .find(|(f, _)| *f == field)
            .map(|(_, c)| c)
    }
}
