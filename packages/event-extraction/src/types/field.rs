//! Field naming, confidence scores, and small value structs.

use serde::{Deserialize, Serialize};

/// A named unit of the output record.
///
/// Serialized names match the downstream record shape (camelCase).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Title,
    Description,
    Venue,
    Address,
    Date,
    EndDate,
    StartTime,
    EndTime,
    Price,
    Free,
    SoldOut,
    Categories,
    Coordinates,
    ImageUrls,
    TicketsLink,
    Phone,
    Email,
    Organizer,
}

impl Field {
    /// All fields, in record order.
    pub const ALL: [Field; 18] = [
        Field::Title,
        Field::Description,
        Field::Venue,
        Field::Address,
        Field::Date,
        Field::EndDate,
        Field::StartTime,
        Field::EndTime,
        Field::Price,
        Field::Free,
        Field::SoldOut,
        Field::Categories,
        Field::Coordinates,
        Field::ImageUrls,
        Field::TicketsLink,
        Field::Phone,
        Field::Email,
        Field::Organizer,
    ];

    /// Wire name of this field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Description => "description",
            Field::Venue => "venue",
            Field::Address => "address",
            Field::Date => "date",
            Field::EndDate => "endDate",
            Field::StartTime => "startTime",
            Field::EndTime => "endTime",
            Field::Price => "price",
            Field::Free => "free",
            Field::SoldOut => "soldOut",
            Field::Categories => "categories",
            Field::Coordinates => "coordinates",
            Field::ImageUrls => "imageUrls",
            Field::TicketsLink => "ticketsLink",
            Field::Phone => "phone",
            Field::Email => "email",
            Field::Organizer => "organizer",
        }
    }

    /// Critical fields carry double weight in the overall score.
    pub fn is_critical(&self) -> bool {
        matches!(self, Field::Title | Field::Date | Field::Address)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A 0 to 100 confidence score.
///
/// Construction clamps out-of-range input, so a stored score is always
/// valid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Confidence(u8);

impl Confidence {
    pub const MIN: Confidence = Confidence(0);
    pub const MAX: Confidence = Confidence(100);

    /// Create a confidence score, clamping to 100.
    pub fn new(value: u8) -> Self {
        Self(value.min(100))
    }

    /// The raw score.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Create from a 0.0 to 1.0 fraction.
    pub fn from_fraction(fraction: f32) -> Self {
        Self((fraction.clamp(0.0, 1.0) * 100.0).round() as u8)
    }

    /// Apply a signed adjustment, clamping to the valid range.
    pub fn adjust(self, delta: i16) -> Self {
        let adjusted = (self.0 as i16 + delta).clamp(0, 100);
        Self(adjusted as u8)
    }

    /// Cap the score at a ceiling.
    pub fn cap(self, ceiling: Confidence) -> Self {
        Self(self.0.min(ceiling.0))
    }

    /// Scale by a 0.0 to 1.0 factor.
    pub fn scale(self, factor: f32) -> Self {
        Self::from_fraction(self.0 as f32 / 100.0 * factor.clamp(0.0, 1.0))
    }
}

impl From<u8> for Confidence {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A value paired with the confidence of the layer that produced it.
///
/// Layers can only report a value together with a score, so a score
/// without a value (or the reverse) cannot be represented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scored<T> {
    pub value: T,
    pub confidence: Confidence,
}

impl<T> Scored<T> {
    /// Pair a value with a confidence score.
    pub fn new(value: T, confidence: impl Into<Confidence>) -> Self {
        Self {
            value,
            confidence: confidence.into(),
        }
    }

    /// Map the value, keeping the score.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Scored<U> {
        Scored {
            value: f(self.value),
            confidence: self.confidence,
        }
    }
}

/// Geographic coordinates of the venue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Organizer or performer details.
///
/// Partial by nature: a page often names the organizer without linking
/// to them, or the reverse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Organizer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Organizer {
    /// Create an organizer with a name only.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            url: None,
        }
    }

    /// Set the URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Check whether any field is populated.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.url.is_none()
    }
}
