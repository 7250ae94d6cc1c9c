//! Merged and validated record types.

use serde::{Deserialize, Serialize};

use super::field::{Coordinates, Field, Organizer};

/// The merged field values for one document, before business-rule
/// validation.
///
/// Every field is optional: a field is present here only if at least one
/// layer reported it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub title: Option<String>,
    pub description: Option<String>,
    pub venue: Option<String>,
    pub address: Option<String>,
    pub date: Option<String>,
    pub end_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub price: Option<f64>,
    pub free: Option<bool>,
    pub sold_out: Option<bool>,
    pub categories: Option<Vec<String>>,
    pub coordinates: Option<Coordinates>,
    pub image_urls: Option<Vec<String>>,
    pub tickets_link: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub organizer: Option<Organizer>,
}

impl MergedRecord {
    /// Fields populated in this record.
    pub fn present_fields(&self) -> Vec<Field> {
        let mut out = Vec::new();
        let mut push = |field: Field, present: bool| {
            if present {
                out.push(field);
            }
        };
        push(Field::Title, self.title.is_some());
        push(Field::Description, self.description.is_some());
        push(Field::Venue, self.venue.is_some());
        push(Field::Address, self.address.is_some());
        push(Field::Date, self.date.is_some());
        push(Field::EndDate, self.end_date.is_some());
        push(Field::StartTime, self.start_time.is_some());
        push(Field::EndTime, self.end_time.is_some());
        push(Field::Price, self.price.is_some());
        push(Field::Free, self.free.is_some());
        push(Field::SoldOut, self.sold_out.is_some());
        push(Field::Categories, self.categories.is_some());
        push(Field::Coordinates, self.coordinates.is_some());
        push(Field::ImageUrls, self.image_urls.is_some());
        push(Field::TicketsLink, self.tickets_link.is_some());
        push(Field::Phone, self.phone.is_some());
        push(Field::Email, self.email.is_some());
        push(Field::Organizer, self.organizer.is_some());
        out
    }

    /// Whether no layer reported anything.
    pub fn is_empty(&self) -> bool {
        self.present_fields().is_empty()
    }
}

/// The validated output record consumed by the storage collaborator.
///
/// Required string fields are never empty and `address` always contains
/// a comma; the validator guarantees both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub title: String,
    pub description: String,
    pub venue: String,
    pub address: String,

    /// ISO-8601 date or datetime
    pub date: String,

    /// "HH:MM:SS"
    pub start_time: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,

    /// 1 to 2 entries, all from the category whitelist
    pub categories: Vec<String>,

    pub free: bool,
    pub sold_out: bool,
    pub hidden: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    pub image_urls: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tickets_link: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizer: Option<Organizer>,
}

/// Outcome of business-rule validation.
///
/// A violation is surfaced here, never thrown: a degraded record is
/// still returned to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationOutcome {
    /// A passing outcome with no findings.
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Record a warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Record an error and mark the outcome invalid.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.is_valid = false;
    }
}
