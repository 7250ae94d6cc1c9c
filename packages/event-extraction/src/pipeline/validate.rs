//! Business-rule validator for the merged record.
//!
//! The downstream store requires every record to carry a non-empty
//! title, description, venue, and address, a comma in the address, and
//! one or two whitelisted categories. Violations are repaired with
//! defaults and surfaced as warnings; nothing here ever throws.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::layers::content_analysis::near_future_default;
use crate::types::{EventRecord, MergedRecord, ValidationOutcome};

/// Placeholder values for required fields.
const DEFAULT_TITLE: &str = "Untitled Event";
const DEFAULT_DESCRIPTION: &str = "No description available";
const DEFAULT_VENUE: &str = "Venue TBD";
const DEFAULT_ADDRESS: &str = "Address TBD, City TBD";
const DEFAULT_LOCALITY: &str = "City TBD";

/// The fixed category whitelist the downstream consumer accepts.
pub const CATEGORY_WHITELIST: &[&str] = &[
    "Music",
    "Nightlife",
    "Arts & Culture",
    "Food & Drink",
    "Sports & Fitness",
    "Community",
    "Comedy",
    "Film",
    "Family",
    "Business",
    "Education",
    "Other",
];

/// Category the record falls back to when nothing scores.
pub const FALLBACK_CATEGORY: &str = "Other";

/// Keyword sets used to map free-text categories onto the whitelist.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Music",
        &[
            "music", "concert", "band", "dj", "hip hop", "hip-hop", "rap", "jazz", "rock",
            "punk", "edm", "techno", "orchestra", "choir", "singer", "album", "tour",
            "live performance", "open mic", "karaoke", "symphony", "acoustic", "vinyl",
        ],
    ),
    (
        "Nightlife",
        &[
            "nightlife", "club night", "bar crawl", "party", "rave", "dance party", "21+",
            "cocktail", "happy hour", "lounge", "after hours",
        ],
    ),
    (
        "Arts & Culture",
        &[
            "art", "gallery", "exhibit", "museum", "theater", "theatre", "opera", "ballet",
            "poetry", "culture", "craft", "painting", "sculpture", "literary", "dance recital",
        ],
    ),
    (
        "Food & Drink",
        &[
            "food", "drink", "beer", "wine", "brunch", "dinner", "tasting", "brewery",
            "restaurant", "cooking", "chef", "bbq", "coffee", "cocktails", "potluck",
        ],
    ),
    (
        "Sports & Fitness",
        &[
            "sport", "game night", "match", "5k", "marathon", "yoga", "fitness", "race",
            "tournament", "basketball", "soccer", "football", "hockey", "climb", "bike",
        ],
    ),
    (
        "Community",
        &[
            "community", "volunteer", "neighborhood", "fundraiser", "charity", "meetup",
            "market", "fair", "parade", "cleanup", "social", "block party", "town hall",
        ],
    ),
    (
        "Comedy",
        &["comedy", "stand-up", "standup", "improv", "comedian", "roast"],
    ),
    (
        "Film",
        &["film", "movie", "screening", "cinema", "documentary", "premiere", "matinee"],
    ),
    (
        "Family",
        &["family", "kids", "children", "all ages", "storytime", "petting zoo"],
    ),
    (
        "Business",
        &[
            "business", "networking", "conference", "summit", "startup", "expo", "career",
            "pitch",
        ],
    ),
    (
        "Education",
        &[
            "education", "class", "lecture", "seminar", "course", "workshop", "lesson",
            "talk", "book club",
        ],
    ),
];

/// Apply the business rules to a merged record.
///
/// Always produces a well-formed record; findings land in the outcome.
pub fn validate(merged: &MergedRecord, now: DateTime<Utc>) -> (EventRecord, ValidationOutcome) {
    let mut outcome = ValidationOutcome::valid();

    let title = required_string(merged.title.as_deref(), DEFAULT_TITLE, "title", &mut outcome);
    let description = required_string(
        merged.description.as_deref(),
        DEFAULT_DESCRIPTION,
        "description",
        &mut outcome,
    );
    let venue = required_string(merged.venue.as_deref(), DEFAULT_VENUE, "venue", &mut outcome);

    let address = match merged.address.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => {
            let (fixed, changed) = ensure_comma(raw);
            if changed {
                outcome.warn(format!("address reformatted to \"{fixed}\""));
            }
            fixed
        }
        _ => {
            outcome.warn(format!("address missing, defaulted to \"{DEFAULT_ADDRESS}\""));
            DEFAULT_ADDRESS.to_string()
        }
    };

    let (default_date, default_time) = near_future_default(now);
    let date = match merged.date.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => raw.to_string(),
        _ => {
            outcome.warn("date missing, defaulted to a near-future evening");
            default_date
        }
    };
    let start_time = match merged.start_time.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => raw.to_string(),
        _ => default_time,
    };

    let raw_categories = merged.categories.clone().unwrap_or_default();
    let (categories, filtered) =
        map_categories(&raw_categories, &title, &description, &venue);
    if !filtered.is_empty() {
        outcome.warn(format!("categories filtered: {}", filtered.join(", ")));
    }
    if categories == [FALLBACK_CATEGORY] && raw_categories.is_empty() {
        outcome.warn(format!("no category matched, defaulted to {FALLBACK_CATEGORY}"));
    }

    let image_urls = merged.image_urls.clone().unwrap_or_default();
    let image_url = image_urls.first().cloned();

    let record = EventRecord {
        title,
        description,
        venue,
        address,
        date,
        start_time,
        end_time: merged.end_time.clone(),
        categories,
        free: merged.free.unwrap_or(false),
        sold_out: merged.sold_out.unwrap_or(false),
        hidden: false,
        image_url,
        image_urls,
        tickets_link: merged.tickets_link.clone(),
        phone: merged.phone.clone(),
        email: merged.email.clone(),
        coordinates: merged.coordinates,
        organizer: merged.organizer.clone(),
    };

    // The defaults above make these unreachable; surfaced rather than
    // asserted if a future rule regresses
    if record.title.is_empty() {
        outcome.fail("title empty after defaults");
    }
    if record.address.is_empty() || !record.address.contains(',') {
        outcome.fail("address malformed after defaults");
    }

    debug!(
        warnings = outcome.warnings.len(),
        valid = outcome.is_valid,
        "validation complete"
    );
    (record, outcome)
}

/// Assemble a record without applying the business rules.
///
/// Used when validation is disabled. Required fields that are absent
/// stay empty and are reported as errors, not repaired.
pub fn assemble(merged: &MergedRecord) -> (EventRecord, ValidationOutcome) {
    let mut outcome = ValidationOutcome::valid();
    for (name, present) in [
        ("title", merged.title.is_some()),
        ("description", merged.description.is_some()),
        ("venue", merged.venue.is_some()),
        ("address", merged.address.is_some()),
        ("date", merged.date.is_some()),
    ] {
        if !present {
            outcome.fail(format!("{name} missing"));
        }
    }

    let image_urls = merged.image_urls.clone().unwrap_or_default();
    let image_url = image_urls.first().cloned();
    let record = EventRecord {
        title: merged.title.clone().unwrap_or_default(),
        description: merged.description.clone().unwrap_or_default(),
        venue: merged.venue.clone().unwrap_or_default(),
        address: merged.address.clone().unwrap_or_default(),
        date: merged.date.clone().unwrap_or_default(),
        start_time: merged.start_time.clone().unwrap_or_default(),
        end_time: merged.end_time.clone(),
        categories: merged.categories.clone().unwrap_or_default(),
        free: merged.free.unwrap_or(false),
        sold_out: merged.sold_out.unwrap_or(false),
        hidden: false,
        image_url,
        image_urls,
        tickets_link: merged.tickets_link.clone(),
        phone: merged.phone.clone(),
        email: merged.email.clone(),
        coordinates: merged.coordinates,
        organizer: merged.organizer.clone(),
    };
    (record, outcome)
}

fn required_string(
    value: Option<&str>,
    default: &str,
    name: &str,
    outcome: &mut ValidationOutcome,
) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => {
            outcome.warn(format!("{name} missing, defaulted to \"{default}\""));
            default.to_string()
        }
    }
}

/// Guarantee a comma in the address.
///
/// Splits after the last street-suffix token when one exists, otherwise
/// bisects the token sequence with the street half rounded up. A
/// single-token address gets a placeholder locality instead.
fn ensure_comma(address: &str) -> (String, bool) {
    if address.contains(',') {
        return (address.to_string(), false);
    }

    let tokens: Vec<&str> = address.split_whitespace().collect();
    if tokens.len() < 2 {
        return (format!("{address}, {DEFAULT_LOCALITY}"), true);
    }

    const STREET_SUFFIXES: &[&str] = &[
        "st", "street", "ave", "avenue", "blvd", "boulevard", "rd", "road", "dr", "drive",
        "ln", "lane", "way", "pl", "place", "ct", "court", "pkwy", "parkway",
    ];

    let cut = tokens
        .iter()
        .enumerate()
        .rev()
        .find(|(i, token)| {
            let bare = token.trim_end_matches('.').to_lowercase();
            // A suffix as the final token leaves nothing for the
            // locality half
            i + 1 < tokens.len() && STREET_SUFFIXES.contains(&bare.as_str())
        })
        .map(|(i, _)| i + 1)
        .unwrap_or_else(|| tokens.len().div_ceil(2));

    (
        format!("{}, {}", tokens[..cut].join(" "), tokens[cut..].join(" ")),
        true,
    )
}

/// Map free-text categories onto the whitelist.
///
/// Direct whitelist matches are kept first; the remaining slots are
/// filled by keyword scoring over the record's text. Returns the kept
/// categories (1 to 2 of them) plus the raw entries that were filtered
/// out.
fn map_categories(
    raw: &[String],
    title: &str,
    description: &str,
    venue: &str,
) -> (Vec<String>, Vec<String>) {
    let mut kept: Vec<String> = Vec::new();
    let mut filtered: Vec<String> = Vec::new();

    for entry in raw {
        let direct = CATEGORY_WHITELIST
            .iter()
            .find(|c| c.eq_ignore_ascii_case(entry.trim()));
        match direct {
            Some(c) if kept.len() < 2 && !kept.iter().any(|k| k == c) => {
                kept.push(c.to_string());
            }
            Some(_) => {}
            None => filtered.push(entry.clone()),
        }
    }

    if kept.len() < 2 {
        let text = format!("{title} {description} {venue} {}", raw.join(" ")).to_lowercase();
        let mut scored: Vec<(&str, usize)> = CATEGORY_KEYWORDS
            .iter()
            .map(|(category, keywords)| {
                let score = keywords.iter().filter(|k| text.contains(*k)).count();
                (*category, score)
            })
            .filter(|(category, score)| *score > 0 && !kept.iter().any(|k| k == category))
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        for (category, _) in scored {
            if kept.len() >= 2 {
                break;
            }
            kept.push(category.to_string());
        }
    }

    if kept.is_empty() {
        kept.push(FALLBACK_CATEGORY.to_string());
    }

    (kept, filtered)
}
