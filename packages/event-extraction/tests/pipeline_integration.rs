//! End-to-end pipeline scenarios driven through mock collaborators.

use chrono::{TimeZone, Utc};

use event_extraction::testing::{MockDocument, MockRecognizer};
use event_extraction::{
    ElementSnapshot, ExtractOptions, Extractor, Field, LayerId, NoopRecognizer,
    CATEGORY_WHITELIST,
};

/// Reference time pinned shortly before the fixture events.
fn options() -> ExtractOptions {
    ExtractOptions::new()
        .with_reference_time(Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap())
}

fn jazz_night_doc() -> MockDocument {
    MockDocument::new("https://bluenote.example.com/events/jazz-night").with_elements(
        r#"script[type="application/ld+json"]"#,
        vec![ElementSnapshot::new(
            r#"{
                "@context": "https://schema.org",
                "@type": "Event",
                "name": "Jazz Night",
                "startDate": "2025-06-01T19:00:00",
                "location": {
                    "@type": "Place",
                    "name": "Blue Note",
                    "address": {
                        "streetAddress": "131 W 3rd St",
                        "addressLocality": "New York"
                    }
                }
            }"#,
        )],
    )
}

#[tokio::test]
async fn structured_metadata_document_end_to_end() {
    let extractor = Extractor::with_options(NoopRecognizer, options());
    let result = extractor.extract(&jazz_night_doc()).await;

    assert_eq!(result.record.title, "Jazz Night");
    assert_eq!(result.record.date, "2025-06-01T19:00:00.000Z");
    assert_eq!(result.record.venue, "Blue Note");
    assert_eq!(result.record.address, "131 W 3rd St, New York");
    assert_eq!(result.record.start_time, "19:00:00");

    for field in [Field::Title, Field::Date, Field::Venue, Field::Address] {
        let confidence = result.field_confidence(field).unwrap();
        assert!(
            confidence.get() >= 85,
            "{field} confidence {confidence} below 85"
        );
    }

    // Confidence was high enough that the expensive layer stayed off
    assert!(!result.used_layer(LayerId::ImageText));
    assert_eq!(result.layers_used.len(), 5);
    assert!(result.validation.is_valid);
}

#[tokio::test]
async fn conditional_layer_runs_when_confidence_is_low() {
    let doc = MockDocument::new("https://venue.example.com/tonight")
        .with_elements(
            "img",
            vec![ElementSnapshot::new("")
                .with_attr("src", "/flyers/tonight.png")
                .with_dimensions(800, 1200)],
        )
        .with_image(
            "https://venue.example.com/flyers/tonight.png",
            vec![0xAA, 0xBB],
        );
    let recognizer = MockRecognizer::new().with_text(
        vec![0xAA, 0xBB],
        "WAREHOUSE SESSIONS\nJune 6, 2025\nDoors 9pm show 10pm\n$10",
    );

    let extractor = Extractor::with_options(recognizer, options());
    let result = extractor.extract(&doc).await;

    assert!(result.used_layer(LayerId::ImageText));
    assert_eq!(result.layers_used.len(), 6);

    // Flyer text outranks the heuristic defaults
    assert_eq!(result.record.date, "2025-06-06");
    assert_eq!(result.record.start_time, "22:00:00");
    assert!(!result.record.free);
    assert!(result.validation.is_valid);
}

#[tokio::test]
async fn conditional_layer_skipped_when_confidence_is_high() {
    let recognizer = MockRecognizer::new();
    let extractor = Extractor::with_options(recognizer.clone(), options());

    let result = extractor.extract(&jazz_night_doc()).await;

    assert!(!result.used_layer(LayerId::ImageText));
    assert_eq!(recognizer.call_count(), 0);
    assert!(result.overall_confidence >= extractor.options().trigger_threshold);
}

#[tokio::test]
async fn categories_are_whitelisted_and_capped() {
    let doc = MockDocument::new("https://venue.example.com/show").with_elements(
        r#"script[type="application/ld+json"]"#,
        vec![ElementSnapshot::new(
            r#"{
                "@type": "MusicEvent",
                "name": "Friday Night Beats",
                "startDate": "2025-06-13T21:00:00",
                "keywords": ["Hip Hop", "Concert", "Live Performance"]
            }"#,
        )],
    );

    let extractor = Extractor::with_options(NoopRecognizer, options());
    let result = extractor.extract(&doc).await;

    assert_eq!(result.record.categories, vec!["Music".to_string()]);
    assert!(result
        .validation
        .warnings
        .iter()
        .any(|w| w.contains("Hip Hop")));
    assert!((1..=2).contains(&result.record.categories.len()));
    for category in &result.record.categories {
        assert!(CATEGORY_WHITELIST.contains(&category.as_str()));
    }
}

#[tokio::test]
async fn address_always_contains_a_comma() {
    let doc = MockDocument::new("https://venue.example.com/show").with_elements(
        r#"[class*="event-address"]"#,
        vec![ElementSnapshot::new("123 Main St Austin TX")],
    );

    let extractor = Extractor::with_options(NoopRecognizer, options());
    let result = extractor.extract(&doc).await;

    assert_eq!(result.record.address, "123 Main St, Austin TX");
    assert!(result.validation.is_valid);
}

#[tokio::test]
async fn partial_layer_failure_still_produces_valid_record() {
    // Selector and body reads fail: the structured-data, semantic, and
    // text-pattern layers all error out. Metadata and the heuristic
    // fallback carry the session.
    let doc = MockDocument::new("https://venue.example.com/show")
        .with_select_error()
        .with_body_error()
        .with_meta("og:title", "Rooftop Social")
        .with_meta("og:description", "Drinks and music above the skyline");

    let extractor = Extractor::with_options(NoopRecognizer, options());
    let result = extractor.extract(&doc).await;

    assert!(result.validation.is_valid);
    assert_eq!(result.record.title, "Rooftop Social");
    assert!(result.record.address.contains(','));
    // All six layers were attempted; failures never abort the session
    assert_eq!(result.layers_used.len(), 6);
}

#[tokio::test]
async fn every_layer_failing_still_reaches_done() {
    let doc = MockDocument::new("https://venue.example.com/show")
        .with_select_error()
        .with_body_error()
        .with_meta_error()
        .with_title_error();

    let extractor = Extractor::with_options(NoopRecognizer, options());
    let result = extractor.extract(&doc).await;

    // The fallback layer tolerates document errors, so even here the
    // record is well-formed with globally low confidence
    assert!(result.validation.is_valid);
    assert!(!result.record.title.is_empty());
    assert!(result.record.address.contains(','));
    assert!(result.overall_confidence.get() < 50);
}

#[tokio::test]
async fn confidence_reflects_agreement_not_attempts() {
    // Metadata and the heading selector agree on the title; the
    // document title would disagree but loses the merge
    let doc = MockDocument::new("https://venue.example.com/show")
        .with_meta("og:title", "Harvest Festival")
        .with_elements("h1", vec![ElementSnapshot::new("Harvest Festival")])
        .with_title("Harvest Festival 2025 Tickets | TicketCo");

    let extractor = Extractor::with_options(NoopRecognizer, options());
    let result = extractor.extract(&doc).await;

    assert_eq!(result.record.title, "Harvest Festival");

    // Three layers agree: og:title at 85 (weight 0.8), bare h1 at 45
    // (weight 0.7), and the heading heuristic at 65 (weight 0.4):
    // (85*0.8 + 45*0.7 + 65*0.4) / 1.9 = 66.05, rounded. The suffixed
    // document title never surfaces, so it contributes nothing
    assert_eq!(result.field_confidence(Field::Title).unwrap().get(), 66);
}

#[tokio::test]
async fn record_serializes_with_wire_field_names() {
    let extractor = Extractor::with_options(NoopRecognizer, options());
    let result = extractor.extract(&jazz_night_doc()).await;

    let json = serde_json::to_value(&result).unwrap();
    assert!(json["record"]["startTime"].is_string());
    assert_eq!(json["record"]["soldOut"], false);
    assert!(json["layersUsed"].as_array().unwrap().iter().all(|v| v.is_u64()));
    assert!(json["confidence"]["title"].is_u64());
}
