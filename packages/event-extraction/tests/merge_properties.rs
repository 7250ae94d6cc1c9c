//! Property tests for the merge and validation invariants.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use event_extraction::{
    merge, validate, LayerId, LayerOutput, MergedRecord, Scored, CATEGORY_WHITELIST,
};

fn arb_scored_text() -> impl Strategy<Value = Option<Scored<String>>> {
    proptest::option::of(
        ("[A-Za-z0-9 ]{1,40}", 0u8..=100u8).prop_map(|(text, conf)| Scored::new(text, conf)),
    )
}

fn arb_output() -> impl Strategy<Value = LayerOutput> {
    (
        0usize..LayerId::ALL.len(),
        arb_scored_text(),
        arb_scored_text(),
        proptest::option::of((proptest::bool::ANY, 0u8..=100u8)),
    )
        .prop_map(|(layer_idx, title, venue, free)| {
            let mut output = LayerOutput::empty(LayerId::ALL[layer_idx]);
            output.title = title;
            output.venue = venue;
            output.free = free.map(|(value, conf)| Scored::new(value, conf));
            output
        })
}

proptest! {
    #[test]
    fn merge_is_idempotent(outputs in proptest::collection::vec(arb_output(), 0..6)) {
        let first = merge(&outputs);
        let second = merge(&outputs);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn single_layer_merge_is_passthrough(output in arb_output()) {
        let expected_title = output.title.as_ref().map(|s| s.value.clone());
        let expected_venue = output.venue.as_ref().map(|s| s.value.clone());

        let (merged, _) = merge(std::slice::from_ref(&output));

        prop_assert_eq!(merged.title, expected_title);
        prop_assert_eq!(merged.venue, expected_venue);
    }

    #[test]
    fn merged_fields_come_from_some_layer(outputs in proptest::collection::vec(arb_output(), 0..6)) {
        let (merged, _) = merge(&outputs);
        if let Some(title) = &merged.title {
            prop_assert!(outputs
                .iter()
                .any(|o| o.title.as_ref().is_some_and(|s| &s.value == title)));
        }
        if let Some(venue) = &merged.venue {
            prop_assert!(outputs
                .iter()
                .any(|o| o.venue.as_ref().is_some_and(|s| &s.value == venue)));
        }
    }

    #[test]
    fn validated_address_always_contains_comma(address in proptest::option::of("[A-Za-z0-9 ]{0,60}")) {
        let merged = MergedRecord {
            address,
            ..Default::default()
        };
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();

        let (record, _) = validate(&merged, now);
        prop_assert!(record.address.contains(','));
    }

    #[test]
    fn validated_categories_are_capped_and_whitelisted(
        raw in proptest::collection::vec("[A-Za-z ]{1,20}", 0..6),
        title in "[A-Za-z ]{0,60}",
    ) {
        let merged = MergedRecord {
            title: Some(title),
            categories: Some(raw),
            ..Default::default()
        };
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();

        let (record, _) = validate(&merged, now);
        prop_assert!((1..=2).contains(&record.categories.len()));
        for category in &record.categories {
            prop_assert!(CATEGORY_WHITELIST.contains(&category.as_str()));
        }
    }

    #[test]
    fn validated_required_fields_never_empty(
        title in proptest::option::of("[A-Za-z ]{0,30}"),
        venue in proptest::option::of("[A-Za-z ]{0,30}"),
    ) {
        let merged = MergedRecord {
            title,
            venue,
            ..Default::default()
        };
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();

        let (record, outcome) = validate(&merged, now);
        prop_assert!(!record.title.is_empty());
        prop_assert!(!record.description.is_empty());
        prop_assert!(!record.venue.is_empty());
        prop_assert!(!record.address.is_empty());
        prop_assert!(!record.date.is_empty());
        prop_assert!(outcome.is_valid);
    }
}
