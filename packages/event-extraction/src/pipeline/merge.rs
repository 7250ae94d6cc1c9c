//! Field merger: fuse layer outputs into one value per field.
//!
//! Pure and stateless. Scalars take the single highest-confidence
//! contributor, collections union every contributor's entries, and
//! structured objects shallow-merge with lower-ranked contributors
//! filling gaps only. Confidence ties break by layer priority.

use crate::types::{
    Field, LayerId, LayerOutput, MergeDecision, MergeStrategy, MergedRecord, Organizer, Scored,
};

/// Merge all layer outputs into a single record.
///
/// Returns the merged values plus one decision per populated field,
/// recording which layers contributed the winning value. Merging the
/// same outputs twice yields the same result.
pub fn merge(outputs: &[LayerOutput]) -> (MergedRecord, Vec<MergeDecision>) {
    let mut merged = MergedRecord::default();
    let mut decisions = Vec::new();

    let mut decide = |field: Field, winners: Vec<LayerId>, strategy: MergeStrategy| {
        decisions.push(MergeDecision {
            field,
            winners,
            strategy,
        });
    };

    if let Some((value, winners)) = pick_scalar(outputs, |o| o.title.as_ref()) {
        merged.title = Some(value);
        decide(Field::Title, winners, MergeStrategy::HighestConfidence);
    }
    if let Some((value, winners)) = pick_scalar(outputs, |o| o.description.as_ref()) {
        merged.description = Some(value);
        decide(Field::Description, winners, MergeStrategy::HighestConfidence);
    }
    if let Some((value, winners)) = pick_scalar(outputs, |o| o.venue.as_ref()) {
        merged.venue = Some(value);
        decide(Field::Venue, winners, MergeStrategy::HighestConfidence);
    }
    if let Some((value, winners)) = pick_scalar(outputs, |o| o.address.as_ref()) {
        merged.address = Some(value);
        decide(Field::Address, winners, MergeStrategy::HighestConfidence);
    }
    if let Some((value, winners)) = pick_scalar(outputs, |o| o.date.as_ref()) {
        merged.date = Some(value);
        decide(Field::Date, winners, MergeStrategy::HighestConfidence);
    }
    if let Some((value, winners)) = pick_scalar(outputs, |o| o.end_date.as_ref()) {
        merged.end_date = Some(value);
        decide(Field::EndDate, winners, MergeStrategy::HighestConfidence);
    }
    if let Some((value, winners)) = pick_scalar(outputs, |o| o.start_time.as_ref()) {
        merged.start_time = Some(value);
        decide(Field::StartTime, winners, MergeStrategy::HighestConfidence);
    }
    if let Some((value, winners)) = pick_scalar(outputs, |o| o.end_time.as_ref()) {
        merged.end_time = Some(value);
        decide(Field::EndTime, winners, MergeStrategy::HighestConfidence);
    }
    if let Some((value, winners)) = pick_scalar(outputs, |o| o.price.as_ref()) {
        merged.price = Some(value);
        decide(Field::Price, winners, MergeStrategy::HighestConfidence);
    }
    if let Some((value, winners)) = pick_scalar(outputs, |o| o.free.as_ref()) {
        merged.free = Some(value);
        decide(Field::Free, winners, MergeStrategy::HighestConfidence);
    }
    if let Some((value, winners)) = pick_scalar(outputs, |o| o.sold_out.as_ref()) {
        merged.sold_out = Some(value);
        decide(Field::SoldOut, winners, MergeStrategy::HighestConfidence);
    }
    if let Some((value, winners)) = pick_scalar(outputs, |o| o.coordinates.as_ref()) {
        merged.coordinates = Some(value);
        decide(Field::Coordinates, winners, MergeStrategy::HighestConfidence);
    }
    if let Some((value, winners)) = pick_scalar(outputs, |o| o.tickets_link.as_ref()) {
        merged.tickets_link = Some(value);
        decide(Field::TicketsLink, winners, MergeStrategy::HighestConfidence);
    }
    if let Some((value, winners)) = pick_scalar(outputs, |o| o.phone.as_ref()) {
        merged.phone = Some(value);
        decide(Field::Phone, winners, MergeStrategy::HighestConfidence);
    }
    if let Some((value, winners)) = pick_scalar(outputs, |o| o.email.as_ref()) {
        merged.email = Some(value);
        decide(Field::Email, winners, MergeStrategy::HighestConfidence);
    }

    if let Some((value, winners)) = union_collection(outputs, |o| o.categories.as_ref()) {
        merged.categories = Some(value);
        decide(Field::Categories, winners, MergeStrategy::CollectionUnion);
    }
    if let Some((value, winners)) = union_collection(outputs, |o| o.image_urls.as_ref()) {
        merged.image_urls = Some(value);
        decide(Field::ImageUrls, winners, MergeStrategy::CollectionUnion);
    }

    if let Some((value, winners)) = merge_organizer(outputs) {
        merged.organizer = Some(value);
        decide(Field::Organizer, winners, MergeStrategy::GapFill);
    }

    (merged, decisions)
}

/// Contributors for one field, best first.
///
/// Order is confidence descending, then layer priority.
fn ranked_contributions<'a, T, F>(
    outputs: &'a [LayerOutput],
    accessor: F,
) -> Vec<(LayerId, &'a Scored<T>)>
where
    F: Fn(&'a LayerOutput) -> Option<&'a Scored<T>>,
{
    let mut contributions: Vec<(LayerId, &Scored<T>)> = outputs
        .iter()
        .filter_map(|o| accessor(o).map(|s| (o.layer, s)))
        .collect();
    contributions.sort_by(|a, b| {
        b.1.confidence
            .cmp(&a.1.confidence)
            .then(a.0.cmp(&b.0))
    });
    contributions
}

/// Highest-confidence contributor wins; winners lists every layer whose
/// value matches the winning one.
fn pick_scalar<'a, T, F>(outputs: &'a [LayerOutput], accessor: F) -> Option<(T, Vec<LayerId>)>
where
    T: Clone + PartialEq + 'a,
    F: Fn(&'a LayerOutput) -> Option<&'a Scored<T>>,
{
    let contributions = ranked_contributions(outputs, accessor);
    let (_, winner) = contributions.first()?;
    let mut winners: Vec<LayerId> = contributions
        .iter()
        .filter(|(_, s)| s.value == winner.value)
        .map(|(layer, _)| *layer)
        .collect();
    winners.sort();
    Some((winner.value.clone(), winners))
}

/// Union of every contributor's entries, first appearance wins,
/// contributors visited best first.
fn union_collection<'a, F>(
    outputs: &'a [LayerOutput],
    accessor: F,
) -> Option<(Vec<String>, Vec<LayerId>)>
where
    F: Fn(&'a LayerOutput) -> Option<&'a Scored<Vec<String>>>,
{
    let contributions = ranked_contributions(outputs, accessor);
    if contributions.is_empty() {
        return None;
    }

    let mut entries: Vec<String> = Vec::new();
    let mut winners: Vec<LayerId> = Vec::new();
    for (layer, scored) in &contributions {
        for item in &scored.value {
            if !entries.contains(item) {
                entries.push(item.clone());
            }
        }
        winners.push(*layer);
    }
    winners.sort();
    Some((entries, winners))
}

/// Winner's struct, later contributors fill only missing parts.
fn merge_organizer(outputs: &[LayerOutput]) -> Option<(Organizer, Vec<LayerId>)> {
    let contributions = ranked_contributions(outputs, |o| o.organizer.as_ref());
    let (first_layer, winner) = contributions.first()?;

    let mut result = winner.value.clone();
    let mut winners = vec![*first_layer];
    for (layer, scored) in contributions.iter().skip(1) {
        let mut filled = false;
        if result.name.is_none() && scored.value.name.is_some() {
            result.name = scored.value.name.clone();
            filled = true;
        }
        if result.url.is_none() && scored.value.url.is_some() {
            result.url = scored.value.url.clone();
            filled = true;
        }
        // Agreeing contributors count as winners even without a fill
        if filled || organizer_agrees(&scored.value, &result) {
            winners.push(*layer);
        }
    }
    winners.sort();
    winners.dedup();
    Some((result, winners))
}

/// Whether a contributor's partial struct is consistent with the merged
/// one.
fn organizer_agrees(candidate: &Organizer, merged: &Organizer) -> bool {
    let name_ok = match (&candidate.name, &merged.name) {
        (Some(a), Some(b)) => a == b,
        (Some(_), None) => false,
        (None, _) => true,
    };
    let url_ok = match (&candidate.url, &merged.url) {
        (Some(a), Some(b)) => a == b,
        (Some(_), None) => false,
        (None, _) => true,
    };
    name_ok && url_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(layer: LayerId) -> LayerOutput {
        LayerOutput::empty(layer)
    }

    #[test]
    fn test_highest_confidence_wins() {
        let mut a = output(LayerId::StructuredData);
        a.title = Some(Scored::new("Jazz Night".to_string(), 90));
        let mut b = output(LayerId::MetaTags);
        b.title = Some(Scored::new("Jazz Night | Blue Note".to_string(), 85));

        let (merged, decisions) = merge(&[a, b]);

        assert_eq!(merged.title.as_deref(), Some("Jazz Night"));
        let decision = decisions.iter().find(|d| d.field == Field::Title).unwrap();
        assert_eq!(decision.winners, vec![LayerId::StructuredData]);
        assert_eq!(decision.strategy, MergeStrategy::HighestConfidence);
    }

    #[test]
    fn test_tie_breaks_by_layer_priority() {
        let mut a = output(LayerId::Semantic);
        a.venue = Some(Scored::new("Turf Club".to_string(), 70));
        let mut b = output(LayerId::MetaTags);
        b.venue = Some(Scored::new("First Avenue".to_string(), 70));

        // Later in the slice, but higher priority
        let (merged, _) = merge(&[a, b]);
        assert_eq!(merged.venue.as_deref(), Some("First Avenue"));
    }

    #[test]
    fn test_agreeing_layers_are_all_winners() {
        let mut a = output(LayerId::StructuredData);
        a.date = Some(Scored::new("2025-06-01".to_string(), 90));
        let mut b = output(LayerId::TextPatterns);
        b.date = Some(Scored::new("2025-06-01".to_string(), 70));
        let mut c = output(LayerId::ContentAnalysis);
        c.date = Some(Scored::new("2025-08-15".to_string(), 25));

        let (_, decisions) = merge(&[a, b, c]);
        let decision = decisions.iter().find(|d| d.field == Field::Date).unwrap();
        assert_eq!(
            decision.winners,
            vec![LayerId::StructuredData, LayerId::TextPatterns]
        );
    }

    #[test]
    fn test_collection_union_order() {
        let mut a = output(LayerId::MetaTags);
        a.image_urls = Some(Scored::new(
            vec!["https://a.com/1.jpg".to_string(), "https://a.com/2.jpg".to_string()],
            85,
        ));
        let mut b = output(LayerId::StructuredData);
        b.image_urls = Some(Scored::new(
            vec!["https://a.com/2.jpg".to_string(), "https://a.com/3.jpg".to_string()],
            90,
        ));

        let (merged, decisions) = merge(&[a, b]);

        // Higher-confidence contributor's entries appear first
        assert_eq!(
            merged.image_urls.unwrap(),
            vec![
                "https://a.com/2.jpg".to_string(),
                "https://a.com/3.jpg".to_string(),
                "https://a.com/1.jpg".to_string()
            ]
        );
        let decision = decisions
            .iter()
            .find(|d| d.field == Field::ImageUrls)
            .unwrap();
        assert_eq!(decision.strategy, MergeStrategy::CollectionUnion);
        assert_eq!(
            decision.winners,
            vec![LayerId::StructuredData, LayerId::MetaTags]
        );
    }

    #[test]
    fn test_organizer_gap_fill() {
        let mut a = output(LayerId::StructuredData);
        a.organizer = Some(Scored::new(Organizer::named("Blue Note"), 90));
        let mut b = output(LayerId::Semantic);
        b.organizer = Some(Scored::new(
            Organizer {
                name: None,
                url: Some("https://bluenote.com".to_string()),
            },
            60,
        ));

        let (merged, decisions) = merge(&[a, b]);

        let organizer = merged.organizer.unwrap();
        assert_eq!(organizer.name.as_deref(), Some("Blue Note"));
        assert_eq!(organizer.url.as_deref(), Some("https://bluenote.com"));
        let decision = decisions
            .iter()
            .find(|d| d.field == Field::Organizer)
            .unwrap();
        assert_eq!(decision.strategy, MergeStrategy::GapFill);
    }

    #[test]
    fn test_single_layer_passthrough() {
        let mut a = output(LayerId::MetaTags);
        a.title = Some(Scored::new("Solo Show".to_string(), 65));
        a.free = Some(Scored::new(true, 70));

        let (merged, _) = merge(std::slice::from_ref(&a));
        assert_eq!(merged.title.as_deref(), Some("Solo Show"));
        assert_eq!(merged.free, Some(true));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut a = output(LayerId::StructuredData);
        a.title = Some(Scored::new("Jazz Night".to_string(), 90));
        a.image_urls = Some(Scored::new(vec!["https://a.com/1.jpg".to_string()], 90));
        let mut b = output(LayerId::ContentAnalysis);
        b.title = Some(Scored::new("Example Event".to_string(), 30));

        let outputs = vec![a, b];
        let first = merge(&outputs);
        let second = merge(&outputs);
        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
    }

    #[test]
    fn test_absent_fields_stay_absent() {
        let (merged, decisions) = merge(&[output(LayerId::StructuredData)]);
        assert!(merged.is_empty());
        assert!(decisions.is_empty());
    }
}
