/*!
 * Tests for mapping service responses back onto requested slots
 */

use std::collections::BTreeSet;

use deckglot::deck::ContainerKind;
use deckglot::translation::SlotId;
use deckglot::translation::mapper::{TranslationResponse, TranslationResponseMapper};
use deckglot::translation::unit::{Segment, TranslationRequest};

fn request(slots: &[SlotId]) -> TranslationRequest {
    TranslationRequest {
        context_summary: String::new(),
        terminology: Vec::new(),
        source_language: "en".to_string(),
        target_language: "es".to_string(),
        segments: slots
            .iter()
            .map(|slot| Segment {
                slot_id: *slot,
                source_text: format!("source {}", slot),
                style_hint: None,
            })
            .collect(),
    }
}

fn slots() -> Vec<SlotId> {
    vec![
        SlotId::new(ContainerKind::TextFrame, 0, 0),
        SlotId::new(ContainerKind::TextFrame, 0, 1),
        SlotId::new(ContainerKind::TableCell, 2, 0),
        SlotId::new(ContainerKind::Notes, 0, 0),
    ]
}

/// Every requested slot ends up either mapped or missing, never both
fn assert_bijection(request: &TranslationRequest, response: &TranslationResponse) -> (usize, usize) {
    let outcome = TranslationResponseMapper::map(request, response);
    let mapped: BTreeSet<SlotId> = outcome.mapped.keys().copied().collect();
    let missing: BTreeSet<SlotId> = outcome.missing.iter().copied().collect();
    let requested: BTreeSet<SlotId> = request.slot_ids().into_iter().collect();

    assert!(mapped.is_disjoint(&missing));
    assert_eq!(mapped.union(&missing).copied().collect::<BTreeSet<_>>(), requested);
    assert_eq!(missing.len(), outcome.missing.len());
    (mapped.len(), missing.len())
}

#[test]
fn test_map_withCompleteShuffledResponse_shouldMapEverySlot() {
    let request = request(&slots());
    let response = TranslationResponse::from_pairs(slots().iter().rev().map(|s| (s.to_string(), format!("t {}", s))));
    assert_eq!(assert_bijection(&request, &response), (4, 0));
}

#[test]
fn test_map_withPartialNoisyResponse_shouldKeepBijection() {
    let request = request(&slots());
    let response = TranslationResponse::from_pairs(vec![
        ("T0.P0", "uno"),
        ("T0.P0", "otra vez"),
        ("C2.P0", "tres"),
        ("T9.P9", "fantasma"),
        ("garbage", "basura"),
    ]);
    // T0.P0 is duplicated and distrusted; T0.P1 and N0.P0 are missing
    assert_eq!(assert_bijection(&request, &response), (1, 3));

    let outcome = TranslationResponseMapper::map(&request, &response);
    assert_eq!(outcome.errors.len(), 5);
    assert_eq!(outcome.mapped[&SlotId::new(ContainerKind::TableCell, 2, 0)].text, "tres");
}

#[test]
fn test_map_withEmptyResponse_shouldMarkAllMissing() {
    let request = request(&slots());
    assert_eq!(assert_bijection(&request, &TranslationResponse::default()), (0, 4));
}

#[test]
fn test_map_withAnchorTags_shouldStripThemFromText() {
    let slot = SlotId::new(ContainerKind::TextFrame, 0, 0);
    let request = request(&[slot]);
    let response = TranslationResponse::from_pairs(vec![("T0.P0", "Los <s0>ingresos</s0> crecieron")]);

    let outcome = TranslationResponseMapper::map(&request, &response);
    let mapped = &outcome.mapped[&slot];
    assert_eq!(mapped.text, "Los ingresos crecieron");
    assert_eq!(mapped.anchors.len(), 1);
    assert_eq!(mapped.anchors[0].start, 4);
    assert_eq!(mapped.anchors[0].len, 8);
}

#[test]
fn test_map_withEmptyTranslation_shouldAcceptIt() {
    let slot = SlotId::new(ContainerKind::Notes, 0, 0);
    let request = request(&[slot]);
    let response = TranslationResponse::from_pairs(vec![("N0.P0", "")]);

    let outcome = TranslationResponseMapper::map(&request, &response);
    assert_eq!(outcome.mapped[&slot].text, "");
    assert!(outcome.missing.is_empty());
}
