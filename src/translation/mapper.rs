/*!
 * Maps a translation response back onto the request's slots.
 *
 * Entries are matched by slot id only, never by position. Ids the request
 * never contained are discarded, a slot answered twice is distrusted, and
 * any requested slot left without an answer is reported as missing so the
 * caller can retranslate it on its own. Anchor tags (`<sN>…</sN>`) echoed
 * by the service are parsed out here, so downstream code always sees plain
 * text plus explicit anchor positions.
 */

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::SlotMappingError;
use crate::translation::unit::{SlotId, TranslationRequest};

static ANCHOR_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)s(\d+)>").expect("anchor tag pattern is valid"));

/// One entry of a service response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEntry {
    pub slot_id: String,
    pub text: String,
}

/// Response crossing the translation-service boundary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationResponse {
    #[serde(default)]
    pub translations: Vec<ResponseEntry>,
}

impl TranslationResponse {
    pub fn from_pairs<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            translations: pairs
                .into_iter()
                .map(|(slot_id, text)| ResponseEntry {
                    slot_id: slot_id.into(),
                    text: text.into(),
                })
                .collect(),
        }
    }
}

/// Position of a style span in translated text, in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    /// Index of the accent span in the source paragraph
    pub span: usize,
    pub start: usize,
    pub len: usize,
}

/// Plain translated text with the anchors found in it
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MappedTranslation {
    pub text: String,
    pub anchors: Vec<Anchor>,
}

impl MappedTranslation {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            anchors: Vec::new(),
        }
    }
}

/// Result of mapping one response
#[derive(Debug, Clone, Default)]
pub struct MappingOutcome {
    pub mapped: BTreeMap<SlotId, MappedTranslation>,
    /// Requested slots that need an individual retry, in request order
    pub missing: Vec<SlotId>,
    pub errors: Vec<SlotMappingError>,
}

/// Validates responses against requests
pub struct TranslationResponseMapper;

impl TranslationResponseMapper {
    pub fn map(request: &TranslationRequest, response: &TranslationResponse) -> MappingOutcome {
        let requested = request.slot_ids();
        let mut answers: HashMap<SlotId, Vec<&str>> = HashMap::new();
        let mut outcome = MappingOutcome::default();

        for entry in &response.translations {
            match entry.slot_id.parse::<SlotId>() {
                Ok(slot) if requested.contains(&slot) => {
                    answers.entry(slot).or_default().push(entry.text.as_str());
                }
                _ => outcome
                    .errors
                    .push(SlotMappingError::Unrecognized(entry.slot_id.clone())),
            }
        }

        for slot in requested {
            match answers.get(&slot).map(Vec::as_slice) {
                Some([text]) => {
                    outcome.mapped.insert(slot, strip_anchor_tags(text));
                }
                Some(many) if many.len() > 1 => {
                    outcome
                        .errors
                        .push(SlotMappingError::Duplicate(slot, many.len()));
                    outcome.missing.push(slot);
                }
                _ => {
                    outcome.errors.push(SlotMappingError::Missing(slot));
                    outcome.missing.push(slot);
                }
            }
        }

        outcome
    }
}

/// Remove `<sN>` tags from text, recording where each balanced pair sat
pub fn strip_anchor_tags(text: &str) -> MappedTranslation {
    let mut plain = String::with_capacity(text.len());
    let mut plain_len = 0usize;
    let mut open: HashMap<usize, usize> = HashMap::new();
    let mut anchors: Vec<Anchor> = Vec::new();
    let mut cursor = 0;

    for caps in ANCHOR_TAG.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let piece = &text[cursor..whole.start()];
        plain.push_str(piece);
        plain_len += piece.chars().count();
        cursor = whole.end();

        let Some(span) = caps.get(2).and_then(|m| m.as_str().parse::<usize>().ok()) else {
            continue;
        };
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        if closing {
            if let Some(start) = open.remove(&span) {
                let already = anchors.iter().any(|a| a.span == span);
                if plain_len > start && !already {
                    anchors.push(Anchor {
                        span,
                        start,
                        len: plain_len - start,
                    });
                }
            }
        } else {
            open.entry(span).or_insert(plain_len);
        }
    }
    plain.push_str(&text[cursor..]);

    anchors.sort_by_key(|a| a.span);
    MappedTranslation {
        text: plain,
        anchors,
    }
}
