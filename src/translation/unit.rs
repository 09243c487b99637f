/*!
 * Translation units: one request per slide.
 *
 * Every translatable paragraph of a slide (text frames, table cells and
 * notes) gets a slot id of the form `T<container>.P<paragraph>`,
 * `C<…>.P<…>` or `N<…>.P<…>`. The unit carries the presentation summary
 * and the recent terminology so the service sees the same context for the
 * whole slide, and so per-paragraph fallback requests can reuse it.
 */

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::deck::slide::ContainerKind;
use crate::translation::extract::ParagraphModel;

/// Identifier of one paragraph within a slide's request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SlotId {
    pub kind: ContainerKind,
    pub container: usize,
    pub paragraph: usize,
}

impl SlotId {
    pub fn new(kind: ContainerKind, container: usize, paragraph: usize) -> Self {
        Self {
            kind,
            container,
            paragraph,
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}.P{}", self.kind.code(), self.container, self.paragraph)
    }
}

impl FromStr for SlotId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let kind = chars
            .next()
            .and_then(ContainerKind::from_code)
            .ok_or_else(|| format!("Invalid slot id: {}", s))?;
        let (container, paragraph) = chars
            .as_str()
            .split_once(".P")
            .ok_or_else(|| format!("Invalid slot id: {}", s))?;
        let container = container
            .parse()
            .map_err(|_| format!("Invalid container index in slot id: {}", s))?;
        let paragraph = paragraph
            .parse()
            .map_err(|_| format!("Invalid paragraph index in slot id: {}", s))?;
        Ok(Self::new(kind, container, paragraph))
    }
}

impl From<SlotId> for String {
    fn from(id: SlotId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for SlotId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A source/target pair remembered for terminology consistency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermPair {
    pub source: String,
    pub target: String,
}

impl TermPair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Pairs committed on one slide
#[derive(Debug, Clone, PartialEq)]
pub struct SlideTerms {
    pub slide_number: usize,
    pub pairs: Vec<TermPair>,
}

/// Bounded queue of the most recently committed slides' term pairs
#[derive(Debug, Clone)]
pub struct TerminologyWindow {
    capacity: usize,
    slides: VecDeque<SlideTerms>,
}

impl Default for TerminologyWindow {
    fn default() -> Self {
        Self::new(3)
    }
}

impl TerminologyWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slides: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Record a committed slide, evicting the oldest when full
    pub fn push(&mut self, slide_number: usize, pairs: Vec<TermPair>) {
        if self.capacity == 0 {
            return;
        }
        while self.slides.len() >= self.capacity {
            self.slides.pop_front();
        }
        self.slides.push_back(SlideTerms { slide_number, pairs });
    }

    /// Slide numbers currently held, oldest first
    pub fn slide_numbers(&self) -> Vec<usize> {
        self.slides.iter().map(|s| s.slide_number).collect()
    }

    pub fn pairs(&self) -> impl Iterator<Item = &TermPair> {
        self.slides.iter().flat_map(|s| s.pairs.iter())
    }

    /// Up to `max` most recent pairs, oldest first; a source repeated on
    /// several slides keeps its newest translation
    pub fn recent_pairs(&self, max: usize) -> Vec<TermPair> {
        let mut seen = HashSet::new();
        let mut recent = Vec::new();
        for pair in self.slides.iter().rev().flat_map(|s| s.pairs.iter().rev()) {
            if recent.len() >= max {
                break;
            }
            if seen.insert(pair.source.as_str()) {
                recent.push(pair.clone());
            }
        }
        recent.reverse();
        recent
    }
}

/// One paragraph as sent to the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub slot_id: SlotId,
    pub source_text: String,
    /// Source text with distinct style spans wrapped in `<sN>` tags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_hint: Option<String>,
}

/// Request crossing the translation-service boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub context_summary: String,
    pub terminology: Vec<TermPair>,
    pub source_language: String,
    pub target_language: String,
    pub segments: Vec<Segment>,
}

impl TranslationRequest {
    pub fn slot_ids(&self) -> Vec<SlotId> {
        self.segments.iter().map(|s| s.slot_id).collect()
    }
}

/// A paragraph tracked by a unit
#[derive(Debug, Clone, PartialEq)]
pub struct UnitParagraph {
    pub slot_id: SlotId,
    pub model: ParagraphModel,
}

/// Extracted paragraphs of one container
#[derive(Debug, Clone)]
pub struct ContainerParagraphs {
    pub kind: ContainerKind,
    pub index: usize,
    pub paragraphs: Vec<ParagraphModel>,
}

/// Everything needed to translate one slide
#[derive(Debug, Clone)]
pub struct TranslationUnit {
    pub slide_number: usize,
    pub paragraphs: Vec<UnitParagraph>,
    pub request: TranslationRequest,
}

impl TranslationUnit {
    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    pub fn paragraph(&self, slot: SlotId) -> Option<&UnitParagraph> {
        self.paragraphs.iter().find(|p| p.slot_id == slot)
    }

    /// Single-paragraph request sharing this unit's context
    pub fn fallback_request(&self, slot: SlotId) -> Option<TranslationRequest> {
        let segment = self.request.segments.iter().find(|s| s.slot_id == slot)?;
        Some(TranslationRequest {
            context_summary: self.request.context_summary.clone(),
            terminology: self.request.terminology.clone(),
            source_language: self.request.source_language.clone(),
            target_language: self.request.target_language.clone(),
            segments: vec![segment.clone()],
        })
    }

    /// Number of distinct containers of a kind that have translatable text
    pub fn container_count(&self, kind: ContainerKind) -> usize {
        let containers: HashSet<usize> = self
            .paragraphs
            .iter()
            .filter(|p| p.slot_id.kind == kind)
            .map(|p| p.slot_id.container)
            .collect();
        containers.len()
    }
}

/// Builds one translation unit per slide
#[derive(Debug, Clone)]
pub struct TranslationUnitBuilder {
    context_summary: String,
    source_language: String,
    target_language: String,
    max_terminology_pairs: usize,
}

impl TranslationUnitBuilder {
    pub fn new(source_language: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            context_summary: String::new(),
            source_language: source_language.into(),
            target_language: target_language.into(),
            max_terminology_pairs: 30,
        }
    }

    /// Attach the presentation-wide summary
    pub fn context_summary(mut self, summary: impl Into<String>) -> Self {
        self.context_summary = summary.into();
        self
    }

    pub fn max_terminology_pairs(mut self, max: usize) -> Self {
        self.max_terminology_pairs = max;
        self
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    pub fn source_language(&self) -> &str {
        &self.source_language
    }

    /// Assign slot ids and assemble the request; blank paragraphs are not sent
    pub fn build(
        &self,
        slide_number: usize,
        containers: Vec<ContainerParagraphs>,
        window: &TerminologyWindow,
    ) -> TranslationUnit {
        let mut paragraphs = Vec::new();
        let mut segments = Vec::new();

        for container in containers {
            for model in container.paragraphs {
                if model.is_blank() {
                    continue;
                }
                let slot_id = SlotId::new(container.kind, container.index, model.index);
                segments.push(Segment {
                    slot_id,
                    source_text: model.plain_text(),
                    style_hint: model.style_hint(),
                });
                paragraphs.push(UnitParagraph { slot_id, model });
            }
        }

        TranslationUnit {
            slide_number,
            paragraphs,
            request: TranslationRequest {
                context_summary: self.context_summary.clone(),
                terminology: window.recent_pairs(self.max_terminology_pairs),
                source_language: self.source_language.clone(),
                target_language: self.target_language.clone(),
                segments,
            },
        }
    }
}
