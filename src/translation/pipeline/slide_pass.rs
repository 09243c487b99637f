/*!
 * Translation of a single slide.
 *
 * A slide goes through four steps: extraction of every text container,
 * one batch request for the whole slide, individual fallback requests for
 * whatever the batch did not deliver, and splicing. All replacement runs
 * are computed before the first paragraph is touched, so the caller only
 * ever sees a slide that is either untouched or fully committed.
 */

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use log::{debug, info, warn};

use crate::deck::slide::{ContainerKind, Slide, TextContainer};
use crate::errors::{TranslationError, Warning};
use crate::translation::core::Translator;
use crate::translation::extract::{ParagraphModel, StyleRunExtractor};
use crate::translation::fonts::{FontResolution, FontResolver};
use crate::translation::mapper::{
    MappedTranslation, TranslationResponse, TranslationResponseMapper,
};
use crate::translation::splice::{RunSplicer, SpanPlacement, SpliceInput, SplicedRun, commit_runs};
use crate::translation::unit::{
    ContainerParagraphs, SlotId, TermPair, TerminologyWindow, TranslationRequest, TranslationUnit,
    TranslationUnitBuilder,
};

/// Counters for translated content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeckStats {
    /// Slides that went through the pipeline
    pub slides_translated: usize,
    /// Text frames with at least one translated paragraph
    pub text_frames: usize,
    /// Table cells with at least one translated paragraph
    pub table_cells: usize,
    /// Tables on slides where cells were translated
    pub tables: usize,
    /// Notes bodies with at least one translated paragraph
    pub notes: usize,
    /// Paragraphs whose runs were replaced
    pub paragraphs: usize,
    /// Single-paragraph requests issued after a batch came up short
    pub fallback_calls: usize,
}

impl DeckStats {
    pub fn merge(&mut self, other: &DeckStats) {
        self.slides_translated += other.slides_translated;
        self.text_frames += other.text_frames;
        self.table_cells += other.table_cells;
        self.tables += other.tables;
        self.notes += other.notes;
        self.paragraphs += other.paragraphs;
        self.fallback_calls += other.fallback_calls;
    }
}

/// What translating one slide produced
#[derive(Debug, Clone, Default)]
pub struct SlideOutcome {
    pub stats: DeckStats,
    pub warnings: Vec<Warning>,
    /// Source/target pairs for the terminology window
    pub pairs: Vec<TermPair>,
}

/// A paragraph ready to be written back
struct Replacement<'u> {
    slot: SlotId,
    model: &'u ParagraphModel,
    runs: Vec<SplicedRun>,
    placements: Vec<SpanPlacement>,
}

/// Everything a slide pass needs besides the slide itself
pub struct SlidePass<'a> {
    pub translator: &'a dyn Translator,
    pub builder: &'a TranslationUnitBuilder,
    pub splicer: &'a RunSplicer,
    pub fonts: Option<&'a FontResolver>,
    pub request_timeout: Duration,
}

impl<'a> SlidePass<'a> {
    /// Translate and commit one slide in place
    pub async fn run(&self, slide: &mut Slide, window: &TerminologyWindow) -> SlideOutcome {
        let mut outcome = SlideOutcome::default();
        let slide_number = slide.number;

        let containers = slide.containers().to_vec();
        let extracted = self.extract(slide, &containers, &mut outcome.warnings);
        let unit = self.builder.build(slide_number, extracted, window);
        outcome.stats.slides_translated = 1;

        if unit.is_empty() {
            debug!("Slide {}: nothing to translate", slide_number);
            return outcome;
        }
        info!(
            "Slide {}: translating {} paragraphs in one request",
            slide_number,
            unit.paragraphs.len()
        );

        let translations = self.translate_unit(&unit, &mut outcome).await;

        // Splice everything first; the slide is only touched once all runs exist.
        let mut replacements = Vec::new();
        for paragraph in &unit.paragraphs {
            let Some(mapped) = translations.get(&paragraph.slot_id) else {
                continue;
            };
            let input = SpliceInput::new(&paragraph.model, &mapped.text)
                .with_anchors(&mapped.anchors)
                .with_terminology(&unit.request.terminology)
                .with_languages(self.builder.source_language(), self.builder.target_language());
            let spliced = self.splicer.splice(input);

            for ambiguity in spliced.ambiguities {
                outcome.warnings.push(Warning::SpliceAmbiguity {
                    slide: slide_number,
                    slot: paragraph.slot_id,
                    span_text: ambiguity.span_text,
                    resolution: ambiguity.resolution,
                });
            }
            replacements.push(Replacement {
                slot: paragraph.slot_id,
                model: &paragraph.model,
                runs: spliced.runs,
                placements: spliced.placements,
            });
        }

        self.commit(slide, &containers, &replacements, &mut outcome);
        outcome
    }

    fn extract(
        &self,
        slide: &Slide,
        containers: &[TextContainer],
        warnings: &mut Vec<Warning>,
    ) -> Vec<ContainerParagraphs> {
        let mut extracted = Vec::new();
        for container in containers {
            let Some(body) = slide.text_body(container) else {
                continue;
            };
            let extraction = StyleRunExtractor::extract(body);
            for error in extraction.errors {
                warn!("Slide {}: {} {} skipped: {}", slide.number, container.kind, container.index, error);
                warnings.push(Warning::Extraction {
                    slide: slide.number,
                    error,
                });
            }
            extracted.push(ContainerParagraphs {
                kind: container.kind,
                index: container.index,
                paragraphs: extraction.paragraphs,
            });
        }
        extracted
    }

    /// Batch request plus individual fallback for every slot it missed
    async fn translate_unit(
        &self,
        unit: &TranslationUnit,
        outcome: &mut SlideOutcome,
    ) -> BTreeMap<SlotId, MappedTranslation> {
        let slide_number = unit.slide_number;

        let (mut translations, missing) = match self.request(&unit.request).await {
            Ok(response) => {
                let mapping = TranslationResponseMapper::map(&unit.request, &response);
                for error in mapping.errors {
                    warn!("Slide {}: {}", slide_number, error);
                    outcome.warnings.push(Warning::SlotMapping {
                        slide: slide_number,
                        error,
                    });
                }
                (mapping.mapped, mapping.missing)
            }
            Err(e) => {
                warn!("Slide {}: batch translation failed, falling back per paragraph: {}", slide_number, e);
                outcome.warnings.push(Warning::BatchFailed {
                    slide: slide_number,
                    message: e.to_string(),
                });
                (BTreeMap::new(), unit.request.slot_ids())
            }
        };

        for slot in missing {
            let Some(request) = unit.fallback_request(slot) else {
                continue;
            };
            outcome.stats.fallback_calls += 1;

            let result = match self.request(&request).await {
                Ok(response) => TranslationResponseMapper::map(&request, &response)
                    .mapped
                    .remove(&slot)
                    .ok_or_else(|| format!("no usable translation for {}", slot)),
                Err(e) => Err(e.to_string()),
            };

            match result {
                Ok(mapped) => {
                    translations.insert(slot, mapped);
                }
                Err(message) => {
                    warn!("Slide {}: {} kept in source language: {}", slide_number, slot, message);
                    outcome.warnings.push(Warning::FallbackFailed {
                        slide: slide_number,
                        slot,
                        message,
                    });
                }
            }
        }

        translations
    }

    async fn request(&self, request: &TranslationRequest) -> Result<TranslationResponse, TranslationError> {
        tokio::time::timeout(self.request_timeout, self.translator.translate(request))
            .await
            .map_err(|_| TranslationError::Timeout(self.request_timeout.as_secs()))?
    }

    fn commit(
        &self,
        slide: &mut Slide,
        containers: &[TextContainer],
        replacements: &[Replacement<'_>],
        outcome: &mut SlideOutcome,
    ) {
        let slide_number = slide.number;
        let mut touched: HashSet<(ContainerKind, usize)> = HashSet::new();

        for replacement in replacements {
            let slot = replacement.slot;
            let Some(container) = containers
                .iter()
                .find(|c| c.kind == slot.kind && c.index == slot.container)
            else {
                continue;
            };
            let Some(paragraph) = slide.paragraph_mut(container, slot.paragraph) else {
                warn!("Slide {}: paragraph {} disappeared before commit", slide_number, slot);
                continue;
            };

            let resolutions = commit_runs(paragraph, replacement.model, &replacement.runs, self.fonts);
            for (text, resolution) in resolutions {
                if resolution == FontResolution::Unknown {
                    outcome.warnings.push(Warning::FontScriptUnknown {
                        slide: slide_number,
                        slot,
                        text,
                    });
                }
            }

            touched.insert((slot.kind, slot.container));
            outcome.stats.paragraphs += 1;
            outcome.pairs.extend(term_pairs(replacement.model, &replacement.runs, &replacement.placements));
        }

        for (kind, _) in &touched {
            match kind {
                ContainerKind::TextFrame => outcome.stats.text_frames += 1,
                ContainerKind::TableCell => outcome.stats.table_cells += 1,
                ContainerKind::Notes => outcome.stats.notes += 1,
            }
        }
        if touched.iter().any(|(kind, _)| *kind == ContainerKind::TableCell) {
            outcome.stats.tables += slide.table_count();
        }
    }
}

/// Source/target pairs a committed paragraph contributes to the window:
/// the paragraph itself and each emphasised phrase where it landed
/// The paragraph pair plus one pair per accent span whose place the answer
/// itself confirmed; guessed placements never feed later slides
fn term_pairs(model: &ParagraphModel, runs: &[SplicedRun], placements: &[SpanPlacement]) -> Vec<TermPair> {
    let mut pairs = Vec::new();
    let source = model.plain_text();
    let target: String = runs.iter().map(|r| r.text.as_str()).collect();
    push_pair(&mut pairs, &source, &target);

    for placement in placements.iter().filter(|p| p.is_confirmed()) {
        push_pair(&mut pairs, &placement.span_text, &placement.placed_text);
    }
    pairs
}

fn push_pair(pairs: &mut Vec<TermPair>, source: &str, target: &str) {
    let (source, target) = (source.trim(), target.trim());
    if source.is_empty() || target.is_empty() || source == target {
        return;
    }
    if pairs.iter().any(|p| p.source == source) {
        return;
    }
    pairs.push(TermPair::new(source, target));
}
