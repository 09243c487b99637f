/*!
 * Integration tests for the deck translation pipeline
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;

use deckglot::deck::{ContainerKind, DeckPackage};
use deckglot::errors::{ProviderError, TranslationError, Warning};
use deckglot::translation::extract::ParagraphModel;
use deckglot::translation::mapper::TranslationResponse;
use deckglot::translation::pipeline::PipelineProgress;
use deckglot::translation::{DeckTranslator, PipelineConfig, StyleRunExtractor};

use crate::common::scripted_translator::tagged_source;
use crate::common::{self, DeckFixture, FixtureSlide, ScriptedTranslator, bold, paragraph, red, run, table, text_box};

fn mixed_deck() -> DeckFixture {
    DeckFixture::new()
        .slide(FixtureSlide::with_text(&["Welcome", "Agenda"]))
        .slide(
            FixtureSlide::new(vec![
                text_box(2, &[paragraph(&[run("Costs are "), bold("down"), run(" again")])]),
                table(3, &[&["Q1", "Q2"]]),
            ])
            .notes(vec![paragraph(&[run("Pause "), red("here"), run(" for questions.")])]),
        )
        .slide(FixtureSlide::with_text(&["Thank you"]))
}

fn open(deck: &DeckFixture) -> Result<DeckPackage> {
    Ok(DeckPackage::from_bytes(&deck.to_bytes()?)?)
}

/// Every non-blank paragraph of a slide, in container order
fn paragraphs(package: &DeckPackage, number: usize) -> Vec<ParagraphModel> {
    let part = package.slide_parts()[number - 1].clone();
    let slide = package.load_slide(&part).unwrap();
    slide
        .containers()
        .iter()
        .filter_map(|c| slide.text_body(c))
        .flat_map(|body| StyleRunExtractor::extract(body).paragraphs)
        .filter(|p| !p.is_blank())
        .collect()
}

fn texts(package: &DeckPackage, number: usize) -> Vec<String> {
    paragraphs(package, number).iter().map(|p| p.plain_text()).collect()
}

fn styled_text(paragraph: &ParagraphModel, pick: impl Fn(&deckglot::translation::StyleFingerprint) -> bool) -> String {
    paragraph
        .runs
        .iter()
        .filter(|r| pick(&r.style))
        .map(|r| r.text.as_str())
        .collect()
}

#[tokio::test]
async fn test_translate_withIdentity_shouldLeaveRunsUnchanged() -> Result<()> {
    let deck = mixed_deck();
    let mut package = open(&deck)?;
    let before: Vec<Vec<ParagraphModel>> = (1..=3).map(|n| paragraphs(&package, n)).collect();

    let translator = ScriptedTranslator::identity();
    let pipeline = DeckTranslator::new(&translator, PipelineConfig::new("en", "fr"));
    let report = pipeline.translate(&mut package, None, &AtomicBool::new(false), None).await?;

    for (n, original) in before.iter().enumerate() {
        let after = paragraphs(&package, n + 1);
        assert_eq!(original.len(), after.len());
        for (a, b) in original.iter().zip(&after) {
            let a_runs: Vec<(&str, &deckglot::translation::StyleFingerprint)> =
                a.runs.iter().map(|r| (r.text.as_str(), &r.style)).collect();
            let b_runs: Vec<(&str, &deckglot::translation::StyleFingerprint)> =
                b.runs.iter().map(|r| (r.text.as_str(), &r.style)).collect();
            assert_eq!(a_runs, b_runs);
        }
    }

    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert!(!report.cancelled);
    assert_eq!(report.stats.slides_translated, 3);
    assert_eq!(report.stats.text_frames, 3);
    assert_eq!(report.stats.table_cells, 2);
    assert_eq!(report.stats.tables, 1);
    assert_eq!(report.stats.notes, 1);
    assert_eq!(report.stats.paragraphs, 7);
    assert_eq!(report.stats.fallback_calls, 0);
    assert_eq!(translator.translate_calls(), 3);
    Ok(())
}

#[tokio::test]
async fn test_translate_withEchoedTags_shouldKeepEmphasisOnTranslatedWords() -> Result<()> {
    let mut package = open(&mixed_deck())?;
    let translator = ScriptedTranslator::prefixed("[es] ");
    let pipeline = DeckTranslator::new(&translator, PipelineConfig::new("en", "es"));
    pipeline.translate(&mut package, None, &AtomicBool::new(false), None).await?;

    let slide = paragraphs(&package, 2);
    assert_eq!(slide[0].plain_text(), "[es] Costs are down again");
    assert_eq!(styled_text(&slide[0], |s| s.bold), "down");
    assert_eq!(slide[1].plain_text(), "[es] Q1");
    assert_eq!(slide[3].plain_text(), "[es] Pause here for questions.");
    assert_eq!(styled_text(&slide[3], |s| s.color.as_deref() == Some("FF0000")), "here");

    // One request per slide, all sharing the presentation summary
    let requests = translator.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].segments.len(), 4);
    assert!(requests.iter().all(|r| r.context_summary == "A deck used for testing."));
    assert_eq!(translator.summary_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_translate_withDroppedSlots_shouldFallBackExactlyForThem() -> Result<()> {
    let mut package = open(&mixed_deck())?;
    let translator = ScriptedTranslator::with(|request| {
        let mut segments = request.segments.clone();
        if segments.len() > 1 {
            segments.pop();
        }
        Ok(TranslationResponse::from_pairs(
            segments
                .iter()
                .map(|s| (s.slot_id.to_string(), format!("[x] {}", tagged_source(s)))),
        ))
    });
    let pipeline = DeckTranslator::new(&translator, PipelineConfig::new("en", "nl"));
    let report = pipeline.translate(&mut package, None, &AtomicBool::new(false), None).await?;

    let unmapped = report
        .warnings
        .iter()
        .filter(|w| matches!(w, Warning::SlotMapping { .. }))
        .count();
    assert_eq!(unmapped, 2);
    assert_eq!(report.stats.fallback_calls, unmapped);
    assert_eq!(translator.translate_calls(), 3 + unmapped);

    for n in 1..=3 {
        assert!(texts(&package, n).iter().all(|t| t.starts_with("[x] ")), "slide {}", n);
    }
    Ok(())
}

#[tokio::test]
async fn test_translate_withFailingBatch_shouldContainFailureToItsSlide() -> Result<()> {
    common::init_test_logging();
    let deck = DeckFixture::new()
        .slide(FixtureSlide::with_text(&["Slide 1 a", "Slide 1 b"]))
        .slide(FixtureSlide::with_text(&["Slide 2 a", "Slide 2 b", "Slide 2 c"]))
        .slide(FixtureSlide::with_text(&["Slide 3 a", "Slide 3 b"]));
    let mut package = open(&deck)?;

    let translator = ScriptedTranslator::failing_batches_with("Slide 2", "[de] ");
    let pipeline = DeckTranslator::new(&translator, PipelineConfig::new("en", "de"));
    let report = pipeline.translate(&mut package, None, &AtomicBool::new(false), None).await?;

    assert_eq!(report.warnings.len(), 1);
    assert!(matches!(&report.warnings[0], Warning::BatchFailed { slide: 2, message } if message.contains("connection reset")));
    assert!(report.warnings.iter().all(|w| w.slide() == Some(2)));
    assert_eq!(report.stats.fallback_calls, 3);
    assert_eq!(translator.translate_calls(), 1 + 1 + 3 + 1);

    assert_eq!(texts(&package, 1), vec!["[de] Slide 1 a", "[de] Slide 1 b"]);
    assert_eq!(texts(&package, 2), vec!["[de] Slide 2 a", "[de] Slide 2 b", "[de] Slide 2 c"]);
    assert_eq!(texts(&package, 3), vec!["[de] Slide 3 a", "[de] Slide 3 b"]);
    Ok(())
}

#[tokio::test]
async fn test_translate_withFailingFallback_shouldKeepSourceForThatParagraph() -> Result<()> {
    common::init_test_logging();
    let deck = DeckFixture::new().slide(FixtureSlide::with_text(&["Fine line", "Broken line"]));
    let mut package = open(&deck)?;

    let translator = ScriptedTranslator::with(|request| {
        if request.segments.iter().any(|s| s.source_text.contains("Broken")) {
            return Err(TranslationError::Provider(ProviderError::ApiError {
                status_code: 400,
                message: "content filtered".to_string(),
            }));
        }
        Ok(TranslationResponse::from_pairs(
            request
                .segments
                .iter()
                .map(|s| (s.slot_id.to_string(), format!("[it] {}", s.source_text))),
        ))
    });
    let pipeline = DeckTranslator::new(&translator, PipelineConfig::new("en", "it"));
    let report = pipeline.translate(&mut package, None, &AtomicBool::new(false), None).await?;

    assert_eq!(texts(&package, 1), vec!["[it] Fine line", "Broken line"]);
    let failed: Vec<String> = report
        .warnings
        .iter()
        .filter_map(|w| match w {
            Warning::FallbackFailed { slot, .. } => Some(slot.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(failed, vec!["T0.P1"]);
    assert_eq!(report.stats.paragraphs, 1);
    Ok(())
}

#[tokio::test]
async fn test_translate_withSlowService_shouldTimeOutAndKeepSource() -> Result<()> {
    common::init_test_logging();
    let deck = DeckFixture::new().slide(FixtureSlide::with_text(&["First", "Second"]));
    let mut package = open(&deck)?;

    let translator = ScriptedTranslator::prefixed("[pt] ").delayed(Duration::from_millis(300));
    let config = PipelineConfig::new("en", "pt").with_request_timeout(Duration::from_millis(30));
    let report = DeckTranslator::new(&translator, config)
        .translate(&mut package, None, &AtomicBool::new(false), None)
        .await?;

    assert_eq!(texts(&package, 1), vec!["First", "Second"]);
    assert!(matches!(&report.warnings[0], Warning::BatchFailed { message, .. } if message.contains("timed out")));
    let fallback_failures = report
        .warnings
        .iter()
        .filter(|w| matches!(w, Warning::FallbackFailed { .. }))
        .count();
    assert_eq!(fallback_failures, 2);
    assert_eq!(report.stats.fallback_calls, 2);
    Ok(())
}

#[tokio::test]
async fn test_translate_sixSlides_shouldFeedOnlyLastThreeSlidesTerms() -> Result<()> {
    let mut package = open(&DeckFixture::numbered(6))?;
    let translator = ScriptedTranslator::prefixed("[fr] ");
    let pipeline = DeckTranslator::new(&translator, PipelineConfig::new("en", "fr"));
    pipeline.translate(&mut package, None, &AtomicBool::new(false), None).await?;

    let requests = translator.requests();
    assert_eq!(requests.len(), 6);
    assert!(requests[0].terminology.is_empty());
    assert_eq!(requests[1].terminology.len(), 1);
    assert_eq!(requests[1].terminology[0].source, "Slide 1 text");
    assert_eq!(requests[1].terminology[0].target, "[fr] Slide 1 text");

    let sources: Vec<&str> = requests[5].terminology.iter().map(|p| p.source.as_str()).collect();
    assert_eq!(sources, vec!["Slide 3 text", "Slide 4 text", "Slide 5 text"]);
    Ok(())
}

#[tokio::test]
async fn test_translate_withoutSummary_shouldWarnAndContinue() -> Result<()> {
    let mut package = open(&DeckFixture::numbered(2))?;
    let translator = ScriptedTranslator::prefixed("[sv] ").summary(None);
    let report = DeckTranslator::new(&translator, PipelineConfig::new("en", "sv"))
        .translate(&mut package, None, &AtomicBool::new(false), None)
        .await?;

    assert!(matches!(&report.warnings[0], Warning::SummaryUnavailable { .. }));
    assert_eq!(report.summary, "");
    assert!(translator.requests().iter().all(|r| r.context_summary.is_empty()));
    assert_eq!(texts(&package, 2), vec!["[sv] Slide 2 text"]);
    Ok(())
}

#[tokio::test]
async fn test_translate_withSelection_shouldOnlyTouchSelectedSlides() -> Result<()> {
    let mut package = open(&DeckFixture::numbered(4))?;
    let translator = ScriptedTranslator::prefixed("[pl] ");
    let seen = Mutex::new(Vec::new());
    let on_progress = |progress: &PipelineProgress| {
        seen.lock().push((progress.slide_number, progress.slides_done, progress.total_slides));
    };

    let report = DeckTranslator::new(&translator, PipelineConfig::new("en", "pl"))
        .translate(&mut package, Some(&[2, 3]), &AtomicBool::new(false), Some(&on_progress))
        .await?;

    assert_eq!(report.stats.slides_translated, 2);
    assert_eq!(texts(&package, 1), vec!["Slide 1 text"]);
    assert_eq!(texts(&package, 2), vec!["[pl] Slide 2 text"]);
    assert_eq!(texts(&package, 3), vec!["[pl] Slide 3 text"]);
    assert_eq!(texts(&package, 4), vec!["Slide 4 text"]);
    assert_eq!(*seen.lock(), vec![(2, 1, 2), (3, 2, 2)]);
    Ok(())
}

#[tokio::test]
async fn test_translate_cancelledBeforeStart_shouldCommitNothing() -> Result<()> {
    let mut package = open(&DeckFixture::numbered(3))?;
    let translator = ScriptedTranslator::prefixed("[ro] ");
    let report = DeckTranslator::new(&translator, PipelineConfig::new("en", "ro"))
        .translate(&mut package, None, &AtomicBool::new(true), None)
        .await?;

    assert!(report.cancelled);
    assert_eq!(report.stats.slides_translated, 0);
    assert_eq!(translator.translate_calls(), 0);
    assert_eq!(texts(&package, 1), vec!["Slide 1 text"]);
    Ok(())
}

#[tokio::test]
async fn test_translate_cancelledMidDeck_shouldKeepOnlyCommittedSlides() -> Result<()> {
    let mut package = open(&DeckFixture::numbered(4))?;
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    let translator = ScriptedTranslator::with(move |request| {
        if request.segments.iter().any(|s| s.source_text == "Slide 2 text") {
            flag.store(true, Ordering::SeqCst);
        }
        Ok(TranslationResponse::from_pairs(
            request
                .segments
                .iter()
                .map(|s| (s.slot_id.to_string(), format!("[fi] {}", s.source_text))),
        ))
    });

    let report = DeckTranslator::new(&translator, PipelineConfig::new("en", "fi"))
        .translate(&mut package, None, &cancel, None)
        .await?;

    // Slide 2 was in flight when the flag went up and still completes
    assert!(report.cancelled);
    assert_eq!(report.stats.slides_translated, 2);
    assert_eq!(texts(&package, 2), vec!["[fi] Slide 2 text"]);
    assert_eq!(texts(&package, 3), vec!["Slide 3 text"]);
    assert_eq!(texts(&package, 4), vec!["Slide 4 text"]);
    Ok(())
}

#[tokio::test]
async fn test_translate_withEmptyAndVeryLongAnswers_shouldCommitThemExactly() -> Result<()> {
    let long = "mot ".repeat(3000);
    let expected_long = long.clone();
    let deck = DeckFixture::new().slide(FixtureSlide::with_text(&["Erase me", "Grow me"]));
    let mut package = open(&deck)?;

    let translator = ScriptedTranslator::with(move |request| {
        Ok(TranslationResponse::from_pairs(request.segments.iter().map(|s| {
            let text = if s.source_text == "Erase me" { String::new() } else { long.clone() };
            (s.slot_id.to_string(), text)
        })))
    });
    DeckTranslator::new(&translator, PipelineConfig::new("en", "fr"))
        .translate(&mut package, None, &AtomicBool::new(false), None)
        .await?;

    let part = package.slide_parts()[0].clone();
    let slide = package.load_slide(&part)?;
    let frame = slide
        .containers()
        .iter()
        .find(|c| c.kind == ContainerKind::TextFrame)
        .and_then(|c| slide.text_body(c))
        .unwrap();
    let committed = StyleRunExtractor::extract(frame).paragraphs;
    assert_eq!(committed[0].plain_text(), "");
    assert_eq!(committed[1].plain_text(), expected_long);
    Ok(())
}

#[tokio::test]
async fn test_translate_intoKorean_shouldAssignEastAsianFont() -> Result<()> {
    let hangul = |_: &deckglot::translation::unit::TranslationRequest| -> Result<TranslationResponse, TranslationError> {
        Ok(TranslationResponse::from_pairs(vec![("T0.P0", "안녕하세요 여러분")]))
    };

    let mut package = open(&DeckFixture::numbered(1))?;
    let translator = ScriptedTranslator::with(hangul);
    DeckTranslator::new(&translator, PipelineConfig::new("en", "ko"))
        .translate(&mut package, None, &AtomicBool::new(false), None)
        .await?;
    let xml = package.part_str("ppt/slides/slide1.xml")?;
    assert!(xml.contains("안녕하세요 여러분"));
    assert!(xml.contains(r#"typeface="Malgun Gothic""#));

    let mut package = open(&DeckFixture::numbered(1))?;
    let translator = ScriptedTranslator::with(hangul);
    DeckTranslator::new(&translator, PipelineConfig::new("en", "ko").without_fonts())
        .translate(&mut package, None, &AtomicBool::new(false), None)
        .await?;
    let xml = package.part_str("ppt/slides/slide1.xml")?;
    assert!(xml.contains("안녕하세요 여러분"));
    assert!(!xml.contains("Malgun Gothic"));
    Ok(())
}
