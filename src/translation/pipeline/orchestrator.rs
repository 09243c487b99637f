/*!
 * Pipeline orchestrator for translating a whole deck.
 *
 * The orchestrator runs two phases:
 * 1. Summary: one request over the leading slides for presentation context
 * 2. Translation: a strictly sequential slide loop, each slide committed
 *    before the next one starts, feeding the terminology window
 *
 * Cancellation is checked between slides, so the package only ever holds
 * slides that were fully committed.
 */

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::app_config::{Config, SpliceConfig};
use crate::deck::package::{DeckPackage, SlidePart};
use crate::errors::{DeckError, Warning};
use crate::translation::core::{TokenUsageStats, Translator};
use crate::translation::fonts::{FontResolver, Script};
use crate::translation::splice::RunSplicer;
use crate::translation::unit::{TerminologyWindow, TranslationUnitBuilder};

use super::slide_pass::{DeckStats, SlidePass};

/// Configuration for the deck pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source_language: String,
    pub target_language: String,

    /// Upper bound for each translation request
    pub request_timeout: Duration,

    /// Number of leading slides the presentation summary is built from
    pub summary_slides: usize,

    /// Number of committed slides the terminology window remembers
    pub terminology_window: usize,

    /// Maximum term pairs rendered into one request
    pub max_terminology_pairs: usize,

    pub splice: SpliceConfig,

    /// Per-script font overrides; `None` leaves fonts alone
    pub fonts: Option<HashMap<Script, String>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_language: "en".to_string(),
            target_language: "fr".to_string(),
            request_timeout: Duration::from_secs(120),
            summary_slides: 5,
            terminology_window: 3,
            max_terminology_pairs: 30,
            splice: SpliceConfig::default(),
            fonts: Some(HashMap::new()),
        }
    }
}

impl PipelineConfig {
    /// Create a new pipeline configuration.
    pub fn new(source_language: &str, target_language: &str) -> Self {
        Self {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            ..Default::default()
        }
    }

    /// Build the pipeline settings from the application configuration.
    pub fn from_config(config: &Config) -> Self {
        let common = &config.translation.common;
        Self {
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
            request_timeout: Duration::from_secs(common.request_timeout_secs.max(1)),
            summary_slides: common.summary_slides,
            terminology_window: common.terminology_window,
            max_terminology_pairs: common.max_terminology_pairs,
            splice: config.splice.clone(),
            fonts: config.fonts.enabled.then(|| config.fonts.overrides.clone()),
        }
    }

    /// Leave run fonts untouched.
    pub fn without_fonts(mut self) -> Self {
        self.fonts = None;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Progress information during pipeline execution.
#[derive(Debug, Clone)]
pub struct PipelineProgress {
    /// Slide just committed
    pub slide_number: usize,

    /// Slides processed so far
    pub slides_done: usize,

    /// Slides selected for translation
    pub total_slides: usize,

    /// Running totals
    pub stats: DeckStats,
}

/// Result of translating a deck.
#[derive(Debug, Clone)]
pub struct DeckReport {
    pub stats: DeckStats,

    /// Every non-fatal problem, in the order it occurred
    pub warnings: Vec<Warning>,

    /// Presentation summary sent with each request; empty when unavailable
    pub summary: String,

    /// Token usage, when the translator tracks it
    pub usage: Option<TokenUsageStats>,

    /// True when the run stopped before the last selected slide
    pub cancelled: bool,

    pub duration: Duration,
}

impl DeckReport {
    /// Get a one-line summary of the run.
    pub fn summary_line(&self) -> String {
        let mut parts = vec![
            format!("{} slides", self.stats.slides_translated),
            format!("{} text frames", self.stats.text_frames),
            format!("{} table cells in {} tables", self.stats.table_cells, self.stats.tables),
            format!("{} notes", self.stats.notes),
            format!("{} fallback calls", self.stats.fallback_calls),
            format!("{} warnings", self.warnings.len()),
            format!("{:.1}s", self.duration.as_secs_f32()),
        ];
        if self.cancelled {
            parts.push("cancelled".to_string());
        }
        parts.join(" | ")
    }
}

/// Translates the slides of a deck one after the other.
pub struct DeckTranslator<'a> {
    translator: &'a dyn Translator,
    config: PipelineConfig,
    splicer: RunSplicer,
    fonts: Option<FontResolver>,
}

impl<'a> DeckTranslator<'a> {
    pub fn new(translator: &'a dyn Translator, config: PipelineConfig) -> Self {
        let splicer = RunSplicer::new(&config.splice);
        let fonts = config
            .fonts
            .as_ref()
            .map(|overrides| FontResolver::new(&config.target_language, overrides));
        Self {
            translator,
            config,
            splicer,
            fonts,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build the presentation summary from the leading slides of the deck.
    ///
    /// Failure is never fatal: the summary is left empty and a warning is
    /// recorded.
    pub async fn summarize(&self, package: &DeckPackage, warnings: &mut Vec<Warning>) -> String {
        if self.config.summary_slides == 0 {
            return String::new();
        }

        let mut texts = Vec::new();
        for part in package.slide_parts().iter().take(self.config.summary_slides) {
            match package.load_slide(part) {
                Ok(slide) => {
                    let text = slide.plain_text();
                    if !text.trim().is_empty() {
                        texts.push(text);
                    }
                }
                Err(e) => debug!("Slide {} left out of the summary: {}", part.number, e),
            }
        }
        if texts.is_empty() {
            info!("No text on the leading slides, skipping the presentation summary");
            return String::new();
        }

        info!("Summarizing the first {} slides for context", texts.len());
        let request = self.translator.summarize(&texts, &self.config.target_language);
        let result = match tokio::time::timeout(self.config.request_timeout, request).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err(format!(
                "timed out after {} seconds",
                self.config.request_timeout.as_secs()
            )),
        };

        match result {
            Ok(summary) => {
                debug!("Presentation summary: {}", summary);
                summary
            }
            Err(message) => {
                warn!("Presentation summary unavailable: {}", message);
                warnings.push(Warning::SummaryUnavailable { message });
                String::new()
            }
        }
    }

    /// Translate the selected slides of a package in place.
    ///
    /// `slides` holds 1-based slide numbers; `None` selects every slide.
    /// Only errors reading a slide part or writing it back are returned;
    /// everything else ends up in the report's warnings.
    pub async fn translate(
        &self,
        package: &mut DeckPackage,
        slides: Option<&[usize]>,
        cancel: &AtomicBool,
        progress_callback: Option<&(dyn Fn(&PipelineProgress) + Send + Sync)>,
    ) -> Result<DeckReport, DeckError> {
        let start_time = Instant::now();
        let mut warnings = Vec::new();
        let mut stats = DeckStats::default();

        let selected: Vec<SlidePart> = package
            .slide_parts()
            .iter()
            .filter(|p| slides.is_none_or(|s| s.contains(&p.number)))
            .cloned()
            .collect();

        let summary = self.summarize(package, &mut warnings).await;
        let builder = TranslationUnitBuilder::new(&self.config.source_language, &self.config.target_language)
            .context_summary(summary.clone())
            .max_terminology_pairs(self.config.max_terminology_pairs);
        let pass = SlidePass {
            translator: self.translator,
            builder: &builder,
            splicer: &self.splicer,
            fonts: self.fonts.as_ref(),
            request_timeout: self.config.request_timeout,
        };

        let mut window = TerminologyWindow::new(self.config.terminology_window);
        let mut cancelled = false;

        for (done, part) in selected.iter().enumerate() {
            if cancel.load(Ordering::SeqCst) {
                warn!(
                    "Cancelled before slide {}; {} of {} slides committed",
                    part.number,
                    done,
                    selected.len()
                );
                cancelled = true;
                break;
            }

            let mut slide = package.load_slide(part)?;
            let outcome = pass.run(&mut slide, &window).await;
            package.store_slide(part, &slide)?;

            window.push(part.number, outcome.pairs);
            stats.merge(&outcome.stats);
            warnings.extend(outcome.warnings);

            if let Some(callback) = progress_callback {
                callback(&PipelineProgress {
                    slide_number: part.number,
                    slides_done: done + 1,
                    total_slides: selected.len(),
                    stats,
                });
            }
        }

        Ok(DeckReport {
            stats,
            warnings,
            summary,
            usage: self.translator.usage(),
            cancelled,
            duration: start_time.elapsed(),
        })
    }
}
