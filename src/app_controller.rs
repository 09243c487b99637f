use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crate::app_config::Config;
use crate::deck::DeckPackage;
use crate::language_utils;
use crate::translation::core::{TranslationService, Translator};
use crate::translation::pipeline::{DeckReport, DeckTranslator, PipelineConfig, PipelineProgress};

// @module: Application controller for deck translation

/// Options for one translation run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Output path; defaults to `<stem>_<lang>.pptx` next to the input
    pub output: Option<PathBuf>,
    /// Slide selection, `N` or `A-B`
    pub slides: Option<String>,
    /// Save the committed slides when the run is cancelled
    pub keep_partial: bool,
    /// Show a progress bar
    pub show_progress: bool,
}

/// What a run did
#[derive(Debug, Clone)]
pub struct RunResult {
    pub report: DeckReport,
    /// Where the deck was written, if it was
    pub output_path: Option<PathBuf>,
}

/// Main application controller for deck translation
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the main workflow with the configured translation provider
    pub async fn run(&self, input_file: &Path, options: &RunOptions, cancel: &AtomicBool) -> Result<RunResult> {
        let service = TranslationService::new(self.config.translation.clone())?;

        info!(
            "deckglot: {} - {}",
            self.config.translation.provider.display_name(),
            self.config.translation.get_model()
        );

        let result = self.run_with_translator(&service, input_file, options, cancel).await?;
        if let Some(usage) = &result.report.usage {
            info!("{}", usage.summary());
        }
        Ok(result)
    }

    /// Run the workflow with any translator
    pub async fn run_with_translator(
        &self,
        translator: &dyn Translator,
        input_file: &Path,
        options: &RunOptions,
        cancel: &AtomicBool,
    ) -> Result<RunResult> {
        if !input_file.is_file() {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }
        if !input_file
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("pptx"))
        {
            return Err(anyhow!("Only .pptx presentations are supported: {:?}", input_file));
        }

        let output_path = options
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(input_file, &self.config.target_language));
        if output_path == input_file {
            return Err(anyhow!("Output path must differ from the input: {:?}", output_path));
        }

        let mut package = DeckPackage::open(input_file)
            .with_context(|| format!("Failed to open presentation: {}", input_file.display()))?;
        let total_slides = package.slide_count();

        let selection = match &options.slides {
            Some(range) => Some(parse_slide_range(range, total_slides)?),
            None => None,
        };
        let selected_count = selection.as_ref().map_or(total_slides, Vec::len);
        info!(
            "Translating {} of {} slides into {}",
            selected_count,
            total_slides,
            language_utils::display_name(&self.config.target_language)
        );

        let progress_bar = if options.show_progress {
            let bar = ProgressBar::new(selected_count as u64);
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} slides ({percent}%) {msg} {eta}")
                .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            bar.set_style(style.progress_chars("█▓▒░"));
            bar.set_message("Summarizing");
            Some(bar)
        } else {
            None
        };

        let pb = progress_bar.clone();
        let on_progress = move |progress: &PipelineProgress| {
            if let Some(bar) = &pb {
                bar.set_position(progress.slides_done as u64);
                bar.set_message(format!(
                    "text {} | tables {} | notes {}",
                    progress.stats.text_frames, progress.stats.tables, progress.stats.notes
                ));
            }
        };

        let pipeline = DeckTranslator::new(translator, PipelineConfig::from_config(&self.config));
        let report = pipeline
            .translate(&mut package, selection.as_deref(), cancel, Some(&on_progress))
            .await
            .with_context(|| format!("Failed to translate {}", input_file.display()))?;

        if let Some(bar) = &progress_bar {
            bar.finish_and_clear();
        }

        for warning in &report.warnings {
            warn!("{}", warning);
        }

        let output_path = if report.cancelled && !options.keep_partial {
            warn!("Translation cancelled; no output written (use --keep-partial to save committed slides)");
            None
        } else {
            package
                .save(&output_path)
                .with_context(|| format!("Failed to write output file: {}", output_path.display()))?;
            if report.cancelled {
                warn!("Translation cancelled; committed slides saved to {}", output_path.display());
            } else {
                info!("Success: {}", output_path.display());
            }
            Some(output_path)
        };

        info!(
            "{} (took {})",
            report.summary_line(),
            Self::format_duration(report.duration)
        );

        Ok(RunResult { report, output_path })
    }

    // Format duration in a human-readable format (HH:MM:SS)
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

/// `<stem>_<lang>.pptx` next to the input
pub fn default_output_path(input_file: &Path, target_language: &str) -> PathBuf {
    let stem = input_file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "presentation".to_string());
    let extension = input_file
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| "pptx".to_string());
    input_file.with_file_name(format!("{}_{}.{}", stem, target_language, extension))
}

/// Parse `N` or `A-B` into 1-based slide numbers, clamped to the deck
pub fn parse_slide_range(range: &str, total_slides: usize) -> Result<Vec<usize>> {
    let range = range.trim();
    let parse = |s: &str| {
        s.trim()
            .parse::<usize>()
            .map_err(|_| anyhow!("Invalid slide range '{}' (expected N or A-B, e.g. 5 or 3-10)", range))
    };

    let (start, end) = match range.split_once('-') {
        Some((a, b)) => (parse(a)?, parse(b)?),
        None => {
            let n = parse(range)?;
            (n, n)
        }
    };

    let start = start.max(1);
    let end = end.min(total_slides);
    if start > end {
        return Err(anyhow!(
            "Slide range '{}' selects no slides (deck has {} slides)",
            range,
            total_slides
        ));
    }
    Ok((start..=end).collect())
}
