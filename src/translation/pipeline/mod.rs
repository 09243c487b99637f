/*!
 * Translation pipeline for slide decks.
 *
 * The pipeline processes a deck in two phases:
 * 1. **Summary**: one request over the leading slides for presentation context
 * 2. **Slide passes**: extraction, batch translation with per-paragraph
 *    fallback, and splicing, one slide at a time
 */

pub mod orchestrator;
pub mod slide_pass;

// Re-export types used externally
pub use orchestrator::{DeckReport, DeckTranslator, PipelineConfig, PipelineProgress};
pub use slide_pass::{DeckStats, SlideOutcome, SlidePass};
