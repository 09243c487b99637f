/*!
 * Slide translation with run-level style preservation.
 *
 * This module contains the core functionality for translating slides
 * while keeping their formatting. It is split into several submodules:
 *
 * - `extract`: Paragraph and run models read from text containers
 * - `unit`: Per-slide translation units, slot ids and the terminology window
 * - `mapper`: Mapping service responses back onto slots
 * - `splice`: Rebuilding styled runs around translated text
 * - `fonts`: Script detection and font assignment for new runs
 * - `prompts`: Prompt templates and response parsing
 * - `core`: Translation service over the configured provider
 * - `pipeline`: The per-deck and per-slide translation loop
 */

// Re-export main types for easier usage
pub use self::core::{TokenUsageStats, TranslationService, Translator};
pub use self::extract::{ParagraphModel, StyleFingerprint, StyleRunExtractor};
pub use self::fonts::{FontResolver, Script};
pub use self::mapper::{TranslationResponse, TranslationResponseMapper};
pub use self::pipeline::{DeckReport, DeckTranslator, PipelineConfig};
pub use self::splice::RunSplicer;
pub use self::unit::{SlotId, TerminologyWindow, TranslationUnitBuilder};

// Submodules
pub mod core;
pub mod extract;
pub mod fonts;
pub mod mapper;
pub mod pipeline;
pub mod prompts;
pub mod splice;
pub mod unit;
