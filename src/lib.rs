/*!
 * # deckglot - slide deck translation that keeps its formatting
 *
 * A Rust library for translating PowerPoint (.pptx) presentations with LLM
 * providers while preserving run-level formatting.
 *
 * ## Features
 *
 * - Read and rewrite .pptx packages in place, leaving untouched parts byte-identical
 * - Translate text frames, table cells and speaker notes one slide per request
 * - Translate using various AI providers:
 *   - Azure OpenAI
 *   - OpenAI API
 *   - Anthropic API
 * - Keep bold, colour, hyperlink and other emphasis on the translated words
 * - Carry terminology from recently translated slides into the next request
 * - Pick script-appropriate fonts for the target language
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `deck`: Package, slide and XML tree handling
 * - `translation`: Translation of slides:
 *   - `translation::extract`: Paragraph and run models
 *   - `translation::unit`: Per-slide translation units and the terminology window
 *   - `translation::mapper`: Mapping responses back to paragraphs
 *   - `translation::splice`: Rebuilding styled runs
 *   - `translation::fonts`: Script detection and font assignment
 *   - `translation::pipeline`: The deck and slide loop
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `providers`: Client implementations for the LLM providers
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod deck;
pub mod errors;
pub mod language_utils;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, RunOptions, RunResult};
pub use deck::{DeckPackage, Slide};
pub use errors::{AppError, DeckError, ProviderError, TranslationError, Warning};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use translation::{DeckReport, DeckTranslator, PipelineConfig, TranslationService, Translator};
