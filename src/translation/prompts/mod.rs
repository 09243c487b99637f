/*!
 * Prompt engineering for slide translation.
 *
 * This module provides:
 * - System prompt templates for slide translation and summaries
 * - JSON user prompts built from translation requests
 * - Extraction of JSON answers from model output
 */

pub mod response;
pub mod templates;

// Re-export main types
pub use response::{extract_json, parse_translation_response};
pub use templates::{PromptTemplate, SlidePromptBuilder, build_summary_prompts};
