/*!
 * Parsing of model output into translation responses.
 */

use crate::errors::TranslationError;
use crate::translation::mapper::TranslationResponse;

/// Pull the JSON object out of a model answer.
///
/// Accepts raw JSON, a fenced code block, or falls back to the span from
/// the first `{` to the last `}`.
pub fn extract_json(response: &str) -> Option<&str> {
    let trimmed = response.trim();

    // If it starts with {, try to parse as-is
    if trimmed.starts_with('{') {
        return Some(trimmed);
    }

    // Look for JSON block in markdown code fence
    if let Some(start) = trimmed.find("```json") {
        if let Some(end) = trimmed[start + 7..].find("```") {
            return Some(trimmed[start + 7..start + 7 + end].trim());
        }
    }

    // Look for JSON block without language specifier
    if let Some(start) = trimmed.find("```") {
        if let Some(end) = trimmed[start + 3..].find("```") {
            let json = trimmed[start + 3..start + 3 + end].trim();
            if json.starts_with('{') {
                return Some(json);
            }
        }
    }

    // Look for first { and last }
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if end > start {
            return Some(&trimmed[start..=end]);
        }
    }

    None
}

/// Parse a model answer into a response
pub fn parse_translation_response(raw: &str) -> Result<TranslationResponse, TranslationError> {
    let json = extract_json(raw)
        .ok_or_else(|| TranslationError::Format("Could not extract JSON from response".to_string()))?;
    serde_json::from_str(json).map_err(|e| TranslationError::Format(format!("Invalid translation JSON: {}", e)))
}
