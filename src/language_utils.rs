use anyhow::{Result, anyhow};
use isolang::Language;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Language utilities for ISO language code handling
///
/// This module validates and normalizes ISO 639-1 (2-letter) and
/// ISO 639-2 (3-letter) codes, accepts BCP 47 tags such as `en-US` or
/// `zh-Hans` by their primary subtag, and knows the basic constituent
/// order of common languages, which decides how far positional style
/// relocation can be trusted.
/// Language code type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
}

/// ISO 639-2/B codes that differ from their ISO 639-2/T form
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

fn bibliographic_to_terminology(code: &str) -> Option<&'static str> {
    BIBLIOGRAPHIC_CODES
        .iter()
        .find(|(b, _)| *b == code)
        .map(|(_, t)| *t)
}

/// Primary subtag of a language tag, lowercased (`pt-BR` -> `pt`)
pub fn primary_subtag(tag: &str) -> String {
    tag.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-2 code
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let normalized_code = primary_subtag(code);

    if normalized_code.len() == 2 && Language::from_639_1(&normalized_code).is_some() {
        return Ok(LanguageCodeType::Part1);
    }
    if normalized_code.len() == 3 {
        if Language::from_639_3(&normalized_code).is_some() {
            return Ok(LanguageCodeType::Part2T);
        }
        if bibliographic_to_terminology(&normalized_code).is_some() {
            return Ok(LanguageCodeType::Part2B);
        }
    }

    Err(anyhow!("Invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = primary_subtag(code);

    if normalized_code.len() == 2 {
        if let Some(lang) = Language::from_639_1(&normalized_code) {
            return Ok(lang.to_639_3().to_string());
        }
    } else if normalized_code.len() == 3 {
        if Language::from_639_3(&normalized_code).is_some() {
            return Ok(normalized_code);
        }
        if let Some(part2t) = bibliographic_to_terminology(&normalized_code) {
            return Ok(part2t.to_string());
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Normalize to ISO 639-1 where one exists, otherwise ISO 639-2/T
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let part2t = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&part2t)
        .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))?;
    Ok(lang
        .to_639_1()
        .map(str::to_string)
        .unwrap_or(part2t))
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}

/// Display name for prompts; unknown codes are passed through unchanged
pub fn display_name(code: &str) -> String {
    get_language_name(code).unwrap_or_else(|_| code.to_string())
}

/// Basic constituent order of a language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordOrder {
    Svo,
    Sov,
    Vso,
}

/// Dominant word order of common languages, keyed by ISO 639-1 code
static WORD_ORDER: LazyLock<HashMap<&'static str, WordOrder>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    // Subject-verb-object
    for code in [
        "en", "fr", "es", "it", "pt", "ro", "ca", "ru", "uk", "pl", "cs", "sk", "bg", "hr", "sr",
        "sl", "el", "sv", "no", "nb", "da", "fi", "et", "id", "ms", "vi", "th", "zh", "sw",
    ] {
        m.insert(code, WordOrder::Svo);
    }

    // Subject-object-verb
    for code in [
        "ja", "ko", "tr", "hi", "bn", "ur", "fa", "ta", "te", "mr", "ne", "my", "mn", "hy", "az",
        "kk", "uz",
    ] {
        m.insert(code, WordOrder::Sov);
    }

    // Verb-subject-object
    for code in ["ar", "he", "ga", "cy"] {
        m.insert(code, WordOrder::Vso);
    }

    // German and Dutch are verb-second in main clauses; close enough to SVO
    // for the order of emphasised phrases.
    m.insert("de", WordOrder::Svo);
    m.insert("nl", WordOrder::Svo);

    m
});

/// Word order of a language tag, if known
pub fn word_order(code: &str) -> Option<WordOrder> {
    let primary = primary_subtag(code);
    let key = if primary.len() == 3 {
        normalize_to_part1_or_part2t(&primary).unwrap_or(primary)
    } else {
        primary
    };
    WORD_ORDER.get(key.as_str()).copied()
}

/// True when both languages are known and share a basic word order
pub fn same_word_order(source: &str, target: &str) -> bool {
    match (word_order(source), word_order(target)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
