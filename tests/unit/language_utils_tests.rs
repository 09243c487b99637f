/*!
 * Tests for language utility functions
 */

use deckglot::language_utils::{
    LanguageCodeType, WordOrder, display_name, get_language_name, language_codes_match, normalize_to_part1_or_part2t,
    normalize_to_part2t, same_word_order, validate_language_code, word_order,
};

/// Test validation of language codes
#[test]
fn test_validate_language_code_withValidCodes_shouldReturnCorrectType() {
    // ISO 639-1 tests
    assert!(matches!(validate_language_code("en").unwrap(), LanguageCodeType::Part1));
    assert!(matches!(validate_language_code("ko").unwrap(), LanguageCodeType::Part1));

    // ISO 639-2/T tests
    assert!(matches!(validate_language_code("eng").unwrap(), LanguageCodeType::Part2T));
    assert!(matches!(validate_language_code("deu").unwrap(), LanguageCodeType::Part2T));

    // ISO 639-2/B tests
    assert!(matches!(validate_language_code("fre").unwrap(), LanguageCodeType::Part2B));
    assert!(matches!(validate_language_code("ger").unwrap(), LanguageCodeType::Part2B));

    // Regional tags are judged by their primary subtag
    assert!(matches!(validate_language_code("pt-BR").unwrap(), LanguageCodeType::Part1));
    assert!(matches!(validate_language_code(" ZH_Hans ").unwrap(), LanguageCodeType::Part1));

    // Invalid codes
    assert!(validate_language_code("xyz").is_err());
    assert!(validate_language_code("123").is_err());
    assert!(validate_language_code("e").is_err());
}

/// Test normalization of language codes
#[test]
fn test_normalize_withValidCodes_shouldNormalizeCorrectly() {
    assert_eq!(normalize_to_part2t("en").unwrap(), "eng");
    assert_eq!(normalize_to_part2t("fre").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("ja-JP").unwrap(), "jpn");
    assert!(normalize_to_part2t("zz").is_err());

    assert_eq!(normalize_to_part1_or_part2t("deu").unwrap(), "de");
    assert_eq!(normalize_to_part1_or_part2t("ger").unwrap(), "de");
}

/// Test matching of different language code formats
#[test]
fn test_language_codes_match_withMatchingCodes_shouldReturnTrue() {
    assert!(language_codes_match("en", "eng"));
    assert!(language_codes_match("fr", "fre"));
    assert!(language_codes_match("en-GB", "en-US"));
    assert!(!language_codes_match("en", "fra"));
    assert!(!language_codes_match("xx", "xx"));
}

/// Test retrieval of language names from codes
#[test]
fn test_get_language_name_withValidCodes_shouldReturnCorrectName() {
    assert_eq!(get_language_name("en").unwrap(), "English");
    assert_eq!(get_language_name("fra").unwrap(), "French");
    assert!(get_language_name("xyz").is_err());

    // Prompts fall back to the raw code
    assert_eq!(display_name("qq"), "qq");
}

/// Word order decides how far positional placement is trusted
#[test]
fn test_wordOrder_withKnownLanguages_shouldClassify() {
    assert_eq!(word_order("en"), Some(WordOrder::Svo));
    assert_eq!(word_order("kor"), Some(WordOrder::Sov));
    assert_eq!(word_order("ar-EG"), Some(WordOrder::Vso));
    assert_eq!(word_order("haw"), None);

    assert!(same_word_order("en", "fr"));
    assert!(!same_word_order("en", "ja"));
    assert!(!same_word_order("en", "haw"));
}
