/*!
 * Tests for error types, conversions and warnings
 */

use deckglot::deck::ContainerKind;
use deckglot::errors::{
    AppError, DeckError, FallbackResolution, ProviderError, SlotMappingError, TranslationError, Warning,
};
use deckglot::translation::SlotId;

#[test]
fn test_providerError_apiError_shouldDisplayStatusAndMessage() {
    let error = ProviderError::ApiError {
        status_code: 400,
        message: "Bad request".to_string(),
    };
    let display = format!("{}", error);
    assert!(display.contains("400"));
    assert!(display.contains("Bad request"));
}

#[test]
fn test_providerError_authenticationError_shouldDisplayCorrectly() {
    let error = ProviderError::AuthenticationError("Invalid API key".to_string());
    let display = format!("{}", error);
    assert!(display.contains("Authentication error"));
    assert!(display.contains("Invalid API key"));
}

#[test]
fn test_translationError_fromProviderError_shouldWrapCorrectly() {
    let provider_error = ProviderError::RateLimitExceeded("slow down".to_string());
    let translation_error: TranslationError = provider_error.into();

    assert!(matches!(translation_error, TranslationError::Provider(_)));
    assert!(translation_error.to_string().contains("slow down"));
}

#[test]
fn test_appError_fromDeckError_shouldWrapCorrectly() {
    let app_error: AppError = DeckError::MissingPart("ppt/slides/slide9.xml".to_string()).into();
    assert!(matches!(app_error, AppError::Deck(_)));
    assert!(app_error.to_string().contains("slide9.xml"));

    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    assert!(matches!(AppError::from(io_error), AppError::File(_)));
}

#[test]
fn test_slotMappingError_shouldNameTheSlot() {
    let slot = SlotId::new(ContainerKind::TableCell, 1, 0);
    assert_eq!(SlotMappingError::Missing(slot).to_string(), "slot C1.P0 missing from response");
    assert!(SlotMappingError::Duplicate(slot, 2).to_string().contains("2 times"));
}

#[test]
fn test_warning_slide_shouldReportOwningSlide() {
    let slot = SlotId::new(ContainerKind::TextFrame, 0, 2);
    let warning = Warning::SpliceAmbiguity {
        slide: 4,
        slot,
        span_text: "World".to_string(),
        resolution: FallbackResolution::FirstToken("Mundo".to_string()),
    };
    assert_eq!(warning.slide(), Some(4));
    let display = warning.to_string();
    assert!(display.contains("slide 4"));
    assert!(display.contains("T0.P2"));
    assert!(display.contains("'Mundo'"));

    let summary = Warning::SummaryUnavailable {
        message: "timed out".to_string(),
    };
    assert_eq!(summary.slide(), None);
}
