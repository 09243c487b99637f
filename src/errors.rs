/*!
 * Error types for the deckglot application.
 *
 * Each layer has its own error enum, defined with thiserror. Only deck
 * errors raised while opening the source or saving the result are fatal;
 * everything else is contained at the slide or paragraph that produced it
 * and reported as a [`Warning`].
 */

use std::fmt;

use thiserror::Error;

use crate::translation::unit::SlotId;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The request did not complete in time
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),
}

/// Errors raised while reading or writing the presentation package
#[derive(Error, Debug)]
pub enum DeckError {
    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The package is not a readable zip archive
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A part could not be parsed or serialized as XML
    #[error("XML error in {part}: {message}")]
    Xml {
        /// Package part name, or "<inline>" for standalone documents
        part: String,
        /// Parser message
        message: String,
    },

    /// A part referenced by the package structure does not exist
    #[error("Missing package part: {0}")]
    MissingPart(String),

    /// The input is not a presentation this tool understands
    #[error("Unsupported input: {0}")]
    Unsupported(String),
}

/// A paragraph whose run structure cannot be modelled safely
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    /// A run carries more than one text element
    #[error("paragraph {paragraph}: run {run} has {count} text elements")]
    MultipleTextNodes {
        paragraph: usize,
        run: usize,
        count: usize,
    },

    /// A run's text element contains markup instead of plain text
    #[error("paragraph {paragraph}: run {run} text contains nested element <{element}>")]
    NestedMarkup {
        paragraph: usize,
        run: usize,
        element: String,
    },

    /// A run appears inside another run
    #[error("paragraph {paragraph}: run {run} is nested inside another run")]
    NestedRun { paragraph: usize, run: usize },
}

impl ExtractionError {
    /// Index of the paragraph the error is scoped to
    pub fn paragraph(&self) -> usize {
        match self {
            Self::MultipleTextNodes { paragraph, .. }
            | Self::NestedMarkup { paragraph, .. }
            | Self::NestedRun { paragraph, .. } => *paragraph,
        }
    }
}

/// Slot identifiers in a response that do not line up with the request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SlotMappingError {
    /// A requested slot has no answer
    #[error("slot {0} missing from response")]
    Missing(SlotId),

    /// The response names a slot that was never requested
    #[error("response contains unrecognized slot '{0}'")]
    Unrecognized(String),

    /// A requested slot was answered more than once
    #[error("slot {0} answered {1} times")]
    Duplicate(SlotId, usize),
}

/// Errors that can occur during translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The service answered, but not in the expected shape
    #[error("Malformed translation response: {0}")]
    Format(String),

    /// The service did not answer within the configured time
    #[error("Translation request timed out after {0} seconds")]
    Timeout(u64),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the deck package
    #[error("Deck error: {0}")]
    Deck(#[from] DeckError),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

/// How a style span without a confident anchor was placed
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackResolution {
    /// The style was applied to this token of the translated text
    FirstToken(String),
    /// No free token was left; the emphasis was dropped
    Dropped,
}

/// Non-fatal problems collected while translating a deck
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// A paragraph was skipped because its runs could not be modelled
    Extraction { slide: usize, error: ExtractionError },

    /// A slot could not be mapped from the batch response
    SlotMapping { slide: usize, error: SlotMappingError },

    /// The batch request for a whole slide failed
    BatchFailed { slide: usize, message: String },

    /// A paragraph kept its source text after fallback also failed
    FallbackFailed {
        slide: usize,
        slot: SlotId,
        message: String,
    },

    /// A style span was placed by the first-token fallback
    SpliceAmbiguity {
        slide: usize,
        slot: SlotId,
        span_text: String,
        resolution: FallbackResolution,
    },

    /// A new run's script could not be classified; its font was left alone
    FontScriptUnknown {
        slide: usize,
        slot: SlotId,
        text: String,
    },

    /// The presentation summary could not be produced
    SummaryUnavailable { message: String },
}

impl Warning {
    /// Slide the warning belongs to, if any
    pub fn slide(&self) -> Option<usize> {
        match self {
            Self::Extraction { slide, .. }
            | Self::SlotMapping { slide, .. }
            | Self::BatchFailed { slide, .. }
            | Self::FallbackFailed { slide, .. }
            | Self::SpliceAmbiguity { slide, .. }
            | Self::FontScriptUnknown { slide, .. } => Some(*slide),
            Self::SummaryUnavailable { .. } => None,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extraction { slide, error } => {
                write!(f, "slide {}: paragraph skipped, {}", slide, error)
            }
            Self::SlotMapping { slide, error } => write!(f, "slide {}: {}", slide, error),
            Self::BatchFailed { slide, message } => {
                write!(f, "slide {}: batch translation failed: {}", slide, message)
            }
            Self::FallbackFailed {
                slide,
                slot,
                message,
            } => write!(
                f,
                "slide {}: {} kept in source language: {}",
                slide, slot, message
            ),
            Self::SpliceAmbiguity {
                slide,
                slot,
                span_text,
                resolution,
            } => match resolution {
                FallbackResolution::FirstToken(token) => write!(
                    f,
                    "slide {}: {} style of '{}' moved to first free token '{}'",
                    slide, slot, span_text, token
                ),
                FallbackResolution::Dropped => write!(
                    f,
                    "slide {}: {} style of '{}' dropped, no free token",
                    slide, slot, span_text
                ),
            },
            Self::FontScriptUnknown { slide, slot, text } => write!(
                f,
                "slide {}: {} script of '{}' not recognised, font unchanged",
                slide, slot, text
            ),
            Self::SummaryUnavailable { message } => {
                write!(f, "presentation summary unavailable: {}", message)
            }
        }
    }
}
