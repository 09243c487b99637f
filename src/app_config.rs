use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::default::Default;

use crate::translation::fonts::Script;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings. Credentials may also come
/// from the environment, which takes precedence over the file.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO)
    pub source_language: String,

    /// Target language code (ISO)
    pub target_language: String,

    /// Translation config
    pub translation: TranslationConfig,

    /// Style relocation settings
    #[serde(default)]
    pub splice: SpliceConfig,

    /// Script-specific font settings
    #[serde(default)]
    pub fonts: FontConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Azure OpenAI deployment
    #[default]
    #[serde(rename = "azure")]
    AzureOpenAI,
    // @provider: OpenAI
    OpenAI,
    // @provider: Anthropic
    Anthropic,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::AzureOpenAI => "Azure OpenAI",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::AzureOpenAI => "azure".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
        }
    }
}

// Implement Display trait for TranslationProvider
impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

// Implement FromStr trait for TranslationProvider
impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "azure" | "azureopenai" | "azure-openai" => Ok(Self::AzureOpenAI),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name; the deployment name for Azure
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: API version (Azure only)
    #[serde(default = "String::new")]
    pub api_version: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Rate limit (requests per minute)
    #[serde(default)]
    pub rate_limit: Option<u32>,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        match provider_type {
            TranslationProvider::AzureOpenAI => Self {
                provider_type: "azure".to_string(),
                model: default_azure_deployment(),
                api_key: String::new(),
                endpoint: String::new(),
                api_version: default_azure_api_version(),
                timeout_secs: default_timeout_secs(),
                rate_limit: default_openai_rate_limit(),
            },
            TranslationProvider::OpenAI => Self {
                provider_type: "openai".to_string(),
                model: default_openai_model(),
                api_key: String::new(),
                endpoint: default_openai_endpoint(),
                api_version: String::new(),
                timeout_secs: default_timeout_secs(),
                rate_limit: default_openai_rate_limit(),
            },
            TranslationProvider::Anthropic => Self {
                provider_type: "anthropic".to_string(),
                model: default_anthropic_model(),
                api_key: String::new(),
                endpoint: default_anthropic_endpoint(),
                api_version: String::new(),
                timeout_secs: default_timeout_secs(),
                rate_limit: default_anthropic_rate_limit(),
            },
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff multiplier for retries (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Temperature for slide translation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Temperature for the presentation summary
    #[serde(default = "default_summary_temperature")]
    pub summary_temperature: f32,

    /// Time allowed for one translation call before falling back, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Number of leading slides the presentation summary is computed from
    #[serde(default = "default_summary_slides")]
    pub summary_slides: usize,

    /// Number of recent slides whose term pairs are kept
    #[serde(default = "default_terminology_window")]
    pub terminology_window: usize,

    /// Maximum term pairs rendered into one prompt
    #[serde(default = "default_max_terminology_pairs")]
    pub max_terminology_pairs: usize,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
            summary_temperature: default_summary_temperature(),
            request_timeout_secs: default_request_timeout_secs(),
            summary_slides: default_summary_slides(),
            terminology_window: default_terminology_window(),
            max_terminology_pairs: default_max_terminology_pairs(),
        }
    }
}

/// How accent spans are relocated in translated text
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpliceConfig {
    /// Minimum confidence for an anchor to be accepted
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,

    /// Confidence of positional projection when both languages share a word
    /// order; raise it above `min_confidence` to let projection place spans
    #[serde(default = "default_positional_same_order")]
    pub positional_same_order: f32,

    /// Confidence of positional projection otherwise
    #[serde(default = "default_positional_other_order")]
    pub positional_other_order: f32,
}

impl Default for SpliceConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            positional_same_order: default_positional_same_order(),
            positional_other_order: default_positional_other_order(),
        }
    }
}

/// Font assignment for translated runs
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FontConfig {
    /// Whether script fonts are applied at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Per-script typeface; an empty name keeps the inherited font
    #[serde(default)]
    pub overrides: HashMap<Script, String>,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            overrides: HashMap::new(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_retry_count() -> u32 {
    3 // Default to 3 retries
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_temperature() -> f32 {
    0.3
}

fn default_summary_temperature() -> f32 {
    0.2
}

fn default_summary_slides() -> usize {
    5
}

fn default_terminology_window() -> usize {
    3
}

fn default_max_terminology_pairs() -> usize {
    30
}

fn default_min_confidence() -> f32 {
    0.6
}

fn default_positional_same_order() -> f32 {
    0.5 // below min_confidence: projection alone cannot see a reordered sentence
}

fn default_positional_other_order() -> f32 {
    0.3
}

fn default_true() -> bool {
    true
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_azure_api_version() -> String {
    "2025-04-01-preview".to_string()
}

fn default_azure_deployment() -> String {
    "gpt-4o".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-sonnet-latest".to_string()
}

fn default_anthropic_rate_limit() -> Option<u32> {
    // Slightly below the standard 50 requests per minute
    Some(45)
}

fn default_openai_rate_limit() -> Option<u32> {
    Some(60) // 60 requests per minute by default
}

/// Environment variables that override credentials from the file
pub const ENV_AZURE_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
pub const ENV_AZURE_API_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const ENV_AZURE_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";
pub const ENV_AZURE_DEPLOYMENT: &str = "AZURE_OPENAI_DEPLOYMENT_NAME";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validate languages
        let _source_name = crate::language_utils::get_language_name(&self.source_language)?;
        let _target_name = crate::language_utils::get_language_name(&self.target_language)?;

        let api_key = self.translation.get_api_key();
        if api_key.is_empty() {
            return Err(anyhow!(
                "Translation API key is required for {} provider",
                self.translation.provider.display_name()
            ));
        }

        if self.translation.provider == TranslationProvider::AzureOpenAI
            && self.translation.get_endpoint().is_empty()
        {
            return Err(anyhow!(
                "Azure OpenAI endpoint is required (set {} or the provider endpoint)",
                ENV_AZURE_ENDPOINT
            ));
        }

        if !(0.0..=1.0).contains(&self.splice.min_confidence) {
            return Err(anyhow!(
                "splice.min_confidence must be between 0 and 1, got {}",
                self.splice.min_confidence
            ));
        }

        if self.translation.common.request_timeout_secs == 0 {
            return Err(anyhow!("translation.common.request_timeout_secs must be positive"));
        }

        Ok(())
    }

    /// Apply credential overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()));
    }

    /// Apply credential overrides from an arbitrary variable lookup
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let azure = self
            .translation
            .provider_config_mut(&TranslationProvider::AzureOpenAI);
        if let Some(endpoint) = lookup(ENV_AZURE_ENDPOINT) {
            azure.endpoint = endpoint;
        }
        if let Some(key) = lookup(ENV_AZURE_API_KEY) {
            azure.api_key = key;
        }
        if let Some(version) = lookup(ENV_AZURE_API_VERSION) {
            azure.api_version = version;
        }
        if let Some(deployment) = lookup(ENV_AZURE_DEPLOYMENT) {
            azure.model = deployment;
        }

        if let Some(key) = lookup(ENV_OPENAI_API_KEY) {
            self.translation
                .provider_config_mut(&TranslationProvider::OpenAI)
                .api_key = key;
        }
        if let Some(key) = lookup(ENV_ANTHROPIC_API_KEY) {
            self.translation
                .provider_config_mut(&TranslationProvider::Anthropic)
                .api_key = key;
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "en".to_string(),
            target_language: "fr".to_string(),
            translation: TranslationConfig::default(),
            splice: SpliceConfig::default(),
            fonts: FontConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Provider configuration by type, created with defaults when missing
    pub fn provider_config_mut(&mut self, provider_type: &TranslationProvider) -> &mut ProviderConfig {
        let provider_str = provider_type.to_lowercase_string();
        let index = match self
            .available_providers
            .iter()
            .position(|p| p.provider_type == provider_str)
        {
            Some(index) => index,
            None => {
                self.available_providers
                    .push(ProviderConfig::new(provider_type.clone()));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[index]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        // Default fallback based on provider type
        match self.provider {
            TranslationProvider::AzureOpenAI => default_azure_deployment(),
            TranslationProvider::OpenAI => default_openai_model(),
            TranslationProvider::Anthropic => default_anthropic_model(),
        }
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        // Azure endpoints are per resource and have no default
        match self.provider {
            TranslationProvider::AzureOpenAI => String::new(),
            TranslationProvider::OpenAI => default_openai_endpoint(),
            TranslationProvider::Anthropic => default_anthropic_endpoint(),
        }
    }

    /// Get the API version for the active provider
    pub fn get_api_version(&self) -> String {
        match self.get_active_provider_config() {
            Some(p) if !p.api_version.is_empty() => p.api_version.clone(),
            _ if self.provider == TranslationProvider::AzureOpenAI => default_azure_api_version(),
            _ => String::new(),
        }
    }

    /// Get the HTTP timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|t| *t > 0)
            .unwrap_or_else(default_timeout_secs)
    }

    /// Get the rate limit for the active provider
    pub fn get_rate_limit(&self) -> Option<u32> {
        if let Some(provider_config) = self.get_active_provider_config() {
            return provider_config.rate_limit;
        }

        // Default fallback based on provider type
        match self.provider {
            TranslationProvider::AzureOpenAI | TranslationProvider::OpenAI => default_openai_rate_limit(),
            TranslationProvider::Anthropic => default_anthropic_rate_limit(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        let mut config = Self {
            provider: TranslationProvider::default(),
            available_providers: Vec::new(),
            common: TranslationCommonConfig::default(),
        };

        // Add default providers
        config
            .available_providers
            .push(ProviderConfig::new(TranslationProvider::AzureOpenAI));
        config
            .available_providers
            .push(ProviderConfig::new(TranslationProvider::OpenAI));
        config
            .available_providers
            .push(ProviderConfig::new(TranslationProvider::Anthropic));

        config
    }
}
