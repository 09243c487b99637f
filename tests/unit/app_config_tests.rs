/*!
 * Tests for application configuration functionality
 */

use std::collections::HashMap;

use deckglot::app_config::{
    Config, LogLevel, ProviderConfig, TranslationCommonConfig, TranslationProvider, ENV_ANTHROPIC_API_KEY,
    ENV_AZURE_API_KEY, ENV_AZURE_DEPLOYMENT, ENV_AZURE_ENDPOINT,
};

fn valid_azure_config() -> Config {
    let mut config = Config::default();
    let azure = config.translation.provider_config_mut(&TranslationProvider::AzureOpenAI);
    azure.api_key = "test-key".to_string();
    azure.endpoint = "https://contoso.openai.azure.com".to_string();
    config
}

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_language, "en");
    assert_eq!(config.target_language, "fr");
    assert_eq!(config.translation.provider, TranslationProvider::AzureOpenAI);
    assert_eq!(config.log_level, LogLevel::Info);

    let common = &config.translation.common;
    assert_eq!(common.terminology_window, 3);
    assert_eq!(common.summary_slides, 5);
    assert!(common.request_timeout_secs > 0);
    assert!(config.fonts.enabled);
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = valid_azure_config();
    assert!(config.validate().is_ok());

    // Invalid source language
    config.source_language = "xyz".to_string();
    assert!(config.validate().is_err());
    config.source_language = "en-US".to_string();
    assert!(config.validate().is_ok());

    // Invalid target language
    config.target_language = "".to_string();
    assert!(config.validate().is_err());
    config.target_language = "ko".to_string();

    // Azure without an endpoint
    config
        .translation
        .provider_config_mut(&TranslationProvider::AzureOpenAI)
        .endpoint = String::new();
    assert!(config.validate().is_err());

    // Anthropic without a key, then with one
    config.translation.provider = TranslationProvider::Anthropic;
    assert!(config.validate().is_err());
    config
        .translation
        .provider_config_mut(&TranslationProvider::Anthropic)
        .api_key = "sk-ant-test".to_string();
    assert!(config.validate().is_ok());

    // Out of range confidence
    config.splice.min_confidence = 1.5;
    assert!(config.validate().is_err());
}

/// Environment credentials override the file
#[test]
fn test_applyEnvWith_shouldOverrideCredentials() {
    let mut config = Config::default();
    let env: HashMap<&str, &str> = HashMap::from([
        (ENV_AZURE_ENDPOINT, "https://env.openai.azure.com"),
        (ENV_AZURE_API_KEY, "env-key"),
        (ENV_AZURE_DEPLOYMENT, "gpt-4o-deck"),
        (ENV_ANTHROPIC_API_KEY, "anthropic-env-key"),
    ]);
    config.apply_env_with(|key| env.get(key).map(|v| v.to_string()));

    assert_eq!(config.translation.get_endpoint(), "https://env.openai.azure.com");
    assert_eq!(config.translation.get_api_key(), "env-key");
    assert_eq!(config.translation.get_model(), "gpt-4o-deck");
    assert!(config.validate().is_ok());

    config.translation.provider = TranslationProvider::Anthropic;
    assert_eq!(config.translation.get_api_key(), "anthropic-env-key");
}

/// A config file with only the essentials fills in every default
#[test]
fn test_deserialize_withMinimalJson_shouldFillDefaults() {
    let json = r#"{
        "source_language": "en",
        "target_language": "ja",
        "translation": { "provider": "openai" }
    }"#;
    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.translation.provider, TranslationProvider::OpenAI);
    assert_eq!(config.translation.common.retry_count, 3);
    assert_eq!(config.splice.min_confidence, 0.6);
    assert!(config.splice.positional_same_order < config.splice.min_confidence);
    assert!(config.splice.positional_other_order < config.splice.min_confidence);
    assert_eq!(config.log_level, LogLevel::Info);
}

/// Test that common configuration provides reasonable default values
#[test]
fn test_commonConfigDefaults_shouldProvideReasonableValues() {
    let common_config = TranslationCommonConfig::default();

    assert_eq!(common_config.retry_count, 3);
    assert_eq!(common_config.retry_backoff_ms, 1000);
    assert!(common_config.temperature >= 0.0 && common_config.temperature <= 1.0);
    assert!(common_config.summary_temperature <= common_config.temperature);
}

/// Test that each provider has appropriate default rate limits
#[test]
fn test_providerSpecificDefaults_shouldHaveCorrectRateLimits() {
    let openai_config = ProviderConfig::new(TranslationProvider::OpenAI);
    assert_eq!(openai_config.rate_limit, Some(60));

    // Anthropic should have a conservative rate limit (45 < 50 limit)
    let anthropic_config = ProviderConfig::new(TranslationProvider::Anthropic);
    assert_eq!(anthropic_config.rate_limit, Some(45));

    let azure_config = ProviderConfig::new(TranslationProvider::AzureOpenAI);
    assert_eq!(azure_config.provider_type, "azure");
    assert!(azure_config.endpoint.is_empty());
}
