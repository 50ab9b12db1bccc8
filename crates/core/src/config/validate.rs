use super::{
    types::{AuthMethod, Config},
    ConfigError,
};

/// Longest token lifetime accepted from configuration (one year).
pub const MAX_TTL_HOURS: u32 = 24 * 366;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - An API key is present when the api_key auth method is selected
/// - The ad page URL is set
/// - Token TTL (1..=MAX_TTL_HOURS), length and sweep interval are usable
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::ApiKey
        && !matches!(config.auth.api_key.as_deref(), Some(k) if !k.is_empty())
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key must be set when auth.method = \"api_key\"".to_string(),
        ));
    }

    if config.bot.ad_page_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "bot.ad_page_url cannot be empty".to_string(),
        ));
    }

    if config.tokens.ttl_hours == 0 {
        return Err(ConfigError::ValidationError(
            "tokens.ttl_hours cannot be 0".to_string(),
        ));
    }

    if config.tokens.ttl_hours > MAX_TTL_HOURS {
        return Err(ConfigError::ValidationError(format!(
            "tokens.ttl_hours must be at most {}, got {}",
            MAX_TTL_HOURS, config.tokens.ttl_hours
        )));
    }

    if !(16..=64).contains(&config.tokens.token_length) {
        return Err(ConfigError::ValidationError(format!(
            "tokens.token_length must be between 16 and 64, got {}",
            config.tokens.token_length
        )));
    }

    if config.tokens.sweep_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "tokens.sweep_interval_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}
