use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Database timeout is positive
/// - Bus topic capacity is positive
/// - Bus URL, when set, is not blank
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.database.timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "database.timeout_ms must be greater than 0".to_string(),
        ));
    }

    if config.bus.capacity == 0 {
        return Err(ConfigError::ValidationError(
            "bus.capacity must be greater than 0".to_string(),
        ));
    }

    if let Some(url) = &config.bus.url {
        if url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "bus.url cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}
