use super::models::Config;
use axum::http::HeaderValue;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.max_body_bytes must be positive")]
    ZeroBodyLimit,

    #[error("compression.timeout_secs must be positive when set")]
    ZeroTimeout,

    #[error("compression.binaries contains an empty entry at index {index}")]
    EmptyBinaryName { index: usize },

    #[error("cors.allowed_origins entry '{origin}' is not a valid header value")]
    InvalidOrigin { origin: String },

    #[error("cors.allowed_origins must not be empty")]
    NoOrigins,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_server(config)?;
    validate_cors(config)?;
    validate_compression(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    if config.server.max_body_bytes.as_u64() == 0 {
        return Err(ValidationError::ZeroBodyLimit);
    }
    Ok(())
}

fn validate_cors(config: &Config) -> Result<(), ValidationError> {
    if config.cors.allowed_origins.is_empty() {
        return Err(ValidationError::NoOrigins);
    }

    if config.cors.allows_any_origin() {
        return Ok(());
    }

    for origin in &config.cors.allowed_origins {
        if HeaderValue::from_str(origin).is_err() {
            return Err(ValidationError::InvalidOrigin {
                origin: origin.clone(),
            });
        }
    }

    Ok(())
}

/// An empty `binaries` list is allowed: it pins every request to the in-process fallback.
fn validate_compression(config: &Config) -> Result<(), ValidationError> {
    if config.compression.timeout_secs == Some(0) {
        return Err(ValidationError::ZeroTimeout);
    }

    if let Some(index) = config
        .compression
        .binaries
        .iter()
        .position(|name| name.trim().is_empty())
    {
        return Err(ValidationError::EmptyBinaryName { index });
    }

    Ok(())
}
