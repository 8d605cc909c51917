use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub compression: CompressionConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Ceiling for a whole request body, multipart framing included
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: ByteSize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_max_body_bytes() -> ByteSize {
    ByteSize::mebibytes(16)
}

/// Cross-origin policy applied to every route
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    /// `"*"` allows any origin
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin == "*")
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

/// Ghostscript discovery and invocation settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompressionConfig {
    /// Executable names searched on `PATH`, in order; entries with a path separator are used as-is
    #[serde(default = "default_binaries")]
    pub binaries: Vec<String>,
    /// Search PATH once per process instead of once per request
    #[serde(default = "default_cache_lookup")]
    pub cache_lookup: bool,
    /// Unset means the child process may run indefinitely
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Parent directory for per-request scratch directories (system temp dir when unset)
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

impl CompressionConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            binaries: default_binaries(),
            cache_lookup: default_cache_lookup(),
            timeout_secs: None,
            scratch_dir: None,
        }
    }
}

fn default_binaries() -> Vec<String> {
    ["gswin64c", "gs", "gswin32c"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_cache_lookup() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.server.max_body_bytes.as_u64(), 16 * 1024 * 1024);
        assert!(config.cors.allows_any_origin());
        assert_eq!(config.compression.binaries, vec!["gswin64c", "gs", "gswin32c"]);
        assert!(config.compression.cache_lookup);
        assert!(config.compression.timeout().is_none());
    }

    #[test]
    fn test_timeout_conversion() {
        let compression = CompressionConfig {
            timeout_secs: Some(90),
            ..CompressionConfig::default()
        };
        assert_eq!(compression.timeout(), Some(Duration::from_secs(90)));
    }
}
