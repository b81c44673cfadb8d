//! Server configuration from environment variables.
//!
//! - `PACKRAT_HOSTNAME`: externally visible host (and port) used when
//!   building upload-response URLs. Default: `localhost:3000`.

use std::env;

/// Hostname used in upload-response URLs when none is configured.
pub const DEFAULT_HOSTNAME: &str = "localhost:3000";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Externally visible hostname, e.g. `files.example.com` or
    /// `localhost:3000`. Only used to render URLs, never to bind.
    pub hostname: String,
}

impl ServerConfig {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            hostname: env::var("PACKRAT_HOSTNAME").unwrap_or_else(|_| DEFAULT_HOSTNAME.to_string()),
        }
    }

    /// Create a config with a specific hostname.
    pub fn with_hostname(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
        }
    }
}
