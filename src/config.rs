//! config
//!
//! Connection configuration schema and loading.
//!
//! # Location
//!
//! The host decides where configuration lives; this module only parses and
//! validates a TOML document:
//!
//! ```toml
//! server_url = "https://gitlab.example.com"
//! token = "glpat-xxx"
//! timeout_secs = 10
//! resolve_mode = "pinned"
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing; an invalid configuration never
//! reaches the client.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::heads::ResolveMode;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML or violates the schema.
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is invalid.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Connection settings for one GitLab deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionConfig {
    /// GitLab server URL (e.g. `https://gitlab.example.com`).
    pub server_url: String,

    /// Private token; omit for anonymous access to public projects.
    pub token: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// How literal discovery-time hashes are treated at resolution.
    pub resolve_mode: ResolveMode,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            resolve_mode: ResolveMode::default(),
        }
    }
}

impl ConnectionConfig {
    /// Parse and validate a configuration document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML and
    /// `ConfigError::InvalidValue` for schema-valid but unusable values.
    pub fn from_toml(document: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let document = std::fs::read_to_string(path)?;
        Self::from_toml(&document)
    }

    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue("server_url is required".into()));
        }
        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(format!(
                "server_url must be an absolute http(s) URL, got '{}'",
                self.server_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// The v4 API base URL derived from the server URL.
    pub fn api_base(&self) -> String {
        format!("{}/api/v4", self.server_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let config =
            ConnectionConfig::from_toml(r#"server_url = "https://gitlab.example.com""#).unwrap();
        assert_eq!(config.server_url, "https://gitlab.example.com");
        assert!(config.token.is_none());
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.resolve_mode, ResolveMode::Pinned);
    }

    #[test]
    fn full_config_parses() {
        let config = ConnectionConfig::from_toml(
            r#"
            server_url = "https://gitlab.example.com/"
            token = "glpat-xxx"
            timeout_secs = 30
            resolve_mode = "refetch"
            "#,
        )
        .unwrap();
        assert_eq!(config.token.as_deref(), Some("glpat-xxx"));
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.resolve_mode, ResolveMode::Refetch);
    }

    #[test]
    fn api_base_strips_trailing_slash() {
        let config =
            ConnectionConfig::from_toml(r#"server_url = "https://gitlab.example.com/""#).unwrap();
        assert_eq!(config.api_base(), "https://gitlab.example.com/api/v4");
    }

    #[test]
    fn missing_server_url_is_invalid() {
        assert!(matches!(
            ConnectionConfig::from_toml(r#"token = "glpat-xxx""#),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn relative_server_url_is_invalid() {
        assert!(matches!(
            ConnectionConfig::from_toml(r#"server_url = "gitlab.example.com""#),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn zero_timeout_is_invalid() {
        assert!(matches!(
            ConnectionConfig::from_toml(
                r#"
                server_url = "https://gitlab.example.com"
                timeout_secs = 0
                "#
            ),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(matches!(
            ConnectionConfig::from_toml(
                r#"
                server_url = "https://gitlab.example.com"
                unknown_field = true
                "#
            ),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_reads_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, r#"server_url = "https://gitlab.example.com""#).unwrap();

        let config = ConnectionConfig::load(&path).unwrap();
        assert_eq!(config.server_url, "https://gitlab.example.com");
    }
}
