//! Configuration management for Askdesk
//!
//! This module handles loading, parsing, and validating configuration
//! from the YAML config file and CLI overrides.

use crate::error::{AskdeskError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Askdesk
///
/// Holds everything needed to reach the document Q&A backend: the server
/// location and the credentials profile used for login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Backend server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the document Q&A API (e.g. `https://ask.example.com`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds for non-ask calls
    ///
    /// Ask requests are not bounded by this timeout; a hung answer is
    /// resolved by explicit user cancellation instead.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Email used for `askdesk login` when `--email` is not given
    #[serde(default)]
    pub email: Option<String>,

    /// Keyring service name under which the bearer token is stored
    #[serde(default = "default_keyring_service")]
    pub keyring_service: String,
}

fn default_keyring_service() -> String {
    "askdesk".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            email: None,
            keyring_service: default_keyring_service(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// A missing file is not an error: defaults are used so that
    /// `askdesk --server <url> ...` works without any config on disk.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file
    /// * `server_override` - Optional base URL override from the CLI
    ///
    /// # Examples
    ///
    /// ```
    /// use askdesk::config::Config;
    ///
    /// let config = Config::load("does/not/exist.yaml", None).unwrap();
    /// assert_eq!(config.server.base_url, "http://localhost:8000");
    /// ```
    pub fn load<P: AsRef<Path>>(path: P, server_override: Option<&str>) -> Result<Config> {
        let mut config = if path.as_ref().exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| AskdeskError::Config(format!("Failed to read config file: {}", e)))?;
            serde_yaml::from_str(&contents)
                .map_err(|e| AskdeskError::Config(format!("Failed to parse config file: {}", e)))?
        } else {
            tracing::debug!(
                "Config file {} not found, using defaults",
                path.as_ref().display()
            );
            Config::default()
        };

        if let Some(url) = server_override {
            config.server.base_url = url.to_string();
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is empty or has no scheme.
    pub fn validate(&self) -> Result<()> {
        let url = self.server.base_url.trim();
        if url.is_empty() {
            return Err(AskdeskError::Config("server.base_url must not be empty".to_string()).into());
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(AskdeskError::Config(format!(
                "server.base_url must start with http:// or https://, got '{}'",
                url
            ))
            .into());
        }
        if self.server.timeout_secs == 0 {
            return Err(
                AskdeskError::Config("server.timeout_secs must be positive".to_string()).into(),
            );
        }
        Ok(())
    }

    /// Base URL with any trailing slash removed
    pub fn base_url(&self) -> String {
        self.server.base_url.trim_end_matches('/').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.base_url, "http://localhost:8000");
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.auth.keyring_service, "askdesk");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load("no/such/config.yaml", None).unwrap();
        assert_eq!(config.server.base_url, "http://localhost:8000");
    }

    #[test]
    fn test_load_parses_yaml_and_applies_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server:\n  base_url: https://ask.example.com\nauth:\n  email: me@example.com"
        )
        .unwrap();

        let config = Config::load(file.path(), None).unwrap();
        assert_eq!(config.server.base_url, "https://ask.example.com");
        assert_eq!(config.auth.email.as_deref(), Some("me@example.com"));

        let config = Config::load(file.path(), Some("http://127.0.0.1:9000")).unwrap();
        assert_eq!(config.server.base_url, "http://127.0.0.1:9000");
    }

    #[test]
    fn test_validate_rejects_empty_base_url() {
        let mut config = Config::default();
        config.server.base_url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_missing_scheme() {
        let mut config = Config::default();
        config.server.base_url = "ask.example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_base_url_strips_trailing_slash() {
        let mut config = Config::default();
        config.server.base_url = "https://ask.example.com/".to_string();
        assert_eq!(config.base_url(), "https://ask.example.com");
    }
}
