//! Configuration management for OpenBridge
//!
//! Loads configuration with priority:
//! 1. `OPENBRIDGE_*` environment variables (a `.env` file is honoured)
//! 2. openbridge.toml (or the file named by `OPENBRIDGE_CONFIG`)
//! 3. Defaults
//!
//! The resulting [`BridgeConfig`] is built once at process start and passed
//! explicitly to every component that needs it.

use crate::error::Error;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "openbridge.toml";
const ENV_PREFIX: &str = "OPENBRIDGE_";

/// Bounds for `request_timeout`, in seconds
pub const MIN_REQUEST_TIMEOUT: u64 = 1;
pub const MAX_REQUEST_TIMEOUT: u64 = 300;

/// OpenBridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Base URL of the PAD API server
    pub server_base_url: String,

    /// Path prefix of the versioned API
    pub api_prefix: String,

    /// Explicit OpenAPI document URL; derived from base URL and prefix when unset
    pub openapi_spec_url: Option<String>,

    /// Explicit ontology URL; derived from the base URL when unset
    pub ontology_url: Option<String>,

    /// API key sent as `X-API-Key` (can reference env var with ${VAR_NAME})
    pub api_key: Option<String>,

    /// Token sent as `Authorization: Bearer` (can reference env var with ${VAR_NAME})
    pub auth_token: Option<String>,

    /// Directory for downloaded and saved files
    pub filesystem_storage: PathBuf,

    /// Timeout for outbound HTTP requests, in seconds
    pub request_timeout: u64,

    /// Name announced by the MCP server
    pub mcp_name: String,

    /// Path substrings whose endpoints are never exposed as tools
    pub excluded_endpoint_patterns: Vec<String>,

    /// Path substring marking the binary endpoint that is persisted to disk
    pub binary_download_marker: String,

    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. "info" or "bridge_openapi=debug"
    pub level: String,

    /// Append logs to this file instead of stderr
    pub file: Option<PathBuf>,

    pub json: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            server_base_url: "https://pad.crc.nd.edu".to_string(),
            api_prefix: "/api-ld/v3".to_string(),
            openapi_spec_url: None,
            ontology_url: None,
            api_key: None,
            auth_token: None,
            filesystem_storage: PathBuf::from("./storage"),
            request_timeout: 30,
            mcp_name: "paper_analytical_devices".to_string(),
            excluded_endpoint_patterns: vec!["stream".to_string(), "webpage".to_string()],
            binary_download_marker: "download-image".to_string(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            json: false,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from the default locations.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, reading the given file when provided.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        // A missing .env file is the common case
        let _ = dotenvy::dotenv();

        let config_path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => env::var(format!("{ENV_PREFIX}CONFIG"))
                .ok()
                .map(PathBuf::from)
                .or_else(Self::find_config_file),
        };

        let mut config = match config_path {
            Some(config_path) => {
                tracing::debug!("Loading configuration from: {:?}", config_path);
                let contents = fs::read_to_string(&config_path)
                    .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
                Self::from_toml_str(&contents)
                    .with_context(|| format!("Failed to parse config file: {:?}", config_path))?
            }
            None => {
                tracing::debug!("No {} found, using defaults", CONFIG_FILE_NAME);
                Self::default()
            }
        };

        config.resolve_env_vars();
        config.apply_env_overrides(|key| env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML document; missing keys fall back to defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Find openbridge.toml by searching current directory and parents
    fn find_config_file() -> Option<PathBuf> {
        let mut current = env::current_dir().ok()?;

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Resolve ${VAR_NAME} references to environment variables
    fn resolve_env_vars(&mut self) {
        for value in [&mut self.api_key, &mut self.auth_token] {
            if let Some(raw) = value.as_deref() {
                *value = Self::resolve_env_var(raw).filter(|v| !v.is_empty());
            }
        }

        if let Some(resolved) = Self::resolve_env_var(&self.server_base_url) {
            self.server_base_url = resolved;
        }
    }

    /// Resolve a single ${VAR_NAME} reference
    fn resolve_env_var(value: &str) -> Option<String> {
        if value.starts_with("${") && value.ends_with('}') {
            let var_name = &value[2..value.len() - 1];
            env::var(var_name).ok()
        } else {
            Some(value.to_string())
        }
    }

    /// Override fields from `OPENBRIDGE_*` variables.
    ///
    /// `lookup` receives the full variable name and returns its value.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> crate::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = var("SERVER_BASE_URL") {
            self.server_base_url = v;
        }
        if let Some(v) = var("API_PREFIX") {
            self.api_prefix = v;
        }
        if let Some(v) = var("OPENAPI_SPEC_URL") {
            self.openapi_spec_url = Some(v);
        }
        if let Some(v) = var("ONTOLOGY_URL") {
            self.ontology_url = Some(v);
        }
        if let Some(v) = var("API_KEY") {
            self.api_key = Some(v).filter(|v| !v.is_empty());
        }
        if let Some(v) = var("AUTH_TOKEN") {
            self.auth_token = Some(v).filter(|v| !v.is_empty());
        }
        if let Some(v) = var("FILESYSTEM_STORAGE") {
            self.filesystem_storage = PathBuf::from(v);
        }
        if let Some(v) = var("REQUEST_TIMEOUT") {
            self.request_timeout = v.trim().parse().map_err(|_| {
                Error::config_error(format!(
                    "{ENV_PREFIX}REQUEST_TIMEOUT must be a whole number of seconds, got '{v}'"
                ))
            })?;
        }
        if let Some(v) = var("MCP_NAME") {
            self.mcp_name = v;
        }
        if let Some(v) = var("EXCLUDED_ENDPOINT_PATTERNS") {
            self.excluded_endpoint_patterns = v
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = var("BINARY_DOWNLOAD_MARKER") {
            self.binary_download_marker = v;
        }
        if let Some(v) = var("LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = var("LOG_FILE") {
            self.logging.file = Some(PathBuf::from(v));
        }
        if let Some(v) = var("LOG_JSON") {
            self.logging.json = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }

        Ok(())
    }

    /// Check value ranges and URL shape.
    pub fn validate(&self) -> crate::Result<()> {
        if !(MIN_REQUEST_TIMEOUT..=MAX_REQUEST_TIMEOUT).contains(&self.request_timeout) {
            return Err(Error::config_error(format!(
                "request_timeout must be between {} and {} seconds, got {}",
                MIN_REQUEST_TIMEOUT, MAX_REQUEST_TIMEOUT, self.request_timeout
            )));
        }

        let base = url::Url::parse(&self.server_base_url).map_err(|e| {
            Error::config_error(format!(
                "server_base_url '{}' is not a valid URL: {}",
                self.server_base_url, e
            ))
        })?;
        if base.cannot_be_a_base() {
            return Err(Error::config_error(format!(
                "server_base_url '{}' must be an absolute http(s) URL",
                self.server_base_url
            )));
        }

        if self.mcp_name.trim().is_empty() {
            return Err(Error::config_error("mcp_name must not be empty"));
        }

        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.server_base_url.trim_end_matches('/')
    }

    pub fn openapi_spec_url(&self) -> String {
        self.openapi_spec_url
            .clone()
            .unwrap_or_else(|| format!("{}{}/openapi.json", self.base_url(), self.api_prefix))
    }

    pub fn ontology_url(&self) -> String {
        self.ontology_url
            .clone()
            .unwrap_or_else(|| format!("{}/ontology/ontology.ttl", self.base_url()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn has_auth(&self) -> bool {
        self.api_key.is_some() || self.auth_token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.request_timeout, 30);
        assert_eq!(config.excluded_endpoint_patterns, vec!["stream", "webpage"]);
        assert_eq!(
            config.openapi_spec_url(),
            "https://pad.crc.nd.edu/api-ld/v3/openapi.json"
        );
        assert_eq!(
            config.ontology_url(),
            "https://pad.crc.nd.edu/ontology/ontology.ttl"
        );
        assert!(!config.has_auth());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = BridgeConfig::from_toml_str(
            r#"
server_base_url = "http://localhost:9000/"
api_key = "k-123"

[logging]
level = "debug"
"#,
        )
        .unwrap();

        assert_eq!(config.base_url(), "http://localhost:9000");
        assert_eq!(config.api_key.as_deref(), Some("k-123"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.mcp_name, "paper_analytical_devices");
        assert_eq!(
            config.openapi_spec_url(),
            "http://localhost:9000/api-ld/v3/openapi.json"
        );
    }

    #[test]
    fn test_env_overrides() {
        let mut config = BridgeConfig::default();
        config
            .apply_env_overrides(lookup(&[
                ("OPENBRIDGE_AUTH_TOKEN", "tok"),
                ("OPENBRIDGE_REQUEST_TIMEOUT", "12"),
                ("OPENBRIDGE_EXCLUDED_ENDPOINT_PATTERNS", "stream, admin ,"),
                ("OPENBRIDGE_LOG_JSON", "true"),
            ]))
            .unwrap();

        assert_eq!(config.auth_token.as_deref(), Some("tok"));
        assert_eq!(config.request_timeout(), Duration::from_secs(12));
        assert_eq!(config.excluded_endpoint_patterns, vec!["stream", "admin"]);
        assert!(config.logging.json);
        assert!(config.has_auth());
    }

    #[test]
    fn test_bad_timeout_override_is_config_error() {
        let mut config = BridgeConfig::default();
        let err = config
            .apply_env_overrides(lookup(&[("OPENBRIDGE_REQUEST_TIMEOUT", "soon")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_timeout_bounds() {
        let mut config = BridgeConfig::default();
        config.request_timeout = 0;
        assert!(config.validate().is_err());
        config.request_timeout = 301;
        assert!(config.validate().is_err());
        config.request_timeout = 300;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_base_url() {
        let config = BridgeConfig {
            server_base_url: "not a url".to_string(),
            ..BridgeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("openbridge.toml");
        fs::write(&path, "request_timeout = 45\nmcp_name = \"pad\"\n").unwrap();

        let config = BridgeConfig::load_from(Some(&path)).unwrap();
        assert_eq!(config.mcp_name, "pad");
    }

    #[test]
    fn test_resolve_env_var() {
        let not_var = BridgeConfig::resolve_env_var("plain_value");
        assert_eq!(not_var, Some("plain_value".to_string()));

        let missing = BridgeConfig::resolve_env_var("${OPENBRIDGE_TEST_SURELY_UNSET_VAR}");
        assert_eq!(missing, None);
    }
}
