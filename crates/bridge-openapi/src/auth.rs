//! Authentication headers for PAD API requests.
//!
//! Two credentials are supported and may be sent together:
//! - API key (`X-API-Key: <key>`)
//! - Bearer token (`Authorization: Bearer <token>`)

use bridge_core::BridgeConfig;
use std::fmt;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Credentials attached to every outbound request.
#[derive(Clone, Default)]
pub struct AuthHeaders {
    api_key: Option<String>,
    bearer_token: Option<String>,
}

impl AuthHeaders {
    /// No authentication.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            bearer_token: config.auth_token.clone(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.api_key.is_none() && self.bearer_token.is_none()
    }

    /// Apply the configured credentials to a request builder.
    pub fn apply_to_request(&self, mut builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }
}

impl fmt::Debug for AuthHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("AuthHeaders")
            .field("api_key", &redact(&self.api_key))
            .field("bearer_token", &redact(&self.bearer_token))
            .finish()
    }
}
