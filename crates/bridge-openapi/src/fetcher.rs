//! Retrieval of the remote OpenAPI document.

use crate::auth::AuthHeaders;
use crate::error::Result;
use crate::parser::OpenApiDocument;
use bridge_core::BridgeConfig;
use std::time::Duration;
use tracing::{error, info};

/// Timed, authenticated GET of an OpenAPI document.
#[derive(Debug, Clone)]
pub struct SpecFetcher {
    client: reqwest::Client,
    auth: AuthHeaders,
    timeout: Duration,
}

impl SpecFetcher {
    pub fn new(auth: AuthHeaders, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            auth,
            timeout,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(AuthHeaders::from_config(config), config.request_timeout())
    }

    /// Fetch and parse the document.
    ///
    /// Any failure (network, timeout, non-2xx status, malformed document) is
    /// logged and yields `None`.
    pub async fn fetch(&self, url: &str) -> Option<OpenApiDocument> {
        info!("Fetching OpenAPI spec from {}", url);
        match self.try_fetch(url).await {
            Ok(document) => Some(document),
            Err(e) => {
                error!("Failed to fetch OpenAPI spec from {}: {}", url, e);
                None
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<OpenApiDocument> {
        let request = self.client.get(url).timeout(self.timeout);
        let response = self
            .auth
            .apply_to_request(request)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        OpenApiDocument::from_str(&body)
    }
}
