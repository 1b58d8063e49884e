//! The `download_ontology` tool.

use crate::auth::AuthHeaders;
use bridge_core::{BridgeConfig, ToolOutcome};
use bridge_tool::FunctionTool;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub const DOWNLOAD_ONTOLOGY_TOOL: &str = "download_ontology";

/// Cache file written inside the storage directory.
pub const ONTOLOGY_CACHE_FILE: &str = "ontology.ttl";

struct OntologyDownloader {
    client: reqwest::Client,
    auth: AuthHeaders,
    url: String,
    storage_dir: PathBuf,
    timeout: Duration,
}

impl OntologyDownloader {
    async fn download(&self) -> ToolOutcome {
        let content = match self.fetch().await {
            Ok(content) => content,
            Err(e) => {
                error!("HTTP error downloading ontology: {}", e);
                return Self::failed(
                    format!("HTTP error: {}", e),
                    format!(
                        "Failed to download the PAD ontology file due to an HTTP error: {}",
                        e
                    ),
                );
            }
        };

        let cache_path = self.storage_dir.join(ONTOLOGY_CACHE_FILE);
        let written: std::io::Result<()> = async {
            tokio::fs::create_dir_all(&self.storage_dir).await?;
            tokio::fs::write(&cache_path, &content).await
        }
        .await;
        if let Err(e) = written {
            error!("Error caching ontology at {:?}: {}", cache_path, e);
            return Self::failed(
                e.to_string(),
                format!("Failed to download the PAD ontology file: {}", e),
            );
        }

        info!("Cached ontology ({} bytes) at {:?}", content.len(), cache_path);
        ToolOutcome::success(
            Value::String(content),
            format!(
                "Successfully downloaded the PAD ontology file from {} and cached at {}.",
                self.url,
                cache_path.display()
            ),
        )
    }

    async fn fetch(&self) -> reqwest::Result<String> {
        let request = self.client.get(&self.url).timeout(self.timeout);
        self.auth
            .apply_to_request(request)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }

    fn failed(error: String, description: String) -> ToolOutcome {
        let mut outcome = ToolOutcome::failure(error, description);
        outcome.data = Value::String(String::new());
        outcome
    }
}

/// Build the tool that downloads the PAD ontology and caches it locally.
pub fn create_download_ontology_tool(config: &BridgeConfig) -> bridge_core::Result<FunctionTool> {
    let downloader = Arc::new(OntologyDownloader {
        client: reqwest::Client::new(),
        auth: AuthHeaders::from_config(config),
        url: config.ontology_url(),
        storage_dir: config.filesystem_storage.clone(),
        timeout: config.request_timeout(),
    });

    FunctionTool::builder()
        .name(DOWNLOAD_ONTOLOGY_TOOL)
        .description(
            "Download the PAD ontology file (ontology.ttl) and cache it in local storage. \
             Returns the ontology content as text.",
        )
        .execute(move |_ctx, _params| {
            let downloader = Arc::clone(&downloader);
            async move { Ok(downloader.download().await.into()) }
        })
        .build()
}
