//! # OpenBridge
//!
//! MCP server that exposes the Paper-based Analytical Device (PAD) API and a
//! set of local image tools to an AI assistant.
//!
//! Startup registers the static tools first (image analysis, image files,
//! ontology download), then one tool per eligible operation of the PAD
//! API's OpenAPI document. When the document cannot be fetched the server
//! still starts with the static tools only.

use bridge_core::BridgeConfig;
use bridge_image_tools::image_tools;
use bridge_mcp::BridgeMcpServer;
use bridge_openapi::{OpenApiToolset, RegistrationReport, create_download_ontology_tool};
use bridge_tool::ToolRegistry;
use std::sync::Arc;
use tracing::{error, info};

pub use bridge_core;
pub use bridge_image_tools;
pub use bridge_mcp;
pub use bridge_openapi;
pub use bridge_telemetry;
pub use bridge_tool;

const SERVER_INSTRUCTIONS: &str = "Tools for the Paper-based Analytical Device (PAD) project: \
query and update PAD API resources, download card images, and measure colour in image regions. \
Every tool returns a JSON object with success, data, error and description fields.";

/// Registered tools plus the outcome of the dynamic registration pass.
pub struct BridgeTools {
    pub registry: ToolRegistry,
    /// `None` when the OpenAPI document could not be fetched
    pub report: Option<RegistrationReport>,
}

/// Build every tool for the given configuration.
pub async fn build_tools(config: &BridgeConfig) -> anyhow::Result<BridgeTools> {
    let mut registry = ToolRegistry::new();

    for tool in image_tools(config.filesystem_storage.clone())? {
        registry.register(tool)?;
    }
    registry.register(Arc::new(create_download_ontology_tool(config)?))?;
    info!("Registered {} static tools", registry.len());

    let report = match OpenApiToolset::fetch(config).await {
        Some(toolset) => Some(toolset.register_into(&mut registry)),
        None => {
            error!("Failed to fetch OpenAPI spec, dynamic tools not registered");
            None
        }
    };

    Ok(BridgeTools { registry, report })
}

/// MCP server over an already built registry.
pub fn build_server(config: &BridgeConfig, registry: ToolRegistry) -> BridgeMcpServer {
    BridgeMcpServer::new(config.mcp_name.clone(), Arc::new(registry))
        .with_instructions(SERVER_INSTRUCTIONS)
}

/// Log the effective configuration without credentials.
pub fn log_config_summary(config: &BridgeConfig) {
    info!("Server name: {}", config.mcp_name);
    info!("API base URL: {}", config.base_url());
    info!("OpenAPI spec URL: {}", config.openapi_spec_url());
    info!("Storage directory: {}", config.filesystem_storage.display());
    info!("Request timeout: {}s", config.request_timeout);
    info!(
        "Authentication: {}",
        match (config.api_key.is_some(), config.auth_token.is_some()) {
            (true, true) => "API key and bearer token",
            (true, false) => "API key",
            (false, true) => "bearer token",
            (false, false) => "none",
        }
    );
}

/// Build the tools and serve them on stdio until the client disconnects.
pub async fn run_stdio(config: BridgeConfig) -> anyhow::Result<()> {
    info!("Starting OpenBridge server with stdio transport");
    log_config_summary(&config);

    let tools = build_tools(&config).await?;
    build_server(&config, tools.registry).serve_stdio().await
}
