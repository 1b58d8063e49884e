//! OpenAPI toolset container.

use crate::executor::HttpExecutor;
use crate::fetcher::SpecFetcher;
use crate::filter::EndpointFilter;
use crate::naming::{build_tool_description, derive_tool_name, disambiguate};
use crate::parser::OpenApiDocument;
use crate::rest_api_tool::RestApiTool;
use bridge_core::BridgeConfig;
use bridge_tool::ToolRegistry;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one registration pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrationReport {
    pub registered: usize,
    pub skipped: usize,
    /// Registered under a hash-suffixed name after a collision
    pub renamed: usize,
}

/// Operations of one OpenAPI document, ready to be registered as tools.
///
/// # Example
///
/// ```no_run
/// use bridge_core::BridgeConfig;
/// use bridge_openapi::OpenApiToolset;
/// use bridge_tool::ToolRegistry;
///
/// # async fn example() {
/// let config = BridgeConfig::default();
/// let mut registry = ToolRegistry::new();
/// if let Some(toolset) = OpenApiToolset::fetch(&config).await {
///     let report = toolset.register_into(&mut registry);
///     println!("{} tools registered", report.registered);
/// }
/// # }
/// ```
pub struct OpenApiToolset {
    document: OpenApiDocument,
    filter: EndpointFilter,
    base_url: String,
    executor: Arc<HttpExecutor>,
}

impl OpenApiToolset {
    pub fn from_document(document: OpenApiDocument, config: &BridgeConfig) -> Self {
        Self {
            document,
            filter: EndpointFilter::from_config(config),
            base_url: config.base_url().to_string(),
            executor: Arc::new(HttpExecutor::from_config(config)),
        }
    }

    /// Fetch the document named by the configuration.
    ///
    /// `None` when the document cannot be retrieved or parsed; the failure is
    /// already logged.
    pub async fn fetch(config: &BridgeConfig) -> Option<Self> {
        let url = config.openapi_spec_url();
        let document = SpecFetcher::from_config(config).fetch(&url).await?;
        info!(
            "Loaded OpenAPI spec '{}' with {} paths",
            document.title().unwrap_or("untitled"),
            document.path_count()
        );
        Some(Self::from_document(document, config))
    }

    /// Register one tool per eligible operation.
    ///
    /// Names already present in `registry` (static tools or an earlier
    /// operation) are disambiguated with a hash suffix.
    pub fn register_into(&self, registry: &mut ToolRegistry) -> RegistrationReport {
        let mut report = RegistrationReport::default();

        for endpoint in self.document.endpoints() {
            let eligible =
                self.filter
                    .eligible(&endpoint.path, &endpoint.method, &endpoint.operation);
            let Some(method) = eligible else {
                report.skipped += 1;
                continue;
            };

            let mut name = derive_tool_name(method.as_str(), &endpoint.path);
            if registry.contains(&name) {
                let renamed = disambiguate(&name, method.as_str(), &endpoint.path);
                warn!(
                    "Tool name '{}' already taken, registering {} {} as '{}'",
                    name, method, endpoint.path, renamed
                );
                name = renamed;
                report.renamed += 1;
            }

            let description = build_tool_description(
                &endpoint.operation.summary,
                &endpoint.operation.description,
                method.as_str(),
                &endpoint.path,
            );
            let tool = RestApiTool::new(
                name.clone(),
                description,
                method,
                endpoint.path.clone(),
                &endpoint.operation,
                self.base_url.clone(),
                Arc::clone(&self.executor),
            );

            match registry.register(Arc::new(tool)) {
                Ok(()) => {
                    debug!("Registered API tool: {}", name);
                    report.registered += 1;
                }
                Err(e) => {
                    warn!("Could not register {} {}: {}", method, endpoint.path, e);
                    report.skipped += 1;
                }
            }
        }

        info!(
            "Registered {} API endpoints as tools (skipped {})",
            report.registered, report.skipped
        );
        report
    }
}
