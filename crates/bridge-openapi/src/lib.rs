//! # OpenBridge OpenAPI Tool Generator
//!
//! Turns the operations of a remote OpenAPI document into tools that call
//! the PAD API.
//!
//! ## Features
//!
//! - Lenient parsing of OpenAPI 3.0/3.1 documents (JSON, with YAML fallback)
//! - Denylist filtering of streaming, web-page and binary endpoints
//! - Deterministic tool names with hash suffixes on collision
//! - Authenticated HTTP execution where every failure becomes a result envelope
//! - Binary downloads persisted to the storage directory
//!
//! ## Example
//!
//! ```no_run
//! use bridge_core::BridgeConfig;
//! use bridge_openapi::OpenApiToolset;
//! use bridge_tool::ToolRegistry;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = BridgeConfig::load()?;
//! let mut registry = ToolRegistry::new();
//!
//! if let Some(toolset) = OpenApiToolset::fetch(&config).await {
//!     let report = toolset.register_into(&mut registry);
//!     println!("Registered {} tools", report.registered);
//! }
//! # Ok(())
//! # }
//! ```

mod auth;
mod error;
mod executor;
mod fetcher;
mod filter;
mod naming;
mod ontology;
mod parser;
mod rest_api_tool;
mod toolset;
mod types;

pub use auth::{API_KEY_HEADER, AuthHeaders};
pub use error::{OpenApiError, Result};
pub use executor::{HttpExecutor, RequestEnvelope, RequestPayload, binary_extension};
pub use fetcher::SpecFetcher;
pub use filter::{EndpointFilter, SkipReason};
pub use naming::{build_tool_description, derive_tool_name, disambiguate};
pub use ontology::{DOWNLOAD_ONTOLOGY_TOOL, ONTOLOGY_CACHE_FILE, create_download_ontology_tool};
pub use parser::OpenApiDocument;
pub use rest_api_tool::RestApiTool;
pub use toolset::{OpenApiToolset, RegistrationReport};
pub use types::{ApiParameter, Endpoint, HttpMethod, Operation, ParameterLocation};
