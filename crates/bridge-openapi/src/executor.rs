//! Authenticated HTTP execution with every failure mapped to an envelope.

use crate::auth::AuthHeaders;
use crate::types::HttpMethod;
use bridge_core::{BridgeConfig, ToolOutcome};
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Upstream error bodies are cut to this many characters.
const MAX_ERROR_BODY: usize = 500;

/// Arguments travel in exactly one channel per request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestPayload {
    Query(Vec<(String, String)>),
    Json(Value),
}

/// A fully resolved outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelope {
    pub method: HttpMethod,
    pub url: String,
    pub payload: RequestPayload,
}

/// Issues requests against the PAD API.
///
/// Never returns an error: timeouts, refused connections and non-2xx
/// statuses all come back as a failed [`ToolOutcome`]. No retries.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
    auth: AuthHeaders,
    storage_dir: PathBuf,
    timeout: Duration,
}

impl HttpExecutor {
    pub fn new(auth: AuthHeaders, storage_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            auth,
            storage_dir: storage_dir.into(),
            timeout,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(
            AuthHeaders::from_config(config),
            config.filesystem_storage.clone(),
            config.request_timeout(),
        )
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send the request and normalize the response.
    pub async fn execute(&self, request: &RequestEnvelope) -> ToolOutcome {
        let url = request.url.as_str();

        let mut builder = self
            .client
            .request(request.method.into(), url)
            .timeout(self.timeout);
        builder = match &request.payload {
            RequestPayload::Query(pairs) if pairs.is_empty() => builder,
            RequestPayload::Query(pairs) => builder.query(pairs),
            RequestPayload::Json(body) => builder.json(body),
        };
        builder = self.auth.apply_to_request(builder);

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return self.transport_failure(url, e),
        };

        let status = response.status();
        debug!("Response status: {} for {} {}", status, request.method, url);

        match status {
            StatusCode::NOT_FOUND => {
                error!("Resource not found: {}", url);
                return ToolOutcome::failure(
                    format!("Resource not found: {}", url),
                    "The requested resource could not be found on the server.",
                )
                .with_status(404);
            }
            StatusCode::UNAUTHORIZED => {
                error!("Authentication required: {}", url);
                return ToolOutcome::failure(
                    "Authentication required",
                    "The request requires valid authentication credentials.",
                )
                .with_status(401);
            }
            StatusCode::FORBIDDEN => {
                error!("Access forbidden: {}", url);
                return ToolOutcome::failure(
                    "Access forbidden",
                    "You do not have permission to access this resource.",
                )
                .with_status(403);
            }
            _ => {}
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            let reason = status.canonical_reason().unwrap_or("Unknown status");
            error!("Request to {} failed with status {}", url, status);
            let message = if body.is_empty() {
                format!("{} {} for url: {}", status.as_u16(), reason, url)
            } else {
                format!("{} {} for url: {}: {}", status.as_u16(), reason, url, body)
            };
            return ToolOutcome::failure(message.clone(), format!("Request failed: {}", message))
                .with_status(status.as_u16());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_lowercase();

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return self.transport_failure(url, e),
        };

        if content_type.starts_with("image/") || content_type.starts_with("application/octet-stream")
        {
            return self.persist_binary(&bytes, &content_type).await;
        }

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(json) => ToolOutcome::success(json, format!("Response from {} {}", request.method, url)),
            Err(_) => ToolOutcome::success(
                Value::String(String::from_utf8_lossy(&bytes).into_owned()),
                "Response is not JSON data",
            )
            .with_content_type(content_type),
        }
    }

    async fn persist_binary(&self, bytes: &[u8], content_type: &str) -> ToolOutcome {
        if let Err(e) = tokio::fs::create_dir_all(&self.storage_dir).await {
            error!("Failed to create storage directory {:?}: {}", self.storage_dir, e);
            return ToolOutcome::failure(
                e.to_string(),
                format!("Could not create storage directory {}", self.storage_dir.display()),
            )
            .with_status(500);
        }

        let filename = format!("{}.{}", Uuid::new_v4(), binary_extension(content_type));
        let joined = self.storage_dir.join(&filename);
        let full_path = std::path::absolute(&joined).unwrap_or(joined);

        if let Err(e) = tokio::fs::write(&full_path, bytes).await {
            error!("Failed to write {:?}: {}", full_path, e);
            return ToolOutcome::failure(
                e.to_string(),
                format!("Could not save binary data to {}", full_path.display()),
            )
            .with_status(500);
        }

        let path = full_path.display().to_string();
        info!("Saved {} bytes of {} to {}", bytes.len(), content_type, path);
        ToolOutcome::success(
            Value::String(path.clone()),
            format!("The binary data has been saved to: {}", path),
        )
        .with_path(path)
        .with_filename(filename)
        .with_content_type(content_type)
    }

    fn transport_failure(&self, url: &str, err: reqwest::Error) -> ToolOutcome {
        if err.is_timeout() {
            error!("Request timeout for {}", url);
            ToolOutcome::failure(
                "Request timed out",
                format!(
                    "The request to {} timed out after {} seconds.",
                    url,
                    self.timeout.as_secs()
                ),
            )
            .with_status(408)
        } else if err.is_connect() {
            error!("Connection error for {}: {}", url, err);
            ToolOutcome::failure(
                "Connection failed",
                format!(
                    "Could not connect to {}. The server may be down or unreachable.",
                    url
                ),
            )
            .with_status(503)
        } else {
            error!("Request error for {}: {}", url, err);
            ToolOutcome::failure(err.to_string(), format!("Request failed: {}", err)).with_status(500)
        }
    }
}

/// File extension for a binary content type: the `image/*` subtype, else `bin`.
pub fn binary_extension(content_type: &str) -> String {
    content_type
        .strip_prefix("image/")
        .map(|subtype| subtype.split(';').next().unwrap_or_default().trim())
        .filter(|subtype| !subtype.is_empty())
        .unwrap_or("bin")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn executor(storage: &Path, timeout: Duration) -> HttpExecutor {
        HttpExecutor::new(AuthHeaders::none(), storage, timeout)
    }

    fn get(url: String, query: Vec<(&str, &str)>) -> RequestEnvelope {
        RequestEnvelope {
            method: HttpMethod::Get,
            url,
            payload: RequestPayload::Query(
                query
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
        }
    }

    #[test]
    fn test_binary_extension() {
        assert_eq!(binary_extension("image/png"), "png");
        assert_eq!(binary_extension("image/jpeg; charset=binary"), "jpeg");
        assert_eq!(binary_extension("image/svg+xml"), "svg+xml");
        assert_eq!(binary_extension("application/octet-stream"), "bin");
        assert_eq!(binary_extension("image/"), "bin");
    }

    #[tokio::test]
    async fn test_json_response_with_auth_and_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/cards/7")
            .match_query(mockito::Matcher::UrlEncoded("verbose".into(), "true".into()))
            .match_header("x-api-key", "k")
            .match_header("authorization", "Bearer t")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 7}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let executor = HttpExecutor::new(
            AuthHeaders::none().with_api_key("k").with_bearer("t"),
            dir.path(),
            Duration::from_secs(5),
        );
        let outcome = executor
            .execute(&get(format!("{}/cards/7", server.url()), vec![("verbose", "true")]))
            .await;

        mock.assert_async().await;
        assert!(outcome.success);
        assert_eq!(outcome.data, json!({"id": 7}));
        assert_eq!(outcome.error, "");
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/cards")
            .match_body(mockito::Matcher::Json(json!({"sample_name": "x"})))
            .with_status(201)
            .with_body(r#"{"created": true}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let request = RequestEnvelope {
            method: HttpMethod::Post,
            url: format!("{}/cards", server.url()),
            payload: RequestPayload::Json(json!({"sample_name": "x"})),
        };
        let outcome = executor(dir.path(), Duration::from_secs(5))
            .execute(&request)
            .await;

        mock.assert_async().await;
        assert!(outcome.success);
        assert_eq!(outcome.data["created"], true);
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(dir.path(), Duration::from_secs(5));

        for (path, status, error) in [
            ("/missing", 404, None),
            ("/private", 401, Some("Authentication required")),
            ("/secret", 403, Some("Access forbidden")),
        ] {
            server
                .mock("GET", path)
                .with_status(status)
                .create_async()
                .await;
            let url = format!("{}{}", server.url(), path);
            let outcome = exec.execute(&get(url.clone(), vec![])).await;
            assert!(!outcome.success);
            assert_eq!(outcome.status_code, Some(status as u16));
            match error {
                Some(error) => assert_eq!(outcome.error, error),
                None => assert_eq!(outcome.error, format!("Resource not found: {}", url)),
            }
        }
    }

    #[tokio::test]
    async fn test_generic_error_keeps_upstream_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/broken")
            .with_status(502)
            .with_body("upstream exploded")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let outcome = executor(dir.path(), Duration::from_secs(5))
            .execute(&get(format!("{}/broken", server.url()), vec![]))
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.status_code, Some(502));
        assert!(outcome.error.contains("502"));
        assert!(outcome.error.contains("upstream exploded"));
    }

    #[tokio::test]
    async fn test_non_json_body_returned_as_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/text")
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body("plain words")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let outcome = executor(dir.path(), Duration::from_secs(5))
            .execute(&get(format!("{}/text", server.url()), vec![]))
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.data, json!("plain words"));
        assert_eq!(outcome.description, "Response is not JSON data");
        assert_eq!(outcome.content_type.as_deref(), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_binary_response_saved_to_storage() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/cards/1/download-image")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body([0x89u8, b'P', b'N', b'G'])
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let storage = dir.path().join("nested").join("storage");
        let outcome = executor(&storage, Duration::from_secs(5))
            .execute(&get(format!("{}/cards/1/download-image", server.url()), vec![]))
            .await;

        assert!(outcome.success);
        let path = PathBuf::from(outcome.path.clone().unwrap());
        assert!(path.is_absolute());
        assert_eq!(path.extension().unwrap(), "png");
        assert_eq!(std::fs::read(&path).unwrap(), vec![0x89u8, b'P', b'N', b'G']);
        assert_eq!(outcome.data, json!(path.display().to_string()));
        assert_eq!(outcome.content_type.as_deref(), Some("image/png"));
        assert!(outcome.filename.unwrap().ends_with(".png"));
    }

    #[tokio::test]
    async fn test_octet_stream_gets_bin_extension() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/blob")
            .with_status(200)
            .with_header("content-type", "application/octet-stream")
            .with_body("raw")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let outcome = executor(dir.path(), Duration::from_secs(5))
            .execute(&get(format!("{}/blob", server.url()), vec![]))
            .await;

        assert!(outcome.success);
        assert!(outcome.path.unwrap().ends_with(".bin"));
    }

    #[tokio::test]
    async fn test_timeout_maps_to_408() {
        // Accepted by the kernel backlog, never answered
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let outcome = executor(dir.path(), Duration::from_secs(1))
            .execute(&get(format!("http://{}/slow", addr), vec![]))
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.status_code, Some(408));
        assert_eq!(outcome.error, "Request timed out");
        assert!(outcome.description.contains("1 seconds"));
        drop(listener);
    }

    #[tokio::test]
    async fn test_connection_refused_maps_to_503() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let dir = tempfile::tempdir().unwrap();
        let outcome = executor(dir.path(), Duration::from_secs(5))
            .execute(&get(format!("http://127.0.0.1:{}/cards", port), vec![]))
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.status_code, Some(503));
        assert_eq!(outcome.error, "Connection failed");
    }
}
