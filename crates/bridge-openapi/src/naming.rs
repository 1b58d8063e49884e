//! Tool identifiers and descriptions derived from an operation.

use sha2::{Digest, Sha256};

/// Derive a tool identifier from a method and path.
///
/// `GET /cards/{id}` becomes `get_cards_id`. Braces are dropped, spaces,
/// slashes and hyphens become underscores, a single pass collapses `__`
/// and leading underscores are stripped.
pub fn derive_tool_name(method: &str, path: &str) -> String {
    format!("{} {}", method, path)
        .to_lowercase()
        .replace(' ', "_")
        .replace('/', "_")
        .replace(['{', '}'], "")
        .replace('-', "_")
        .replace("__", "_")
        .trim_start_matches('_')
        .to_string()
}

/// Suffix a colliding identifier with a short hash of `METHOD path`.
pub fn disambiguate(name: &str, method: &str, path: &str) -> String {
    let digest = Sha256::digest(format!("{} {}", method.to_uppercase(), path).as_bytes());
    let suffix: String = digest
        .iter()
        .take(4)
        .map(|b| format!("{:02x}", b))
        .collect();
    format!("{}_{}", name, suffix)
}

/// Tool description; always names the HTTP verb and path.
pub fn build_tool_description(summary: &str, description: &str, method: &str, path: &str) -> String {
    format!(
        "{}\n\n{}\n\n(This tool calls: {} {})",
        summary,
        description,
        method.to_uppercase(),
        path
    )
}
