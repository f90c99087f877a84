//! URL helpers for the configured API base.
//!
//! The backend mounts its routes under `/api` while the health probe lives at
//! the server root, so both forms have to be derivable from one setting.

/// Normalize a base URL by trimming whitespace and trailing slashes.
///
/// # Examples
///
/// ```
/// use nova::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8000/api/"), "http://localhost:8000/api");
/// assert_eq!(normalize_base_url(" https://nova.example.com// "), "https://nova.example.com");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// The server root for a base URL: the base with a trailing `/api` segment removed.
///
/// ```
/// use nova::utils::url::server_root;
///
/// assert_eq!(server_root("http://localhost:8000/api"), "http://localhost:8000");
/// assert_eq!(server_root("http://localhost:8000"), "http://localhost:8000");
/// ```
pub fn server_root(base_url: &str) -> String {
    let normalized = normalize_base_url(base_url);
    match normalized.strip_suffix("/api") {
        Some(root) if !root.ends_with(':') && !root.ends_with('/') => root.to_string(),
        _ => normalized,
    }
}

/// Whether a user-supplied value looks like an HTTP(S) endpoint.
pub fn is_http_url(value: &str) -> bool {
    let trimmed = value.trim();
    ["http://", "https://"].iter().any(|scheme| {
        trimmed
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
            && trimmed.len() > scheme.len()
    })
}
