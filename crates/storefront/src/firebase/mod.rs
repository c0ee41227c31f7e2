//! Firebase REST clients.
//!
//! - [`FirebaseAuth`]: Identity Toolkit (`accounts:signInWithPassword`,
//!   `accounts:signUp`) behind [`IdentityProvider`](crate::backend::IdentityProvider)
//! - [`Firestore`]: Cloud Firestore REST v1 behind
//!   [`DocumentStore`](crate::backend::DocumentStore)
//!
//! Both share one `reqwest::Client` and build their URLs with `url::Url` so
//! ids and collection names are percent-encoded as path segments.

mod auth;
mod firestore;

pub use auth::FirebaseAuth;
pub use firestore::Firestore;

use url::Url;

/// Append path segments to `base`, keeping any path it already has.
fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Truncate a response body for logging.
fn excerpt(body: &str) -> String {
    body.chars().take(500).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_appends_segments() {
        let base = Url::parse("https://identitytoolkit.googleapis.com").unwrap();
        let url = endpoint(&base, &["v1", "accounts:signUp"]);
        assert_eq!(url.as_str(), "https://identitytoolkit.googleapis.com/v1/accounts:signUp");
    }

    #[test]
    fn test_endpoint_keeps_base_path_and_encodes() {
        let base = Url::parse("http://localhost:8080/emulator/").unwrap();
        let url = endpoint(&base, &["documents", "a b/c"]);
        assert_eq!(url.as_str(), "http://localhost:8080/emulator/documents/a%20b%2Fc");
    }
}
