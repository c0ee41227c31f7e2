//! Firebase Authentication (Identity Toolkit REST API).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::instrument;
use url::Url;

use boutique_core::{Email, UserId};

use super::{endpoint, excerpt};
use crate::backend::{
    AuthEvent, AuthUser, IdToken, IdentityError, IdentityProvider, RefreshToken,
};
use crate::config::FirebaseConfig;

/// Buffered session events per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 64;

/// Identity provider backed by Firebase email/password accounts.
///
/// Sessions are stateless on the Firebase side: ID tokens last an hour and
/// are renewed through the Secure Token API, and signing out only notifies
/// subscribers.
#[derive(Clone)]
pub struct FirebaseAuth {
    inner: Arc<FirebaseAuthInner>,
}

struct FirebaseAuthInner {
    client: reqwest::Client,
    base_url: Url,
    token_url: Url,
    api_key: SecretString,
    events: broadcast::Sender<AuthEvent>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
}

/// The Secure Token API answers in snake case.
#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl FirebaseAuth {
    #[must_use]
    pub fn new(client: reqwest::Client, config: &FirebaseConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(FirebaseAuthInner {
                client,
                base_url: config.auth_url.clone(),
                token_url: config.token_url.clone(),
                api_key: config.api_key.clone(),
                events,
            }),
        }
    }

    fn url(&self, method: &str) -> Url {
        self.with_key(endpoint(&self.inner.base_url, &["v1", method]))
    }

    fn token_endpoint(&self) -> Url {
        self.with_key(endpoint(&self.inner.token_url, &["v1", "token"]))
    }

    fn with_key(&self, mut url: Url) -> Url {
        url.query_pairs_mut()
            .append_pair("key", self.inner.api_key.expose_secret());
        url
    }

    async fn send<R: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<R, IdentityError> {
        let response = request
            .send()
            .await
            .map_err(|e| IdentityError::Network(e.without_url().to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| IdentityError::Network(e.without_url().to_string()))?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(envelope) => map_error_code(&envelope.error.message),
                Err(_) => {
                    tracing::error!(
                        status = %status,
                        body = %excerpt(&text),
                        "Identity provider returned an unreadable error"
                    );
                    IdentityError::Provider(format!("HTTP {status}"))
                }
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse identity provider response");
            IdentityError::Provider(e.to_string())
        })
    }

    async fn password_call(
        &self,
        method: &str,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthUser, IdentityError> {
        let body = PasswordRequest {
            email: email.as_str(),
            password: password.expose_secret(),
            return_secure_token: true,
        };
        let request = self.inner.client.post(self.url(method)).json(&body);
        let parsed: PasswordResponse = self.send(request).await?;

        Ok(AuthUser {
            uid: UserId::new(parsed.local_id),
            email: email.clone(),
            id_token: IdToken::new(parsed.id_token),
            refresh_token: RefreshToken::new(parsed.refresh_token),
            expires_at: expiry(Utc::now(), &parsed.expires_in),
        })
    }

    fn publish(&self, event: AuthEvent) {
        // No receivers is fine: the gate may not be subscribed yet.
        let _ = self.inner.events.send(event);
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthUser, IdentityError> {
        let user = self
            .password_call("accounts:signInWithPassword", email, password)
            .await?;
        self.publish(AuthEvent::SignedIn(user.uid.clone()));
        Ok(user)
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthUser, IdentityError> {
        let user = self.password_call("accounts:signUp", email, password).await?;
        self.publish(AuthEvent::SignedUp(user.uid.clone()));
        Ok(user)
    }

    #[instrument(skip(self, user), fields(uid = %user.uid))]
    async fn refresh(&self, user: &AuthUser) -> Result<AuthUser, IdentityError> {
        let body = RefreshRequest {
            grant_type: "refresh_token",
            refresh_token: user.refresh_token.expose(),
        };
        let request = self.inner.client.post(self.token_endpoint()).form(&body);
        let parsed: RefreshResponse = self.send(request).await?;
        tracing::debug!("ID token refreshed");

        Ok(AuthUser {
            id_token: IdToken::new(parsed.id_token),
            refresh_token: RefreshToken::new(parsed.refresh_token),
            expires_at: expiry(Utc::now(), &parsed.expires_in),
            ..user.clone()
        })
    }

    async fn sign_out(&self, uid: &UserId) {
        self.publish(AuthEvent::SignedOut(uid.clone()));
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.events.subscribe()
    }
}

/// When a token issued at `now` with a lifetime of `expires_in` seconds
/// expires. An unreadable lifetime counts as already expired.
fn expiry(now: DateTime<Utc>, expires_in: &str) -> DateTime<Utc> {
    match expires_in.trim().parse::<i64>() {
        Ok(secs) => TimeDelta::try_seconds(secs).map_or(now, |lifetime| now + lifetime),
        Err(_) => {
            tracing::warn!(expires_in, "Unreadable token lifetime");
            now
        }
    }
}

/// Map an Identity Toolkit error message to an [`IdentityError`].
///
/// Messages look like `EMAIL_EXISTS` or `WEAK_PASSWORD : Password should be
/// at least 6 characters`.
fn map_error_code(message: &str) -> IdentityError {
    let (code, detail) = message
        .split_once(" : ")
        .map_or((message.trim(), ""), |(code, detail)| (code.trim(), detail.trim()));

    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS"
        | "INVALID_EMAIL" | "MISSING_PASSWORD" | "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN"
        | "USER_NOT_FOUND" => IdentityError::InvalidCredentials,
        "EMAIL_EXISTS" => IdentityError::EmailTaken,
        "WEAK_PASSWORD" => IdentityError::WeakPassword(if detail.is_empty() {
            "Password is too weak".to_string()
        } else {
            detail.to_string()
        }),
        "USER_DISABLED" => IdentityError::UserDisabled,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => IdentityError::TooManyAttempts,
        other => IdentityError::Provider(other.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> FirebaseAuth {
        FirebaseAuth::new(
            reqwest::Client::new(),
            &FirebaseConfig {
                project_id: "demo".to_string(),
                api_key: SecretString::from("AIzaTestKey123"),
                auth_url: Url::parse("http://127.0.0.1:9099/identitytoolkit.googleapis.com")
                    .unwrap(),
                token_url: Url::parse("http://127.0.0.1:9099/securetoken.googleapis.com")
                    .unwrap(),
                firestore_url: Url::parse("http://127.0.0.1:8080").unwrap(),
            },
        )
    }

    #[test]
    fn test_url_includes_method_and_key() {
        let url = client().url("accounts:signInWithPassword");
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1/accounts:signInWithPassword?key=AIzaTestKey123"
        );
    }

    #[test]
    fn test_token_endpoint() {
        assert_eq!(
            client().token_endpoint().as_str(),
            "http://127.0.0.1:9099/securetoken.googleapis.com/v1/token?key=AIzaTestKey123"
        );
    }

    #[test]
    fn test_expiry_from_lifetime() {
        let now = Utc::now();
        assert_eq!(expiry(now, "3600"), now + TimeDelta::hours(1));
        assert_eq!(expiry(now, "soon"), now);
    }

    #[test]
    fn test_refresh_response_is_snake_case() {
        let parsed: RefreshResponse = serde_json::from_str(
            r#"{"expires_in":"3600","token_type":"Bearer","refresh_token":"r2","id_token":"t2","user_id":"u1"}"#,
        )
        .unwrap();
        assert_eq!(parsed.id_token, "t2");
        assert_eq!(parsed.refresh_token, "r2");
        assert_eq!(parsed.expires_in, "3600");
    }

    #[test]
    fn test_map_error_codes() {
        assert!(matches!(map_error_code("EMAIL_EXISTS"), IdentityError::EmailTaken));
        assert!(matches!(
            map_error_code("INVALID_LOGIN_CREDENTIALS"),
            IdentityError::InvalidCredentials
        ));
        assert!(matches!(map_error_code("USER_DISABLED"), IdentityError::UserDisabled));
        assert!(matches!(map_error_code("TOKEN_EXPIRED"), IdentityError::InvalidCredentials));
        assert!(matches!(
            map_error_code("TOO_MANY_ATTEMPTS_TRY_LATER : Access disabled"),
            IdentityError::TooManyAttempts
        ));
        assert!(matches!(map_error_code("OPERATION_NOT_ALLOWED"), IdentityError::Provider(_)));
    }

    #[test]
    fn test_weak_password_keeps_detail() {
        match map_error_code("WEAK_PASSWORD : Password should be at least 6 characters") {
            IdentityError::WeakPassword(detail) => {
                assert_eq!(detail, "Password should be at least 6 characters");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sign_out_is_published() {
        let auth = client();
        let mut events = auth.subscribe();
        auth.sign_out(&UserId::new("u1")).await;
        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedOut(UserId::new("u1")));
    }
}
