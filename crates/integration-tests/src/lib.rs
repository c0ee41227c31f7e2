//! Integration tests for the Boutique storefront.
//!
//! Each test spawns the full storefront router on an ephemeral port, backed
//! by in-memory fakes of the identity provider and the document store, and
//! drives it over HTTP with a cookie-keeping `reqwest` client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p boutique-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower_sessions::MemoryStore;
use url::Url;

use boutique_core::{Email, UserId};
use boutique_storefront::backend::{
    AuthEvent, AuthUser, Document, DocumentStore, Fields, IdToken, IdentityError,
    IdentityProvider, RefreshToken, StoreError, collections,
};
use boutique_storefront::config::{FirebaseConfig, SentryConfig, StorefrontConfig};
use boutique_storefront::identity::GateSubscription;
use boutique_storefront::middleware::session::session_layer;
use boutique_storefront::services::RecordedPayments;
use boutique_storefront::state::AppState;

// ============================================================================
// Fake identity provider
// ============================================================================

/// Accounts kept in memory.
///
/// ID tokens are `token-{uid}-{expiry timestamp}` so that [`FakeStore`] can
/// reject expired ones; refresh tokens are `refresh-{uid}`.
pub struct FakeIdentity {
    accounts: Mutex<HashMap<String, (String, UserId)>>,
    events: broadcast::Sender<AuthEvent>,
    token_lifetime: Mutex<TimeDelta>,
    revoked: Mutex<HashSet<UserId>>,
    /// Successful token refreshes so far.
    pub refreshes: AtomicUsize,
}

impl Default for FakeIdentity {
    fn default() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            events: broadcast::channel(16).0,
            token_lifetime: Mutex::new(TimeDelta::hours(1)),
            revoked: Mutex::new(HashSet::new()),
            refreshes: AtomicUsize::new(0),
        }
    }
}

impl FakeIdentity {
    /// Register an account directly.
    pub fn add_account(&self, email: &str, password: &str, uid: &str) {
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_owned(), (password.to_owned(), UserId::new(uid)));
    }

    /// Lifetime of the ID tokens issued from now on.
    pub fn set_token_lifetime(&self, lifetime: TimeDelta) {
        *self.token_lifetime.lock().unwrap() = lifetime;
    }

    /// Invalidate the user's refresh token.
    pub fn revoke(&self, uid: &str) {
        self.revoked.lock().unwrap().insert(UserId::new(uid));
    }

    fn user(&self, email: &Email, uid: &UserId) -> AuthUser {
        let expires_at = Utc::now() + *self.token_lifetime.lock().unwrap();
        AuthUser {
            uid: uid.clone(),
            email: email.clone(),
            id_token: IdToken::new(format!("token-{uid}-{}", expires_at.timestamp())),
            refresh_token: RefreshToken::new(format!("refresh-{uid}")),
            expires_at,
        }
    }
}

/// Whether an ID token issued by [`FakeIdentity`] has expired.
fn is_expired(token: &IdToken) -> bool {
    token
        .expose()
        .rsplit_once('-')
        .and_then(|(_, expiry)| expiry.parse::<i64>().ok())
        .is_none_or(|expiry| expiry <= Utc::now().timestamp())
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthUser, IdentityError> {
        let accounts = self.accounts.lock().unwrap();
        match accounts.get(email.as_str()) {
            Some((stored, uid)) if stored == password.expose_secret() => {
                let _ = self.events.send(AuthEvent::SignedIn(uid.clone()));
                Ok(self.user(email, uid))
            }
            _ => Err(IdentityError::InvalidCredentials),
        }
    }

    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthUser, IdentityError> {
        if password.expose_secret().len() < 6 {
            return Err(IdentityError::WeakPassword("too short".into()));
        }
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email.as_str()) {
            return Err(IdentityError::EmailTaken);
        }
        let uid = UserId::new(format!("uid-{}", accounts.len() + 1));
        accounts.insert(
            email.as_str().to_owned(),
            (password.expose_secret().to_owned(), uid.clone()),
        );
        let _ = self.events.send(AuthEvent::SignedUp(uid.clone()));
        Ok(self.user(email, &uid))
    }

    async fn refresh(&self, user: &AuthUser) -> Result<AuthUser, IdentityError> {
        if self.revoked.lock().unwrap().contains(&user.uid)
            || user.refresh_token.expose() != format!("refresh-{}", user.uid)
        {
            return Err(IdentityError::InvalidCredentials);
        }
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(self.user(&user.email, &user.uid))
    }

    async fn sign_out(&self, uid: &UserId) {
        let _ = self.events.send(AuthEvent::SignedOut(uid.clone()));
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

// ============================================================================
// Fake document store
// ============================================================================

/// Collections kept in memory.
#[derive(Default)]
pub struct FakeStore {
    collections: Mutex<BTreeMap<String, BTreeMap<String, Fields>>>,
    next_id: AtomicUsize,
    /// Make every read of `users` fail like a network outage.
    pub fail_profiles: AtomicBool,
    /// Reads of `users` documents so far.
    pub profile_reads: AtomicUsize,
}

impl FakeStore {
    /// Store a document as-is.
    pub fn put(&self, collection: &str, doc: Document) {
        self.collections
            .lock()
            .unwrap()
            .entry(collection.to_owned())
            .or_default()
            .insert(doc.id, doc.fields);
    }

    /// Documents of a collection, in id order.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for FakeStore {
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
        token: Option<&IdToken>,
    ) -> Result<Option<Document>, StoreError> {
        if collection == collections::USERS {
            self.profile_reads.fetch_add(1, Ordering::SeqCst);
            if self.fail_profiles.load(Ordering::SeqCst) {
                return Err(StoreError::Network("connection refused".into()));
            }
            if token.is_some_and(is_expired) {
                return Err(StoreError::Permission("ID token expired".into()));
            }
        }
        Ok(self
            .documents(collection)
            .into_iter()
            .find(|doc| doc.id == id))
    }

    async fn list_documents(
        &self,
        collection: &str,
        _token: Option<&IdToken>,
    ) -> Result<Vec<Document>, StoreError> {
        Ok(self.documents(collection))
    }

    async fn create_document(
        &self,
        collection: &str,
        fields: Fields,
        _token: Option<&IdToken>,
    ) -> Result<Document, StoreError> {
        let id = format!("doc{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let doc = Document {
            id,
            fields: fields.clone(),
        };
        self.put(collection, doc.clone());
        Ok(doc)
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        _token: Option<&IdToken>,
    ) -> Result<(), StoreError> {
        self.put(
            collection,
            Document {
                id: id.to_owned(),
                fields,
            },
        );
        Ok(())
    }

    async fn delete_document(
        &self,
        collection: &str,
        id: &str,
        _token: Option<&IdToken>,
    ) -> Result<(), StoreError> {
        if let Some(docs) = self.collections.lock().unwrap().get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

// ============================================================================
// Test application
// ============================================================================

/// Storefront configuration pointing nowhere; the fakes never dial out.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        host: Ipv4Addr::LOCALHOST.into(),
        port: 0,
        base_url: Url::parse("http://localhost:3000").unwrap(),
        auth_rate_limit: false,
        role_cache_ttl: Duration::from_secs(300),
        firebase: FirebaseConfig {
            project_id: "boutique-test".into(),
            api_key: SecretString::from("unused-in-tests"),
            auth_url: Url::parse("http://127.0.0.1:9").unwrap(),
            token_url: Url::parse("http://127.0.0.1:9").unwrap(),
            firestore_url: Url::parse("http://127.0.0.1:9").unwrap(),
        },
        sentry: SentryConfig::default(),
    }
}

/// A running storefront plus one browser.
pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub store: Arc<FakeStore>,
    pub identity: Arc<FakeIdentity>,
    subscription: Option<GateSubscription>,
    server: JoinHandle<()>,
}

impl TestApp {
    /// Serve the storefront with default configuration.
    pub async fn spawn() -> Self {
        Self::spawn_with(test_config()).await
    }

    pub async fn spawn_with(config: StorefrontConfig) -> Self {
        let store = Arc::new(FakeStore::default());
        let identity = Arc::new(FakeIdentity::default());
        let payments = Arc::new(RecordedPayments::new(store.clone()));
        let state = AppState::from_parts(config, identity.clone(), store.clone(), payments);
        let subscription = state.gate().subscribe(identity.as_ref());

        let app = boutique_storefront::app(state, session_layer(MemoryStore::default(), false));
        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            client: browser(),
            store,
            identity,
            subscription: Some(subscription),
            server,
        }
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .unwrap()
    }

    pub async fn post(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(format!("{}{path}", self.base_url))
            .form(form)
            .send()
            .await
            .unwrap()
    }

    /// Create an account, optionally with an admin profile, and sign in.
    pub async fn sign_in_as(&self, email: &str, uid: &str, admin: bool) -> reqwest::Response {
        self.identity.add_account(email, "hunter22", uid);
        let role = if admin { "admin" } else { "user" };
        self.store.put(
            collections::USERS,
            Document::new(uid).with("email", email).with("role", role),
        );
        self.post("/signin", &[("email", email), ("password", "hunter22")])
            .await
    }

    /// Stop the identity subscription and the server.
    pub async fn shutdown(mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.close().await;
        }
        self.server.abort();
    }
}

/// A cookie-keeping client that does not follow redirects.
#[must_use]
pub fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// The `Location` of a redirect response.
#[must_use]
pub fn location(response: &reqwest::Response) -> Option<&str> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
}
