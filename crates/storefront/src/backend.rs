//! Contracts of the external collaborators.
//!
//! The storefront never talks to Firebase or the payment processor directly;
//! handlers go through these traits, held as `Arc<dyn ...>` in [`AppState`].
//! Production implementations live in [`crate::firebase`] and
//! [`crate::services::payment`].
//!
//! [`AppState`]: crate::state::AppState

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use boutique_core::{Email, OrderId, Price, UserId};

/// Collection names in the document store.
pub mod collections {
    pub const USERS: &str = "users";
    pub const PRODUCTS: &str = "products";
    pub const MESSAGES: &str = "messages";
    pub const ORDERS: &str = "orders";
}

// =============================================================================
// Identity provider
// =============================================================================

/// An ID token issued by the identity provider.
///
/// Forwarded as a bearer token to the document store so its security rules
/// see the signed-in user. `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdToken(String);

impl IdToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for IdToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdToken([REDACTED])")
    }
}

/// Long-lived token exchanged for fresh ID tokens. `Debug` never prints it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshToken(String);

impl RefreshToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefreshToken([REDACTED])")
    }
}

/// ID tokens this close to expiry are refreshed before use.
pub const TOKEN_EXPIRY_MARGIN: TimeDelta = TimeDelta::seconds(60);

/// A user signed in with the identity provider.
///
/// This is what the session remembers between requests. ID tokens are
/// short-lived; [`IdentityProvider::refresh`] trades the refresh token for a
/// new one once [`AuthUser::needs_refresh`] says so.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Stable unique identifier.
    pub uid: UserId,
    pub email: Email,
    pub id_token: IdToken,
    pub refresh_token: RefreshToken,
    /// When `id_token` stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl AuthUser {
    /// Whether the ID token is expired, or will be within
    /// [`TOKEN_EXPIRY_MARGIN`], at `now`.
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now + TOKEN_EXPIRY_MARGIN >= self.expires_at
    }
}

/// Session change reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(UserId),
    SignedUp(UserId),
    SignedOut(UserId),
}

impl AuthEvent {
    /// The user the event is about.
    #[must_use]
    pub const fn uid(&self) -> &UserId {
        match self {
            Self::SignedIn(uid) | Self::SignedUp(uid) | Self::SignedOut(uid) => uid,
        }
    }
}

/// Errors from the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Unknown email or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Sign-up with an email that already has an account.
    #[error("email already registered")]
    EmailTaken,

    /// Password rejected by the provider's policy.
    #[error("weak password: {0}")]
    WeakPassword(String),

    /// Account disabled by an administrator.
    #[error("user disabled")]
    UserDisabled,

    /// Provider-side throttling.
    #[error("too many attempts")]
    TooManyAttempts,

    /// The provider could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// Any other provider failure.
    #[error("identity provider error: {0}")]
    Provider(String),
}

/// Sign-in, sign-up and session-change notifications.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange email and password for a signed-in user.
    async fn sign_in(&self, email: &Email, password: &SecretString)
    -> Result<AuthUser, IdentityError>;

    /// Create an account and sign it in.
    async fn sign_up(&self, email: &Email, password: &SecretString)
    -> Result<AuthUser, IdentityError>;

    /// Trade the user's refresh token for a new ID token.
    ///
    /// The returned user carries the new tokens and expiry; uid and email
    /// are unchanged.
    async fn refresh(&self, user: &AuthUser) -> Result<AuthUser, IdentityError>;

    /// End the user's session with the provider.
    async fn sign_out(&self, uid: &UserId);

    /// Receive every session change from now on.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

// =============================================================================
// Document store
// =============================================================================

/// A typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Double(f64),
    Integer(i64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Array(Vec<FieldValue>),
    Map(Fields),
    Null,
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<Vec<Self>> for FieldValue {
    fn from(value: Vec<Self>) -> Self {
        Self::Array(value)
    }
}

impl From<Fields> for FieldValue {
    fn from(value: Fields) -> Self {
        Self::Map(value)
    }
}

/// Field map of a document.
pub type Fields = BTreeMap<String, FieldValue>;

/// A stored document: its id within the collection and its fields.
///
/// Accessors return `None` when a field is missing or has another type, so
/// callers validate the shape at the boundary instead of trusting it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Fields::new(),
        }
    }

    /// Builder-style field setter.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.to_owned(), value.into());
        self
    }

    #[must_use]
    pub fn string(&self, name: &str) -> Option<&str> {
        match self.fields.get(name)? {
            FieldValue::String(value) => Some(value),
            _ => None,
        }
    }

    /// Numeric field as a float; integers are widened.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Prices and counts stay far below 2^53
    pub fn number(&self, name: &str) -> Option<f64> {
        match self.fields.get(name)? {
            FieldValue::Double(value) => Some(*value),
            FieldValue::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.fields.get(name)? {
            FieldValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn timestamp(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.fields.get(name)? {
            FieldValue::Timestamp(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn array(&self, name: &str) -> Option<&[FieldValue]> {
        match self.fields.get(name)? {
            FieldValue::Array(values) => Some(values),
            _ => None,
        }
    }
}

/// Errors from the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// Security rules rejected the request.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Any other non-success status.
    #[error("document store returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Collections of schemaless documents.
///
/// `token` is the signed-in user's ID token, when there is one.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document; `Ok(None)` when it does not exist.
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
        token: Option<&IdToken>,
    ) -> Result<Option<Document>, StoreError>;

    /// Every document of a collection.
    async fn list_documents(
        &self,
        collection: &str,
        token: Option<&IdToken>,
    ) -> Result<Vec<Document>, StoreError>;

    /// Insert a document under a store-assigned id.
    async fn create_document(
        &self,
        collection: &str,
        fields: Fields,
        token: Option<&IdToken>,
    ) -> Result<Document, StoreError>;

    /// Create or replace the document with the given id.
    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        token: Option<&IdToken>,
    ) -> Result<(), StoreError>;

    /// Delete a document; deleting a missing document succeeds.
    async fn delete_document(
        &self,
        collection: &str,
        id: &str,
        token: Option<&IdToken>,
    ) -> Result<(), StoreError>;
}

// =============================================================================
// Payment collaborator
// =============================================================================

/// A line of an order, frozen at payment time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: String,
    pub name: String,
    pub unit_price: Price,
    pub quantity: u32,
}

/// Everything the payment collaborator needs to settle a cart.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub customer_name: String,
    pub email: Email,
    pub shipping_address: String,
    pub lines: Vec<OrderLine>,
    pub total: Price,
    /// Set when the buyer is signed in.
    pub buyer: Option<AuthUser>,
}

/// Proof that a payment was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub order_id: OrderId,
    pub total: Price,
}

/// Errors from the payment collaborator.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The processor refused the payment.
    #[error("payment declined: {0}")]
    Declined(String),

    /// The processor or its ledger failed.
    #[error("payment processor error: {0}")]
    Processor(String),
}

/// Settles a cart total.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, request: PaymentRequest) -> Result<PaymentReceipt, PaymentError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_token_debug_is_redacted() {
        let token = IdToken::new("eyJhbGciOi.secret");
        let debug = format!("{token:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_needs_refresh_near_expiry() {
        let now = Utc::now();
        let user = AuthUser {
            uid: UserId::new("u1"),
            email: Email::parse("ada@example.com").unwrap(),
            id_token: IdToken::new("t"),
            refresh_token: RefreshToken::new("r"),
            expires_at: now + TimeDelta::minutes(30),
        };
        assert!(!user.needs_refresh(now));
        assert!(user.needs_refresh(now + TimeDelta::minutes(30)));
        assert!(user.needs_refresh(now + TimeDelta::minutes(30) - TimeDelta::seconds(10)));
        assert!(!format!("{user:?}").contains("\"r\""));
    }

    #[test]
    fn test_document_accessors_check_types() {
        let doc = Document::new("p1")
            .with("name", "Mug")
            .with("price", 12.5)
            .with("stock", 3_i64);

        assert_eq!(doc.string("name"), Some("Mug"));
        assert_eq!(doc.string("price"), None);
        assert_eq!(doc.number("price"), Some(12.5));
        assert_eq!(doc.number("stock"), Some(3.0));
        assert_eq!(doc.integer("price"), None);
        assert_eq!(doc.string("missing"), None);
    }

    #[test]
    fn test_auth_event_uid() {
        let uid = UserId::new("u1");
        assert_eq!(AuthEvent::SignedOut(uid.clone()).uid(), &uid);
    }
}
