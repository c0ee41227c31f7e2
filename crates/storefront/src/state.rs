//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::{DocumentStore, IdentityProvider, PaymentGateway};
use crate::config::StorefrontConfig;
use crate::firebase::{FirebaseAuth, Firestore};
use crate::identity::IdentityGate;
use crate::services::RecordedPayments;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Collaborators sit behind
/// trait objects so tests can swap in fakes.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    payments: Arc<dyn PaymentGateway>,
    gate: IdentityGate,
}

impl AppState {
    /// Create the production state backed by Firebase.
    ///
    /// One `reqwest::Client` is shared by both Firebase clients.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let client = reqwest::Client::new();
        let identity: Arc<dyn IdentityProvider> =
            Arc::new(FirebaseAuth::new(client.clone(), &config.firebase));
        let store: Arc<dyn DocumentStore> = Arc::new(Firestore::new(client, &config.firebase));
        let payments: Arc<dyn PaymentGateway> = Arc::new(RecordedPayments::new(store.clone()));

        Self::from_parts(config, identity, store, payments)
    }

    /// Assemble the state from explicit collaborators.
    #[must_use]
    pub fn from_parts(
        config: StorefrontConfig,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        let gate = IdentityGate::new(store.clone(), config.role_cache_ttl);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                identity,
                store,
                payments,
                gate,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The identity provider used by the sign-in and sign-up forms.
    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.identity.as_ref()
    }

    /// The document store holding products, profiles, messages and orders.
    #[must_use]
    pub fn store(&self) -> &dyn DocumentStore {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn payments(&self) -> &dyn PaymentGateway {
        self.inner.payments.as_ref()
    }

    /// The gate resolving each request's session state.
    #[must_use]
    pub fn gate(&self) -> &IdentityGate {
        &self.inner.gate
    }
}
