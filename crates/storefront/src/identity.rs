//! Identity gate: turns the signed-in user into a [`SessionState`].
//!
//! Every request resolves its session from the user stored in the browser
//! session. A signed-in user is authenticated right away; whether they are an
//! admin comes from the `role` field of their `users/{uid}` profile, looked up
//! in the document store and cached per uid. A lookup that fails leaves the
//! user a plain customer.
//!
//! The cache is kept coherent by [`IdentityGate::subscribe`], which listens to
//! the identity provider's session events and drops the cached role of any
//! user whose session changed.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::instrument;

use boutique_core::{Role, SessionEvent, SessionState, UserId};

use crate::backend::{AuthUser, DocumentStore, IdentityProvider, StoreError, collections};

const ROLE_CACHE_CAPACITY: u64 = 10_000;

/// Resolves session state and caches user roles.
#[derive(Clone)]
pub struct IdentityGate {
    store: Arc<dyn DocumentStore>,
    roles: Cache<UserId, Role>,
}

impl IdentityGate {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, role_ttl: Duration) -> Self {
        let roles = Cache::builder()
            .max_capacity(ROLE_CACHE_CAPACITY)
            .time_to_live(role_ttl)
            .build();
        Self { store, roles }
    }

    /// Session state for the request's signed-in user, if any.
    ///
    /// Never fails: a role lookup error is logged and yields a non-admin
    /// session.
    pub async fn resolve(&self, user: Option<&AuthUser>) -> SessionState {
        let Some(user) = user else {
            return SessionState::default();
        };

        let state = SessionState::default().apply(SessionEvent::SignedIn);
        let event = match self.role_of(user).await {
            Ok(role) => SessionEvent::RoleResolved(role),
            Err(e) => {
                tracing::warn!(uid = %user.uid, error = %e, "Role lookup failed, treating user as non-admin");
                SessionEvent::RoleLookupFailed
            }
        };
        state.apply(event)
    }

    /// Role stored on the user's profile, from cache when possible.
    ///
    /// # Errors
    ///
    /// Returns the store error when the profile cannot be read. Failures are
    /// not cached.
    #[instrument(skip(self, user), fields(uid = %user.uid))]
    pub async fn role_of(&self, user: &AuthUser) -> Result<Role, StoreError> {
        if let Some(role) = self.roles.get(&user.uid).await {
            return Ok(role);
        }

        let profile = self
            .store
            .get_document(collections::USERS, user.uid.as_str(), Some(&user.id_token))
            .await?;

        // A missing profile is a regular customer.
        let role = Role::from_field(profile.as_ref().and_then(|doc| doc.string("role")));
        self.roles.insert(user.uid.clone(), role).await;
        Ok(role)
    }

    /// Drop the cached role of one user.
    pub async fn forget(&self, uid: &UserId) {
        self.roles.invalidate(uid).await;
    }

    /// Listen to the provider's session events until the returned handle is
    /// closed or dropped.
    #[must_use = "dropping the subscription stops the listener"]
    pub fn subscribe(&self, provider: &dyn IdentityProvider) -> GateSubscription {
        let mut events = provider.subscribe();
        let (stop, mut stopped) = oneshot::channel::<()>();
        let gate = self.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    event = events.recv() => match event {
                        Ok(event) => {
                            tracing::debug!(?event, "Session event");
                            gate.forget(event.uid()).await;
                        }
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            tracing::warn!(missed, "Session events lagged, clearing role cache");
                            gate.roles.invalidate_all();
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            tracing::debug!("Identity subscription ended");
        });

        GateSubscription {
            stop: Some(stop),
            task: Some(task),
        }
    }
}

/// Handle on the gate's event listener.
///
/// Call [`close`](Self::close) during shutdown; dropping it without closing
/// aborts the listener.
pub struct GateSubscription {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl GateSubscription {
    /// Stop the listener and wait for it to finish.
    pub async fn close(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::warn!(error = %e, "Identity subscription task failed");
        }
    }

    /// Whether the listener is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for GateSubscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
