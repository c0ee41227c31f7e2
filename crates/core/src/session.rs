//! Authentication and role state of the current visitor.
//!
//! ```text
//! Anonymous --SignedIn--> Authenticated{User} --RoleResolved(Admin)--> Authenticated{Admin}
//!     ^                          |                                          |
//!     +-------- SignedOut -------+------------------------------------------+
//! ```
//!
//! `is_admin()` can only be true for an authenticated state, so
//! `is_admin => is_authenticated` holds by construction.

use serde::{Deserialize, Serialize};

use crate::types::Role;

/// What the identity layer currently knows about the visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// No signed-in user.
    #[default]
    Anonymous,
    /// A user is signed in. `role` stays [`Role::User`] until a lookup says otherwise.
    Authenticated { role: Role },
}

/// An input to the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The identity provider reports a signed-in user.
    SignedIn,
    /// The profile lookup for the signed-in user completed.
    RoleResolved(Role),
    /// The profile lookup failed; the role stays non-admin.
    RoleLookupFailed,
    /// The identity provider reports no user.
    SignedOut,
}

impl SessionState {
    /// Apply one event and return the next state.
    #[must_use]
    pub const fn apply(self, event: SessionEvent) -> Self {
        match (self, event) {
            (_, SessionEvent::SignedOut) => Self::Anonymous,
            (Self::Anonymous, SessionEvent::SignedIn) => Self::Authenticated { role: Role::User },
            (Self::Authenticated { .. }, SessionEvent::SignedIn) => self,
            (Self::Authenticated { .. }, SessionEvent::RoleResolved(role)) => {
                Self::Authenticated { role }
            }
            (Self::Authenticated { .. }, SessionEvent::RoleLookupFailed) => {
                Self::Authenticated { role: Role::User }
            }
            // A lookup finishing after sign-out must not resurrect the session.
            (Self::Anonymous, SessionEvent::RoleResolved(_) | SessionEvent::RoleLookupFailed) => {
                Self::Anonymous
            }
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Authenticated { role: Role::Admin })
    }

    /// Role of the signed-in user, if any.
    #[must_use]
    pub const fn role(&self) -> Option<Role> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { role } => Some(*role),
        }
    }
}
