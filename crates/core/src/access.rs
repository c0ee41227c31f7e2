//! Route capabilities and the guard decision.

use serde::{Deserialize, Serialize};

use crate::session::SessionState;

/// The minimum session privilege a route requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Anyone.
    Public,
    /// Any signed-in user.
    Authenticated,
    /// Signed-in users whose profile role is `admin`.
    Admin,
}

/// Outcome of checking a capability against a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Render the view.
    Allow,
    /// Send the visitor to the sign-in page instead.
    RedirectToSignIn,
    /// Behave as if the route did not exist.
    NotFound,
}

impl Capability {
    /// Decide what happens when `session` navigates to a route requiring `self`.
    ///
    /// Admin routes are not part of the route set for non-admins, so they
    /// answer [`Access::NotFound`] rather than revealing that they exist.
    #[must_use]
    pub const fn check(self, session: &SessionState) -> Access {
        match self {
            Self::Public => Access::Allow,
            Self::Authenticated if session.is_authenticated() => Access::Allow,
            Self::Authenticated => Access::RedirectToSignIn,
            Self::Admin if session.is_admin() => Access::Allow,
            Self::Admin => Access::NotFound,
        }
    }
}
