//! Authentication extractors and session helpers.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tower_sessions::Session;

use boutique_core::SessionState;

use crate::backend::{AuthUser, IdentityError, IdentityProvider};
use crate::models::session::keys;

/// Where unauthenticated visitors are sent.
pub const SIGN_IN_PATH: &str = "/signin";

/// The resolved session of the current request.
///
/// Inserted into request extensions by the route guard. Requests that did
/// not pass through the guard read as anonymous.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub state: SessionState,
    pub user: Option<AuthUser>,
}

impl SessionContext {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.state.is_admin()
    }
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().cloned().unwrap_or_default())
    }
}

/// Extractor that requires a signed-in user.
///
/// If nobody is signed in, the request is redirected to the sign-in page.
///
/// # Example
///
/// ```rust,ignore
/// async fn profile(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub AuthUser);

/// Error returned when authentication is required but nobody is signed in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the sign-in page.
    RedirectToSignIn,
    /// The session layer is missing from the stack.
    MissingSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToSignIn => Redirect::to(SIGN_IN_PATH).into_response(),
            Self::MissingSession => {
                tracing::error!("RequireAuth used on a route without the session layer");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(SessionContext {
            user: Some(user), ..
        }) = parts.extensions.get::<SessionContext>()
        {
            return Ok(Self(user.clone()));
        }

        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::MissingSession)?;

        current_user(session)
            .await
            .map(Self)
            .ok_or(AuthRejection::RedirectToSignIn)
    }
}

/// The signed-in user stored in the session, if any.
///
/// An unreadable entry counts as signed out.
pub async fn current_user(session: &Session) -> Option<AuthUser> {
    session
        .get::<AuthUser>(keys::CURRENT_USER)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Unreadable signed-in user in session"))
        .ok()
        .flatten()
}

/// The signed-in user with an ID token that is still good.
///
/// An expiring token is traded for a new one and the session updated. If
/// the provider refuses the refresh token the user is signed out; if it
/// cannot be reached the stale user is kept and later calls that present
/// its token fail on their own.
pub async fn fresh_user(session: &Session, identity: &dyn IdentityProvider) -> Option<AuthUser> {
    let user = current_user(session).await?;
    if !user.needs_refresh(Utc::now()) {
        return Some(user);
    }

    match identity.refresh(&user).await {
        Ok(refreshed) => {
            if let Err(e) = session.insert(keys::CURRENT_USER, &refreshed).await {
                tracing::warn!(uid = %user.uid, error = %e, "Failed to store refreshed ID token");
            }
            Some(refreshed)
        }
        Err(IdentityError::Network(e) | IdentityError::Provider(e)) => {
            tracing::warn!(uid = %user.uid, error = %e, "ID token refresh failed");
            Some(user)
        }
        Err(e) => {
            tracing::info!(uid = %user.uid, error = %e, "Refresh token rejected, signing out");
            if let Err(e) = clear_current_user(session).await {
                tracing::warn!(error = %e, "Failed to clear signed-in user");
            }
            None
        }
    }
}

/// Store the signed-in user in the session.
///
/// The session id is cycled first so a pre-login session id cannot be reused
/// to ride the new login.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &AuthUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_USER, user).await
}

/// Remove the signed-in user from the session. The cart stays.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(
    session: &Session,
) -> Result<Option<AuthUser>, tower_sessions::session::Error> {
    session.remove::<AuthUser>(keys::CURRENT_USER).await
}
