//! Authentication route handlers.
//!
//! Sign-in and sign-up go through the identity provider; the signed-in user
//! is kept in the session. Failures redirect back to the form with an
//! `?error=` code.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use boutique_core::Email;

use super::layout::{Layout, error_message};
use crate::backend::{AuthUser, IdentityError};
use crate::db::ProfileRepository;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{SessionContext, clear_current_user, set_current_user};
use crate::state::AppState;

/// Where a successful sign-in or sign-up lands.
const AFTER_SIGN_IN: &str = "/";

// =============================================================================
// Form Types
// =============================================================================

/// Sign-in form data.
#[derive(Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

/// Sign-up form data.
#[derive(Deserialize)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Query parameters for error display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "auth/signin.html")]
pub struct SignInTemplate {
    pub layout: Layout,
    pub error: Option<&'static str>,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignUpTemplate {
    pub layout: Layout,
    pub error: Option<&'static str>,
}

// =============================================================================
// Sign-in
// =============================================================================

/// Display the sign-in page.
pub async fn signin_page(
    session: Session,
    ctx: SessionContext,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    SignInTemplate {
        layout: Layout::load("Sign in", &session, &ctx).await,
        error: query.error.as_deref().map(error_message),
    }
}

/// Handle sign-in form submission.
#[instrument(skip(state, session, form))]
pub async fn signin(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignInForm>,
) -> Response {
    let Ok(email) = Email::parse(&form.email) else {
        return Redirect::to("/signin?error=email").into_response();
    };

    let password = SecretString::from(form.password);
    match state.identity().sign_in(&email, &password).await {
        Ok(user) => start_session(&session, &user, "/signin").await,
        Err(e) => {
            log_identity_error(&e, "Sign-in failed");
            Redirect::to(&format!("/signin?error={}", error_code(&e))).into_response()
        }
    }
}

// =============================================================================
// Sign-up
// =============================================================================

/// Display the sign-up page.
pub async fn signup_page(
    session: Session,
    ctx: SessionContext,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    SignUpTemplate {
        layout: Layout::load("Sign up", &session, &ctx).await,
        error: query.error.as_deref().map(error_message),
    }
}

/// Handle sign-up form submission.
///
/// Creates the account, writes its `user` profile and signs it in. A failed
/// profile write leaves the account without a profile, which reads as a
/// regular user.
#[instrument(skip(state, session, form))]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignUpForm>,
) -> Response {
    let Ok(email) = Email::parse(&form.email) else {
        return Redirect::to("/signup?error=email").into_response();
    };
    if form.password != form.password_confirm {
        return Redirect::to("/signup?error=password_mismatch").into_response();
    }

    let password = SecretString::from(form.password);
    let user = match state.identity().sign_up(&email, &password).await {
        Ok(user) => user,
        Err(e) => {
            log_identity_error(&e, "Sign-up failed");
            return Redirect::to(&format!("/signup?error={}", error_code(&e))).into_response();
        }
    };

    if let Err(e) = ProfileRepository::new(state.store())
        .create(&user.uid, &user.email, &user.id_token)
        .await
    {
        tracing::error!(uid = %user.uid, error = %e, "Failed to write profile");
    }

    start_session(&session, &user, "/signup").await
}

// =============================================================================
// Sign-out
// =============================================================================

/// Sign out, keeping the cart.
#[instrument(skip(state, session))]
pub async fn signout(State(state): State<AppState>, session: Session) -> Result<Redirect> {
    if let Some(user) = clear_current_user(&session).await? {
        state.identity().sign_out(&user.uid).await;
        tracing::info!(uid = %user.uid, "Signed out");
    }
    clear_sentry_user();
    Ok(Redirect::to(AFTER_SIGN_IN))
}

// =============================================================================
// Helpers
// =============================================================================

async fn start_session(session: &Session, user: &AuthUser, form_path: &str) -> Response {
    if let Err(e) = set_current_user(session, user).await {
        tracing::error!("Failed to set session: {}", e);
        return Redirect::to(&format!("{form_path}?error=session")).into_response();
    }
    set_sentry_user(&user.uid, Some(user.email.as_str()));
    tracing::info!(uid = %user.uid, "Signed in");
    Redirect::to(AFTER_SIGN_IN).into_response()
}

/// Form error code for an identity failure.
const fn error_code(error: &IdentityError) -> &'static str {
    match error {
        IdentityError::InvalidCredentials => "credentials",
        IdentityError::EmailTaken => "email_taken",
        IdentityError::WeakPassword(_) => "weak_password",
        IdentityError::UserDisabled => "disabled",
        IdentityError::TooManyAttempts => "too_many",
        IdentityError::Network(_) | IdentityError::Provider(_) => "unavailable",
    }
}

fn log_identity_error(error: &IdentityError, message: &str) {
    match error {
        IdentityError::Network(_) | IdentityError::Provider(_) => {
            tracing::error!(error = %error, "{message}");
        }
        _ => tracing::warn!(error = %error, "{message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_error_code_has_a_message() {
        for error in [
            IdentityError::InvalidCredentials,
            IdentityError::EmailTaken,
            IdentityError::WeakPassword("short".into()),
            IdentityError::UserDisabled,
            IdentityError::TooManyAttempts,
        ] {
            assert_ne!(
                error_message(error_code(&error)),
                error_message("unavailable"),
                "{error:?}"
            );
        }
    }
}
