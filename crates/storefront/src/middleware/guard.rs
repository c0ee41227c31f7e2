//! Route guard: resolves who is asking and whether they may see the page.

use axum::{
    extract::{OriginalUri, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use boutique_core::Access;

use super::auth::{SIGN_IN_PATH, SessionContext, fresh_user};
use crate::routes::{pages, table};
use crate::state::AppState;

/// Gate every page request on the route table.
///
/// The signed-in user's ID token is refreshed when it is about to expire,
/// then the session state is resolved once per request through the identity
/// gate and handed to the view as a [`SessionContext`] extension.
/// Authenticated pages redirect anonymous visitors to the sign-in page;
/// admin pages answer exactly like an unknown path for everyone else.
pub async fn route_guard(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    let user = fresh_user(&session, state.identity()).await;
    let resolved = state.gate().resolve(user.as_ref()).await;
    // Nested routers see a stripped URI; the table is keyed by full paths.
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map_or_else(|| request.uri().path().to_owned(), |uri| uri.path().to_owned());
    let capability = table::capability_for(&path);
    let ctx = SessionContext {
        state: resolved,
        user,
    };

    match capability.check(&ctx.state) {
        Access::Allow => {
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Access::RedirectToSignIn => {
            tracing::debug!(%path, "Redirecting anonymous visitor");
            Redirect::to(SIGN_IN_PATH).into_response()
        }
        Access::NotFound => pages::not_found(session, ctx).await,
    }
}
