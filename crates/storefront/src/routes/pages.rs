//! Static pages and the not-found page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use boutique_core::Product;

use super::layout::Layout;
use crate::db::ProductRepository;
use crate::middleware::SessionContext;
use crate::state::AppState;

/// Products shown on the home page.
const FEATURED_PRODUCTS: usize = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub featured: Vec<Product>,
}

#[derive(Template, WebTemplate)]
#[template(path = "pages/about.html")]
pub struct AboutTemplate {
    pub layout: Layout,
}

#[derive(Template, WebTemplate)]
#[template(path = "pages/not_found.html")]
pub struct NotFoundTemplate {
    pub layout: Layout,
}

/// Display the home page.
///
/// A catalog outage shows the page without featured products.
#[instrument(skip(state, session, ctx))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    ctx: SessionContext,
) -> impl IntoResponse {
    let featured = ProductRepository::new(state.store())
        .list()
        .await
        .map_or_else(
            |e| {
                tracing::error!("Failed to fetch featured products: {e}");
                Vec::new()
            },
            |products| products.into_iter().take(FEATURED_PRODUCTS).collect(),
        );

    HomeTemplate {
        layout: Layout::load("Home", &session, &ctx).await,
        featured,
    }
}

/// Display the about page.
pub async fn about(session: Session, ctx: SessionContext) -> impl IntoResponse {
    AboutTemplate {
        layout: Layout::load("About", &session, &ctx).await,
    }
}

/// Render the not-found page with a 404 status.
///
/// Serves unknown paths and admin pages requested by non-admins alike.
pub async fn not_found(session: Session, ctx: SessionContext) -> Response {
    let page = NotFoundTemplate {
        layout: Layout::load("Page not found", &session, &ctx).await,
    };
    (StatusCode::NOT_FOUND, page).into_response()
}
