//! Administration pages.
//!
//! Only reachable by admins: the route guard answers 404 to everyone else.
//! Reads and writes go to the store with the admin's ID token so the store's
//! own rules apply as well.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use tower_sessions::Session;
use tracing::instrument;

use boutique_core::{Product, ProductId};

use super::layout::Layout;
use crate::db::{MessageRepository, OrderRepository, ProductRepository};
use crate::error::Result;
use crate::middleware::{RequireAuth, SessionContext};
use crate::models::{DashboardStats, Message, Order};
use crate::state::AppState;

/// Orders listed on the dashboard.
const RECENT_ORDERS: usize = 10;

#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct ProductsTemplate {
    pub layout: Layout,
    pub products: Vec<Product>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub stats: DashboardStats,
    pub recent_orders: Vec<Order>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/messages.html")]
pub struct MessagesTemplate {
    pub layout: Layout,
    pub messages: Vec<Message>,
}

/// List every product with a delete button.
#[instrument(skip(state, session, ctx))]
pub async fn products(
    State(state): State<AppState>,
    session: Session,
    ctx: SessionContext,
) -> Result<impl IntoResponse> {
    let products = ProductRepository::new(state.store()).list().await?;
    Ok(ProductsTemplate {
        layout: Layout::load("Products", &session, &ctx).await,
        products,
    })
}

/// Delete a product.
#[instrument(skip(state, user), fields(uid = %user.uid))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let id = ProductId::new(id);
    ProductRepository::new(state.store())
        .delete(&id, &user.id_token)
        .await?;
    tracing::info!(product_id = %id, "Product deleted");
    Ok(Redirect::to("/admin/products"))
}

/// Store counts and revenue.
#[instrument(skip(state, session, ctx, user))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    ctx: SessionContext,
) -> Result<impl IntoResponse> {
    let token = &user.id_token;
    let store = state.store();

    let product_repo = ProductRepository::new(store);
    let message_repo = MessageRepository::new(store);
    let order_repo = OrderRepository::new(store);
    let (products, messages, orders) = tokio::try_join!(
        product_repo.list(),
        message_repo.count(token),
        order_repo.list(token),
    )?;

    let stats = DashboardStats::new(products.len(), messages, &orders);
    let recent_orders = orders.into_iter().take(RECENT_ORDERS).collect();

    Ok(DashboardTemplate {
        layout: Layout::load("Dashboard", &session, &ctx).await,
        stats,
        recent_orders,
    })
}

/// Contact messages, newest first.
#[instrument(skip(state, session, ctx, user))]
pub async fn messages(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    ctx: SessionContext,
) -> Result<impl IntoResponse> {
    let messages = MessageRepository::new(state.store())
        .list(&user.id_token)
        .await?;
    Ok(MessagesTemplate {
        layout: Layout::load("Messages", &session, &ctx).await,
        messages,
    })
}
