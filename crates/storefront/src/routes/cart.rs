//! Cart route handlers.
//!
//! The cart lives in the session. Every mutation is a form post that loads
//! the cart, applies one action, stores it and redirects back.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use boutique_core::{Cart, CartAction, ProductId};

use super::layout::Layout;
use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::SessionContext;
use crate::services::cart;
use crate::state::AppState;

const CART_PATH: &str = "/cart";

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddForm {
    pub product_id: String,
    /// Local page to return to, defaults to the cart.
    pub return_to: Option<String>,
}

/// Update quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateForm {
    pub product_id: String,
    pub quantity: i64,
}

/// Remove item form data.
#[derive(Debug, Deserialize)]
pub struct RemoveForm {
    pub product_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/cart.html")]
pub struct CartTemplate {
    pub layout: Layout,
    pub cart: Cart,
}

/// Display the cart page.
pub async fn show(session: Session, ctx: SessionContext) -> Result<impl IntoResponse> {
    let cart = cart::load(&session).await?;
    Ok(CartTemplate {
        layout: Layout::new("Cart", &ctx, cart.summary()),
        cart,
    })
}

/// Add one unit of a catalog product.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddForm>,
) -> Result<Redirect> {
    let id = ProductId::new(form.product_id);
    let product = ProductRepository::new(state.store())
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let cart = cart::dispatch(&session, CartAction::Add(product)).await?;
    tracing::debug!(items = cart.len(), "Added to cart");

    Ok(Redirect::to(return_path(form.return_to.as_deref())))
}

/// Set the quantity of a line. Unknown lines are ignored.
#[instrument(skip(session))]
pub async fn update(session: Session, Form(form): Form<UpdateForm>) -> Result<Redirect> {
    cart::dispatch(
        &session,
        CartAction::UpdateQuantity {
            id: ProductId::new(form.product_id),
            quantity: form.quantity,
        },
    )
    .await?;
    Ok(Redirect::to(CART_PATH))
}

/// Remove a line. Unknown lines are ignored.
#[instrument(skip(session))]
pub async fn remove(session: Session, Form(form): Form<RemoveForm>) -> Result<Redirect> {
    cart::dispatch(&session, CartAction::Remove(ProductId::new(form.product_id))).await?;
    Ok(Redirect::to(CART_PATH))
}

/// Empty the cart.
pub async fn clear(session: Session) -> Result<Redirect> {
    cart::dispatch(&session, CartAction::Clear).await?;
    Ok(Redirect::to(CART_PATH))
}

/// Only same-site paths are followed; anything else goes to the cart.
fn return_path(requested: Option<&str>) -> &str {
    match requested {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => CART_PATH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_path() {
        assert_eq!(return_path(None), "/cart");
        assert_eq!(
            return_path(Some("/categories?category=Tea")),
            "/categories?category=Tea"
        );
        assert_eq!(return_path(Some("https://evil.example")), "/cart");
        assert_eq!(return_path(Some("//evil.example")), "/cart");
        assert_eq!(return_path(Some("/\\evil.example")), "/cart");
    }
}
