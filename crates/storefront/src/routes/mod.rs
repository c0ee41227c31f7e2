//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Home page
//! GET  /about                     - About page
//!
//! # Catalog
//! GET  /categories                - Products by category (?category=)
//! GET  /search                    - Product search (?q=)
//!
//! # Cart
//! GET  /cart                      - Cart page
//! POST /cart/add                  - Add one unit of a product
//! POST /cart/update               - Set a line's quantity
//! POST /cart/remove               - Remove a line
//! POST /cart/clear                - Empty the cart
//!
//! # Checkout
//! GET  /payment                   - Shipping form and total
//! POST /payment                   - Charge and clear the cart
//! GET  /confirmation              - Order reference (?order=)
//!
//! # Auth
//! GET  /signin, POST /signin      - Sign in
//! GET  /signup, POST /signup      - Create an account
//! POST /signout                   - Sign out
//!
//! # Contact
//! GET  /contact, POST /contact    - Contact form
//!
//! # Signed-in users
//! GET  /profil                    - Profile
//! GET  /ajout, POST /ajout        - Add a product
//!
//! # Admin
//! GET  /admin/products            - Product list
//! POST /admin/products/{id}/delete - Delete a product
//! GET  /admin/dashboard           - Counts and revenue
//! GET  /admin/messages            - Contact messages
//! ```
//!
//! Who may reach which path is decided by [`table`], enforced by the route
//! guard wrapped around every route here and around the fallback.

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod contact;
pub mod layout;
pub mod pages;
pub mod table;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};

use crate::middleware::{auth_rate_limiter, route_guard};
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the auth routes router.
///
/// Form posts are rate limited per client IP when enabled.
pub fn auth_routes(rate_limit: bool) -> Router<AppState> {
    let forms = Router::new()
        .route("/signin", post(auth::signin))
        .route("/signup", post(auth::signup));
    let forms = if rate_limit {
        forms.route_layer(auth_rate_limiter())
    } else {
        forms
    };

    Router::new()
        .route("/signin", get(auth::signin_page))
        .route("/signup", get(auth::signup_page))
        .route("/signout", post(auth::signout))
        .merge(forms)
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(admin::products))
        .route("/products/{id}/delete", post(admin::delete_product))
        .route("/dashboard", get(admin::dashboard))
        .route("/messages", get(admin::messages))
}

/// Create all page routes for the storefront, behind the route guard.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(pages::home))
        .route("/about", get(pages::about))
        .route("/categories", get(catalog::categories))
        .route("/search", get(catalog::search))
        .nest("/cart", cart_routes())
        .route("/payment", get(checkout::payment_page).post(checkout::pay))
        .route("/confirmation", get(checkout::confirmation))
        .merge(auth_routes(state.config().auth_rate_limit))
        .route("/contact", get(contact::contact_page).post(contact::submit))
        .route("/profil", get(account::profile))
        .route(
            "/ajout",
            get(account::add_product_page).post(account::add_product),
        )
        .nest("/admin", admin_routes())
        .fallback(pages::not_found)
        .layer(from_fn_with_state(state.clone(), route_guard))
}
