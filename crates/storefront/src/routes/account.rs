//! Pages for signed-in users: the profile and the add-product form.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use boutique_core::{Price, Role};

use super::layout::{Layout, error_message};
use crate::db::ProductRepository;
use crate::error::Result;
use crate::middleware::{RequireAuth, SessionContext};
use crate::models::NewProduct;
use crate::state::AppState;

/// New product form data.
#[derive(Debug, Deserialize)]
pub struct ProductForm {
    pub name: String,
    pub price: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
}

#[derive(Debug, Deserialize)]
pub struct AddProductQuery {
    pub error: Option<String>,
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/profil.html")]
pub struct ProfileTemplate {
    pub layout: Layout,
    pub uid: String,
    pub email: String,
    pub role: Role,
}

#[derive(Template, WebTemplate)]
#[template(path = "account/ajout.html")]
pub struct AddProductTemplate {
    pub layout: Layout,
    pub error: Option<&'static str>,
}

/// Display the signed-in user's profile.
pub async fn profile(
    RequireAuth(user): RequireAuth,
    session: Session,
    ctx: SessionContext,
) -> impl IntoResponse {
    ProfileTemplate {
        layout: Layout::load("Profile", &session, &ctx).await,
        uid: user.uid.to_string(),
        email: user.email.to_string(),
        role: ctx.state.role().unwrap_or_default(),
    }
}

/// Display the add-product form.
pub async fn add_product_page(
    session: Session,
    ctx: SessionContext,
    Query(query): Query<AddProductQuery>,
) -> impl IntoResponse {
    AddProductTemplate {
        layout: Layout::load("Add a product", &session, &ctx).await,
        error: query.error.as_deref().map(error_message),
    }
}

/// Create a product from the form.
#[instrument(skip(state, user, form), fields(uid = %user.uid))]
pub async fn add_product(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ProductForm>,
) -> Result<Redirect> {
    let product = match parse_product(form) {
        Ok(product) => product,
        Err(code) => return Ok(Redirect::to(&format!("/ajout?error={code}"))),
    };

    let created = ProductRepository::new(state.store())
        .create(product, &user.id_token)
        .await?;
    tracing::info!(product_id = %created.id, "Product created");

    Ok(Redirect::to("/categories"))
}

/// Validate the form into a product, or the form error code.
fn parse_product(form: ProductForm) -> std::result::Result<NewProduct, &'static str> {
    let name = form.name.trim();
    if name.is_empty() {
        return Err("missing");
    }
    let price: Price = form.price.trim().parse().map_err(|_| "price")?;

    Ok(NewProduct {
        name: name.to_owned(),
        price,
        category: non_empty(form.category),
        description: non_empty(form.description),
        image_url: non_empty(form.image_url),
    })
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}
