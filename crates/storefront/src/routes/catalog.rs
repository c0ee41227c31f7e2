//! Catalog route handlers: categories and search.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use boutique_core::Product;

use super::layout::Layout;
use crate::db::ProductRepository;
use crate::error::Result;
use crate::middleware::SessionContext;
use crate::state::AppState;

/// Heading for products without a category.
const UNCATEGORIZED: &str = "Other";

/// Query parameters for the categories page.
#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

/// Query parameters for the search page.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Products sharing a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup {
    pub name: String,
    pub products: Vec<Product>,
}

#[derive(Template, WebTemplate)]
#[template(path = "pages/categories.html")]
pub struct CategoriesTemplate {
    pub layout: Layout,
    /// Every category name, for the filter links.
    pub categories: Vec<String>,
    pub selected: Option<String>,
    pub groups: Vec<CategoryGroup>,
}

#[derive(Template, WebTemplate)]
#[template(path = "pages/search.html")]
pub struct SearchTemplate {
    pub layout: Layout,
    pub query: String,
    pub results: Vec<Product>,
}

/// Display the catalog grouped by category, optionally filtered to one.
#[instrument(skip(state, session, ctx))]
pub async fn categories(
    State(state): State<AppState>,
    session: Session,
    ctx: SessionContext,
    Query(query): Query<CategoryQuery>,
) -> Result<impl IntoResponse> {
    let products = ProductRepository::new(state.store()).list().await?;
    let selected = query
        .category
        .map(|c| c.trim().to_owned())
        .filter(|c| !c.is_empty());

    let mut groups = group_by_category(products);
    let categories = groups.iter().map(|g| g.name.clone()).collect();
    if let Some(selected) = &selected {
        groups.retain(|g| g.name.eq_ignore_ascii_case(selected));
    }

    Ok(CategoriesTemplate {
        layout: Layout::load("Categories", &session, &ctx).await,
        categories,
        selected,
        groups,
    })
}

/// Search the catalog by name, description and category.
#[instrument(skip(state, session, ctx))]
pub async fn search(
    State(state): State<AppState>,
    session: Session,
    ctx: SessionContext,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse> {
    let query = query.q.unwrap_or_default().trim().to_owned();

    let results = if query.is_empty() {
        Vec::new()
    } else {
        ProductRepository::new(state.store())
            .list()
            .await?
            .into_iter()
            .filter(|p| matches_query(p, &query))
            .collect()
    };

    Ok(SearchTemplate {
        layout: Layout::load("Search", &session, &ctx).await,
        query,
        results,
    })
}

/// Group products by category, keeping the incoming order inside a group.
///
/// Groups are ordered by name; uncategorized products come last.
#[must_use]
pub fn group_by_category(products: Vec<Product>) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();
    for product in products {
        let name = product
            .category
            .clone()
            .unwrap_or_else(|| UNCATEGORIZED.to_owned());
        match groups.iter_mut().find(|g| g.name == name) {
            Some(group) => group.products.push(product),
            None => groups.push(CategoryGroup {
                name,
                products: vec![product],
            }),
        }
    }
    groups.sort_by(|a, b| {
        (a.name == UNCATEGORIZED)
            .cmp(&(b.name == UNCATEGORIZED))
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    groups
}

/// Case-insensitive substring match on name, description and category.
#[must_use]
pub fn matches_query(product: &Product, query: &str) -> bool {
    let needle = query.to_lowercase();
    [
        Some(product.name.as_str()),
        product.description.as_deref(),
        product.category.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(&needle))
}
