//! Contact form route handlers.

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

use boutique_core::Email;

use super::layout::{Layout, error_message};
use crate::db::MessageRepository;
use crate::error::Result;
use crate::middleware::SessionContext;
use crate::models::NewMessage;
use crate::state::AppState;

/// Longest accepted message body, in characters.
const MAX_MESSAGE_CHARS: usize = 5000;

/// Contact form data.
#[derive(Debug, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ContactQuery {
    pub error: Option<String>,
    pub sent: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "pages/contact.html")]
pub struct ContactTemplate {
    pub layout: Layout,
    pub error: Option<&'static str>,
    pub sent: bool,
}

/// Display the contact page.
pub async fn contact_page(
    session: Session,
    ctx: SessionContext,
    Query(query): Query<ContactQuery>,
) -> impl IntoResponse {
    ContactTemplate {
        layout: Layout::load("Contact", &session, &ctx).await,
        error: query.error.as_deref().map(error_message),
        sent: query.sent.is_some(),
    }
}

/// Store a contact message.
#[instrument(skip(state, ctx, form), fields(email = %form.email))]
pub async fn submit(
    State(state): State<AppState>,
    ctx: SessionContext,
    Form(form): Form<ContactForm>,
) -> Result<Redirect> {
    let name = form.name.trim();
    let body = form.message.trim();
    if name.is_empty() || body.is_empty() {
        return Ok(Redirect::to("/contact?error=missing"));
    }
    let Ok(email) = Email::parse(&form.email) else {
        return Ok(Redirect::to("/contact?error=email"));
    };

    let message = NewMessage {
        name: name.to_owned(),
        email,
        body: body.chars().take(MAX_MESSAGE_CHARS).collect(),
    };
    let token = ctx.user.as_ref().map(|u| &u.id_token);
    let id = MessageRepository::new(state.store())
        .create(message, token)
        .await?;

    tracing::info!(message_id = %id, "Contact message stored");
    Ok(Redirect::to("/contact?sent=1"))
}
