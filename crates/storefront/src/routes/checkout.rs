//! Payment and confirmation route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use boutique_core::{Cart, CartAction, Email, OrderId};

use super::layout::{Layout, error_message};
use crate::backend::{PaymentError, PaymentRequest};
use crate::db::OrderRepository;
use crate::error::Result;
use crate::middleware::SessionContext;
use crate::models::Order;
use crate::services::cart;
use crate::services::payment::ShippingDetails;
use crate::state::AppState;

/// Shipping form data.
#[derive(Debug, Deserialize)]
pub struct PaymentForm {
    pub customer_name: String,
    pub email: String,
    pub shipping_address: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentQuery {
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmationQuery {
    pub order: Option<String>,
}

/// Payment page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/payment.html")]
pub struct PaymentTemplate {
    pub layout: Layout,
    pub cart: Cart,
    pub error: Option<&'static str>,
    /// Prefilled from the signed-in user.
    pub email: String,
}

/// Confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/confirmation.html")]
pub struct ConfirmationTemplate {
    pub layout: Layout,
    pub reference: Option<String>,
    pub order: Option<Order>,
}

/// Display the payment page.
pub async fn payment_page(
    session: Session,
    ctx: SessionContext,
    Query(query): Query<PaymentQuery>,
) -> Result<impl IntoResponse> {
    let cart = cart::load(&session).await?;
    let email = ctx
        .user
        .as_ref()
        .map(|u| u.email.to_string())
        .unwrap_or_default();

    Ok(PaymentTemplate {
        layout: Layout::new("Payment", &ctx, cart.summary()),
        cart,
        error: query.error.as_deref().map(error_message),
        email,
    })
}

/// Charge the cart total and clear the cart.
///
/// An empty cart goes back to the cart page; invalid input and declined
/// payments go back to the form with an error code.
#[instrument(skip(state, session, ctx, form))]
pub async fn pay(
    State(state): State<AppState>,
    session: Session,
    ctx: SessionContext,
    Form(form): Form<PaymentForm>,
) -> Result<Response> {
    let cart = cart::load(&session).await?;

    let customer_name = form.customer_name.trim();
    let shipping_address = form.shipping_address.trim();
    if customer_name.is_empty() || shipping_address.is_empty() {
        return Ok(Redirect::to("/payment?error=missing").into_response());
    }
    let Ok(email) = Email::parse(&form.email) else {
        return Ok(Redirect::to("/payment?error=email").into_response());
    };

    let details = ShippingDetails {
        customer_name: customer_name.to_owned(),
        email,
        shipping_address: shipping_address.to_owned(),
    };
    let Some(request) = PaymentRequest::from_cart(&cart, details, ctx.user) else {
        return Ok(Redirect::to("/cart").into_response());
    };

    let receipt = match state.payments().charge(request).await {
        Ok(receipt) => receipt,
        Err(PaymentError::Declined(reason)) => {
            tracing::warn!(%reason, "Payment declined");
            return Ok(Redirect::to("/payment?error=declined").into_response());
        }
        Err(e) => return Err(e.into()),
    };

    cart::dispatch(&session, CartAction::Clear).await?;
    tracing::info!(order_id = %receipt.order_id, total = %receipt.total, "Payment accepted");

    Ok(Redirect::to(&format!("/confirmation?order={}", receipt.order_id)).into_response())
}

/// Display the order confirmation.
///
/// The order is shown when the store lets this visitor read it; otherwise
/// only its reference is.
#[instrument(skip(state, session, ctx))]
pub async fn confirmation(
    State(state): State<AppState>,
    session: Session,
    ctx: SessionContext,
    Query(query): Query<ConfirmationQuery>,
) -> impl IntoResponse {
    let reference = query.order.filter(|id| is_reference(id));

    let order = match &reference {
        Some(id) => {
            let token = ctx.user.as_ref().map(|u| &u.id_token);
            OrderRepository::new(state.store())
                .get(&OrderId::new(id.as_str()), token)
                .await
                .inspect_err(|e| tracing::debug!(error = %e, "Order not readable"))
                .ok()
        }
        None => None,
    };

    ConfirmationTemplate {
        layout: Layout::load("Confirmation", &session, &ctx).await,
        reference,
        order,
    }
}

/// Store-generated ids are short alphanumeric tokens.
fn is_reference(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_'))
}
