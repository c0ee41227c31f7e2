//! Payment.
//!
//! Card data never reaches the storefront. [`RecordedPayments`] is the
//! production [`PaymentGateway`]: it records the order as `pending` in the
//! `orders` collection for offline settlement and hands back its id as the
//! receipt reference.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use boutique_core::{Cart, Email, Price};

use crate::backend::{
    AuthUser, DocumentStore, OrderLine, PaymentError, PaymentGateway, PaymentReceipt,
    PaymentRequest,
};
use crate::db::OrderRepository;
use crate::models::OrderStatus;

/// Shipping details entered on the payment page.
#[derive(Debug, Clone)]
pub struct ShippingDetails {
    pub customer_name: String,
    pub email: Email,
    pub shipping_address: String,
}

impl PaymentRequest {
    /// Freeze a cart into a payment request.
    ///
    /// Returns `None` for an empty cart.
    #[must_use]
    pub fn from_cart(cart: &Cart, details: ShippingDetails, buyer: Option<AuthUser>) -> Option<Self> {
        if cart.is_empty() {
            return None;
        }

        let lines = cart
            .items()
            .iter()
            .map(|item| OrderLine {
                product_id: item.id().to_string(),
                name: item.product.name.clone(),
                unit_price: item.price(),
                quantity: item.quantity,
            })
            .collect();

        Some(Self {
            customer_name: details.customer_name,
            email: details.email,
            shipping_address: details.shipping_address,
            lines,
            total: cart.summary().total,
            buyer,
        })
    }
}

/// Payment gateway that records orders for offline settlement.
#[derive(Clone)]
pub struct RecordedPayments {
    store: Arc<dyn DocumentStore>,
}

impl RecordedPayments {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PaymentGateway for RecordedPayments {
    #[instrument(skip(self, request), fields(total = %request.total, lines = request.lines.len()))]
    async fn charge(&self, request: PaymentRequest) -> Result<PaymentReceipt, PaymentError> {
        if request.lines.is_empty() {
            return Err(PaymentError::Declined("nothing to pay for".to_string()));
        }

        let computed: Price = request
            .lines
            .iter()
            .map(|line| line.unit_price.times(line.quantity))
            .sum();
        if computed.rounded() != request.total.rounded() {
            return Err(PaymentError::Declined(format!(
                "total {} does not match order lines {computed}",
                request.total
            )));
        }

        let order_id = OrderRepository::new(self.store.as_ref())
            .create(&request, OrderStatus::Pending)
            .await
            .map_err(|e| PaymentError::Processor(e.to_string()))?;

        tracing::info!(order_id = %order_id, "Order recorded");
        Ok(PaymentReceipt {
            order_id,
            total: request.total,
        })
    }
}
