//! Order repository.

use chrono::Utc;

use boutique_core::{OrderId, Price};

use super::RepositoryError;
use crate::backend::{
    Document, DocumentStore, FieldValue, Fields, IdToken, OrderLine, PaymentRequest, collections,
};
use crate::models::{Order, OrderStatus};

/// Repository for orders recorded at payment.
pub struct OrderRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Record a paid-for cart as an order and return its id.
    ///
    /// The order is written with the buyer's token when there is one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the write fails.
    pub async fn create(
        &self,
        request: &PaymentRequest,
        status: OrderStatus,
    ) -> Result<OrderId, RepositoryError> {
        let lines: Vec<FieldValue> = request.lines.iter().map(line_to_field).collect();
        let mut doc = Document::default()
            .with("customerName", request.customer_name.as_str())
            .with("email", request.email.as_str())
            .with("shippingAddress", request.shipping_address.as_str())
            .with("items", lines)
            .with("total", request.total.to_f64())
            .with("status", status.as_str())
            .with("createdAt", Utc::now());
        if let Some(buyer) = &request.buyer {
            doc = doc.with("uid", buyer.uid.as_str());
        }

        let created = self
            .store
            .create_document(
                collections::ORDERS,
                doc.fields,
                request.buyer.as_ref().map(|buyer| &buyer.id_token),
            )
            .await?;
        Ok(OrderId::new(created.id))
    }

    /// Get one order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there is no such order.
    /// Returns `RepositoryError::Store` if the store cannot be read.
    pub async fn get(&self, id: &OrderId, token: Option<&IdToken>) -> Result<Order, RepositoryError> {
        let doc = self
            .store
            .get_document(collections::ORDERS, id.as_str(), token)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        order_from_document(&doc)
    }

    /// Every order, newest first. Invalid documents are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the store cannot be read.
    pub async fn list(&self, token: &IdToken) -> Result<Vec<Order>, RepositoryError> {
        let documents = self
            .store
            .list_documents(collections::ORDERS, Some(token))
            .await?;

        let mut orders: Vec<Order> = documents
            .iter()
            .filter_map(|doc| {
                order_from_document(doc)
                    .inspect_err(|e| {
                        tracing::warn!(order_id = %doc.id, error = %e, "Skipping invalid order document");
                    })
                    .ok()
            })
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}

fn line_to_field(line: &OrderLine) -> FieldValue {
    let mut fields = Fields::new();
    fields.insert("productId".into(), line.product_id.as_str().into());
    fields.insert("name".into(), line.name.as_str().into());
    fields.insert("price".into(), line.unit_price.to_f64().into());
    fields.insert("quantity".into(), i64::from(line.quantity).into());
    FieldValue::Map(fields)
}

fn line_from_field(value: &FieldValue) -> Option<OrderLine> {
    let FieldValue::Map(fields) = value else {
        return None;
    };
    let line = Document {
        id: String::new(),
        fields: fields.clone(),
    };
    Some(OrderLine {
        product_id: line.string("productId")?.to_owned(),
        name: line.string("name").unwrap_or_default().to_owned(),
        unit_price: line.number("price").and_then(Price::from_f64)?,
        quantity: u32::try_from(line.integer("quantity")?).ok()?,
    })
}

fn order_from_document(doc: &Document) -> Result<Order, RepositoryError> {
    let total = doc
        .number("total")
        .and_then(Price::from_f64)
        .ok_or_else(|| RepositoryError::DataCorruption(format!("order {} has no valid total", doc.id)))?;
    let text = |field: &str| doc.string(field).unwrap_or_default().to_owned();

    Ok(Order {
        id: OrderId::new(doc.id.as_str()),
        customer_name: text("customerName"),
        email: text("email"),
        shipping_address: text("shippingAddress"),
        lines: doc
            .array("items")
            .unwrap_or_default()
            .iter()
            .filter_map(line_from_field)
            .collect(),
        total,
        status: OrderStatus::from_field(doc.string("status")),
        created_at: doc.timestamp("createdAt"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_document_round_trip() {
        let line = OrderLine {
            product_id: "p1".into(),
            name: "Mug".into(),
            unit_price: "12.50".parse().unwrap(),
            quantity: 2,
        };
        let doc = Document::new("o1")
            .with("customerName", "Ada")
            .with("items", vec![line_to_field(&line)])
            .with("total", 25.0)
            .with("status", "paid");

        let order = order_from_document(&doc).unwrap();
        assert_eq!(order.lines, vec![line]);
        assert_eq!(order.item_count(), 2);
        assert_eq!(order.total.to_string(), "25.00");
        assert_eq!(order.status, OrderStatus::Paid);
    }

    #[test]
    fn test_order_without_total_is_corrupt() {
        let doc = Document::new("o1").with("customerName", "Ada");
        assert!(matches!(
            order_from_document(&doc),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
