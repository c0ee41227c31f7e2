//! Domain models stored in the document store.
//!
//! Products and the cart live in `boutique-core`; this module holds the
//! storefront-only records and the input shapes used to create them.

pub mod session;

use chrono::{DateTime, Utc};

use boutique_core::{Email, MessageId, OrderId, Price};

use crate::backend::OrderLine;

/// Fields of a product about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub price: Price,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// A contact-form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub name: String,
    pub email: String,
    pub body: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Fields of a contact message about to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub name: String,
    pub email: Email,
    pub body: String,
}

/// Settlement status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderStatus {
    /// Recorded, awaiting offline settlement.
    #[default]
    Pending,
    Paid,
    Cancelled,
}

impl OrderStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        }
    }

    /// Unknown values read back as pending.
    #[must_use]
    pub fn from_field(value: Option<&str>) -> Self {
        match value {
            Some("paid") => Self::Paid,
            Some("cancelled") => Self::Cancelled,
            _ => Self::Pending,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub customer_name: String,
    pub email: String,
    pub shipping_address: String,
    pub lines: Vec<OrderLine>,
    pub total: Price,
    pub status: OrderStatus,
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }
}

/// Figures shown on the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardStats {
    pub products: usize,
    pub messages: usize,
    pub orders: usize,
    pub pending_orders: usize,
    /// Sum of order totals, cancelled orders excluded.
    pub revenue: Price,
}

impl DashboardStats {
    #[must_use]
    pub fn new(products: usize, messages: usize, orders: &[Order]) -> Self {
        Self {
            products,
            messages,
            orders: orders.len(),
            pending_orders: orders
                .iter()
                .filter(|order| order.status == OrderStatus::Pending)
                .count(),
            revenue: orders
                .iter()
                .filter(|order| order.status != OrderStatus::Cancelled)
                .map(|order| order.total)
                .sum(),
        }
    }
}
