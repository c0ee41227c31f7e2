//! Business logic services for storefront.
//!
//! - `cart` - Load and mutate the session cart
//! - `payment` - Settle a cart through the payment collaborator

pub mod cart;
pub mod payment;

pub use payment::RecordedPayments;
