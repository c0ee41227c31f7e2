//! Repositories over the document store.
//!
//! # Collections
//!
//! - `products` - Catalog (`name`, `price`, `category`, `description`, `imageUrl`)
//! - `users` - Profiles keyed by uid (`email`, `role`)
//! - `messages` - Contact-form submissions
//! - `orders` - Orders recorded at payment
//!
//! Each repository borrows the store for the duration of a request and
//! validates document shapes into typed models at the boundary.

pub mod messages;
pub mod orders;
pub mod products;
pub mod users;

use thiserror::Error;

use crate::backend::StoreError;

pub use messages::MessageRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use users::ProfileRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The document store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A stored document does not have the expected shape.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,
}
