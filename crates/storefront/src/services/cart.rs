//! The session cart.
//!
//! Each browser session owns one [`Cart`], stored under
//! [`keys::CART`](crate::models::session::keys::CART). A cart request loads
//! it, applies exactly one [`CartAction`] and stores the result.

use tower_sessions::Session;
use tower_sessions::session::Error;

use boutique_core::{Cart, CartAction};

use crate::models::session::keys;

/// Load the session's cart; a session without one has an empty cart.
///
/// A stored cart that no longer deserializes is discarded.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load(session: &Session) -> Result<Cart, Error> {
    match session.get::<Cart>(keys::CART).await {
        Ok(cart) => Ok(cart.unwrap_or_default()),
        Err(Error::SerdeJson(e)) => {
            tracing::warn!(error = %e, "Discarding unreadable session cart");
            Ok(Cart::default())
        }
        Err(e) => Err(e),
    }
}

/// Apply one action to the session's cart and store the result.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn dispatch(session: &Session, action: CartAction) -> Result<Cart, Error> {
    let cart = load(session).await?.apply(action);
    session.insert(keys::CART, &cart).await?;
    Ok(cart)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;
    use boutique_core::{Product, ProductId};

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn product(id: &str, price: &str) -> Product {
        Product::new(id, id.to_uppercase(), price.parse().unwrap())
    }

    #[tokio::test]
    async fn test_empty_session_has_empty_cart() {
        let cart = load(&session()).await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_persists_between_loads() {
        let session = session();
        dispatch(&session, CartAction::Add(product("a", "10.00"))).await.unwrap();
        dispatch(&session, CartAction::Add(product("a", "10.00"))).await.unwrap();
        dispatch(&session, CartAction::Add(product("b", "3.5"))).await.unwrap();

        let summary = load(&session).await.unwrap().summary();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.total.to_string(), "23.50");

        dispatch(&session, CartAction::Remove(ProductId::new("a"))).await.unwrap();
        dispatch(&session, CartAction::Remove(ProductId::new("a"))).await.unwrap();
        assert_eq!(load(&session).await.unwrap().len(), 1);

        let cart = dispatch(&session, CartAction::Clear).await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_cart_is_discarded() {
        let session = session();
        session.insert(keys::CART, "not a cart").await.unwrap();
        assert!(load(&session).await.unwrap().is_empty());
    }
}
