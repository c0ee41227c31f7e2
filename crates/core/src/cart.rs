//! The shopping cart.
//!
//! A [`Cart`] is an ordered list of line items, at most one per product id.
//! Every mutation goes through [`Cart::apply`], a pure reducer taking the
//! current cart and a [`CartAction`] and returning the next cart. The named
//! operations ([`Cart::add_to_cart`], [`Cart::update_quantity`], ...) are thin
//! wrappers over it.
//!
//! None of the operations can fail: acting on an id that is not in the cart
//! is a no-op, and quantities are kept between 1 and [`MAX_QUANTITY`].
//!
//! ```
//! use boutique_core::{Cart, Product};
//!
//! let tea = Product::new("tea", "Green tea", "10.00".parse().unwrap());
//! let mug = Product::new("mug", "Mug", "3.5".parse().unwrap());
//!
//! let cart = Cart::default()
//!     .add_to_cart(tea.clone())
//!     .add_to_cart(mug)
//!     .add_to_cart(tea);
//!
//! let summary = cart.summary();
//! assert_eq!(summary.count, 3);
//! assert_eq!(summary.total.to_string(), "23.50");
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// Most units of one product a cart line can hold.
pub const MAX_QUANTITY: u32 = 999;

/// A product as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Product {
    /// Create a product with only the fields the cart needs.
    #[must_use]
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Price) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            description: None,
            category: None,
            image_url: None,
        }
    }
}

/// One line of the cart: a product snapshot and how many of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    /// Between 1 and [`MAX_QUANTITY`].
    pub quantity: u32,
}

impl CartItem {
    #[must_use]
    pub const fn id(&self) -> &ProductId {
        &self.product.id
    }

    #[must_use]
    pub const fn price(&self) -> Price {
        self.product.price
    }

    /// `price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

/// A cart mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Add one unit of a product.
    Add(Product),
    /// Set the quantity of a line, clamped to `1..=MAX_QUANTITY`.
    UpdateQuantity { id: ProductId, quantity: i64 },
    /// Drop a line.
    Remove(ProductId),
    /// Empty the cart.
    Clear,
}

/// Count and total of a cart, computed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartSummary {
    /// Sum of quantities.
    pub count: u64,
    /// Sum of `price * quantity`. Displays with exactly two decimals.
    pub total: Price,
}

/// Ordered collection of line items.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Apply one action and return the resulting cart.
    #[must_use]
    pub fn apply(mut self, action: CartAction) -> Self {
        match action {
            CartAction::Add(product) => {
                match self.items.iter_mut().find(|item| item.product.id == product.id) {
                    Some(item) => {
                        item.quantity = item.quantity.saturating_add(1).min(MAX_QUANTITY);
                    }
                    None => self.items.push(CartItem {
                        product,
                        quantity: 1,
                    }),
                }
            }
            CartAction::UpdateQuantity { id, quantity } => {
                if let Some(item) = self.items.iter_mut().find(|item| item.product.id == id) {
                    item.quantity = clamp_quantity(quantity);
                }
            }
            CartAction::Remove(id) => self.items.retain(|item| item.product.id != id),
            CartAction::Clear => self.items.clear(),
        }
        self
    }

    /// Add one unit of `product`, appending a new line if needed.
    #[must_use]
    pub fn add_to_cart(self, product: Product) -> Self {
        self.apply(CartAction::Add(product))
    }

    /// Set the quantity of the line for `id` to `quantity`, clamped to
    /// `1..=MAX_QUANTITY`.
    #[must_use]
    pub fn update_quantity(self, id: ProductId, quantity: i64) -> Self {
        self.apply(CartAction::UpdateQuantity { id, quantity })
    }

    /// Remove the line for `id`.
    #[must_use]
    pub fn remove_from_cart(self, id: ProductId) -> Self {
        self.apply(CartAction::Remove(id))
    }

    /// Remove every line.
    #[must_use]
    pub fn clear_cart(self) -> Self {
        self.apply(CartAction::Clear)
    }

    #[must_use]
    pub fn summary(&self) -> CartSummary {
        CartSummary {
            count: self.items.iter().map(|item| u64::from(item.quantity)).sum(),
            total: self.items.iter().map(CartItem::line_total).sum(),
        }
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.product.id == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

fn clamp_quantity(quantity: i64) -> u32 {
    u32::try_from(quantity.clamp(1, i64::from(MAX_QUANTITY))).unwrap_or(MAX_QUANTITY)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: &str, price: &str) -> Product {
        Product::new(id, format!("Product {id}"), price.parse().unwrap())
    }

    #[test]
    fn test_distinct_adds_count_per_id() {
        let adds = ["a", "b", "a", "c", "b", "a"];
        let cart = adds
            .iter()
            .fold(Cart::default(), |cart, id| cart.add_to_cart(product(id, "1")));

        assert_eq!(cart.len(), 3);
        assert_eq!(cart.get(&ProductId::new("a")).unwrap().quantity, 3);
        assert_eq!(cart.get(&ProductId::new("b")).unwrap().quantity, 2);
        assert_eq!(cart.get(&ProductId::new("c")).unwrap().quantity, 1);
    }

    #[test]
    fn test_add_twice_is_one_line_of_two() {
        let p = product("tea", "4.00");
        let cart = Cart::default().add_to_cart(p.clone()).add_to_cart(p);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn test_add_preserves_order() {
        let cart = Cart::default()
            .add_to_cart(product("a", "1"))
            .add_to_cart(product("b", "1"))
            .add_to_cart(product("a", "1"));
        let ids: Vec<&str> = cart.items().iter().map(|i| i.id().as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_update_quantity_clamps_to_one() {
        let cart = Cart::default().add_to_cart(product("a", "1"));
        let id = ProductId::new("a");

        let cart = cart.update_quantity(id.clone(), 0);
        assert_eq!(cart.get(&id).unwrap().quantity, 1);

        let cart = cart.update_quantity(id.clone(), -7);
        assert_eq!(cart.get(&id).unwrap().quantity, 1);

        let cart = cart.update_quantity(id.clone(), 5);
        assert_eq!(cart.get(&id).unwrap().quantity, 5);
    }

    #[test]
    fn test_quantity_is_capped() {
        let id = ProductId::new("a");
        let cart = Cart::default()
            .add_to_cart(product("a", "1"))
            .update_quantity(id.clone(), i64::MAX);
        assert_eq!(cart.get(&id).unwrap().quantity, MAX_QUANTITY);

        let cart = cart.add_to_cart(product("a", "1"));
        assert_eq!(cart.get(&id).unwrap().quantity, MAX_QUANTITY);
    }

    #[test]
    fn test_summary_of_extreme_cart_does_not_overflow() {
        let priciest = Product::new("big", "Big", Price::MAX);
        let cart = Cart::default()
            .add_to_cart(priciest.clone())
            .update_quantity(priciest.id.clone(), i64::MAX)
            .add_to_cart(product("small", "0.01"));

        let summary = cart.summary();
        assert_eq!(summary.count, u64::from(MAX_QUANTITY) + 1);
        assert_eq!(summary.total.to_string(), "999000000000.01");
    }

    #[test]
    fn test_oversized_quantity_from_storage_does_not_overflow() {
        let json = r#"{"items":[{"product":{"id":"big","name":"Big","price":"1000000000"},"quantity":4294967295}]}"#;
        let cart: Cart = serde_json::from_str(json).unwrap();
        let summary = cart.summary();
        assert_eq!(summary.count, u64::from(u32::MAX));
        assert_eq!(summary.total.to_string(), "4294967295000000000.00");
    }

    #[test]
    fn test_negative_price_from_storage_is_rejected() {
        let json = r#"{"items":[{"product":{"id":"a","name":"A","price":"-1"},"quantity":1}]}"#;
        assert!(serde_json::from_str::<Cart>(json).is_err());
    }

    #[test]
    fn test_update_quantity_leaves_other_lines() {
        let cart = Cart::default()
            .add_to_cart(product("a", "1"))
            .add_to_cart(product("b", "1"))
            .update_quantity(ProductId::new("b"), 4);
        assert_eq!(cart.get(&ProductId::new("a")).unwrap().quantity, 1);
        assert_eq!(cart.get(&ProductId::new("b")).unwrap().quantity, 4);
    }

    #[test]
    fn test_update_missing_id_is_noop() {
        let cart = Cart::default().add_to_cart(product("a", "1"));
        let updated = cart.clone().update_quantity(ProductId::new("zzz"), 9);
        assert_eq!(updated, cart);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let cart = Cart::default()
            .add_to_cart(product("a", "1"))
            .add_to_cart(product("b", "1"));
        let once = cart.remove_from_cart(ProductId::new("a"));
        let twice = once.clone().remove_from_cart(ProductId::new("a"));
        assert_eq!(once, twice);
        assert_eq!(twice.len(), 1);
    }

    #[test]
    fn test_clear_yields_zero_summary() {
        let cart = Cart::default()
            .add_to_cart(product("a", "9.99"))
            .add_to_cart(product("b", "1.01"))
            .clear_cart();
        assert!(cart.is_empty());
        let summary = cart.summary();
        assert_eq!(summary.count, 0);
        assert_eq!(summary.total.to_string(), "0.00");
    }

    #[test]
    fn test_summary_example() {
        let cart = Cart::default()
            .add_to_cart(product("a", "10.00"))
            .add_to_cart(product("a", "10.00"))
            .add_to_cart(product("b", "3.5"));
        let summary = cart.summary();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.total.to_string(), "23.50");
    }

    #[test]
    fn test_summary_rounds_total() {
        let cart = Cart::default()
            .add_to_cart(product("a", "0.333"))
            .update_quantity(ProductId::new("a"), 3);
        assert_eq!(cart.summary().total.to_string(), "1.00");
    }

    #[test]
    fn test_cart_survives_json_round_trip() {
        let cart = Cart::default().add_to_cart(product("a", "2.50"));
        let json = serde_json::to_string(&cart).unwrap();
        let restored: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cart);
    }
}
