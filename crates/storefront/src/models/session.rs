//! Session-related types.
//!
//! The browser session carries two things: the signed-in user, if any, and
//! the cart. Everything else (admin flag, cart summary) is derived per request.

/// Session keys.
pub mod keys {
    /// The signed-in [`AuthUser`](crate::backend::AuthUser).
    pub const CURRENT_USER: &str = "current_user";

    /// The visitor's [`Cart`](boutique_core::Cart).
    pub const CART: &str = "cart";
}
