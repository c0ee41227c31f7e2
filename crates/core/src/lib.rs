//! Boutique Core - cart, session and access-control types.
//!
//! This crate holds the state logic of the Boutique storefront:
//! - [`cart`] - the per-session cart and its pure reducer
//! - [`session`] - authentication/role state derived from the identity provider
//! - [`access`] - route capabilities and the guard decision
//! - [`types`] - newtype wrappers for ids, prices, emails and roles
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP,
//! no clocks. Every state change is a `(state, action) -> state` function so it
//! can be tested at memory speed and reused by any front end.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod cart;
pub mod session;
pub mod types;

pub use access::{Access, Capability};
pub use cart::{Cart, CartAction, CartItem, CartSummary, MAX_QUANTITY, Product};
pub use session::{SessionEvent, SessionState};
pub use types::*;
