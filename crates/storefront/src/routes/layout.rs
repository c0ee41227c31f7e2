//! Data every page shares: the header, the navigation and the signed-in user.

use tower_sessions::Session;

use boutique_core::{Capability, CartSummary, SessionState};

use super::table::{self, RouteEntry};
use crate::middleware::SessionContext;
use crate::services::cart;

/// Public pages linked from the standard header.
const STANDARD_NAV: &[&str] = &["/", "/categories", "/search", "/about", "/contact"];

/// Which header a page is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Header {
    /// Administration links, no cart.
    Admin,
    /// Shop links and the cart badge.
    Standard(CartSummary),
}

impl Header {
    /// The admin header iff the session is admin.
    #[must_use]
    pub const fn select(state: &SessionState, cart: CartSummary) -> Self {
        if state.is_admin() {
            Self::Admin
        } else {
            Self::Standard(cart)
        }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Cart badge contents, absent on the admin header.
    #[must_use]
    pub const fn cart(&self) -> Option<CartSummary> {
        match self {
            Self::Admin => None,
            Self::Standard(summary) => Some(*summary),
        }
    }
}

/// Layout context embedded in every page template.
#[derive(Debug, Clone)]
pub struct Layout {
    pub title: &'static str,
    pub header: Header,
    pub nav: Vec<&'static RouteEntry>,
    /// Email of the signed-in user.
    pub email: Option<String>,
}

impl Layout {
    /// Build the layout from the resolved session and a cart summary.
    #[must_use]
    pub fn new(title: &'static str, ctx: &SessionContext, cart: CartSummary) -> Self {
        let header = Header::select(&ctx.state, cart);
        let nav = if header.is_admin() {
            table::with_capability(Capability::Admin).collect()
        } else {
            let mut nav: Vec<_> = STANDARD_NAV.iter().filter_map(|p| table::lookup(p)).collect();
            if ctx.is_authenticated() {
                nav.extend(table::with_capability(Capability::Authenticated));
            }
            nav
        };

        Self {
            title,
            header,
            nav,
            email: ctx.user.as_ref().map(|u| u.email.to_string()),
        }
    }

    /// Build the layout, reading the cart badge from the session.
    ///
    /// An unavailable session store renders an empty badge rather than
    /// failing the page.
    pub async fn load(title: &'static str, session: &Session, ctx: &SessionContext) -> Self {
        let summary = match cart::load(session).await {
            Ok(cart) => cart.summary(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to read session cart");
                CartSummary::default()
            }
        };
        Self::new(title, ctx, summary)
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.email.is_some()
    }
}

/// Human message for an `?error=` code on a form page.
#[must_use]
pub fn error_message(code: &str) -> &'static str {
    match code {
        "credentials" => "Incorrect email or password.",
        "email" => "Please enter a valid email address.",
        "email_taken" => "An account with this email already exists.",
        "weak_password" => "Password should be at least 6 characters.",
        "password_mismatch" => "Passwords do not match.",
        "disabled" => "This account has been disabled.",
        "too_many" => "Too many attempts. Please try again later.",
        "missing" => "Please fill in every required field.",
        "price" => "Please enter a valid price, at most 1 000 000 000.",
        "declined" => "The payment was declined.",
        "session" => "Your session could not be saved. Please try again.",
        _ => "Something went wrong. Please try again.",
    }
}
