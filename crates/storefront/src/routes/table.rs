//! The route table: which pages exist and who may see them.
//!
//! The axum router decides which handler serves a path; this table decides
//! whether the current visitor may reach it. Supporting endpoints below a
//! page (`/cart/add`, `/admin/products/{id}/delete`, ...) inherit the
//! capability of the longest page path that is a segment prefix of theirs.

use boutique_core::Capability;

/// A page of the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    pub path: &'static str,
    /// Page title, also used in the navigation.
    pub title: &'static str,
    pub capability: Capability,
}

const fn entry(path: &'static str, title: &'static str, capability: Capability) -> RouteEntry {
    RouteEntry {
        path,
        title,
        capability,
    }
}

/// Every page, in navigation order.
pub const ROUTES: &[RouteEntry] = &[
    entry("/", "Home", Capability::Public),
    entry("/categories", "Categories", Capability::Public),
    entry("/search", "Search", Capability::Public),
    entry("/about", "About", Capability::Public),
    entry("/contact", "Contact", Capability::Public),
    entry("/cart", "Cart", Capability::Public),
    entry("/payment", "Payment", Capability::Public),
    entry("/confirmation", "Confirmation", Capability::Public),
    entry("/signin", "Sign in", Capability::Public),
    entry("/signup", "Sign up", Capability::Public),
    entry("/profil", "Profile", Capability::Authenticated),
    entry("/ajout", "Add a product", Capability::Authenticated),
    entry("/admin/products", "Products", Capability::Admin),
    entry("/admin/dashboard", "Dashboard", Capability::Admin),
    entry("/admin/messages", "Messages", Capability::Admin),
];

/// Find the table entry governing `path`.
///
/// Exact matches win; otherwise the longest entry that is a whole-segment
/// prefix of `path`. `/` only ever matches itself.
#[must_use]
pub fn lookup(path: &str) -> Option<&'static RouteEntry> {
    let path = normalize(path);

    if let Some(exact) = ROUTES.iter().find(|route| route.path == path) {
        return Some(exact);
    }

    ROUTES
        .iter()
        .filter(|route| route.path != "/" && is_segment_prefix(route.path, path))
        .max_by_key(|route| route.path.len())
}

/// Capability required for `path`. Paths outside the table are public.
#[must_use]
pub fn capability_for(path: &str) -> Capability {
    lookup(path).map_or(Capability::Public, |route| route.capability)
}

/// Pages with the given capability, for navigation.
pub fn with_capability(capability: Capability) -> impl Iterator<Item = &'static RouteEntry> {
    ROUTES
        .iter()
        .filter(move |route| route.capability == capability)
}

/// Drop one trailing slash, keeping `/` itself.
fn normalize(path: &str) -> &str {
    match path.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => path,
    }
}

fn is_segment_prefix(prefix: &str, path: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_of_pages() {
        for path in [
            "/",
            "/contact",
            "/signin",
            "/signup",
            "/about",
            "/categories",
            "/cart",
            "/payment",
            "/confirmation",
            "/search",
        ] {
            assert_eq!(capability_for(path), Capability::Public, "{path}");
        }
        assert_eq!(capability_for("/profil"), Capability::Authenticated);
        assert_eq!(capability_for("/ajout"), Capability::Authenticated);
        assert_eq!(capability_for("/admin/products"), Capability::Admin);
        assert_eq!(capability_for("/admin/dashboard"), Capability::Admin);
        assert_eq!(capability_for("/admin/messages"), Capability::Admin);
    }

    #[test]
    fn test_sub_paths_inherit() {
        assert_eq!(capability_for("/cart/add"), Capability::Public);
        assert_eq!(
            capability_for("/admin/products/abc/delete"),
            Capability::Admin
        );
        assert_eq!(capability_for("/profil/"), Capability::Authenticated);
        assert_eq!(lookup("/ajout/x").map(|r| r.path), Some("/ajout"));
    }

    #[test]
    fn test_prefix_must_end_on_segment() {
        assert_eq!(lookup("/profile"), None);
        assert_eq!(lookup("/carton"), None);
        assert_eq!(capability_for("/admin/productsx"), Capability::Public);
    }

    #[test]
    fn test_root_matches_only_itself() {
        assert_eq!(lookup("/").map(|r| r.path), Some("/"));
        assert_eq!(lookup("/unknown"), None);
        assert_eq!(capability_for("/static/style.css"), Capability::Public);
        assert_eq!(capability_for("/health"), Capability::Public);
    }

    #[test]
    fn test_admin_prefix_alone_is_not_a_page() {
        assert_eq!(lookup("/admin"), None);
    }

    #[test]
    fn test_paths_are_unique() {
        for (i, a) in ROUTES.iter().enumerate() {
            for b in &ROUTES[i + 1..] {
                assert_ne!(a.path, b.path);
            }
        }
    }
}
