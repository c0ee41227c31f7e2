//! Route guard: who reaches which page.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::Ordering;

use chrono::TimeDelta;
use reqwest::StatusCode;

use boutique_core::Capability;
use boutique_integration_tests::{TestApp, location};
use boutique_storefront::routes::table;

#[tokio::test]
async fn test_anonymous_profile_redirects_to_signin() {
    let app = TestApp::spawn().await;

    for path in ["/profil", "/ajout"] {
        let resp = app.get(path).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(location(&resp), Some("/signin"));
    }

    app.shutdown().await;
}

#[tokio::test]
async fn test_every_public_page_renders_for_anonymous() {
    let app = TestApp::spawn().await;

    for route in table::with_capability(Capability::Public) {
        let resp = app.get(route.path).await;
        assert_eq!(resp.status(), StatusCode::OK, "{}", route.path);
        let body = resp.text().await.unwrap();
        assert!(body.contains("Cart (0)"), "{}: standard header", route.path);
    }

    app.shutdown().await;
}

#[tokio::test]
async fn test_admin_pages_are_not_found_for_anonymous() {
    let app = TestApp::spawn().await;

    for route in table::with_capability(Capability::Admin) {
        let resp = app.get(route.path).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", route.path);
        assert!(resp.text().await.unwrap().contains("Page not found"));
    }

    app.shutdown().await;
}

#[tokio::test]
async fn test_non_admin_dashboard_is_not_found() {
    let app = TestApp::spawn().await;
    let resp = app.sign_in_as("ada@example.com", "u-ada", false).await;
    assert_eq!(location(&resp), Some("/"));

    let resp = app.get("/admin/dashboard").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Page not found"));
    assert!(!body.contains("revenue"));

    // Same answer as a path that does not exist at all
    let resp = app.get("/no-such-page").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // And no side effects through the admin endpoints either
    let resp = app.post("/admin/products/p1/delete", &[]).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    app.shutdown().await;
}

#[tokio::test]
async fn test_admin_reaches_dashboard_with_admin_header() {
    let app = TestApp::spawn().await;
    app.sign_in_as("grace@example.com", "u-grace", true).await;

    let resp = app.get("/admin/dashboard").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Boutique admin"));
    assert!(!body.contains("Cart ("));

    for path in ["/admin/products", "/admin/messages"] {
        assert_eq!(app.get(path).await.status(), StatusCode::OK, "{path}");
    }

    app.shutdown().await;
}

#[tokio::test]
async fn test_role_lookup_failure_is_not_admin() {
    let app = TestApp::spawn().await;
    app.store.fail_profiles.store(true, Ordering::SeqCst);
    app.sign_in_as("grace@example.com", "u-grace", true).await;

    // Still signed in
    assert_eq!(app.get("/profil").await.status(), StatusCode::OK);
    // But never admin
    assert_eq!(
        app.get("/admin/dashboard").await.status(),
        StatusCode::NOT_FOUND
    );

    // Once the store recovers, the role is read again: failures are not cached
    app.store.fail_profiles.store(false, Ordering::SeqCst);
    assert_eq!(app.get("/admin/dashboard").await.status(), StatusCode::OK);

    app.shutdown().await;
}

#[tokio::test]
async fn test_role_is_cached_between_requests() {
    let app = TestApp::spawn().await;
    app.sign_in_as("ada@example.com", "u-ada", false).await;

    // The sign-in event evicts the role once; let it settle
    app.get("/profil").await;
    app.get("/profil").await;
    let reads = app.store.profile_reads.load(Ordering::SeqCst);
    assert!(reads >= 1);
    app.get("/").await;
    app.get("/cart").await;
    assert_eq!(app.store.profile_reads.load(Ordering::SeqCst), reads);

    app.shutdown().await;
}

#[tokio::test]
async fn test_admin_stays_admin_after_token_expiry() {
    let app = TestApp::spawn().await;
    app.identity.set_token_lifetime(TimeDelta::zero());
    app.sign_in_as("grace@example.com", "u-grace", true).await;

    // Refreshing only yields more expired tokens: the store refuses them
    assert_eq!(
        app.get("/admin/dashboard").await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(app.identity.refreshes.load(Ordering::SeqCst), 1);

    app.identity.set_token_lifetime(TimeDelta::hours(1));
    assert_eq!(app.get("/admin/dashboard").await.status(), StatusCode::OK);
    assert_eq!(app.identity.refreshes.load(Ordering::SeqCst), 2);

    // The refreshed token is kept in the session
    assert_eq!(app.get("/admin/products").await.status(), StatusCode::OK);
    assert_eq!(app.identity.refreshes.load(Ordering::SeqCst), 2);

    app.shutdown().await;
}

#[tokio::test]
async fn test_revoked_refresh_token_signs_out() {
    let app = TestApp::spawn().await;
    app.identity.set_token_lifetime(TimeDelta::zero());
    app.sign_in_as("ada@example.com", "u-ada", false).await;
    app.identity.revoke("u-ada");

    let resp = app.get("/profil").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), Some("/signin"));

    let body = app.get("/").await.text().await.unwrap();
    assert!(body.contains("Sign in"));
    assert!(!body.contains("ada@example.com"));

    app.shutdown().await;
}
