//! Sign-in, sign-up and sign-out.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;

use boutique_integration_tests::{TestApp, location};
use boutique_storefront::backend::collections;

#[tokio::test]
async fn test_sign_in_then_profile() {
    let app = TestApp::spawn().await;
    let resp = app.sign_in_as("ada@example.com", "u-ada", false).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), Some("/"));

    let resp = app.get("/profil").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("ada@example.com"));
    assert!(body.contains("user"));

    app.shutdown().await;
}

#[tokio::test]
async fn test_wrong_password() {
    let app = TestApp::spawn().await;
    app.identity.add_account("ada@example.com", "hunter22", "u-ada");

    let resp = app
        .post(
            "/signin",
            &[("email", "ada@example.com"), ("password", "nope")],
        )
        .await;
    assert_eq!(location(&resp), Some("/signin?error=credentials"));

    let body = app.get("/signin?error=credentials").await.text().await.unwrap();
    assert!(body.contains("Incorrect email or password."));
    assert_eq!(app.get("/profil").await.status(), StatusCode::SEE_OTHER);

    app.shutdown().await;
}

#[tokio::test]
async fn test_sign_up_writes_user_profile() {
    let app = TestApp::spawn().await;
    let form = [
        ("email", "new@example.com"),
        ("password", "secret123"),
        ("password_confirm", "secret123"),
    ];

    let resp = app.post("/signup", &form).await;
    assert_eq!(location(&resp), Some("/"));

    let profiles = app.store.documents(collections::USERS);
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].string("role"), Some("user"));
    assert_eq!(profiles[0].string("email"), Some("new@example.com"));
    assert_eq!(app.get("/profil").await.status(), StatusCode::OK);

    // Same email again
    let other = boutique_integration_tests::browser();
    let resp = other
        .post(format!("{}/signup", app.base_url))
        .form(&form)
        .send()
        .await
        .unwrap();
    assert_eq!(location(&resp), Some("/signup?error=email_taken"));

    app.shutdown().await;
}

#[tokio::test]
async fn test_sign_up_password_mismatch() {
    let app = TestApp::spawn().await;
    let resp = app
        .post(
            "/signup",
            &[
                ("email", "new@example.com"),
                ("password", "secret123"),
                ("password_confirm", "secret124"),
            ],
        )
        .await;
    assert_eq!(location(&resp), Some("/signup?error=password_mismatch"));
    app.shutdown().await;
}

#[tokio::test]
async fn test_sign_out_ends_admin_access() {
    let app = TestApp::spawn().await;
    app.sign_in_as("grace@example.com", "u-grace", true).await;
    assert_eq!(app.get("/admin/dashboard").await.status(), StatusCode::OK);

    let resp = app.post("/signout", &[]).await;
    assert_eq!(location(&resp), Some("/"));
    assert_eq!(
        app.get("/admin/dashboard").await.status(),
        StatusCode::NOT_FOUND
    );

    app.shutdown().await;
}

#[tokio::test]
async fn test_health_and_request_id() {
    let app = TestApp::spawn().await;
    let resp = app.get("/health").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    assert!(resp.headers().contains_key("x-content-type-options"));
    assert_eq!(resp.text().await.unwrap(), "ok");
    app.shutdown().await;
}
