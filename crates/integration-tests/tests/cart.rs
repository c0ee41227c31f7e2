//! The session cart through the cart pages.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;

use boutique_integration_tests::{TestApp, location};
use boutique_storefront::backend::{Document, collections};

fn seed(app: &TestApp) {
    app.store.put(
        collections::PRODUCTS,
        Document::new("tea")
            .with("name", "Green tea")
            .with("price", 10.0)
            .with("category", "Tea"),
    );
    app.store.put(
        collections::PRODUCTS,
        Document::new("mug").with("name", "Mug").with("price", 3.5),
    );
}

#[tokio::test]
async fn test_cart_flow() {
    let app = TestApp::spawn().await;
    seed(&app);

    let resp = app.post("/cart/add", &[("product_id", "tea")]).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), Some("/cart"));
    app.post("/cart/add", &[("product_id", "tea")]).await;
    app.post("/cart/add", &[("product_id", "mug")]).await;

    let body = app.get("/cart").await.text().await.unwrap();
    assert!(body.contains("Cart (3)"));
    assert!(body.contains("23.50"));

    app.post("/cart/update", &[("product_id", "tea"), ("quantity", "0")])
        .await;
    let body = app.get("/cart").await.text().await.unwrap();
    assert!(body.contains("Cart (2)"));
    assert!(body.contains("13.50"));

    app.post("/cart/remove", &[("product_id", "mug")]).await;
    app.post("/cart/remove", &[("product_id", "mug")]).await;
    let body = app.get("/cart").await.text().await.unwrap();
    assert!(body.contains("Cart (1)"));
    assert!(body.contains("10.00"));

    app.post("/cart/clear", &[]).await;
    let body = app.get("/cart").await.text().await.unwrap();
    assert!(body.contains("Cart (0)"));
    assert!(body.contains("Your cart is empty"));

    app.shutdown().await;
}

#[tokio::test]
async fn test_add_unknown_product_is_not_found() {
    let app = TestApp::spawn().await;
    let resp = app.post("/cart/add", &[("product_id", "ghost")]).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    app.shutdown().await;
}

#[tokio::test]
async fn test_add_returns_to_local_page_only() {
    let app = TestApp::spawn().await;
    seed(&app);

    let resp = app
        .post(
            "/cart/add",
            &[("product_id", "mug"), ("return_to", "/categories")],
        )
        .await;
    assert_eq!(location(&resp), Some("/categories"));

    let resp = app
        .post(
            "/cart/add",
            &[("product_id", "mug"), ("return_to", "https://evil.example")],
        )
        .await;
    assert_eq!(location(&resp), Some("/cart"));

    app.shutdown().await;
}

#[tokio::test]
async fn test_cart_survives_sign_in_and_out() {
    let app = TestApp::spawn().await;
    seed(&app);

    app.post("/cart/add", &[("product_id", "tea")]).await;
    app.sign_in_as("ada@example.com", "u-ada", false).await;
    assert!(app.get("/cart").await.text().await.unwrap().contains("Cart (1)"));

    app.post("/signout", &[]).await;
    assert_eq!(app.get("/profil").await.status(), StatusCode::SEE_OTHER);
    assert!(app.get("/cart").await.text().await.unwrap().contains("Cart (1)"));

    app.shutdown().await;
}

#[tokio::test]
async fn test_catalog_and_search() {
    let app = TestApp::spawn().await;
    seed(&app);

    let body = app.get("/categories?category=tea").await.text().await.unwrap();
    assert!(body.contains("Green tea"));
    assert!(!body.contains("<h3>Mug</h3>"));

    let body = app.get("/search?q=MUG").await.text().await.unwrap();
    assert!(body.contains("<h3>Mug</h3>"));
    assert!(!body.contains("Green tea"));

    app.shutdown().await;
}

#[tokio::test]
async fn test_huge_quantity_is_capped_and_pages_render() {
    let app = TestApp::spawn().await;
    app.store.put(
        collections::PRODUCTS,
        Document::new("yacht")
            .with("name", "Yacht")
            .with("price", 1_000_000_000.0),
    );

    app.post("/cart/add", &[("product_id", "yacht")]).await;
    let resp = app
        .post(
            "/cart/update",
            &[("product_id", "yacht"), ("quantity", "9223372036854775807")],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = app.get("/cart").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Cart (999)"));
    assert!(body.contains("999000000000.00"));

    assert_eq!(app.get("/").await.status(), StatusCode::OK);
    assert_eq!(app.get("/payment").await.status(), StatusCode::OK);

    app.shutdown().await;
}
