//! HTTP API integration tests
//!
//! Require a running server on localhost:8080 backed by a migrated database.
//! Run with: cargo test -- --ignored

use serde_json::{json, Value};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

const BASE_URL: &str = "http://localhost:8080/api/v1";

async fn connect() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("Failed to connect to database")
}

async fn seed_user(pool: &PgPool) -> Uuid {
    sqlx::query_scalar("INSERT INTO users (full_name, email) VALUES ($1, $2) RETURNING id")
        .bind("Api Test User")
        .bind(format!("{}@example.org", Uuid::new_v4()))
        .fetch_one(pool)
        .await
        .expect("Failed to seed user")
}

async fn seed_book(pool: &PgPool, title: &str) -> Uuid {
    sqlx::query_scalar("INSERT INTO books (title) VALUES ($1) RETURNING id")
        .bind(title)
        .fetch_one(pool)
        .await
        .expect("Failed to seed book")
}

#[tokio::test]
#[ignore]
async fn health_endpoints_respond() {
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(response.status(), 200);

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(response.status(), 200);
}

#[tokio::test]
#[ignore]
async fn copy_lifecycle_over_http() {
    let pool = connect().await;
    let client = reqwest::Client::new();

    let user = seed_user(&pool).await;
    let book = seed_book(&pool, "HTTP Lifecycle").await;

    // Register a copy
    let response = client
        .post(format!("{}/books/{}/copies", BASE_URL, book))
        .json(&json!({ "barcode": Uuid::new_v4().to_string() }))
        .send()
        .await
        .expect("Failed to create copy");
    assert_eq!(response.status(), 201);
    let copy: Value = response.json().await.expect("Invalid JSON");
    assert_eq!(copy["status"], "AVAILABLE");
    let copy_id = copy["id"].as_str().expect("missing id").to_string();

    // Walk-in borrow
    let response = client
        .post(format!("{}/copies/{}/borrow", BASE_URL, copy_id))
        .json(&json!({ "user_id": user }))
        .send()
        .await
        .expect("Failed to borrow");
    assert_eq!(response.status(), 201);
    let loan: Value = response.json().await.expect("Invalid JSON");
    assert_eq!(loan["status"], "ACTIVE");
    let loan_id = loan["id"].as_str().expect("missing id").to_string();

    // Deleting the copy while it is out must be refused
    let response = client
        .delete(format!("{}/copies/{}", BASE_URL, copy_id))
        .send()
        .await
        .expect("Failed to call delete");
    assert_eq!(response.status(), 409);

    // Return it
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .send()
        .await
        .expect("Failed to return");
    assert_eq!(response.status(), 200);
    let loan: Value = response.json().await.expect("Invalid JSON");
    assert_eq!(loan["status"], "RETURNED");

    // A second return reports the invalid state
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .send()
        .await
        .expect("Failed to call return");
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.expect("Invalid JSON");
    assert!(body["code"].is_number());
}

#[tokio::test]
#[ignore]
async fn checkout_of_empty_cart_is_rejected() {
    let pool = connect().await;
    let client = reqwest::Client::new();

    let user = seed_user(&pool).await;

    let response = client
        .post(format!("{}/cart/{}/checkout", BASE_URL, user))
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to call checkout");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn unknown_loan_returns_not_found() {
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/loans/{}", BASE_URL, Uuid::new_v4()))
        .send()
        .await
        .expect("Failed to call loans");
    assert_eq!(response.status(), 404);
}
