//! Cart and checkout endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::cart::{AddCartItem, CartDetails, CartItem, CheckoutSummary},
};

/// Checkout request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    /// Due date for all loans; defaults to the configured loan period from now
    pub due_date: Option<DateTime<Utc>>,
}

/// Get the user's cart with resolved book details
#[utoipa::path(
    get,
    path = "/cart/{user_id}",
    tag = "cart",
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "The user's cart", body = CartDetails)
    )
)]
pub async fn get_cart(
    State(state): State<crate::AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<CartDetails>> {
    let cart = state.services.checkout.get_cart(user_id).await?;
    Ok(Json(cart))
}

/// Add a book to the cart
#[utoipa::path(
    post,
    path = "/cart/{user_id}/items",
    tag = "cart",
    params(("user_id" = Uuid, Path, description = "User ID")),
    request_body = AddCartItem,
    responses(
        (status = 201, description = "Item added", body = CartItem),
        (status = 400, description = "Already in cart or already borrowed"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "No available copies")
    )
)]
pub async fn add_item(
    State(state): State<crate::AppState>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<AddCartItem>,
) -> AppResult<(StatusCode, Json<CartItem>)> {
    let item = state
        .services
        .checkout
        .add_item(user_id, request.book_id)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Remove a book from the cart
#[utoipa::path(
    delete,
    path = "/cart/{user_id}/items/{book_id}",
    tag = "cart",
    params(
        ("user_id" = Uuid, Path, description = "User ID"),
        ("book_id" = Uuid, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Item removed"),
        (status = 404, description = "Book not in cart")
    )
)]
pub async fn remove_item(
    State(state): State<crate::AppState>,
    Path((user_id, book_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    state.services.checkout.remove_item(user_id, book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Clear the cart
#[utoipa::path(
    delete,
    path = "/cart/{user_id}/clear",
    tag = "cart",
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Cart cleared")
    )
)]
pub async fn clear_cart(
    State(state): State<crate::AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.checkout.clear(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Check out the cart: borrow every book in it, all or nothing
#[utoipa::path(
    post,
    path = "/cart/{user_id}/checkout",
    tag = "cart",
    params(("user_id" = Uuid, Path, description = "User ID")),
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "All books borrowed", body = CheckoutSummary),
        (status = 400, description = "Cart is empty"),
        (status = 409, description = "Some books unavailable, nothing borrowed")
    )
)]
pub async fn checkout(
    State(state): State<crate::AppState>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<CheckoutRequest>,
) -> AppResult<Json<CheckoutSummary>> {
    let summary = state
        .services
        .checkout
        .checkout(user_id, request.due_date)
        .await?;
    Ok(Json(summary))
}
