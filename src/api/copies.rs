//! Copy inventory endpoints

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
    models::{copy::Copy, copy::CreateCopy, loan::Loan},
};

/// Walk-in borrow request
#[derive(Debug, Deserialize, ToSchema)]
pub struct BorrowRequest {
    /// Borrowing user
    pub user_id: Uuid,
    /// Due date; defaults to the configured loan period from now
    pub due_date: Option<DateTime<Utc>>,
}

/// List all copies of a book
#[utoipa::path(
    get,
    path = "/books/{book_id}/copies",
    tag = "copies",
    params(("book_id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Copies of the book", body = Vec<Copy>),
        (status = 404, description = "Book not found")
    )
)]
pub async fn list_copies(
    State(state): State<crate::AppState>,
    Path(book_id): Path<Uuid>,
) -> AppResult<Json<Vec<Copy>>> {
    let copies = state.services.inventory.list_copies(book_id).await?;
    Ok(Json(copies))
}

/// Register a new copy of a book
#[utoipa::path(
    post,
    path = "/books/{book_id}/copies",
    tag = "copies",
    params(("book_id" = Uuid, Path, description = "Book ID")),
    request_body = CreateCopy,
    responses(
        (status = 201, description = "Copy created", body = Copy),
        (status = 400, description = "Barcode already exists"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn create_copy(
    State(state): State<crate::AppState>,
    Path(book_id): Path<Uuid>,
    Json(request): Json<CreateCopy>,
) -> AppResult<(StatusCode, Json<Copy>)> {
    let copy = state
        .services
        .inventory
        .create_copy(book_id, &request.barcode)
        .await?;
    Ok((StatusCode::CREATED, Json(copy)))
}

/// Get a copy
#[utoipa::path(
    get,
    path = "/copies/{id}",
    tag = "copies",
    params(("id" = Uuid, Path, description = "Copy ID")),
    responses(
        (status = 200, description = "The copy", body = Copy),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn get_copy(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Copy>> {
    let copy = state.services.inventory.get_copy(id).await?;
    Ok(Json(copy))
}

/// Mark a copy as lost
#[utoipa::path(
    post,
    path = "/copies/{id}/lost",
    tag = "copies",
    params(("id" = Uuid, Path, description = "Copy ID")),
    responses(
        (status = 200, description = "Copy marked lost", body = Copy),
        (status = 404, description = "Copy not found"),
        (status = 409, description = "Copy is currently borrowed")
    )
)]
pub async fn mark_lost(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Copy>> {
    let copy = state.services.inventory.mark_lost(id).await?;
    Ok(Json(copy))
}

/// Delete a copy
#[utoipa::path(
    delete,
    path = "/copies/{id}",
    tag = "copies",
    params(("id" = Uuid, Path, description = "Copy ID")),
    responses(
        (status = 204, description = "Copy deleted"),
        (status = 404, description = "Copy not found"),
        (status = 409, description = "Copy is currently borrowed")
    )
)]
pub async fn delete_copy(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.inventory.delete_copy(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Borrow a specific copy (walk-in, loan starts ACTIVE)
#[utoipa::path(
    post,
    path = "/copies/{id}/borrow",
    tag = "copies",
    params(("id" = Uuid, Path, description = "Copy ID")),
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Loan created", body = Loan),
        (status = 404, description = "Copy not found"),
        (status = 409, description = "Copy is not available")
    )
)]
pub async fn borrow_copy(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<BorrowRequest>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    let loan = state
        .services
        .circulation
        .borrow_copy(id, request.user_id, request.due_date)
        .await?;
    Ok((StatusCode::CREATED, Json(loan)))
}
