//! Loan lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::loan::{BorrowStats, Loan, LoanDetails, LoanPage, LoanStatus},
};

use super::Pagination;

/// Status filter for loan listings
#[derive(Debug, Deserialize, IntoParams)]
pub struct LoanFilter {
    pub status: Option<LoanStatus>,
}

/// List all loans, paginated (librarian view)
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    params(Pagination, LoanFilter),
    responses(
        (status = 200, description = "Paginated loans", body = LoanPage)
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    Query(pagination): Query<Pagination>,
    Query(filter): Query<LoanFilter>,
) -> AppResult<Json<LoanPage>> {
    let (page, page_size) = pagination.clamped();
    let loans = state
        .services
        .circulation
        .list_loans(filter.status, page, page_size)
        .await?;
    Ok(Json(loans))
}

/// Borrowing statistics
#[utoipa::path(
    get,
    path = "/loans/stats",
    tag = "loans",
    responses(
        (status = 200, description = "Borrowing statistics", body = BorrowStats)
    )
)]
pub async fn loan_stats(State(state): State<crate::AppState>) -> AppResult<Json<BorrowStats>> {
    let stats = state.services.circulation.stats().await?;
    Ok(Json(stats))
}

/// Get one loan with resolved book and copy details
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(("id" = Uuid, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.circulation.loan_details(id).await?;
    Ok(Json(loan))
}

/// Confirm pickup of a pending loan (PENDING -> ACTIVE)
#[utoipa::path(
    post,
    path = "/loans/{id}/confirm-pickup",
    tag = "loans",
    params(("id" = Uuid, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Pickup confirmed", body = Loan),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan is not pending")
    )
)]
pub async fn confirm_pickup(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.circulation.confirm_pickup(id).await?;
    Ok(Json(loan))
}

/// Return a loan; frees the copy and serves the reservation queue
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    params(("id" = Uuid, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan returned", body = Loan),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan already returned or cancelled")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.circulation.return_loan(id).await?;
    Ok(Json(loan))
}

/// Cancel a pending loan; frees the copy
#[utoipa::path(
    post,
    path = "/loans/{id}/cancel",
    tag = "loans",
    params(("id" = Uuid, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan cancelled", body = Loan),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan is not pending")
    )
)]
pub async fn cancel_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.circulation.cancel_loan(id).await?;
    Ok(Json(loan))
}

/// Borrow history for a user, newest first
#[utoipa::path(
    get,
    path = "/users/{user_id}/loans",
    tag = "loans",
    params(
        ("user_id" = Uuid, Path, description = "User ID"),
        LoanFilter
    ),
    responses(
        (status = 200, description = "User's loans", body = Vec<LoanDetails>)
    )
)]
pub async fn user_loans(
    State(state): State<crate::AppState>,
    Path(user_id): Path<Uuid>,
    Query(filter): Query<LoanFilter>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state
        .services
        .circulation
        .user_loans(user_id, filter.status)
        .await?;
    Ok(Json(loans))
}
