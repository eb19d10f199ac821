//! Reservation queue endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::reservation::{Reservation, ReservationPage, ReservationStatus},
};

use super::Pagination;

/// Create reservation request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReservation {
    pub user_id: Uuid,
    pub book_id: Uuid,
}

/// Acting user for ownership-checked operations
#[derive(Debug, Deserialize, IntoParams)]
pub struct ActingUser {
    pub user_id: Uuid,
}

/// Status filter for reservation listings
#[derive(Debug, Deserialize, IntoParams)]
pub struct ReservationFilter {
    pub status: Option<ReservationStatus>,
}

/// Reserve a book with zero available copies
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    request_body = CreateReservation,
    responses(
        (status = 201, description = "Reservation created", body = Reservation),
        (status = 400, description = "Copies available or duplicate reservation"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn create_reservation(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateReservation>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    let reservation = state
        .services
        .reservations
        .reserve(request.user_id, request.book_id)
        .await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Cancel one's own pending reservation
#[utoipa::path(
    delete,
    path = "/reservations/{id}",
    tag = "reservations",
    params(("id" = Uuid, Path, description = "Reservation ID"), ActingUser),
    responses(
        (status = 204, description = "Reservation cancelled"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Reservation is not pending")
    )
)]
pub async fn cancel_reservation(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
    Query(acting): Query<ActingUser>,
) -> AppResult<StatusCode> {
    state.services.reservations.cancel(id, acting.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Manually fulfill a pending reservation (librarian handover)
#[utoipa::path(
    post,
    path = "/reservations/{id}/fulfill",
    tag = "reservations",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation fulfilled", body = Reservation),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Reservation is not pending or has expired")
    )
)]
pub async fn fulfill_reservation(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Reservation>> {
    let reservation = state.services.reservations.fulfill(id).await?;
    Ok(Json(reservation))
}

/// A user's reservations, newest first
#[utoipa::path(
    get,
    path = "/users/{user_id}/reservations",
    tag = "reservations",
    params(
        ("user_id" = Uuid, Path, description = "User ID"),
        Pagination,
        ReservationFilter
    ),
    responses(
        (status = 200, description = "Paginated reservations", body = ReservationPage)
    )
)]
pub async fn user_reservations(
    State(state): State<crate::AppState>,
    Path(user_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
    Query(filter): Query<ReservationFilter>,
) -> AppResult<Json<ReservationPage>> {
    let (page, page_size) = pagination.clamped();
    let reservations = state
        .services
        .reservations
        .list_for_user(user_id, filter.status, page, page_size)
        .await?;
    Ok(Json(reservations))
}

/// The pending FIFO queue for a book (librarian view)
#[utoipa::path(
    get,
    path = "/reservations/book/{book_id}",
    tag = "reservations",
    params(("book_id" = Uuid, Path, description = "Book ID"), Pagination),
    responses(
        (status = 200, description = "Pending reservations in FIFO order", body = ReservationPage),
        (status = 404, description = "Book not found")
    )
)]
pub async fn book_queue(
    State(state): State<crate::AppState>,
    Path(book_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ReservationPage>> {
    let (page, page_size) = pagination.clamped();
    let reservations = state
        .services
        .reservations
        .queue_for_book(book_id, page, page_size)
        .await?;
    Ok(Json(reservations))
}
