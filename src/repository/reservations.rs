//! Reservation queue repository: FIFO wait lists per book

use chrono::{DateTime, Duration, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::reservation::{Reservation, ReservationPage, ReservationStatus},
};

use super::Tx;

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get reservation by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    /// Get reservation by ID with a row lock held for the rest of the transaction
    pub async fn get_for_update(&self, tx: &mut Tx, id: Uuid) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    /// Insert a PENDING reservation expiring `ttl_hours` from now
    pub async fn create(
        &self,
        tx: &mut Tx,
        user_id: Uuid,
        book_id: Uuid,
        ttl_hours: i64,
        now: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations (user_id, book_id, status, reserved_at, expires_at, created_at)
            VALUES ($1, $2, 'PENDING', $3, $4, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(now)
        .bind(now + Duration::hours(ttl_hours))
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| match &e {
            // Partial unique index on (user_id, book_id) WHERE PENDING
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                AppError::DuplicateReservation(
                    "You already have an active reservation for this book".to_string(),
                )
            }
            _ => AppError::Database(e),
        })?;
        Ok(reservation)
    }

    /// The user's PENDING reservation for a book, if any
    pub async fn find_pending(
        &self,
        tx: &mut Tx,
        user_id: Uuid,
        book_id: Uuid,
    ) -> AppResult<Option<Reservation>> {
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservations
            WHERE user_id = $1 AND book_id = $2 AND status = 'PENDING'
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(reservation)
    }

    /// Serve the head of the book's FIFO queue after a copy frees up.
    ///
    /// Walks PENDING reservations in arrival order (reserved_at, then id),
    /// lazily expiring any whose window has closed, and marks the first live
    /// one FULFILLED. Rows created after this statement takes its locks are
    /// not visible, which is correct: they arrived later. Fulfillment only
    /// signals staff to hand over the copy; no loan is created and the copy
    /// stays AVAILABLE until an explicit pickup.
    pub async fn fulfill_next(
        &self,
        tx: &mut Tx,
        book_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Reservation>> {
        let queue = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservations
            WHERE book_id = $1 AND status = 'PENDING'
            ORDER BY reserved_at, id
            FOR UPDATE
            "#,
        )
        .bind(book_id)
        .fetch_all(&mut **tx)
        .await?;

        for reservation in queue {
            if reservation.is_expired(now) {
                self.set_status(tx, reservation.id, ReservationStatus::Expired, None)
                    .await?;
                tracing::info!(
                    "Reservation {} for book {} expired before fulfillment",
                    reservation.id,
                    book_id
                );
                continue;
            }

            self.set_status(tx, reservation.id, ReservationStatus::Fulfilled, Some(now))
                .await?;
            tracing::info!(
                "Reservation {} fulfilled for user {} on book {}",
                reservation.id,
                reservation.user_id,
                book_id
            );
            return Ok(Some(Reservation {
                status: ReservationStatus::Fulfilled,
                fulfilled_at: Some(now),
                ..reservation
            }));
        }

        Ok(None)
    }

    /// Transition a reservation row; fulfilled_at is only set for FULFILLED
    pub async fn set_status(
        &self,
        tx: &mut Tx,
        id: Uuid,
        status: ReservationStatus,
        fulfilled_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE reservations SET status = $1, fulfilled_at = $2 WHERE id = $3")
            .bind(status)
            .bind(fulfilled_at)
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// A user's reservations, newest first, optionally filtered by status
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        status: Option<ReservationStatus>,
        page: i64,
        page_size: i64,
    ) -> AppResult<ReservationPage> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM reservations
            WHERE user_id = $1 AND ($2::reservation_status IS NULL OR status = $2)
            "#,
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservations
            WHERE user_id = $1 AND ($2::reservation_status IS NULL OR status = $2)
            ORDER BY reserved_at DESC
            OFFSET $3 LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(status)
        .bind((page - 1) * page_size)
        .bind(page_size)
        .fetch_all(&self.pool)
        .await?;

        Ok(page_of(items, total, page, page_size))
    }

    /// The PENDING queue for a book in FIFO order (librarian view)
    pub async fn pending_for_book(
        &self,
        book_id: Uuid,
        page: i64,
        page_size: i64,
    ) -> AppResult<ReservationPage> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservations WHERE book_id = $1 AND status = 'PENDING'",
        )
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservations
            WHERE book_id = $1 AND status = 'PENDING'
            ORDER BY reserved_at, id
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(book_id)
        .bind((page - 1) * page_size)
        .bind(page_size)
        .fetch_all(&self.pool)
        .await?;

        Ok(page_of(items, total, page, page_size))
    }
}

fn page_of(items: Vec<Reservation>, total: i64, page: i64, page_size: i64) -> ReservationPage {
    ReservationPage {
        items,
        total,
        page,
        page_size,
        total_pages: if total > 0 {
            (total + page_size - 1) / page_size
        } else {
            0
        },
    }
}
