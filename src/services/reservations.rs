//! Reservation queue service: reserve, cancel, fulfill

use chrono::Utc;
use uuid::Uuid;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::reservation::{Reservation, ReservationPage, ReservationStatus},
    repository::Repository,
};

#[derive(Clone)]
pub struct ReservationsService {
    repository: Repository,
    config: CirculationConfig,
}

impl ReservationsService {
    pub fn new(repository: Repository, config: CirculationConfig) -> Self {
        Self { repository, config }
    }

    /// Reserve a book that has zero available copies. Rejected with
    /// `CopyAvailable` while any copy can be borrowed directly, and with
    /// `DuplicateReservation` if the user is already queued for this book.
    pub async fn reserve(&self, user_id: Uuid, book_id: Uuid) -> AppResult<Reservation> {
        let now = Utc::now();

        if !self.repository.books.exists(book_id).await? {
            return Err(AppError::NotFound(format!("Book with id {} not found", book_id)));
        }

        let mut tx = self.repository.pool.begin().await?;

        if self
            .repository
            .reservations
            .find_pending(&mut tx, user_id, book_id)
            .await?
            .is_some()
        {
            return Err(AppError::DuplicateReservation(
                "You already have an active reservation for this book".to_string(),
            ));
        }

        let available = self
            .repository
            .copies
            .count_available(&mut *tx, book_id)
            .await?;
        if available > 0 {
            return Err(AppError::CopyAvailable(
                "Book has available copies. Please borrow directly instead of reserving."
                    .to_string(),
            ));
        }

        let reservation = self
            .repository
            .reservations
            .create(&mut tx, user_id, book_id, self.config.reservation_ttl_hours, now)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Reservation {} created for user {} on book {}",
            reservation.id,
            user_id,
            book_id
        );
        Ok(reservation)
    }

    /// Cancel one's own PENDING reservation
    pub async fn cancel(&self, reservation_id: Uuid, requesting_user_id: Uuid) -> AppResult<()> {
        let mut tx = self.repository.pool.begin().await?;

        let reservation = self
            .repository
            .reservations
            .get_for_update(&mut tx, reservation_id)
            .await?;

        if reservation.user_id != requesting_user_id {
            return Err(AppError::Forbidden(
                "You can only cancel your own reservations".to_string(),
            ));
        }
        if reservation.status != ReservationStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "Cannot cancel reservation with status: {}",
                reservation.status
            )));
        }

        self.repository
            .reservations
            .set_status(&mut tx, reservation_id, ReservationStatus::Cancelled, None)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Librarian marks a specific PENDING reservation FULFILLED (manual
    /// handover). An expired one flips to EXPIRED instead and the call fails.
    pub async fn fulfill(&self, reservation_id: Uuid) -> AppResult<Reservation> {
        let now = Utc::now();
        let mut tx = self.repository.pool.begin().await?;

        let reservation = self
            .repository
            .reservations
            .get_for_update(&mut tx, reservation_id)
            .await?;

        if reservation.status != ReservationStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "Cannot fulfill reservation with status: {}",
                reservation.status
            )));
        }

        if reservation.is_expired(now) {
            // The expiry transition is kept even though the call fails
            self.repository
                .reservations
                .set_status(&mut tx, reservation_id, ReservationStatus::Expired, None)
                .await?;
            tx.commit().await?;
            return Err(AppError::InvalidState("Reservation has expired".to_string()));
        }

        self.repository
            .reservations
            .set_status(&mut tx, reservation_id, ReservationStatus::Fulfilled, Some(now))
            .await?;
        tx.commit().await?;

        Ok(Reservation {
            status: ReservationStatus::Fulfilled,
            fulfilled_at: Some(now),
            ..reservation
        })
    }

    /// A user's reservations, newest first
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        status: Option<ReservationStatus>,
        page: i64,
        page_size: i64,
    ) -> AppResult<ReservationPage> {
        self.repository
            .reservations
            .list_for_user(user_id, status, page, page_size)
            .await
    }

    /// The FIFO queue for a book (librarian view)
    pub async fn queue_for_book(
        &self,
        book_id: Uuid,
        page: i64,
        page_size: i64,
    ) -> AppResult<ReservationPage> {
        if !self.repository.books.exists(book_id).await? {
            return Err(AppError::NotFound(format!("Book with id {} not found", book_id)));
        }
        self.repository
            .reservations
            .pending_for_book(book_id, page, page_size)
            .await
    }
}
