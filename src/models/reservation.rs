//! Reservation (wait-list entry) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Reservation lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "reservation_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ReservationStatus {
    Pending,
    Fulfilled,
    Cancelled,
    Expired,
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Fulfilled => "FULFILLED",
            ReservationStatus::Cancelled => "CANCELLED",
            ReservationStatus::Expired => "EXPIRED",
        };
        write!(f, "{}", label)
    }
}

/// Reservation model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub status: ReservationStatus,
    pub reserved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// A PENDING reservation whose window has closed. Expiry is evaluated
    /// lazily at fulfillment time; the row stays PENDING until then.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == ReservationStatus::Pending && now > self.expires_at
    }
}

/// Paginated reservation listing
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReservationPage {
    pub items: Vec<Reservation>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn reservation(status: ReservationStatus, expires_in_hours: i64) -> Reservation {
        let now = Utc::now();
        Reservation {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            book_id: Uuid::new_v4(),
            status,
            reserved_at: now,
            expires_at: now + Duration::hours(expires_in_hours),
            fulfilled_at: None,
            created_at: now,
        }
    }

    #[test]
    fn only_pending_past_window_is_expired() {
        let now = Utc::now();
        assert!(reservation(ReservationStatus::Pending, -1).is_expired(now));
        assert!(!reservation(ReservationStatus::Pending, 1).is_expired(now));
        assert!(!reservation(ReservationStatus::Fulfilled, -1).is_expired(now));
        assert!(!reservation(ReservationStatus::Cancelled, -1).is_expired(now));
    }
}
