//! Loan (borrow record) model and state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Loan lifecycle status.
///
/// OVERDUE is deliberately not a stored status: it is derived from
/// `due_date < now` on ACTIVE loans at read time, so a concurrent return can
/// never race an overdue-marking job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "loan_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum LoanStatus {
    /// Reserved online, waiting for pickup
    Pending,
    /// Picked up, currently borrowed
    Active,
    Returned,
    Cancelled,
}

impl LoanStatus {
    /// A loan that still ties up its copy (PENDING or ACTIVE).
    pub fn is_open(self) -> bool {
        matches!(self, LoanStatus::Pending | LoanStatus::Active)
    }

    /// RETURNED and CANCELLED are terminal.
    pub fn is_terminal(self) -> bool {
        !self.is_open()
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LoanStatus::Pending => "PENDING",
            LoanStatus::Active => "ACTIVE",
            LoanStatus::Returned => "RETURNED",
            LoanStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", label)
    }
}

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: Uuid,
    pub copy_id: Uuid,
    pub user_id: Uuid,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
}

impl Loan {
    /// Overdue is a derived state, never written to the row.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == LoanStatus::Active && self.due_date < now
    }
}

/// Loan with book and copy details for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: Uuid,
    pub book_id: Uuid,
    pub book_title: String,
    pub copy_barcode: String,
    pub user_id: Uuid,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub is_overdue: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
}

/// Paginated loan listing
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanPage {
    pub items: Vec<LoanDetails>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

/// Borrowing statistics (librarian dashboard)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BorrowStats {
    pub active_borrows: i64,
    pub overdue_books: i64,
    pub pending_pickups: i64,
    pub returned_today: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn loan(status: LoanStatus, due_in_hours: i64) -> Loan {
        let now = Utc::now();
        Loan {
            id: Uuid::new_v4(),
            copy_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            borrowed_at: now,
            due_date: now + Duration::hours(due_in_hours),
            returned_at: None,
            status,
            created_at: now,
        }
    }

    #[test]
    fn open_statuses_tie_up_the_copy() {
        assert!(LoanStatus::Pending.is_open());
        assert!(LoanStatus::Active.is_open());
        assert!(LoanStatus::Returned.is_terminal());
        assert!(LoanStatus::Cancelled.is_terminal());
    }

    #[test]
    fn overdue_is_derived_from_active_past_due() {
        let now = Utc::now();
        assert!(loan(LoanStatus::Active, -1).is_overdue(now));
        assert!(!loan(LoanStatus::Active, 1).is_overdue(now));
        // A pending no-show is not overdue, it is swept separately
        assert!(!loan(LoanStatus::Pending, -1).is_overdue(now));
        assert!(!loan(LoanStatus::Returned, -1).is_overdue(now));
    }
}
