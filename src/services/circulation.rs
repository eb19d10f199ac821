//! Loan lifecycle service: walk-in borrow, pickup, return, cancel
//!
//! Every multi-step operation runs in a single transaction. The copy row is
//! locked before any loan mutation, so copy and loan state always commit (or
//! roll back) together and no two operations can act on the same copy.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::loan::{BorrowStats, Loan, LoanDetails, LoanPage, LoanStatus},
    repository::Repository,
};

#[derive(Clone)]
pub struct CirculationService {
    repository: Repository,
    config: CirculationConfig,
}

impl CirculationService {
    pub fn new(repository: Repository, config: CirculationConfig) -> Self {
        Self { repository, config }
    }

    fn default_due_date(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(self.config.default_loan_days)
    }

    /// Walk-in borrow of a specific copy: the loan starts ACTIVE.
    pub async fn borrow_copy(
        &self,
        copy_id: Uuid,
        user_id: Uuid,
        due_date: Option<DateTime<Utc>>,
    ) -> AppResult<Loan> {
        let now = Utc::now();
        let due_date = due_date.unwrap_or_else(|| self.default_due_date(now));

        let mut tx = self.repository.pool.begin().await?;

        let copy = self.repository.copies.get_for_update(&mut tx, copy_id).await?;
        if !copy.status.is_lendable() {
            return Err(AppError::NoAvailableCopy(format!(
                "Copy is not available (current status: {})",
                copy.status
            )));
        }

        self.repository.copies.mark_borrowed(&mut tx, copy_id, now).await?;
        let loan = self
            .repository
            .loans
            .create(&mut tx, copy_id, user_id, due_date, LoanStatus::Active, now)
            .await?;

        tx.commit().await?;

        tracing::info!("Copy {} borrowed by user {} as loan {}", copy_id, user_id, loan.id);
        Ok(loan)
    }

    /// PENDING -> ACTIVE on pickup confirmation
    pub async fn confirm_pickup(&self, loan_id: Uuid) -> AppResult<Loan> {
        let now = Utc::now();
        let mut tx = self.repository.pool.begin().await?;

        let loan = self.repository.loans.get_for_update(&mut tx, loan_id).await?;
        if loan.status != LoanStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "Loan is not pending pickup (current status: {})",
                loan.status
            )));
        }

        self.repository.loans.set_active(&mut tx, loan_id, now).await?;
        tx.commit().await?;

        Ok(Loan {
            status: LoanStatus::Active,
            borrowed_at: now,
            ..loan
        })
    }

    /// Return a loan: loan -> RETURNED, copy freed, then the book's FIFO
    /// reservation queue is served. Returning a PENDING loan is a valid
    /// no-show return.
    pub async fn return_loan(&self, loan_id: Uuid) -> AppResult<Loan> {
        let now = Utc::now();
        let mut tx = self.repository.pool.begin().await?;

        let loan = self.repository.loans.get_for_update(&mut tx, loan_id).await?;
        match loan.status {
            LoanStatus::Returned => {
                return Err(AppError::InvalidState("Loan already returned".to_string()))
            }
            LoanStatus::Cancelled => {
                return Err(AppError::InvalidState(
                    "Cannot return a cancelled loan".to_string(),
                ))
            }
            LoanStatus::Pending | LoanStatus::Active => {}
        }

        let copy = self.repository.copies.get_for_update(&mut tx, loan.copy_id).await?;

        self.repository.loans.set_returned(&mut tx, loan_id, now).await?;
        self.repository.copies.release(&mut tx, loan.copy_id, now).await?;
        self.repository
            .reservations
            .fulfill_next(&mut tx, copy.book_id, now)
            .await?;

        tx.commit().await?;

        tracing::info!("Loan {} returned, copy {} freed", loan_id, loan.copy_id);
        Ok(Loan {
            status: LoanStatus::Returned,
            returned_at: Some(now),
            ..loan
        })
    }

    /// Manual cancel of a PENDING loan; frees the copy.
    pub async fn cancel_loan(&self, loan_id: Uuid) -> AppResult<Loan> {
        let now = Utc::now();
        let mut tx = self.repository.pool.begin().await?;

        let loan = self.repository.loans.get_for_update(&mut tx, loan_id).await?;
        if loan.status != LoanStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "Only pending loans can be cancelled (current status: {})",
                loan.status
            )));
        }

        self.repository.loans.set_cancelled(&mut tx, loan_id).await?;
        self.repository.copies.release(&mut tx, loan.copy_id, now).await?;

        tx.commit().await?;

        tracing::info!("Loan {} cancelled, copy {} freed", loan_id, loan.copy_id);
        Ok(Loan {
            status: LoanStatus::Cancelled,
            ..loan
        })
    }

    /// Borrow history for a user
    pub async fn user_loans(
        &self,
        user_id: Uuid,
        status: Option<LoanStatus>,
    ) -> AppResult<Vec<LoanDetails>> {
        self.repository.loans.user_history(user_id, status, Utc::now()).await
    }

    /// All loans, paginated (librarian view)
    pub async fn list_loans(
        &self,
        status: Option<LoanStatus>,
        page: i64,
        page_size: i64,
    ) -> AppResult<LoanPage> {
        self.repository.loans.list(status, page, page_size, Utc::now()).await
    }

    /// Resolved details for one loan
    pub async fn loan_details(&self, loan_id: Uuid) -> AppResult<LoanDetails> {
        self.repository.loans.details(loan_id, Utc::now()).await
    }

    /// Borrowing statistics (librarian dashboard)
    pub async fn stats(&self) -> AppResult<BorrowStats> {
        self.repository.loans.stats(Utc::now()).await
    }
}
