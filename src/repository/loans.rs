//! Loan ledger repository: borrow-record rows and their guarded transitions
//!
//! Transition guards (which status may move where) live in the circulation
//! service after it has locked the row; the UPDATEs here are deliberately
//! dumb so every state change flows through the same locked path.

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::loan::{BorrowStats, Loan, LoanDetails, LoanPage, LoanStatus},
};

use super::Tx;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Get loan by ID with a row lock held for the rest of the transaction
    pub async fn get_for_update(&self, tx: &mut Tx, id: Uuid) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Insert a loan row. The caller must have flipped the copy to BORROWED
    /// in the same transaction.
    pub async fn create(
        &self,
        tx: &mut Tx,
        copy_id: Uuid,
        user_id: Uuid,
        due_date: DateTime<Utc>,
        status: LoanStatus,
        now: DateTime<Utc>,
    ) -> AppResult<Loan> {
        if due_date <= now {
            return Err(AppError::BadRequest(
                "Due date must be in the future".to_string(),
            ));
        }

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (copy_id, user_id, borrowed_at, due_date, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $3)
            RETURNING *
            "#,
        )
        .bind(copy_id)
        .bind(user_id)
        .bind(now)
        .bind(due_date)
        .bind(status)
        .fetch_one(&mut **tx)
        .await?;
        Ok(loan)
    }

    /// PENDING -> ACTIVE: borrowed_at becomes the actual pickup time
    pub async fn set_active(&self, tx: &mut Tx, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE loans SET status = 'ACTIVE', borrowed_at = $1 WHERE id = $2")
            .bind(now)
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// {PENDING, ACTIVE} -> RETURNED
    pub async fn set_returned(&self, tx: &mut Tx, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE loans SET status = 'RETURNED', returned_at = $1 WHERE id = $2")
            .bind(now)
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// PENDING -> CANCELLED
    pub async fn set_cancelled(&self, tx: &mut Tx, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE loans SET status = 'CANCELLED' WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// PENDING loans created before the cutoff, locked for cancellation
    pub async fn find_expired_pending(
        &self,
        tx: &mut Tx,
        cutoff: DateTime<Utc>,
    ) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            r#"
            SELECT * FROM loans
            WHERE status = 'PENDING' AND created_at <= $1
            ORDER BY created_at
            FOR UPDATE
            "#,
        )
        .bind(cutoff)
        .fetch_all(&mut **tx)
        .await?;
        Ok(loans)
    }

    /// Does the user already hold an open (PENDING/ACTIVE) loan for any copy
    /// of this book?
    pub async fn user_has_open_loan_for_book(
        &self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM loans l
                JOIN copies c ON l.copy_id = c.id
                WHERE l.user_id = $1 AND c.book_id = $2
                  AND l.status IN ('PENDING', 'ACTIVE')
            )
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Borrow history for a user, newest first
    pub async fn user_history(
        &self,
        user_id: Uuid,
        status: Option<LoanStatus>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<LoanDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT l.id, l.copy_id, l.user_id, l.borrowed_at, l.due_date,
                   l.returned_at, l.status, c.barcode, c.book_id, b.title
            FROM loans l
            JOIN copies c ON l.copy_id = c.id
            JOIN books b ON c.book_id = b.id
            WHERE l.user_id = $1 AND ($2::loan_status IS NULL OR l.status = $2)
            ORDER BY l.created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row_to_details(&row, now)).collect())
    }

    /// All loans, paginated, optionally filtered by status (librarian view)
    pub async fn list(
        &self,
        status: Option<LoanStatus>,
        page: i64,
        page_size: i64,
        now: DateTime<Utc>,
    ) -> AppResult<LoanPage> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE ($1::loan_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            r#"
            SELECT l.id, l.copy_id, l.user_id, l.borrowed_at, l.due_date,
                   l.returned_at, l.status, c.barcode, c.book_id, b.title,
                   u.full_name, u.email
            FROM loans l
            JOIN copies c ON l.copy_id = c.id
            JOIN books b ON c.book_id = b.id
            JOIN users u ON l.user_id = u.id
            WHERE ($1::loan_status IS NULL OR l.status = $1)
            ORDER BY l.created_at DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(status)
        .bind((page - 1) * page_size)
        .bind(page_size)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(|row| {
                let mut details = row_to_details(&row, now);
                details.user_full_name = row.get("full_name");
                details.user_email = row.get("email");
                details
            })
            .collect();

        Ok(LoanPage {
            items,
            total,
            page,
            page_size,
            total_pages: (total + page_size - 1) / page_size,
        })
    }

    /// Resolved details for a single loan
    pub async fn details(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<LoanDetails> {
        let row = sqlx::query(
            r#"
            SELECT l.id, l.copy_id, l.user_id, l.borrowed_at, l.due_date,
                   l.returned_at, l.status, c.barcode, c.book_id, b.title
            FROM loans l
            JOIN copies c ON l.copy_id = c.id
            JOIN books b ON c.book_id = b.id
            WHERE l.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;

        Ok(row_to_details(&row, now))
    }

    /// Counts for the librarian dashboard. Overdue is derived from due_date,
    /// never read from a stored status.
    pub async fn stats(&self, now: DateTime<Utc>) -> AppResult<BorrowStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'ACTIVE') AS active_borrows,
                COUNT(*) FILTER (WHERE status = 'ACTIVE' AND due_date < $1) AS overdue_books,
                COUNT(*) FILTER (WHERE status = 'PENDING') AS pending_pickups,
                COUNT(*) FILTER (WHERE status = 'RETURNED'
                                 AND returned_at >= date_trunc('day', $1)) AS returned_today
            FROM loans
            "#,
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(BorrowStats {
            active_borrows: row.get("active_borrows"),
            overdue_books: row.get("overdue_books"),
            pending_pickups: row.get("pending_pickups"),
            returned_today: row.get("returned_today"),
        })
    }
}

fn row_to_details(row: &sqlx::postgres::PgRow, now: DateTime<Utc>) -> LoanDetails {
    let status: LoanStatus = row.get("status");
    let due_date: DateTime<Utc> = row.get("due_date");

    LoanDetails {
        id: row.get("id"),
        book_id: row.get("book_id"),
        book_title: row.get("title"),
        copy_barcode: row.get("barcode"),
        user_id: row.get("user_id"),
        borrowed_at: row.get("borrowed_at"),
        due_date,
        returned_at: row.get("returned_at"),
        status,
        is_overdue: status == LoanStatus::Active && due_date < now,
        user_full_name: None,
        user_email: None,
    }
}
