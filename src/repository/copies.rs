//! Copy inventory repository: atomic copy status transitions

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::copy::{Copy, CopyStatus},
};

use super::Tx;
use sqlx::{Pool, Postgres};

#[derive(Clone)]
pub struct CopiesRepository {
    pool: Pool<Postgres>,
}

impl CopiesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get copy by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Copy> {
        sqlx::query_as::<_, Copy>("SELECT * FROM copies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Copy with id {} not found", id)))
    }

    /// List all copies of a book
    pub async fn list_for_book(&self, book_id: Uuid) -> AppResult<Vec<Copy>> {
        let copies = sqlx::query_as::<_, Copy>(
            "SELECT * FROM copies WHERE book_id = $1 ORDER BY barcode",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(copies)
    }

    /// Get copy by ID with a row lock held for the rest of the transaction
    pub async fn get_for_update(&self, tx: &mut Tx, id: Uuid) -> AppResult<Copy> {
        sqlx::query_as::<_, Copy>("SELECT * FROM copies WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Copy with id {} not found", id)))
    }

    /// Select one AVAILABLE copy of the book, lock it and flip it to BORROWED.
    ///
    /// A contending transaction selecting the same row blocks on the lock and
    /// re-evaluates the status predicate once it is released, so two callers
    /// can never acquire the same copy. `NoAvailableCopy` is an expected
    /// outcome, not a defect.
    pub async fn acquire_available(
        &self,
        tx: &mut Tx,
        book_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Copy> {
        let copy = sqlx::query_as::<_, Copy>(
            r#"
            SELECT * FROM copies
            WHERE book_id = $1 AND status = 'AVAILABLE'
            ORDER BY barcode
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(book_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| {
            AppError::NoAvailableCopy(format!("No available copies of book {}", book_id))
        })?;

        self.set_status(tx, copy.id, CopyStatus::Borrowed, now).await?;

        Ok(Copy {
            status: CopyStatus::Borrowed,
            updated_at: now,
            ..copy
        })
    }

    /// Flip a locked AVAILABLE copy to BORROWED. The caller must hold the
    /// row lock and have checked the status.
    pub async fn mark_borrowed(&self, tx: &mut Tx, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        self.set_status(tx, id, CopyStatus::Borrowed, now).await
    }

    /// Flip a copy back to AVAILABLE. Idempotent: releasing a copy that is
    /// already AVAILABLE (or LOST) is a logged no-op.
    pub async fn release(&self, tx: &mut Tx, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        let copy = self.get_for_update(tx, id).await?;

        if copy.status != CopyStatus::Borrowed {
            tracing::debug!("Release of copy {} in status {} is a no-op", id, copy.status);
            return Ok(());
        }

        self.set_status(tx, id, CopyStatus::Available, now).await
    }

    /// Mark a copy LOST. Refused while an open loan holds it.
    pub async fn mark_lost(&self, tx: &mut Tx, id: Uuid, now: DateTime<Utc>) -> AppResult<Copy> {
        let copy = self.get_for_update(tx, id).await?;

        if copy.status == CopyStatus::Borrowed {
            return Err(AppError::InvalidState(
                "Cannot mark a borrowed copy as lost; return or cancel its loan first".to_string(),
            ));
        }

        self.set_status(tx, id, CopyStatus::Lost, now).await?;

        Ok(Copy {
            status: CopyStatus::Lost,
            updated_at: now,
            ..copy
        })
    }

    /// Delete a copy. Fails with `CopyInUse` if it is currently BORROWED.
    pub async fn delete(&self, tx: &mut Tx, id: Uuid) -> AppResult<()> {
        let copy = self.get_for_update(tx, id).await?;

        if copy.status == CopyStatus::Borrowed {
            return Err(AppError::CopyInUse(
                "Cannot delete a borrowed book copy".to_string(),
            ));
        }

        sqlx::query("DELETE FROM copies WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Create a copy (catalog administration). Barcodes are unique.
    pub async fn create(&self, book_id: Uuid, barcode: &str) -> AppResult<Copy> {
        let copy = sqlx::query_as::<_, Copy>(
            r#"
            INSERT INTO copies (book_id, barcode)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(book_id)
        .bind(barcode)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                AppError::BadRequest(format!("Barcode {} already exists", barcode))
            }
            _ => AppError::Database(e),
        })?;
        Ok(copy)
    }

    /// Count AVAILABLE copies of a book, on the pool or inside a transaction
    pub async fn count_available<'e, E>(&self, executor: E, book_id: Uuid) -> AppResult<i64>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM copies WHERE book_id = $1 AND status = 'AVAILABLE'",
        )
        .bind(book_id)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    async fn set_status(
        &self,
        tx: &mut Tx,
        id: Uuid,
        status: CopyStatus,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE copies SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(status)
            .bind(now)
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
