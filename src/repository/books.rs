//! Boundary reads against the catalog's books table

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::book::BookSummary,
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a book summary with copy availability counts
    pub async fn get_summary(&self, book_id: Uuid) -> AppResult<BookSummary> {
        sqlx::query_as::<_, BookSummary>(
            r#"
            SELECT b.id, b.title,
                   (SELECT COUNT(*) FROM copies c WHERE c.book_id = b.id) AS total_copies,
                   (SELECT COUNT(*) FROM copies c
                    WHERE c.book_id = b.id AND c.status = 'AVAILABLE') AS available_copies
            FROM books b
            WHERE b.id = $1
            "#,
        )
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))
    }

    /// Resolve a book title, for failure reports and cart views
    pub async fn title_of<'e, E>(&self, executor: E, book_id: Uuid) -> AppResult<Option<String>>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let title = sqlx::query_scalar::<_, String>("SELECT title FROM books WHERE id = $1")
            .bind(book_id)
            .fetch_optional(executor)
            .await?;
        Ok(title)
    }

    pub async fn exists(&self, book_id: Uuid) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(book_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}
