//! Cart repository: per-user staging area consumed by checkout

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::BookSummary,
        cart::{Cart, CartItem, CartItemDetails},
    },
};

use super::Tx;

#[derive(Clone)]
pub struct CartsRepository {
    pool: Pool<Postgres>,
}

impl CartsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get the user's cart, creating an empty one on first touch
    pub async fn get_or_create(&self, user_id: Uuid) -> AppResult<Cart> {
        let cart = sqlx::query_as::<_, Cart>(
            r#"
            INSERT INTO carts (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING *
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(cart)
    }

    /// Lock the user's cart row for the duration of the transaction, so two
    /// concurrent checkouts by the same user serialize.
    pub async fn get_for_update(&self, tx: &mut Tx, user_id: Uuid) -> AppResult<Option<Cart>> {
        let cart =
            sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut **tx)
                .await?;
        Ok(cart)
    }

    /// Cart items in the order they were added
    pub async fn items<'e, E>(&self, executor: E, cart_id: Uuid) -> AppResult<Vec<CartItem>>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let items = sqlx::query_as::<_, CartItem>(
            "SELECT * FROM cart_items WHERE cart_id = $1 ORDER BY added_at, id",
        )
        .bind(cart_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    /// Cart items with resolved book summaries and availability counts
    pub async fn item_details(&self, cart_id: Uuid) -> AppResult<Vec<CartItemDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT ci.id, ci.cart_id, ci.book_id, ci.added_at, b.title,
                   (SELECT COUNT(*) FROM copies c WHERE c.book_id = b.id) AS total_copies,
                   (SELECT COUNT(*) FROM copies c
                    WHERE c.book_id = b.id AND c.status = 'AVAILABLE') AS available_copies
            FROM cart_items ci
            JOIN books b ON ci.book_id = b.id
            WHERE ci.cart_id = $1
            ORDER BY ci.added_at, ci.id
            "#,
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CartItemDetails {
                id: row.get("id"),
                cart_id: row.get("cart_id"),
                book_id: row.get("book_id"),
                added_at: row.get("added_at"),
                book: BookSummary {
                    id: row.get("book_id"),
                    title: row.get("title"),
                    total_copies: row.get("total_copies"),
                    available_copies: row.get("available_copies"),
                },
            })
            .collect())
    }

    /// Add a book to the cart. Unique per (cart, book).
    pub async fn add_item(&self, cart_id: Uuid, book_id: Uuid) -> AppResult<CartItem> {
        let item = sqlx::query_as::<_, CartItem>(
            r#"
            INSERT INTO cart_items (cart_id, book_id)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(cart_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                AppError::BadRequest("Book already in cart".to_string())
            }
            _ => AppError::Database(e),
        })?;
        Ok(item)
    }

    /// Remove a book from the cart
    pub async fn remove_item(&self, cart_id: Uuid, book_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND book_id = $2")
            .bind(cart_id)
            .bind(book_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Book not found in cart".to_string()));
        }
        Ok(())
    }

    /// Empty the cart, on the pool or inside the checkout transaction
    pub async fn clear_items<'e, E>(&self, executor: E, cart_id: Uuid) -> AppResult<u64>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Bump the cart's updated_at
    pub async fn touch<'e, E>(&self, executor: E, cart_id: Uuid, now: DateTime<Utc>) -> AppResult<()>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query("UPDATE carts SET updated_at = $1 WHERE id = $2")
            .bind(now)
            .bind(cart_id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
