//! Cart checkout coordinator: convert a cart into loans, all or nothing

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult, FailedBook},
    models::{
        cart::{CartDetails, CartItem, CheckoutSummary},
        loan::{LoanDetails, LoanStatus},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CheckoutService {
    repository: Repository,
    config: CirculationConfig,
}

impl CheckoutService {
    pub fn new(repository: Repository, config: CirculationConfig) -> Self {
        Self { repository, config }
    }

    /// The user's cart with resolved book details, created on first access
    pub async fn get_cart(&self, user_id: Uuid) -> AppResult<CartDetails> {
        let cart = self.repository.carts.get_or_create(user_id).await?;
        let items = self.repository.carts.item_details(cart.id).await?;
        Ok(CartDetails {
            id: cart.id,
            user_id: cart.user_id,
            created_at: cart.created_at,
            updated_at: cart.updated_at,
            items,
        })
    }

    /// Add a book to the user's cart.
    ///
    /// Rules carried from the catalog side: the book must exist and have at
    /// least one available copy, the user must not already hold an open loan
    /// for it, and it must not already be in the cart.
    pub async fn add_item(&self, user_id: Uuid, book_id: Uuid) -> AppResult<CartItem> {
        let book = self.repository.books.get_summary(book_id).await?;

        if book.available_copies == 0 {
            return Err(AppError::NoAvailableCopy(
                "No available copies of this book".to_string(),
            ));
        }

        if self
            .repository
            .loans
            .user_has_open_loan_for_book(user_id, book_id)
            .await?
        {
            return Err(AppError::BadRequest(
                "You already have an active or pending borrow for this book".to_string(),
            ));
        }

        let cart = self.repository.carts.get_or_create(user_id).await?;
        let item = self.repository.carts.add_item(cart.id, book_id).await?;
        self.repository.carts.touch(&self.repository.pool, cart.id, Utc::now()).await?;
        Ok(item)
    }

    /// Remove a book from the user's cart
    pub async fn remove_item(&self, user_id: Uuid, book_id: Uuid) -> AppResult<()> {
        let cart = self.repository.carts.get_or_create(user_id).await?;
        self.repository.carts.remove_item(cart.id, book_id).await?;
        self.repository.carts.touch(&self.repository.pool, cart.id, Utc::now()).await
    }

    /// Empty the user's cart
    pub async fn clear(&self, user_id: Uuid) -> AppResult<()> {
        let cart = self.repository.carts.get_or_create(user_id).await?;
        self.repository.carts.clear_items(&self.repository.pool, cart.id).await?;
        self.repository.carts.touch(&self.repository.pool, cart.id, Utc::now()).await
    }

    /// Borrow every book in the cart as one atomic unit.
    ///
    /// The cart row is locked so the same user cannot check out twice
    /// concurrently; every item is attempted so the failure report names all
    /// unavailable books; any failure rolls the whole transaction back, so
    /// acquired copies revert to AVAILABLE and no loan rows survive. On
    /// success the loans start PENDING (awaiting pickup) and the cart is
    /// emptied, which makes an accidental replay fail with `EmptyCart`.
    pub async fn checkout(
        &self,
        user_id: Uuid,
        due_date: Option<DateTime<Utc>>,
    ) -> AppResult<CheckoutSummary> {
        let now = Utc::now();
        let due_date = due_date.unwrap_or_else(|| now + Duration::days(self.config.default_loan_days));
        if due_date <= now {
            return Err(AppError::BadRequest("Due date must be in the future".to_string()));
        }

        let mut tx = self.repository.pool.begin().await?;

        let cart = self
            .repository
            .carts
            .get_for_update(&mut tx, user_id)
            .await?
            .ok_or(AppError::EmptyCart)?;

        let items = self.repository.carts.items(&mut *tx, cart.id).await?;
        if items.is_empty() {
            return Err(AppError::EmptyCart);
        }

        let mut loans = Vec::new();
        let mut failed_books: Vec<FailedBook> = Vec::new();

        for item in &items {
            let title = self
                .repository
                .books
                .title_of(&mut *tx, item.book_id)
                .await?
                .unwrap_or_else(|| "Unknown".to_string());

            match self
                .repository
                .copies
                .acquire_available(&mut tx, item.book_id, now)
                .await
            {
                Ok(copy) => {
                    let loan = self
                        .repository
                        .loans
                        .create(&mut tx, copy.id, user_id, due_date, LoanStatus::Pending, now)
                        .await?;
                    loans.push(LoanDetails {
                        id: loan.id,
                        book_id: item.book_id,
                        book_title: title,
                        copy_barcode: copy.barcode,
                        user_id,
                        borrowed_at: loan.borrowed_at,
                        due_date: loan.due_date,
                        returned_at: None,
                        status: loan.status,
                        is_overdue: false,
                        user_full_name: None,
                        user_email: None,
                    });
                }
                Err(AppError::NoAvailableCopy(_)) => {
                    failed_books.push(FailedBook {
                        book_id: item.book_id,
                        book_title: title,
                        reason: "No available copies".to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        if !failed_books.is_empty() {
            tx.rollback().await?;
            tracing::info!(
                "Checkout by user {} aborted, {} of {} book(s) unavailable",
                user_id,
                failed_books.len(),
                items.len()
            );
            return Err(AppError::CheckoutFailed(failed_books));
        }

        self.repository.carts.clear_items(&mut *tx, cart.id).await?;
        self.repository.carts.touch(&mut *tx, cart.id, now).await?;
        tx.commit().await?;

        tracing::info!("User {} checked out {} book(s)", user_id, loans.len());
        Ok(CheckoutSummary {
            message: format!("Successfully borrowed {} book(s)", loans.len()),
            loans,
        })
    }
}
