//! Copy inventory administration: create, list, mark lost, delete

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::copy::Copy,
    repository::Repository,
};

#[derive(Clone)]
pub struct InventoryService {
    repository: Repository,
}

impl InventoryService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Register a new copy of a book
    pub async fn create_copy(&self, book_id: Uuid, barcode: &str) -> AppResult<Copy> {
        // Surface NotFound for an unknown book rather than an FK violation
        self.repository.books.get_summary(book_id).await?;
        self.repository.copies.create(book_id, barcode).await
    }

    /// All copies of a book
    pub async fn list_copies(&self, book_id: Uuid) -> AppResult<Vec<Copy>> {
        self.repository.books.get_summary(book_id).await?;
        self.repository.copies.list_for_book(book_id).await
    }

    pub async fn get_copy(&self, copy_id: Uuid) -> AppResult<Copy> {
        self.repository.copies.get_by_id(copy_id).await
    }

    /// Mark a copy LOST. Refused while it is borrowed.
    pub async fn mark_lost(&self, copy_id: Uuid) -> AppResult<Copy> {
        let now = Utc::now();
        let mut tx = self.repository.pool.begin().await?;
        let copy = self.repository.copies.mark_lost(&mut tx, copy_id, now).await?;
        tx.commit().await?;

        tracing::warn!("Copy {} marked lost", copy_id);
        Ok(copy)
    }

    /// Delete a copy. Fails with `CopyInUse` while it is borrowed.
    pub async fn delete_copy(&self, copy_id: Uuid) -> AppResult<()> {
        let mut tx = self.repository.pool.begin().await?;
        self.repository.copies.delete(&mut tx, copy_id).await?;
        tx.commit().await?;
        Ok(())
    }
}
