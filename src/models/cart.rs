//! Cart and cart item models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::book::BookSummary;
use super::loan::LoanDetails;

/// Cart model from database (one per user)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Cart item model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub book_id: Uuid,
    pub added_at: DateTime<Utc>,
}

/// Cart item with resolved book details
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CartItemDetails {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub book_id: Uuid,
    pub added_at: DateTime<Utc>,
    pub book: BookSummary,
}

/// Full cart view with resolved items
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CartDetails {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<CartItemDetails>,
}

/// Add-to-cart request
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCartItem {
    pub book_id: Uuid,
}

/// Result of a successful checkout
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutSummary {
    pub message: String,
    pub loans: Vec<LoanDetails>,
}
