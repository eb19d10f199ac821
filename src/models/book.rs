//! Book summary read model (catalog itself is managed elsewhere)

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Short book view with copy availability counts
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookSummary {
    pub id: Uuid,
    pub title: String,
    pub total_copies: i64,
    pub available_copies: i64,
}
