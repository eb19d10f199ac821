//! Physical book copy model and status state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Copy availability status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "copy_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum CopyStatus {
    Available,
    Borrowed,
    Lost,
}

impl CopyStatus {
    /// Only an AVAILABLE copy can be handed to a borrower.
    pub fn is_lendable(self) -> bool {
        self == CopyStatus::Available
    }
}

impl std::fmt::Display for CopyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CopyStatus::Available => "AVAILABLE",
            CopyStatus::Borrowed => "BORROWED",
            CopyStatus::Lost => "LOST",
        };
        write!(f, "{}", label)
    }
}

/// Copy model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Copy {
    pub id: Uuid,
    pub book_id: Uuid,
    pub barcode: String,
    pub status: CopyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create copy request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCopy {
    /// Barcode, unique across all copies
    pub barcode: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_available_is_lendable() {
        assert!(CopyStatus::Available.is_lendable());
        assert!(!CopyStatus::Borrowed.is_lendable());
        assert!(!CopyStatus::Lost.is_lendable());
    }
}
