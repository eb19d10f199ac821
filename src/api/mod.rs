//! API handlers for the Biblio REST endpoints
//!
//! Authentication and authorization live in a separate gateway; handlers
//! here take the acting user id explicitly and only map requests onto the
//! circulation services.

pub mod cart;
pub mod copies;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod reservations;

use serde::Deserialize;
use utoipa::IntoParams;

/// Common pagination query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct Pagination {
    /// Page number, starting from 1
    pub page: Option<i64>,
    /// Items per page (max 100)
    pub page_size: Option<i64>,
}

impl Pagination {
    pub fn clamped(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let page_size = self.page_size.unwrap_or(20).clamp(1, 100);
        (page, page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_clamps() {
        let p = Pagination { page: None, page_size: None };
        assert_eq!(p.clamped(), (1, 20));

        let p = Pagination { page: Some(0), page_size: Some(1000) };
        assert_eq!(p.clamped(), (1, 100));
    }
}
