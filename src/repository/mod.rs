//! Repository layer for database operations
//!
//! Methods that participate in a multi-step operation take the caller's
//! `Transaction` so copy, loan and reservation state is always committed (or
//! rolled back) as one unit. Pure reads run on the pool.

pub mod books;
pub mod carts;
pub mod copies;
pub mod loans;
pub mod reservations;

use sqlx::{Pool, Postgres};

/// Transaction handle threaded through multi-step circulation operations.
pub type Tx = sqlx::Transaction<'static, Postgres>;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub copies: copies::CopiesRepository,
    pub loans: loans::LoansRepository,
    pub reservations: reservations::ReservationsRepository,
    pub carts: carts::CartsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            copies: copies::CopiesRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            reservations: reservations::ReservationsRepository::new(pool.clone()),
            carts: carts::CartsRepository::new(pool.clone()),
            pool,
        }
    }
}
