//! Data models for Biblio

pub mod book;
pub mod cart;
pub mod copy;
pub mod loan;
pub mod reservation;

// Re-export commonly used types
pub use book::BookSummary;
pub use cart::{Cart, CartDetails, CartItem, CheckoutSummary};
pub use copy::{Copy, CopyStatus};
pub use loan::{Loan, LoanDetails, LoanStatus};
pub use reservation::{Reservation, ReservationStatus};
