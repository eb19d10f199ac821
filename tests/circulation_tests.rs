//! Circulation core integration tests
//!
//! These drive the services and repositories directly against a migrated
//! Postgres database. Run with:
//!   DATABASE_URL=postgres://... cargo test -- --ignored

use chrono::{Duration, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use biblio_server::config::CirculationConfig;
use biblio_server::error::AppError;
use biblio_server::models::{CopyStatus, LoanStatus, ReservationStatus};
use biblio_server::repository::Repository;
use biblio_server::services::{sweeper::ExpirySweeper, Services};

async fn connect() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to database")
}

fn services(pool: &PgPool) -> Services {
    Services::new(Repository::new(pool.clone()), CirculationConfig::default())
}

async fn seed_user(pool: &PgPool) -> Uuid {
    sqlx::query_scalar("INSERT INTO users (full_name, email) VALUES ($1, $2) RETURNING id")
        .bind("Test User")
        .bind(format!("{}@example.org", Uuid::new_v4()))
        .fetch_one(pool)
        .await
        .expect("Failed to seed user")
}

async fn seed_book(pool: &PgPool, title: &str) -> Uuid {
    sqlx::query_scalar("INSERT INTO books (title) VALUES ($1) RETURNING id")
        .bind(title)
        .fetch_one(pool)
        .await
        .expect("Failed to seed book")
}

async fn seed_copy(pool: &PgPool, book_id: Uuid) -> Uuid {
    sqlx::query_scalar("INSERT INTO copies (book_id, barcode) VALUES ($1, $2) RETURNING id")
        .bind(book_id)
        .bind(Uuid::new_v4().to_string())
        .fetch_one(pool)
        .await
        .expect("Failed to seed copy")
}

async fn copy_status(pool: &PgPool, copy_id: Uuid) -> CopyStatus {
    sqlx::query_scalar("SELECT status FROM copies WHERE id = $1")
        .bind(copy_id)
        .fetch_one(pool)
        .await
        .expect("Failed to read copy status")
}

async fn loan_status(pool: &PgPool, loan_id: Uuid) -> LoanStatus {
    sqlx::query_scalar("SELECT status FROM loans WHERE id = $1")
        .bind(loan_id)
        .fetch_one(pool)
        .await
        .expect("Failed to read loan status")
}

async fn reservation_status(pool: &PgPool, reservation_id: Uuid) -> ReservationStatus {
    sqlx::query_scalar("SELECT status FROM reservations WHERE id = $1")
        .bind(reservation_id)
        .fetch_one(pool)
        .await
        .expect("Failed to read reservation status")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn walk_in_borrow_and_return() {
    let pool = connect().await;
    let svc = services(&pool);

    let user = seed_user(&pool).await;
    let book = seed_book(&pool, "Walk-in").await;
    let copy = seed_copy(&pool, book).await;

    let loan = svc.circulation.borrow_copy(copy, user, None).await.expect("borrow");
    assert_eq!(loan.status, LoanStatus::Active);
    assert_eq!(copy_status(&pool, copy).await, CopyStatus::Borrowed);

    // Second borrow of the same copy must be refused
    let other = seed_user(&pool).await;
    let err = svc.circulation.borrow_copy(copy, other, None).await.unwrap_err();
    assert!(matches!(err, AppError::NoAvailableCopy(_)));

    let returned = svc.circulation.return_loan(loan.id).await.expect("return");
    assert_eq!(returned.status, LoanStatus::Returned);
    assert!(returned.returned_at.is_some());
    assert_eq!(copy_status(&pool, copy).await, CopyStatus::Available);

    // Returning twice is an invalid state, not a crash
    let err = svc.circulation.return_loan(loan.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
#[ignore]
async fn return_fulfills_oldest_waiting_reservation() {
    let pool = connect().await;
    let svc = services(&pool);

    let u1 = seed_user(&pool).await;
    let u2 = seed_user(&pool).await;
    let book = seed_book(&pool, "Contended").await;
    let copy = seed_copy(&pool, book).await;

    let loan = svc.circulation.borrow_copy(copy, u1, None).await.expect("borrow");

    // Zero copies available now, so u2 may queue
    let reservation = svc.reservations.reserve(u2, book).await.expect("reserve");
    assert_eq!(reservation.status, ReservationStatus::Pending);

    svc.circulation.return_loan(loan.id).await.expect("return");

    assert_eq!(copy_status(&pool, copy).await, CopyStatus::Available);
    assert_eq!(
        reservation_status(&pool, reservation.id).await,
        ReservationStatus::Fulfilled
    );
}

#[tokio::test]
#[ignore]
async fn expired_reservation_is_skipped_on_return() {
    let pool = connect().await;
    let svc = services(&pool);

    let u1 = seed_user(&pool).await;
    let u2 = seed_user(&pool).await;
    let book = seed_book(&pool, "Expired hold").await;
    let copy = seed_copy(&pool, book).await;

    let loan = svc.circulation.borrow_copy(copy, u1, None).await.expect("borrow");
    let reservation = svc.reservations.reserve(u2, book).await.expect("reserve");

    // Force the 48h window shut before the copy comes back
    sqlx::query("UPDATE reservations SET expires_at = $1 WHERE id = $2")
        .bind(Utc::now() - Duration::hours(1))
        .bind(reservation.id)
        .execute(&pool)
        .await
        .expect("backdate");

    svc.circulation.return_loan(loan.id).await.expect("return");

    assert_eq!(
        reservation_status(&pool, reservation.id).await,
        ReservationStatus::Expired
    );
    // No live waiter, so the copy just sits available
    assert_eq!(copy_status(&pool, copy).await, CopyStatus::Available);
}

#[tokio::test]
#[ignore]
async fn reservations_are_fulfilled_in_arrival_order() {
    let pool = connect().await;
    let svc = services(&pool);

    let holder = seed_user(&pool).await;
    let first = seed_user(&pool).await;
    let second = seed_user(&pool).await;
    let book = seed_book(&pool, "Queue").await;
    let copy = seed_copy(&pool, book).await;

    let loan = svc.circulation.borrow_copy(copy, holder, None).await.expect("borrow");

    let r1 = svc.reservations.reserve(first, book).await.expect("reserve 1");
    let r2 = svc.reservations.reserve(second, book).await.expect("reserve 2");

    svc.circulation.return_loan(loan.id).await.expect("return 1");
    assert_eq!(reservation_status(&pool, r1.id).await, ReservationStatus::Fulfilled);
    assert_eq!(reservation_status(&pool, r2.id).await, ReservationStatus::Pending);

    // Next return cycle serves the next in line
    let loan = svc.circulation.borrow_copy(copy, holder, None).await.expect("borrow again");
    svc.circulation.return_loan(loan.id).await.expect("return 2");
    assert_eq!(reservation_status(&pool, r2.id).await, ReservationStatus::Fulfilled);
}

#[tokio::test]
#[ignore]
async fn reservation_rules_are_enforced() {
    let pool = connect().await;
    let svc = services(&pool);

    let u1 = seed_user(&pool).await;
    let u2 = seed_user(&pool).await;
    let book = seed_book(&pool, "Rules").await;
    let copy = seed_copy(&pool, book).await;

    // A copy is on the shelf: reserving is rejected
    let err = svc.reservations.reserve(u1, book).await.unwrap_err();
    assert!(matches!(err, AppError::CopyAvailable(_)));

    let loan = svc.circulation.borrow_copy(copy, u1, None).await.expect("borrow");

    let reservation = svc.reservations.reserve(u2, book).await.expect("reserve");
    let err = svc.reservations.reserve(u2, book).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateReservation(_)));

    // Only the owner may cancel
    let err = svc.reservations.cancel(reservation.id, u1).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    svc.reservations.cancel(reservation.id, u2).await.expect("cancel own");
    assert_eq!(
        reservation_status(&pool, reservation.id).await,
        ReservationStatus::Cancelled
    );

    svc.circulation.return_loan(loan.id).await.expect("return");
}

#[tokio::test]
#[ignore]
async fn checkout_rolls_back_when_any_book_is_unavailable() {
    let pool = connect().await;
    let svc = services(&pool);

    let user = seed_user(&pool).await;
    let rival = seed_user(&pool).await;
    let book_x = seed_book(&pool, "Book X").await;
    let book_y = seed_book(&pool, "Book Y").await;
    let copy_x = seed_copy(&pool, book_x).await;
    let copy_y = seed_copy(&pool, book_y).await;

    svc.checkout.add_item(user, book_x).await.expect("add x");
    svc.checkout.add_item(user, book_y).await.expect("add y");

    // The last copy of Y disappears between add and checkout
    svc.circulation.borrow_copy(copy_y, rival, None).await.expect("rival borrow");

    let err = svc.checkout.checkout(user, None).await.unwrap_err();
    match err {
        AppError::CheckoutFailed(failed) => {
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].book_id, book_y);
            assert_eq!(failed[0].book_title, "Book Y");
        }
        other => panic!("expected CheckoutFailed, got {:?}", other.to_string()),
    }

    // Nothing was partially borrowed: X's copy is still on the shelf and the
    // user has no loans
    assert_eq!(copy_status(&pool, copy_x).await, CopyStatus::Available);
    let open: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM loans WHERE user_id = $1 AND status IN ('PENDING', 'ACTIVE')",
    )
    .bind(user)
    .fetch_one(&pool)
    .await
    .expect("count");
    assert_eq!(open, 0);

    // The cart survives the failed attempt
    let cart = svc.checkout.get_cart(user).await.expect("cart");
    assert_eq!(cart.items.len(), 2);
}

#[tokio::test]
#[ignore]
async fn successful_checkout_creates_pending_loans_and_empties_cart() {
    let pool = connect().await;
    let svc = services(&pool);

    let user = seed_user(&pool).await;
    let book_a = seed_book(&pool, "Book A").await;
    let book_b = seed_book(&pool, "Book B").await;
    let copy_a = seed_copy(&pool, book_a).await;
    let copy_b = seed_copy(&pool, book_b).await;

    svc.checkout.add_item(user, book_a).await.expect("add a");
    svc.checkout.add_item(user, book_b).await.expect("add b");

    let summary = svc.checkout.checkout(user, None).await.expect("checkout");
    assert_eq!(summary.loans.len(), 2);
    for loan in &summary.loans {
        assert_eq!(loan.status, LoanStatus::Pending);
        assert!(!loan.is_overdue);
    }

    assert_eq!(copy_status(&pool, copy_a).await, CopyStatus::Borrowed);
    assert_eq!(copy_status(&pool, copy_b).await, CopyStatus::Borrowed);

    // A double-submit lands on an empty cart
    let err = svc.checkout.checkout(user, None).await.unwrap_err();
    assert!(matches!(err, AppError::EmptyCart));

    // Pickup flows PENDING -> ACTIVE exactly once
    let picked = svc.circulation.confirm_pickup(summary.loans[0].id).await.expect("pickup");
    assert_eq!(picked.status, LoanStatus::Active);
    let err = svc.circulation.confirm_pickup(summary.loans[0].id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
#[ignore]
async fn release_of_an_available_copy_is_a_noop() {
    let pool = connect().await;
    let repository = Repository::new(pool.clone());

    let book = seed_book(&pool, "Idempotent").await;
    let copy = seed_copy(&pool, book).await;

    let mut tx = pool.begin().await.expect("begin");
    repository
        .copies
        .release(&mut tx, copy, Utc::now())
        .await
        .expect("release must not error");
    tx.commit().await.expect("commit");

    assert_eq!(copy_status(&pool, copy).await, CopyStatus::Available);
}

#[tokio::test]
#[ignore]
async fn concurrent_acquires_of_the_last_copy_yield_one_winner() {
    let pool = connect().await;
    let repository = Repository::new(pool.clone());

    let book = seed_book(&pool, "Race").await;
    seed_copy(&pool, book).await;

    let acquire = |repository: Repository, pool: PgPool| async move {
        let mut tx = pool.begin().await.expect("begin");
        let result = repository.copies.acquire_available(&mut tx, book, Utc::now()).await;
        match &result {
            Ok(_) => tx.commit().await.expect("commit"),
            Err(_) => tx.rollback().await.expect("rollback"),
        }
        result
    };

    let (a, b) = tokio::join!(
        acquire(repository.clone(), pool.clone()),
        acquire(repository.clone(), pool.clone())
    );

    let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one acquirer must win the last copy");
    for r in [a, b] {
        if let Err(e) = r {
            assert!(matches!(e, AppError::NoAvailableCopy(_)));
        }
    }
}

#[tokio::test]
#[ignore]
async fn sweeper_cancels_stale_pending_loans_only() {
    let pool = connect().await;
    let svc = services(&pool);
    let repository = Repository::new(pool.clone());

    let user = seed_user(&pool).await;
    let book = seed_book(&pool, "Stale").await;
    let fresh_book = seed_book(&pool, "Fresh").await;
    let stale_copy = seed_copy(&pool, book).await;
    let fresh_copy = seed_copy(&pool, fresh_book).await;

    svc.checkout.add_item(user, book).await.expect("add");
    let stale = svc.checkout.checkout(user, None).await.expect("checkout").loans[0].id;
    svc.checkout.add_item(user, fresh_book).await.expect("add");
    let fresh = svc.checkout.checkout(user, None).await.expect("checkout").loans[0].id;

    // Age the first pickup past the 48h threshold
    sqlx::query("UPDATE loans SET created_at = $1 WHERE id = $2")
        .bind(Utc::now() - Duration::hours(50))
        .bind(stale)
        .execute(&pool)
        .await
        .expect("backdate");
    sqlx::query("UPDATE loans SET created_at = $1 WHERE id = $2")
        .bind(Utc::now() - Duration::hours(10))
        .bind(fresh)
        .execute(&pool)
        .await
        .expect("backdate");

    let sweeper = ExpirySweeper::new(repository, CirculationConfig::default());
    let swept = sweeper.sweep_expired_pickups().await.expect("sweep");
    assert!(swept >= 1);

    assert_eq!(loan_status(&pool, stale).await, LoanStatus::Cancelled);
    assert_eq!(copy_status(&pool, stale_copy).await, CopyStatus::Available);

    assert_eq!(loan_status(&pool, fresh).await, LoanStatus::Pending);
    assert_eq!(copy_status(&pool, fresh_copy).await, CopyStatus::Borrowed);
}

#[tokio::test]
#[ignore]
async fn borrowed_copy_cannot_be_deleted_or_marked_lost() {
    let pool = connect().await;
    let svc = services(&pool);

    let user = seed_user(&pool).await;
    let book = seed_book(&pool, "Held").await;
    let copy = seed_copy(&pool, book).await;

    let loan = svc.circulation.borrow_copy(copy, user, None).await.expect("borrow");

    let err = svc.inventory.delete_copy(copy).await.unwrap_err();
    assert!(matches!(err, AppError::CopyInUse(_)));
    let err = svc.inventory.mark_lost(copy).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    svc.circulation.return_loan(loan.id).await.expect("return");
    svc.inventory.delete_copy(copy).await.expect("delete after return");
}
