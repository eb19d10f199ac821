//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{cart, copies, health, loans, reservations};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Biblio API",
        version = "1.0.0",
        description = "Library Circulation REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Copies
        copies::list_copies,
        copies::create_copy,
        copies::get_copy,
        copies::mark_lost,
        copies::delete_copy,
        copies::borrow_copy,
        // Loans
        loans::list_loans,
        loans::loan_stats,
        loans::get_loan,
        loans::confirm_pickup,
        loans::return_loan,
        loans::cancel_loan,
        loans::user_loans,
        // Reservations
        reservations::create_reservation,
        reservations::cancel_reservation,
        reservations::fulfill_reservation,
        reservations::user_reservations,
        reservations::book_queue,
        // Cart
        cart::get_cart,
        cart::add_item,
        cart::remove_item,
        cart::clear_cart,
        cart::checkout,
    ),
    components(
        schemas(
            health::HealthResponse,
            copies::BorrowRequest,
            reservations::CreateReservation,
            cart::CheckoutRequest,
            crate::error::ErrorResponse,
            crate::error::FailedBook,
            crate::models::book::BookSummary,
            crate::models::copy::Copy,
            crate::models::copy::CopyStatus,
            crate::models::copy::CreateCopy,
            crate::models::loan::Loan,
            crate::models::loan::LoanStatus,
            crate::models::loan::LoanDetails,
            crate::models::loan::LoanPage,
            crate::models::loan::BorrowStats,
            crate::models::reservation::Reservation,
            crate::models::reservation::ReservationStatus,
            crate::models::reservation::ReservationPage,
            crate::models::cart::Cart,
            crate::models::cart::CartItem,
            crate::models::cart::CartItemDetails,
            crate::models::cart::CartDetails,
            crate::models::cart::AddCartItem,
            crate::models::cart::CheckoutSummary,
        )
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "copies", description = "Copy inventory"),
        (name = "loans", description = "Loan lifecycle"),
        (name = "reservations", description = "Reservation queue"),
        (name = "cart", description = "Cart and checkout")
    )
)]
pub struct ApiDoc;

/// Swagger UI router serving the generated document
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
