//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness check
//! GET  /health/ready               - Readiness check (backend reachable)
//!
//! # Products
//! GET  /products?category=&sort=&q= - Product listing
//! GET  /products/featured          - Home page selection
//! GET  /products/{id}              - Single product
//!
//! # Cart (JSON, mutations send HX-Trigger: cart-updated)
//! GET  /cart                       - Cart lines, total and count
//! GET  /cart/count                 - Header badge count
//! POST /cart/add                   - {product_id, size?, quantity?}
//! POST /cart/update                - {product_id, size, quantity}
//! POST /cart/remove                - {product_id, size}
//! POST /cart/clear                 - Empty the cart
//!
//! # Checkout (requires user)
//! POST /checkout                   - Place an order from the cart
//!
//! # Account (requires user)
//! GET  /account/orders             - Order history summary
//!
//! # Admin (requires admin)
//! GET  /admin/dashboard            - Counts, revenue and recent orders
//! GET  /admin/orders?status=&q=    - Filtered order table
//! POST /admin/orders/{id}/status   - {status}
//! GET  /admin/users?q=             - Filtered user table
//! POST /admin/users/{id}/admin     - {is_admin}
//! ```

pub mod account;
pub mod admin;
pub mod cart;
pub mod checkout;
pub mod products;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/featured", get(products::featured))
        .route("/{id}", get(products::show))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new().route("/orders", get(account::orders))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/orders", get(admin::orders))
        .route("/orders/{id}/status", post(admin::update_status))
        .route("/users", get(admin::users))
        .route("/users/{id}/admin", post(admin::set_admin))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", post(checkout::place))
        .nest("/account", account_routes())
        .nest("/admin", admin_routes())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the backend is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.backend().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Backend not ready");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
