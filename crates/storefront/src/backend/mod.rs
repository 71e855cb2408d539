//! Client for the hosted backend (REST data API + auth API).
//!
//! # Architecture
//!
//! - The backend is the source of truth for products, orders and profiles:
//!   there is no local database, every read is a direct API call
//! - Product lookups are cached in memory via `moka` (5 minute TTL by default)
//! - Bearer tokens are resolved to users through the auth API and cached for
//!   a minute
//! - User-scoped queries are sent with the caller's own access token so the
//!   backend's row-level security applies
//!
//! # Example
//!
//! ```rust,ignore
//! use redthread_storefront::backend::BackendClient;
//!
//! let client = BackendClient::new(&config.backend)?;
//! let product = client.product(product_id).await?;
//! ```

mod client;
pub mod types;

pub use client::BackendClient;
pub use types::*;

use std::future::Future;

use redthread_core::ProductId;
use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connection, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A URL could not be built from the configured base URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Requested record does not exist (or is hidden by row-level security).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The bearer token was rejected.
    #[error("Unauthorized")]
    Unauthorized,

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success status.
    #[error("Backend returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        message: String,
    },
}

impl BackendError {
    /// Whether the failure means the record does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Source of product records for the cart.
///
/// Implemented by [`BackendClient`]; tests substitute an in-memory catalog.
pub trait ProductCatalog: Send + Sync {
    /// Look up a product by ID.
    ///
    /// Returns [`BackendError::NotFound`] if no such product exists.
    fn product(&self, id: ProductId) -> impl Future<Output = Result<Product, BackendError>> + Send;
}

/// Destination for placed orders.
pub trait OrderSink: Send + Sync {
    /// Insert an order on behalf of `user` and return the stored row.
    fn create_order(
        &self,
        user: &AuthUser,
        order: &NewOrder,
    ) -> impl Future<Output = Result<Order, BackendError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::NotFound("product 123".to_string());
        assert_eq!(err.to_string(), "Not found: product 123");
        assert!(err.is_not_found());

        let err = BackendError::Status {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Backend returned 500: boom");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_rate_limited_error() {
        let err = BackendError::RateLimited(30);
        assert_eq!(err.to_string(), "Rate limited, retry after 30 seconds");
    }
}
