//! Unified error handling with Sentry integration.
//!
//! Handlers return `Result<T, AppError>`. Server-side failures are captured
//! to Sentry before the response is built; clients get a JSON body of the
//! form `{"error": "..."}` without internal details.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::backend::BackendError;
use crate::cart::CartError;
use crate::checkout::CheckoutError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// A cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// A backend call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("Unauthorized")]
    Unauthorized,

    /// Caller is authenticated but not allowed.
    #[error("Forbidden")]
    Forbidden,

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn backend_status(err: &BackendError) -> StatusCode {
        match err {
            BackendError::NotFound(_) => StatusCode::NOT_FOUND,
            BackendError::Unauthorized => StatusCode::UNAUTHORIZED,
            BackendError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            BackendError::Http(_)
            | BackendError::Parse(_)
            | BackendError::Url(_)
            | BackendError::Status { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Cart(CartError::Lookup(e))
            | Self::Checkout(CheckoutError::Backend(e))
            | Self::Backend(e) => Self::backend_status(e),
            Self::Cart(CartError::LineNotFound { .. }) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Cart(CartError::OutOfStock { .. }) => StatusCode::CONFLICT,
            Self::Checkout(CheckoutError::EmptyCart | CheckoutError::Address(_))
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client.
    fn public_message(&self) -> String {
        match self {
            Self::Cart(CartError::Lookup(e)) if e.is_not_found() => "Product not found".to_string(),
            Self::Cart(CartError::Lookup(_)) => {
                "Could not add the product, please try again".to_string()
            }
            Self::Cart(CartError::OutOfStock { .. }) => "This product is out of stock".to_string(),
            Self::Cart(err @ CartError::LineNotFound { .. }) => err.to_string(),
            Self::Checkout(CheckoutError::Backend(_)) => {
                "Could not place the order, please try again".to_string()
            }
            Self::Checkout(err) => err.to_string(),
            Self::Backend(BackendError::NotFound(_)) => "Not found".to_string(),
            Self::Backend(BackendError::Unauthorized) | Self::Unauthorized => {
                "Unauthorized".to_string()
            }
            Self::Backend(BackendError::RateLimited(_)) => "Too many requests".to_string(),
            Self::Backend(_) => "External service error".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            Self::NotFound(_) | Self::Forbidden | Self::BadRequest(_) => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = Json(serde_json::json!({ "error": self.public_message() }));
        (status, body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the authenticated caller.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use redthread_core::{ProductId, Size};

    use super::*;
    use crate::checkout::AddressError;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order-123".to_string());
        assert_eq!(err.to_string(), "Not found: order-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(CartError::Lookup(BackendError::NotFound("p".into())).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(
                CartError::Lookup(BackendError::Status {
                    status: 503,
                    message: String::new()
                })
                .into()
            ),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(
                CartError::LineNotFound {
                    product_id: ProductId::generate(),
                    size: Size::one_size()
                }
                .into()
            ),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(
                CartError::OutOfStock {
                    product_id: ProductId::generate()
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(CheckoutError::EmptyCart.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CheckoutError::Address(AddressError::MissingField("city")).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(get_status(AppError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(get_status(AppError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(BackendError::RateLimited(3).into()),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::Backend(BackendError::Status {
            status: 500,
            message: "relation \"orders\" does not exist".to_string(),
        });
        assert_eq!(err.public_message(), "External service error");

        let err = AppError::Checkout(CheckoutError::Address(AddressError::MissingField("city")));
        assert_eq!(
            err.public_message(),
            "Invalid shipping address: city is required"
        );
    }
}
