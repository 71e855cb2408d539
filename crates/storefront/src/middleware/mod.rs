//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, one hub per request)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with in-memory store)
//!
//! Authentication is not a layer: handlers opt in with the [`RequireUser`]
//! and [`RequireAdmin`] extractors.

pub mod auth;
pub mod request_id;
pub mod session;

pub use auth::{AuthRejection, RequireAdmin, RequireUser};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
