//! Authentication extractors.
//!
//! Callers authenticate with the backend's access token in an
//! `Authorization: Bearer <token>` header. The token is resolved through the
//! backend auth API on each request (with a short cache in the client).

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};

use crate::backend::{AuthUser, BackendError};
use crate::error::set_sentry_user;
use crate::state::AppState;

/// Extractor that requires an authenticated user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.id)
/// }
/// ```
pub struct RequireUser(pub AuthUser);

/// Extractor that requires an authenticated user whose profile is marked admin.
pub struct RequireAdmin(pub AuthUser);

/// Error returned when authentication or authorization fails.
#[derive(Debug)]
pub enum AuthRejection {
    /// No usable bearer token.
    Unauthorized,
    /// Authenticated, but not an admin.
    Forbidden,
    /// The auth API could not be reached.
    Unavailable,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Forbidden"),
            Self::Unavailable => (StatusCode::BAD_GATEWAY, "External service error"),
        };
        (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<BackendError> for AuthRejection {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unauthorized | BackendError::NotFound(_) => Self::Unauthorized,
            other => {
                tracing::error!(error = %other, "Failed to resolve access token");
                Self::Unavailable
            }
        }
    }
}

/// Pull the token out of an `Authorization: Bearer` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthRejection::Unauthorized)?;
        let user = state.backend().user_from_token(token).await?;

        set_sentry_user(&user.id, user.email.as_deref());
        tracing::Span::current().record("user_id", tracing::field::display(&user.id));

        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;

        let profile = match state.backend().profile(&user).await {
            Ok(profile) => profile,
            Err(BackendError::NotFound(_)) => return Err(AuthRejection::Forbidden),
            Err(e) => return Err(e.into()),
        };

        if !profile.is_admin {
            tracing::warn!(user_id = %user.id, "Non-admin attempted admin access");
            return Err(AuthRejection::Forbidden);
        }

        Ok(Self(user))
    }
}
