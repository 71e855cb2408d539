//! Checkout route handler.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{AppendHeaders, IntoResponse},
};
use tower_sessions::Session;
use tracing::instrument;

use super::cart::{CART_UPDATED_TRIGGER, open_cart};
use crate::checkout::{ShippingForm, place_order};
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::state::AppState;

/// Place an order for the visitor's cart.
///
/// Answers `201 Created` with the stored order; the cart is emptied.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn place(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    session: Session,
    Json(shipping): Json<ShippingForm>,
) -> Result<impl IntoResponse> {
    let mut store = open_cart(&state, session).await;
    let order = place_order(&mut store, state.backend(), &user, shipping).await?;

    Ok((
        StatusCode::CREATED,
        AppendHeaders([CART_UPDATED_TRIGGER]),
        Json(order),
    ))
}
