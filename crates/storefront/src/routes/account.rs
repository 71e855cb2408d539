//! Account route handlers.
//!
//! These routes require an authenticated user.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::orders::OrderHistory;
use crate::state::AppState;

/// Order history summary for the account dashboard.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<OrderHistory>> {
    let orders = state.backend().orders_for_user(&user).await?;
    Ok(Json(OrderHistory::from_orders(orders)))
}
