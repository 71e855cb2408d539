//! Admin console handlers: dashboard, orders and users.
//!
//! These routes require a user whose profile is marked admin.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use redthread_core::{OrderId, OrderStatus, UserId};

use crate::admin::{DashboardStats, UserFilter};
use crate::backend::{Order, Profile};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::orders::OrderFilter;
use crate::state::AppState;

/// Dashboard figures.
///
/// The three backend calls run concurrently. A failed count shows as zero.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<DashboardStats>> {
    let backend = state.backend();
    let (products, users, orders) = tokio::join!(
        backend.count_rows(&admin, "products"),
        backend.count_rows(&admin, "profiles"),
        backend.list_orders(&admin),
    );

    let products = products.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to count products");
        0
    });
    let users = users.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to count users");
        0
    });

    Ok(Json(DashboardStats::new(products, users, orders?)))
}

/// The filtered order table.
#[derive(Debug, Serialize)]
pub struct OrderTable {
    /// Orders before filtering.
    pub total: usize,
    pub orders: Vec<Order>,
}

/// Status change request body.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// List orders, newest first, filtered by `?status=` and `?q=`.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<OrderTable>> {
    let orders = state.backend().list_orders(&admin).await?;
    let total = orders.len();

    Ok(Json(OrderTable {
        total,
        orders: filter.apply(orders),
    }))
}

/// Move an order to another status.
#[instrument(skip_all, fields(admin_id = %admin.id, order_id = %order_id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(order_id): Path<OrderId>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Order>> {
    let status: OrderStatus = update
        .status
        .parse()
        .map_err(|e| AppError::BadRequest(format!("{e}")))?;

    let order = state
        .backend()
        .update_order_status(&admin, order_id, status)
        .await?;
    tracing::info!(status = %status, "Order status updated");

    Ok(Json(order))
}

/// The filtered user table.
#[derive(Debug, Serialize)]
pub struct UserTable {
    /// Users before filtering.
    pub total: usize,
    pub users: Vec<Profile>,
}

/// Admin flag change request body.
#[derive(Debug, Deserialize)]
pub struct AdminUpdate {
    pub is_admin: bool,
}

/// List users, newest first, filtered by `?q=`.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn users(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(filter): Query<UserFilter>,
) -> Result<Json<UserTable>> {
    let profiles = state.backend().list_profiles(&admin).await?;
    let total = profiles.len();

    Ok(Json(UserTable {
        total,
        users: filter.apply(profiles),
    }))
}

/// Grant or revoke admin access.
#[instrument(skip_all, fields(admin_id = %admin.id, user_id = %user_id))]
pub async fn set_admin(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(user_id): Path<UserId>,
    Json(update): Json<AdminUpdate>,
) -> Result<Json<Profile>> {
    let profile = state
        .backend()
        .set_admin(&admin, user_id, update.is_admin)
        .await?;
    tracing::info!(is_admin = update.is_admin, "Admin access changed");

    Ok(Json(profile))
}
