//! Order history summaries and the admin order filter.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use redthread_core::{OrderStatus, format_amount};

use crate::backend::Order;

/// Number of orders shown on the account dashboard.
pub const RECENT_ORDERS: usize = 5;

/// Account dashboard figures derived from a customer's orders.
#[derive(Debug, Clone, Serialize)]
pub struct OrderHistory {
    pub total_orders: usize,
    pub total_spent: Decimal,
    pub total_spent_display: String,
    pub pending_orders: usize,
    /// Newest first, at most [`RECENT_ORDERS`].
    pub recent: Vec<Order>,
}

impl OrderHistory {
    /// Summarize orders; the input need not be sorted.
    #[must_use]
    pub fn from_orders(mut orders: Vec<Order>) -> Self {
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total_spent: Decimal = orders.iter().map(|o| o.total_amount).sum();
        let pending_orders = orders
            .iter()
            .filter(|o| o.status == OrderStatus::Pending)
            .count();
        let total_orders = orders.len();
        orders.truncate(RECENT_ORDERS);

        Self {
            total_orders,
            total_spent,
            total_spent_display: format_amount(total_spent),
            pending_orders,
            recent: orders,
        }
    }
}

/// Filter for the admin order table, from `?status=&q=`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    /// Only orders in this status; `None` (or `all`) keeps every status.
    #[serde(default, deserialize_with = "status_or_all")]
    pub status: Option<OrderStatus>,
    /// Case-insensitive substring of order ID, customer name or email.
    #[serde(default, rename = "q")]
    pub search: Option<String>,
}

fn status_or_all<'de, D>(deserializer: D) -> Result<Option<OrderStatus>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

impl OrderFilter {
    /// Whether an order passes the filter.
    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        if self.status.is_some_and(|status| order.status != status) {
            return false;
        }

        let Some(term) = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        else {
            return true;
        };
        let term = term.to_lowercase();

        let customer = order.customer.as_ref();
        let haystacks = [
            Some(order.id.to_string()),
            customer.and_then(|c| c.name.clone()),
            customer.and_then(|c| c.email.clone()),
        ];
        haystacks
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&term))
    }

    /// Keep the matching orders, preserving order.
    #[must_use]
    pub fn apply(&self, orders: Vec<Order>) -> Vec<Order> {
        orders.into_iter().filter(|o| self.matches(o)).collect()
    }
}
