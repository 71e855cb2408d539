//! Admin console summaries: dashboard figures and the user table filter.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use redthread_core::format_amount;

use crate::backend::{Order, Profile};
use crate::orders::RECENT_ORDERS;

/// Figures for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_products: u64,
    pub total_users: u64,
    pub total_orders: usize,
    pub total_revenue: Decimal,
    pub total_revenue_display: String,
    /// Newest first, at most [`RECENT_ORDERS`].
    pub recent_orders: Vec<Order>,
}

impl DashboardStats {
    /// Combine table counts with the full order list.
    #[must_use]
    pub fn new(total_products: u64, total_users: u64, mut orders: Vec<Order>) -> Self {
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total_revenue: Decimal = orders.iter().map(|o| o.total_amount).sum();
        let total_orders = orders.len();
        orders.truncate(RECENT_ORDERS);

        Self {
            total_products,
            total_users,
            total_orders,
            total_revenue,
            total_revenue_display: format_amount(total_revenue),
            recent_orders: orders,
        }
    }
}

/// Filter for the admin user table, from `?q=`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    /// Case-insensitive substring of the name or email.
    #[serde(default, rename = "q")]
    pub search: Option<String>,
}

impl UserFilter {
    /// Whether a profile passes the filter.
    #[must_use]
    pub fn matches(&self, profile: &Profile) -> bool {
        let Some(term) = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        else {
            return true;
        };
        let term = term.to_lowercase();

        [profile.name.as_deref(), profile.email.as_deref()]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&term))
    }

    /// Keep the matching profiles, preserving order.
    #[must_use]
    pub fn apply(&self, profiles: Vec<Profile>) -> Vec<Profile> {
        profiles.into_iter().filter(|p| self.matches(p)).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use redthread_core::{OrderId, OrderStatus, UserId};

    use super::*;

    fn order(day: u32, amount: &str) -> Order {
        Order {
            id: OrderId::generate(),
            user_id: UserId::generate(),
            total_amount: amount.parse().unwrap(),
            items: vec![],
            shipping_address: serde_json::Value::Null,
            status: OrderStatus::Processing,
            created_at: Utc.with_ymd_and_hms(2024, 6, day, 8, 0, 0).unwrap(),
            customer: None,
        }
    }

    fn profile(name: Option<&str>, email: Option<&str>) -> Profile {
        Profile {
            id: UserId::generate(),
            name: name.map(String::from),
            email: email.map(String::from),
            is_admin: false,
            created_at: None,
        }
    }

    #[test]
    fn test_dashboard_revenue_is_exact() {
        let orders = (1..=8).map(|day| order(day, "0.10")).collect();
        let stats = DashboardStats::new(42, 7, orders);

        assert_eq!(stats.total_products, 42);
        assert_eq!(stats.total_users, 7);
        assert_eq!(stats.total_orders, 8);
        assert_eq!(stats.total_revenue, Decimal::new(80, 2));
        assert_eq!(stats.total_revenue_display, "0.80");
        assert_eq!(stats.recent_orders.len(), RECENT_ORDERS);
        assert_eq!(stats.recent_orders[0].created_at.format("%d").to_string(), "08");
    }

    #[test]
    fn test_empty_dashboard() {
        let stats = DashboardStats::new(0, 0, vec![]);
        assert_eq!(stats.total_revenue_display, "0.00");
        assert!(stats.recent_orders.is_empty());
    }

    #[test]
    fn test_user_filter() {
        let profiles = vec![
            profile(Some("Sam Rivera"), Some("sam@shop.com")),
            profile(None, Some("alex@mail.test")),
            profile(Some("Jo"), None),
        ];

        let filter = UserFilter {
            search: Some("SHOP".to_string()),
        };
        assert_eq!(filter.apply(profiles.clone()).len(), 1);

        let filter = UserFilter {
            search: Some("alex".to_string()),
        };
        assert_eq!(filter.apply(profiles.clone()).len(), 1);

        assert_eq!(UserFilter::default().apply(profiles).len(), 3);
    }
}
