//! Records exchanged with the hosted backend's REST API.
//!
//! Field names match the backend's column names. Columns that the backend
//! may return as `null` are defaulted so that one sloppy row does not fail a
//! whole listing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};

use redthread_core::{OrderId, OrderStatus, Price, ProductId, Quantity, Size, UserId};

/// Treat an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A product row from the `products` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Price,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
    /// Units on hand; `None` when the row does not track stock.
    #[serde(default)]
    pub stock: Option<i32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub featured: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Whether the product is sold in distinct sizes.
    #[must_use]
    pub fn has_sizes(&self) -> bool {
        !self.sizes.is_empty()
    }

    /// Whether the product can be added to a cart. Rows without a stock
    /// figure are sellable.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.stock.is_none_or(|units| units > 0)
    }

    /// The size a quick-add button should use: the first listed size, or
    /// "One Size" for products without variants.
    #[must_use]
    pub fn default_size(&self) -> Size {
        self.sizes
            .first()
            .map_or_else(Size::one_size, |label| Size::new(label))
    }
}

/// One line of an order's item snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub quantity: Quantity,
    pub size: Size,
}

/// Shipping details captured at checkout.
///
/// Stored as a JSON column with camelCase keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub first_name: String,
    pub last_name: String,
    pub email: redthread_core::Email,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

/// Payload for inserting a row into the `orders` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrder {
    pub user_id: UserId,
    pub total_amount: Decimal,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub status: OrderStatus,
}

/// Customer name and email embedded in admin order listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSummary {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// An order row from the `orders` table.
///
/// The shipping address is kept loosely typed: rows written by older clients
/// do not all carry a validated email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_amount: Decimal,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub shipping_address: serde_json::Value,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    /// Present only when the query embeds `profiles(name,email)`.
    #[serde(default, rename = "profiles", skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerSummary>,
}

/// A row from the `profiles` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_admin: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Payload for changing a user's admin flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct AdminFlag {
    pub is_admin: bool,
}

/// An authenticated caller, resolved from a bearer token by the auth API.
///
/// The access token is kept so that user-scoped queries run under the
/// caller's row-level security policies rather than the anonymous key.
#[derive(Clone)]
pub struct AuthUser {
    pub id: UserId,
    pub email: Option<String>,
    pub access_token: SecretString,
}

impl std::fmt::Debug for AuthUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Response body of the auth API's `GET /user`.
#[derive(Debug, Deserialize)]
pub(crate) struct AuthUserResponse {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_tolerates_null_columns() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": "0f8fad5b-d9cb-469f-a165-70867728950e",
            "name": "Logo Tee",
            "price": 20,
            "images": null,
            "sizes": null,
            "stock": null
        }))
        .unwrap();

        assert!(product.images.is_empty());
        assert!(!product.has_sizes());
        assert!(product.in_stock());
        assert!(!product.featured);
        assert!(product.default_size().is_one_size());
        assert_eq!(product.price, Price::from_cents(2000));
    }

    #[test]
    fn test_default_size_is_first_listed() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": "0f8fad5b-d9cb-469f-a165-70867728950e",
            "name": "Hoodie",
            "price": "45.00",
            "sizes": ["S", "M", "L"]
        }))
        .unwrap();

        assert_eq!(product.default_size().as_str(), "S");
    }

    #[test]
    fn test_zero_stock_is_not_sellable() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": "0f8fad5b-d9cb-469f-a165-70867728950e",
            "name": "Bomber Jacket",
            "price": "120.00",
            "stock": 0,
            "featured": true,
            "created_at": "2024-03-01T09:30:00Z"
        }))
        .unwrap();

        assert!(!product.in_stock());
        assert!(product.featured);
        assert!(product.created_at.is_some());
    }

    #[test]
    fn test_order_with_embedded_profile() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
            "user_id": "16fd2706-8baf-433b-82eb-8c7fada847da",
            "total_amount": 75.5,
            "items": [],
            "shipping_address": {"city": "Austin"},
            "status": "shipped",
            "created_at": "2024-05-01T12:00:00Z",
            "profiles": {"name": "Sam", "email": "sam@shop.com"}
        }))
        .unwrap();

        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.total_amount, Decimal::new(755, 1));
        assert_eq!(
            order.customer.unwrap().email.as_deref(),
            Some("sam@shop.com")
        );
    }

    #[test]
    fn test_auth_user_debug_redacts_token() {
        let user = AuthUser {
            id: UserId::parse("16fd2706-8baf-433b-82eb-8c7fada847da").unwrap(),
            email: None,
            access_token: SecretString::from("eyJhbGciOi.token"),
        };
        assert!(!format!("{user:?}").contains("eyJ"));
    }
}
