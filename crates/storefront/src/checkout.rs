//! Order placement from the current cart.

use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use redthread_core::{Email, EmailError, OrderStatus};

use crate::backend::{
    AuthUser, BackendError, NewOrder, Order, OrderSink, ProductCatalog, ShippingAddress,
};
use crate::cart::{CartLine, CartStorage, CartStore};

/// Country used when the form leaves it blank.
pub const DEFAULT_COUNTRY: &str = "United States";

/// Errors validating a shipping form.
#[derive(Debug, Error)]
pub enum AddressError {
    /// A required field is missing or blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The contact email is not usable.
    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),
}

/// Errors placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// There is nothing to order.
    #[error("Cart is empty")]
    EmptyCart,

    /// The shipping details are incomplete.
    #[error("Invalid shipping address: {0}")]
    Address(#[from] AddressError),

    /// The backend rejected the order; the cart was kept.
    #[error("Order submission failed: {0}")]
    Backend(#[from] BackendError),
}

/// Shipping details as submitted by the checkout page.
///
/// Accepts both snake_case and camelCase keys.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShippingForm {
    #[serde(default, alias = "firstName")]
    pub first_name: String,
    #[serde(default, alias = "lastName")]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, alias = "zipCode")]
    pub zip_code: String,
    #[serde(default)]
    pub country: Option<String>,
}

impl ShippingForm {
    /// Validate into a [`ShippingAddress`].
    ///
    /// A blank email falls back to `account_email`; a blank country becomes
    /// [`DEFAULT_COUNTRY`].
    ///
    /// # Errors
    ///
    /// Returns the first missing field, or an email error.
    pub fn validate(self, account_email: Option<&str>) -> Result<ShippingAddress, AddressError> {
        let email = self
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .or(account_email)
            .ok_or(AddressError::MissingField("email"))?;

        let country = self
            .country
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_COUNTRY)
            .to_owned();

        Ok(ShippingAddress {
            first_name: required("first_name", &self.first_name)?,
            last_name: required("last_name", &self.last_name)?,
            email: Email::parse(email)?,
            address: required("address", &self.address)?,
            city: required("city", &self.city)?,
            state: required("state", &self.state)?,
            zip_code: required("zip_code", &self.zip_code)?,
            country,
        })
    }
}

fn required(field: &'static str, value: &str) -> Result<String, AddressError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AddressError::MissingField(field));
    }
    Ok(value.to_owned())
}

/// Submit the cart as a pending order and empty it on success.
///
/// # Errors
///
/// - [`CheckoutError::EmptyCart`] if the cart has no lines
/// - [`CheckoutError::Address`] if the shipping form is incomplete
/// - [`CheckoutError::Backend`] if the order could not be stored
///
/// The cart is unchanged on every error.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn place_order<S, C, O>(
    store: &mut CartStore<S, C>,
    orders: &O,
    user: &AuthUser,
    shipping: ShippingForm,
) -> Result<Order, CheckoutError>
where
    S: CartStorage,
    C: ProductCatalog,
    O: OrderSink,
{
    if store.cart().is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let shipping_address = shipping.validate(user.email.as_deref())?;

    let new_order = NewOrder {
        user_id: user.id,
        total_amount: store.cart_total(),
        items: store
            .cart()
            .lines()
            .iter()
            .map(CartLine::to_order_item)
            .collect(),
        shipping_address,
        status: OrderStatus::Pending,
    };

    let order = orders.create_order(user, &new_order).await?;
    tracing::info!(order_id = %order.id, total = %new_order.total_amount, "Order placed");

    store.clear_cart().await;
    Ok(order)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;
    use rust_decimal::Decimal;
    use secrecy::SecretString;

    use redthread_core::{OrderId, ProductId, Quantity, Size, UserId};

    use super::*;
    use crate::backend::Product;
    use crate::cart::MemoryCartStorage;
    use crate::cart::tests::line;

    struct NoCatalog;

    impl ProductCatalog for NoCatalog {
        async fn product(&self, id: ProductId) -> Result<Product, BackendError> {
            Err(BackendError::NotFound(id.to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        fail: bool,
        received: Mutex<Vec<NewOrder>>,
    }

    impl OrderSink for RecordingSink {
        async fn create_order(&self, user: &AuthUser, order: &NewOrder) -> Result<Order, BackendError> {
            if self.fail {
                return Err(BackendError::Status {
                    status: 500,
                    message: "insert failed".to_string(),
                });
            }
            self.received.lock().unwrap().push(order.clone());
            Ok(Order {
                id: OrderId::generate(),
                user_id: user.id,
                total_amount: order.total_amount,
                items: order.items.clone(),
                shipping_address: serde_json::to_value(&order.shipping_address).unwrap(),
                status: order.status,
                created_at: Utc::now(),
                customer: None,
            })
        }
    }

    fn user() -> AuthUser {
        AuthUser {
            id: UserId::generate(),
            email: Some("sam@shop.com".to_string()),
            access_token: SecretString::from("token"),
        }
    }

    fn form() -> ShippingForm {
        ShippingForm {
            first_name: "Sam".to_string(),
            last_name: "Rivera".to_string(),
            email: None,
            address: "1 Main St".to_string(),
            city: "Austin".to_string(),
            state: "TX".to_string(),
            zip_code: "78701".to_string(),
            country: None,
        }
    }

    async fn filled_store() -> (CartStore<MemoryCartStorage, NoCatalog>, MemoryCartStorage) {
        let storage = MemoryCartStorage::with_value(
            serde_json::to_value([line(1, "M", 2, 2000), line(2, "", 1, 1500)]).unwrap(),
        );
        (CartStore::load(storage.clone(), NoCatalog).await, storage)
    }

    #[test]
    fn test_validate_fills_defaults() {
        let address = form().validate(Some("sam@shop.com")).unwrap();
        assert_eq!(address.email.as_str(), "sam@shop.com");
        assert_eq!(address.country, DEFAULT_COUNTRY);
    }

    #[test]
    fn test_validate_reports_blank_field() {
        let mut form = form();
        form.city = "   ".to_string();
        assert!(matches!(
            form.validate(Some("sam@shop.com")),
            Err(AddressError::MissingField("city"))
        ));
    }

    #[test]
    fn test_validate_requires_some_email() {
        assert!(matches!(
            form().validate(None),
            Err(AddressError::MissingField("email"))
        ));

        let mut form = form();
        form.email = Some("not-an-email".to_string());
        assert!(matches!(form.validate(None), Err(AddressError::Email(_))));
    }

    #[test]
    fn test_form_accepts_camel_case() {
        let form: ShippingForm = serde_json::from_value(serde_json::json!({
            "firstName": "Sam",
            "lastName": "Rivera",
            "zipCode": "78701"
        }))
        .unwrap();
        assert_eq!(form.zip_code, "78701");
        assert_eq!(form.last_name, "Rivera");
    }

    #[tokio::test]
    async fn test_place_order_submits_snapshot_and_clears() {
        let (mut store, storage) = filled_store().await;
        let sink = RecordingSink::default();

        let order = place_order(&mut store, &sink, &user(), form()).await.unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, Decimal::new(5500, 2));

        let received = sink.received.lock().unwrap();
        assert_eq!(received[0].items.len(), 2);
        assert_eq!(received[0].items[0].quantity, Quantity::new(2));
        assert_eq!(received[0].items[1].size, Size::one_size());
        drop(received);

        assert!(store.cart().is_empty());
        assert_eq!(storage.snapshot().await, Some(serde_json::json!([])));
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let mut store = CartStore::load(MemoryCartStorage::new(), NoCatalog).await;
        let sink = RecordingSink::default();

        let err = place_order(&mut store, &sink, &user(), form()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
        assert!(sink.received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_submission_keeps_cart() {
        let (mut store, _) = filled_store().await;
        let sink = RecordingSink {
            fail: true,
            ..RecordingSink::default()
        };

        let err = place_order(&mut store, &sink, &user(), form()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Backend(_)));
        assert_eq!(store.cart_count(), 3);
    }

    #[tokio::test]
    async fn test_invalid_address_keeps_cart() {
        let (mut store, _) = filled_store().await;
        let mut form = form();
        form.first_name.clear();

        let err = place_order(&mut store, &RecordingSink::default(), &user(), form)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Address(AddressError::MissingField("first_name"))));
        assert_eq!(store.cart_count(), 3);
    }
}
