//! Persistence of the cart between requests.
//!
//! The cart lives in a single key-value slot scoped to the visitor's browser
//! session. It is read once when a [`CartStore`](super::CartStore) is opened
//! and overwritten after every mutation.
//!
//! Stored data is not trusted: [`restore_lines`] validates each entry into a
//! strict [`CartLine`], repairing what can be repaired and discarding the rest.

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tower_sessions::Session;

use redthread_core::{Price, ProductId, Quantity, Size};

use super::{Cart, CartLine};
use crate::models::session_keys;

/// Errors reading or writing the persisted cart.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// The cart could not be serialized.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A persisted slot holding one visitor's cart.
pub trait CartStorage: Send + Sync {
    /// Read the raw stored value, if any.
    fn load(&self) -> impl Future<Output = Result<Option<Value>, StorageError>> + Send;

    /// Overwrite the slot with `lines`.
    fn save(&self, lines: &[CartLine]) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Cart storage backed by the visitor's `tower-sessions` session.
#[derive(Clone)]
pub struct SessionCartStorage {
    session: Session,
}

impl SessionCartStorage {
    /// Wrap the session of the current request.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

impl CartStorage for SessionCartStorage {
    async fn load(&self) -> Result<Option<Value>, StorageError> {
        Ok(self.session.get::<Value>(session_keys::CART).await?)
    }

    async fn save(&self, lines: &[CartLine]) -> Result<(), StorageError> {
        self.session.insert(session_keys::CART, lines).await?;
        Ok(())
    }
}

/// In-process cart storage.
///
/// Clones share the same slot, so a test can keep a handle and inspect what
/// the store persisted.
#[derive(Clone, Default)]
pub struct MemoryCartStorage {
    slot: Arc<Mutex<Option<Value>>>,
}

impl MemoryCartStorage {
    /// An empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot pre-filled with a raw value, as if written by an earlier visit.
    #[must_use]
    pub fn with_value(value: Value) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(value))),
        }
    }

    /// Current raw contents of the slot.
    pub async fn snapshot(&self) -> Option<Value> {
        self.slot.lock().await.clone()
    }
}

impl CartStorage for MemoryCartStorage {
    async fn load(&self) -> Result<Option<Value>, StorageError> {
        Ok(self.snapshot().await)
    }

    async fn save(&self, lines: &[CartLine]) -> Result<(), StorageError> {
        let value = serde_json::to_value(lines)?;
        *self.slot.lock().await = Some(value);
        Ok(())
    }
}

/// Result of validating a stored cart.
#[derive(Debug, Default)]
pub struct RestoredCart {
    /// The repaired cart.
    pub cart: Cart,
    /// Entries that could not be repaired and were dropped.
    pub discarded: usize,
    /// Entries folded into an earlier entry with the same key.
    pub merged: usize,
}

/// Validate a stored value into a cart.
///
/// Anything other than a JSON array yields an empty cart with one discard.
/// Per entry:
/// - product id must be a valid ID under `product_id`, `productId` or `id`
/// - a missing or blank size becomes "One Size"
/// - a missing, fractional or out-of-range quantity is clamped into range
/// - price may be a number or a numeric string and must not be negative
/// - name must be a non-blank string
/// - non-string image entries are dropped
///
/// Entries sharing a `(product, size)` key are merged by summing quantities.
#[must_use]
pub fn restore_lines(value: &Value) -> RestoredCart {
    let Some(entries) = value.as_array() else {
        return RestoredCart {
            discarded: 1,
            ..RestoredCart::default()
        };
    };

    let mut restored = RestoredCart::default();
    for entry in entries {
        let Some(line) = repair_line(entry) else {
            restored.discarded += 1;
            continue;
        };
        if restored.cart.get(&line.key()).is_some() {
            restored.merged += 1;
        }
        restored.cart.merge_line(line);
    }
    restored
}

fn repair_line(entry: &Value) -> Option<CartLine> {
    let fields = entry.as_object()?;

    let product_id = ["product_id", "productId", "id"]
        .iter()
        .find_map(|key| fields.get(*key))
        .and_then(Value::as_str)
        .and_then(|raw| ProductId::parse(raw).ok())?;

    let size = fields
        .get("size")
        .and_then(Value::as_str)
        .map_or_else(Size::one_size, Size::new);

    let quantity = fields
        .get("quantity")
        .and_then(parse_quantity)
        .unwrap_or(Quantity::ONE);

    let name = fields
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())?
        .to_owned();

    let price = fields.get("price").and_then(parse_price)?;

    let images = fields
        .get("images")
        .and_then(Value::as_array)
        .map(|images| {
            images
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    Some(CartLine {
        product_id,
        size,
        quantity,
        name,
        price,
        images,
    })
}

fn parse_quantity(value: &Value) -> Option<Quantity> {
    let raw = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            #[allow(clippy::cast_possible_truncation)] // clamped by Quantity::clamped
            n.as_f64().map(|f| f.floor() as i64)
        })?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    Some(Quantity::clamped(raw))
}

fn parse_price(value: &Value) -> Option<Price> {
    let amount = match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok()?,
        Value::String(s) => Decimal::from_str(s.trim()).ok()?,
        _ => return None,
    };
    Price::new(amount).ok()
}
