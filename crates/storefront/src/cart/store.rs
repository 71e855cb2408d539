//! The cart store: the single owner of a visitor's cart.

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::watch;
use tracing::instrument;

use redthread_core::{ProductId, Quantity, Size};

use super::storage::{CartStorage, restore_lines};
use super::{Cart, CartError, CartLine, LineKey};
use crate::backend::ProductCatalog;

/// Derived figures published to subscribers after every change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    /// Sum of quantities (header badge).
    pub count: u32,
    /// Sum of line totals.
    pub total: Decimal,
}

impl CartSummary {
    fn of(cart: &Cart) -> Self {
        Self {
            count: cart.count(),
            total: cart.total(),
        }
    }
}

/// A visitor's cart together with its persistence and product lookup.
///
/// Every mutating operation writes the full cart back to storage once it has
/// been applied, then publishes a fresh [`CartSummary`] to subscribers. Lookups
/// happen before any mutation, so a failed lookup leaves both the in-memory
/// cart and storage untouched.
///
/// Storage failures never fail an operation: a cart that cannot be read
/// starts empty and a cart that cannot be written stays correct in memory.
pub struct CartStore<S, C> {
    cart: Cart,
    storage: S,
    catalog: C,
    changes: watch::Sender<CartSummary>,
}

impl<S: CartStorage, C: ProductCatalog> CartStore<S, C> {
    /// Open the store, restoring whatever the storage slot holds.
    #[instrument(skip_all)]
    pub async fn load(storage: S, catalog: C) -> Self {
        let cart = match storage.load().await {
            Ok(Some(value)) => {
                let restored = restore_lines(&value);
                if restored.discarded > 0 || restored.merged > 0 {
                    tracing::warn!(
                        discarded = restored.discarded,
                        merged = restored.merged,
                        "Repaired persisted cart"
                    );
                }
                restored.cart
            }
            Ok(None) => Cart::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted cart, starting empty");
                Cart::new()
            }
        };

        let (changes, _) = watch::channel(CartSummary::of(&cart));
        Self {
            cart,
            storage,
            catalog,
            changes,
        }
    }

    /// The current cart.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Receive a [`CartSummary`] after every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSummary> {
        self.changes.subscribe()
    }

    /// Add `quantity` units of a product in a size.
    ///
    /// The product is looked up first (the catalog may serve it from cache)
    /// to snapshot its name, price and images. An existing line for the same
    /// product and size grows instead of being duplicated.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Lookup`] if the product cannot be fetched and
    /// [`CartError::OutOfStock`] if it has no units left; the cart is
    /// unchanged in both cases.
    #[instrument(skip(self), fields(product_id = %product_id, size = %size, quantity = %quantity))]
    pub async fn add_to_cart(
        &mut self,
        product_id: ProductId,
        size: Size,
        quantity: Quantity,
    ) -> Result<(), CartError> {
        let key = LineKey::new(product_id, size);

        let line = match self.cart.get(&key) {
            Some(existing) => CartLine {
                quantity,
                ..existing.clone()
            },
            None => {
                let product = self.catalog.product(product_id).await.map_err(|e| {
                    tracing::warn!(error = %e, "Product lookup failed, cart unchanged");
                    CartError::Lookup(e)
                })?;
                if !product.in_stock() {
                    tracing::info!("Product is out of stock, cart unchanged");
                    return Err(CartError::OutOfStock { product_id });
                }
                CartLine::from_product(&product, key.size.clone(), quantity)
            }
        };

        self.cart.merge_line(line);
        self.commit().await;
        Ok(())
    }

    /// Set the quantity of an existing line. Values below 1 become 1.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if no line has this product and
    /// size. Callers should treat this as a logic error; the cart is left
    /// unchanged.
    #[instrument(skip(self), fields(product_id = %product_id, size = %size))]
    pub async fn update_cart_item(
        &mut self,
        product_id: ProductId,
        size: Size,
        quantity: i64,
    ) -> Result<(), CartError> {
        let key = LineKey::new(product_id, size);

        if !self.cart.set_quantity(&key, Quantity::clamped(quantity)) {
            tracing::warn!("Quantity update for a line that is not in the cart");
            return Err(CartError::LineNotFound {
                product_id: key.product_id,
                size: key.size,
            });
        }

        self.commit().await;
        Ok(())
    }

    /// Remove a line regardless of its quantity.
    ///
    /// Returns whether a line was removed; removing an absent line is a
    /// no-op and does not touch storage.
    #[instrument(skip(self), fields(product_id = %product_id, size = %size))]
    pub async fn remove_from_cart(&mut self, product_id: ProductId, size: Size) -> bool {
        let removed = self.cart.remove(&LineKey::new(product_id, size));
        if removed {
            self.commit().await;
        }
        removed
    }

    /// Empty the cart (after a successful order, or on request).
    #[instrument(skip(self))]
    pub async fn clear_cart(&mut self) {
        self.cart.clear();
        self.commit().await;
    }

    /// Exact total of the cart.
    #[must_use]
    pub fn cart_total(&self) -> Decimal {
        self.cart.total()
    }

    /// Total formatted for display, e.g. `"75.00"`.
    #[must_use]
    pub fn cart_total_display(&self) -> String {
        self.cart.total_display()
    }

    /// Number of units in the cart.
    #[must_use]
    pub fn cart_count(&self) -> u32 {
        self.cart.count()
    }

    /// Persist and notify after a change.
    async fn commit(&self) {
        if let Err(e) = self.storage.save(self.cart.lines()).await {
            tracing::error!(error = %e, "Failed to persist cart");
        }
        self.changes.send_replace(CartSummary::of(&self.cart));
    }
}
