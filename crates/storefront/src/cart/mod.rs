//! Shopping cart: line items, merge rules and derived totals.
//!
//! # Model
//!
//! A [`Cart`] is an ordered list of [`CartLine`]s, unique by [`LineKey`]
//! (`product_id` + `size`). Adding an existing key increments its quantity;
//! quantities are clamped to `1..=MAX_LINE_QUANTITY`, so decrementing never
//! removes a line implicitly. Totals are computed on demand with exact
//! decimal arithmetic.
//!
//! The [`CartStore`] wraps a cart with persistence ([`CartStorage`]) and a
//! product lookup ([`ProductCatalog`](crate::backend::ProductCatalog)), and is
//! the only way handlers mutate a visitor's cart.

mod storage;
mod store;

pub use storage::{
    CartStorage, MemoryCartStorage, RestoredCart, SessionCartStorage, StorageError, restore_lines,
};
pub use store::{CartStore, CartSummary};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use redthread_core::{Price, ProductId, Quantity, Size, format_amount};

use crate::backend::{BackendError, OrderItem, Product};

/// Errors returned by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The product could not be looked up; the cart was not changed.
    #[error("Product lookup failed: {0}")]
    Lookup(#[from] BackendError),

    /// The product has no units left; the cart was not changed.
    #[error("Product {product_id} is out of stock")]
    OutOfStock {
        /// The unavailable product.
        product_id: ProductId,
    },

    /// No line matches the given product and size.
    #[error("No cart line for product {product_id} in size {size}")]
    LineNotFound {
        /// Product of the missing line.
        product_id: ProductId,
        /// Size of the missing line.
        size: Size,
    },
}

/// Identity of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineKey {
    pub product_id: ProductId,
    pub size: Size,
}

impl LineKey {
    /// Create a key; a blank size becomes "One Size".
    #[must_use]
    pub fn new(product_id: ProductId, size: impl Into<Size>) -> Self {
        Self {
            product_id,
            size: size.into(),
        }
    }
}

/// One distinct purchasable unit in the cart.
///
/// `name`, `price` and `images` are snapshots taken from the product when
/// the line was first added and are not refreshed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub size: Size,
    pub quantity: Quantity,
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub images: Vec<String>,
}

impl CartLine {
    /// Start a line from a product snapshot.
    #[must_use]
    pub fn from_product(product: &Product, size: Size, quantity: Quantity) -> Self {
        Self {
            product_id: product.id,
            size,
            quantity,
            name: product.name.clone(),
            price: product.price,
            images: product.images.clone(),
        }
    }

    /// Whether this line has the given identity.
    #[must_use]
    pub fn matches(&self, key: &LineKey) -> bool {
        self.product_id == key.product_id && self.size == key.size
    }

    /// The line's identity.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey::new(self.product_id, self.size.clone())
    }

    /// `price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.times(self.quantity)
    }

    /// Snapshot of this line for an order record.
    #[must_use]
    pub fn to_order_item(&self) -> OrderItem {
        OrderItem {
            product_id: self.product_id,
            name: self.name.clone(),
            price: self.price,
            quantity: self.quantity,
            size: self.size.clone(),
        }
    }
}

/// The visitor's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Find the line with this identity.
    #[must_use]
    pub fn get(&self, key: &LineKey) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.matches(key))
    }

    /// Merge a line into the cart.
    ///
    /// If a line with the same key exists its quantity grows by
    /// `line.quantity` (the existing snapshot fields are kept); otherwise the
    /// line is appended.
    pub fn merge_line(&mut self, line: CartLine) {
        let key = line.key();
        match self.lines.iter_mut().find(|existing| existing.matches(&key)) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => self.lines.push(line),
        }
    }

    /// Set the quantity of an existing line. Returns `false` if absent.
    pub fn set_quantity(&mut self, key: &LineKey, quantity: Quantity) -> bool {
        match self.lines.iter_mut().find(|line| line.matches(key)) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove a line. Returns `false` if absent.
    pub fn remove(&mut self, key: &LineKey) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| !line.matches(key));
        self.lines.len() < before
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of `price * quantity` over all lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Total formatted with two decimal places.
    #[must_use]
    pub fn total_display(&self) -> String {
        format_amount(self.total())
    }

    /// Sum of quantities (not the number of lines).
    #[must_use]
    pub fn count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity.get()).sum()
    }
}

impl FromIterator<CartLine> for Cart {
    fn from_iter<I: IntoIterator<Item = CartLine>>(iter: I) -> Self {
        let mut cart = Self::new();
        for line in iter {
            cart.merge_line(line);
        }
        cart
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn pid(n: u8) -> ProductId {
        ProductId::parse(&format!("00000000-0000-4000-8000-0000000000{n:02x}")).unwrap()
    }

    pub(crate) fn line(n: u8, size: &str, qty: u32, cents: u32) -> CartLine {
        CartLine {
            product_id: pid(n),
            size: Size::new(size),
            quantity: Quantity::new(qty),
            name: format!("Product {n}"),
            price: Price::from_cents(cents),
            images: vec![format!("https://cdn.test/{n}.jpg")],
        }
    }

    #[test]
    fn test_merge_same_key_sums_quantity() {
        let mut cart = Cart::new();
        cart.merge_line(line(1, "M", 1, 2000));
        cart.merge_line(line(1, "M", 2, 2000));

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity.get(), 3);
    }

    #[test]
    fn test_merge_keeps_first_snapshot() {
        let mut cart = Cart::new();
        cart.merge_line(line(1, "M", 1, 2000));
        cart.merge_line(line(1, "M", 1, 9900));

        assert_eq!(cart.lines()[0].price, Price::from_cents(2000));
    }

    #[test]
    fn test_sizes_are_distinct_lines() {
        let cart: Cart = [line(1, "M", 1, 2000), line(1, "L", 1, 2000)]
            .into_iter()
            .collect();
        assert_eq!(cart.lines().len(), 2);
    }

    #[test]
    fn test_count_is_sum_of_quantities() {
        let cart: Cart = [line(1, "M", 2, 1000), line(2, "", 3, 1000)]
            .into_iter()
            .collect();
        assert_eq!(cart.count(), 5);
    }

    #[test]
    fn test_total_is_exact_to_the_cent() {
        // 3 x 0.10 + 1 x 0.20 must be exactly 0.50, not 0.5000000001
        let cart: Cart = [line(1, "S", 3, 10), line(2, "S", 1, 20)]
            .into_iter()
            .collect();
        assert_eq!(cart.total(), Decimal::new(50, 2));
        assert_eq!(cart.total_display(), "0.50");
    }

    #[test]
    fn test_remove_and_set_quantity_report_absence() {
        let mut cart: Cart = std::iter::once(line(1, "M", 1, 2000)).collect();
        let missing = LineKey::new(pid(2), "M");

        assert!(!cart.set_quantity(&missing, Quantity::new(4)));
        assert!(!cart.remove(&missing));
        assert!(cart.remove(&LineKey::new(pid(1), "M")));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_empty_cart_totals() {
        let cart = Cart::new();
        assert_eq!(cart.count(), 0);
        assert_eq!(cart.total_display(), "0.00");
    }
}
