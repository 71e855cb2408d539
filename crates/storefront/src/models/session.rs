//! Session-related types.
//!
//! The storefront keeps no identity in the session: users authenticate with
//! a bearer token on each request. The session only carries the cart.

/// Session keys.
pub mod keys {
    /// Key for the serialized cart lines.
    pub const CART: &str = "cart";
}
