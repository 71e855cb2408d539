//! Redthread Core - Shared domain types.
//!
//! This crate provides the types shared by the storefront binary and its
//! integration tests:
//! - Type-safe identifiers for backend records (products, orders, users)
//! - Cart line identity pieces: [`Size`] and [`Quantity`]
//! - Exact decimal prices via [`Price`]
//! - Order lifecycle status via [`OrderStatus`]
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no session
//! handling. This keeps it lightweight and usable anywhere.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
