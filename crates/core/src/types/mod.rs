//! Core types for Redthread.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod quantity;
pub mod size;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError, format_amount};
pub use quantity::{MAX_LINE_QUANTITY, Quantity};
pub use size::Size;
pub use status::{OrderStatus, ParseStatusError};
