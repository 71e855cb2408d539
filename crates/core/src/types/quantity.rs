//! Cart line quantities.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Largest quantity a single cart line may hold.
///
/// Additions beyond this saturate instead of overflowing.
pub const MAX_LINE_QUANTITY: u32 = 999;

/// A line quantity, always within `1..=MAX_LINE_QUANTITY`.
///
/// Construction clamps rather than fails: a request for zero (or a negative
/// amount coming from a form) becomes one, and anything above the limit
/// becomes the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(1);

    /// Create a quantity, clamping into the valid range.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        if value < 1 {
            Self(1)
        } else if value > MAX_LINE_QUANTITY {
            Self(MAX_LINE_QUANTITY)
        } else {
            Self(value)
        }
    }

    /// Create a quantity from a signed request value, clamping into range.
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        Self::new(u32::try_from(value.max(0)).unwrap_or(MAX_LINE_QUANTITY))
    }

    /// The raw quantity.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Add another quantity, saturating at [`MAX_LINE_QUANTITY`].
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self::new(self.0.saturating_add(other.0))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::clamped(i64::deserialize(deserializer)?))
    }
}
