//! Size labels for apparel variants.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// A size label such as `"M"` or `"XL"`.
///
/// Products without size variants use the [`Size::ONE_SIZE`] sentinel. A
/// blank label is never stored: it normalizes to the sentinel so that
/// `(product, "")` and `(product, "One Size")` are the same cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Size(String);

impl Size {
    /// Label used for products without size variants.
    pub const ONE_SIZE: &'static str = "One Size";

    /// Create a size from a label, trimming whitespace.
    #[must_use]
    pub fn new(label: &str) -> Self {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            Self::one_size()
        } else {
            Self(trimmed.to_owned())
        }
    }

    /// The "One Size" sentinel.
    #[must_use]
    pub fn one_size() -> Self {
        Self(Self::ONE_SIZE.to_owned())
    }

    /// Whether this is the "One Size" sentinel.
    #[must_use]
    pub fn is_one_size(&self) -> bool {
        self.0 == Self::ONE_SIZE
    }

    /// Returns the label as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Size {
    fn default() -> Self {
        Self::one_size()
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Size {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl<'de> Deserialize<'de> for Size {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label.map_or_else(Self::one_size, |l| Self::new(&l)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_normalizes_to_one_size() {
        assert!(Size::new("").is_one_size());
        assert!(Size::new("   ").is_one_size());
        assert_eq!(Size::new(""), Size::new("One Size"));
    }

    #[test]
    fn test_label_is_trimmed() {
        assert_eq!(Size::new(" M ").as_str(), "M");
    }

    #[test]
    fn test_null_deserializes_to_one_size() {
        let size: Size = serde_json::from_str("null").unwrap();
        assert!(size.is_one_size());
    }
}
