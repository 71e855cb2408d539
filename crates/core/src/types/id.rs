//! Newtype IDs for type-safe references to backend records.
//!
//! Every record owned by the hosted backend is keyed by a UUID. Use the
//! `define_id!` macro to create wrappers that prevent accidentally mixing IDs
//! from different tables.

/// Error returned when a string is not a valid record identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} id: {value}")]
pub struct ParseIdError {
    /// Name of the ID type that failed to parse.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around [`uuid::Uuid`] with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - `generate()`, `parse()`, `as_uuid()`, `Display` and `FromStr`
///
/// # Example
///
/// ```rust
/// # use redthread_core::define_id;
/// define_id!(WishlistId);
///
/// let id = WishlistId::parse("8d3c5f1e-3b4a-4f7e-9a51-0c2d6e7f8a90").unwrap();
/// assert_eq!(id.to_string(), "8d3c5f1e-3b4a-4f7e-9a51-0c2d6e7f8a90");
/// assert!(WishlistId::parse("not-a-uuid").is_err());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(::uuid::Uuid);

        impl $name {
            /// Wrap an existing UUID.
            #[must_use]
            pub const fn new(id: ::uuid::Uuid) -> Self {
                Self(id)
            }

            /// Generate a fresh random (v4) ID.
            #[must_use]
            pub fn generate() -> Self {
                Self(::uuid::Uuid::new_v4())
            }

            /// Parse an ID from its textual (hyphenated) form.
            ///
            /// # Errors
            ///
            /// Returns an error if the input is not a valid UUID.
            pub fn parse(s: &str) -> ::core::result::Result<Self, $crate::types::id::ParseIdError> {
                ::uuid::Uuid::parse_str(s.trim()).map(Self).map_err(|_| {
                    $crate::types::id::ParseIdError {
                        kind: stringify!($name),
                        value: s.to_owned(),
                    }
                })
            }

            /// Get the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> ::uuid::Uuid {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::types::id::ParseIdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<::uuid::Uuid> for $name {
            fn from(id: ::uuid::Uuid) -> Self {
                Self(id)
            }
        }
    };
}

define_id!(ProductId);
define_id!(OrderId);
define_id!(UserId);
