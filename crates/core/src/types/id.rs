//! Newtype IDs for type-safe entity references.
//!
//! The marketplace API hands out opaque string identifiers (UUIDs in
//! practice). Use the `define_id!` macro to create wrappers that prevent
//! accidentally passing a cart entry ID where a product ID is expected.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use bazaar_core::define_id;
/// define_id!(SellerId);
/// define_id!(BookingId);
///
/// let seller = SellerId::new("s-1");
/// let booking = BookingId::new("s-1");
///
/// // These are different types, so this won't compile:
/// // let _: SellerId = booking;
/// assert_eq!(seller.as_str(), booking.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from anything convertible into a `String`.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Define standard entity IDs
define_id!(UserId);
define_id!(ProductId);
define_id!(CartEntryId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_transparently() {
        let id = ProductId::new("p1");
        assert_eq!(serde_json::to_string(&id).ok().as_deref(), Some("\"p1\""));

        let parsed: Result<CartEntryId, _> = serde_json::from_str("\"e-42\"");
        assert_eq!(parsed.ok(), Some(CartEntryId::new("e-42")));
    }

    #[test]
    fn test_id_display_and_conversions() {
        let id = UserId::from("u-7");
        assert_eq!(id.to_string(), "u-7");
        assert_eq!(id.as_str(), "u-7");
        assert_eq!(String::from(id), "u-7");
    }
}
