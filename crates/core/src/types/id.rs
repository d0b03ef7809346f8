//! Newtype IDs for type-safe entity references.
//!
//! The marketplace backend issues opaque string identifiers (document ids),
//! but a few endpoints send numeric ids (addresses, for example). Every ID
//! type defined here accepts either on the wire and always serializes as a
//! string.

use serde::{Deserialize, Deserializer};

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize` as a plain string, `Deserialize` from a string or a number
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use evmarket_core::define_id;
/// define_id!(BrandId);
/// define_id!(ReviewId);
///
/// let brand_id = BrandId::new("b-1");
/// let review_id = ReviewId::new("b-1");
///
/// // These are different types, so this won't compile:
/// // let _: BrandId = review_id;
/// assert_eq!(brand_id.as_str(), review_id.as_str());
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
            ::serde::Serialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                $crate::types::id::string_or_number(deserializer).map(Self)
            }
        }

        impl $name {
            /// Create a new ID from anything string-like.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the underlying identifier.
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

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

/// Deserialize an identifier sent either as a JSON string or a JSON number.
///
/// # Errors
///
/// Returns a deserialization error for any other JSON type.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Signed(n) => n.to_string(),
        Raw::Unsigned(n) => n.to_string(),
    })
}

define_id!(ProductId);
define_id!(VariantId);
define_id!(ShopId);
define_id!(AuctionId);
define_id!(OrderId);
define_id!(AddressId);
define_id!(UserId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_plain_string() {
        let id = ProductId::new("66f1c0ffee");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"66f1c0ffee\"");
    }

    #[test]
    fn test_deserializes_numeric_ids() {
        let id: AddressId = serde_json::from_str("42").unwrap();
        assert_eq!(id.as_str(), "42");

        let id: AddressId = serde_json::from_str("-7").unwrap();
        assert_eq!(id.as_str(), "-7");
    }

    #[test]
    fn test_rejects_non_scalar_ids() {
        assert!(serde_json::from_str::<UserId>("{\"id\":1}").is_err());
        assert!(serde_json::from_str::<UserId>("null").is_err());
    }

    #[test]
    fn test_display_and_from() {
        let id = ShopId::from("shop-9");
        assert_eq!(id.to_string(), "shop-9");
        assert_eq!(id.into_inner(), "shop-9".to_string());
    }
}
