//! Newtype IDs for type-safe vendor references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different vendor entities.

/// Macro to define a type-safe numeric ID wrapper.
///
/// Creates a newtype wrapper around `i64` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_i64()`
/// - `From<i64>` and `Into<i64>` implementations
/// - `matches_json()` for loose comparison against vendor JSON values
///
/// # Example
///
/// ```rust
/// # use iqmetrix_dropship_core::define_id;
/// define_id!(VendorId);
///
/// let vendor = VendorId::new(7187);
/// assert!(vendor.matches_json(&serde_json::json!("7187")));
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
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from an i64 value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying i64 value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }

            /// Compare against a JSON value that may carry the id as a number
            /// or as a numeric string.
            #[must_use]
            pub fn matches_json(&self, value: &::serde_json::Value) -> bool {
                match value {
                    ::serde_json::Value::Number(n) => n.as_i64() == Some(self.0),
                    ::serde_json::Value::String(s) => s.trim().parse::<i64>().ok() == Some(self.0),
                    _ => false,
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Supplier (vendor entity) that sources a subscription list.
define_id!(SupplierId);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_supplier_id_display() {
        assert_eq!(SupplierId::new(7187).to_string(), "7187");
    }

    #[test]
    fn test_supplier_id_matches_number_and_string() {
        let id = SupplierId::new(188_979);
        assert!(id.matches_json(&json!(188_979)));
        assert!(id.matches_json(&json!("188979")));
        assert!(!id.matches_json(&json!(7187)));
        assert!(!id.matches_json(&json!(null)));
        assert!(!id.matches_json(&json!("abc")));
    }

    #[test]
    fn test_supplier_id_serde_transparent() {
        let id: SupplierId = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(id.as_i64(), 42);
        assert_eq!(serde_json::to_value(id).unwrap(), json!(42));
    }
}
