//! Newtype IDs for type-safe entity references.
//!
//! The API numbers every record with a plain integer. Wrapping each one in
//! its own type keeps a robot ID from being passed where a product ID is
//! expected, which matters for bookings where exactly one of the two is set.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i64` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Ord`
/// - Conversion methods: `new()`, `as_i64()`
/// - `From<i64>`, `Into<i64>` and `FromStr` implementations
///
/// # Example
///
/// ```rust
/// # use sealen_core::define_id;
/// define_id!(FleetId);
/// define_id!(DockId);
///
/// let fleet = FleetId::new(1);
/// let dock: DockId = "7".parse().unwrap();
///
/// assert_eq!(fleet.as_i64(), 1);
/// assert_eq!(dock.to_string(), "7");
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
            PartialOrd,
            Ord,
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
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
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

define_id!(UserId);
define_id!(ProductId);
define_id!(RobotId);
define_id!(BookingId);
define_id!(PaymentId);
define_id!(ModuleId);
define_id!(CertificateId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_whitespace() {
        let id: RobotId = " 42 ".parse().unwrap();
        assert_eq!(id, RobotId::new(42));
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        assert!("cb-001".parse::<RobotId>().is_err());
        assert!("".parse::<ProductId>().is_err());
    }

    #[test]
    fn test_serde_is_transparent() {
        let json = serde_json::to_string(&BookingId::new(17)).unwrap();
        assert_eq!(json, "17");

        let parsed: BookingId = serde_json::from_str("17").unwrap();
        assert_eq!(parsed.as_i64(), 17);
    }
}
