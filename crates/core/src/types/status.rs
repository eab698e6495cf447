//! Roles and status enums.
//!
//! Every value here travels over the wire as a lowercase (or kebab-case)
//! string. Parsing is closed: an unrecognized string is an error, except for
//! robot status where the fleet may report states this client predates.

use serde::{Deserialize, Serialize};

/// Error returned when a string is not a member of a closed enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum
/// from a single variant/string table.
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Wire representation.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_owned(),
                    }),
                }
            }
        }
    };
}

/// User role. Parsing is closed, but a user record carrying an unknown
/// role decodes as a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access including the fleet dashboard.
    Admin,
    /// May drive robots from the control panel.
    Operator,
    /// May rent robots, and buy products once certified.
    Customer,
}

string_enum!(Role, "role", {
    Admin => "admin",
    Operator => "operator",
    Customer => "customer",
});

/// Whether a booking rents a robot or buys a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingKind {
    Rental,
    Purchase,
}

string_enum!(BookingKind, "booking type", {
    Rental => "rental",
    Purchase => "purchase",
});

/// Booking lifecycle status. Mutated by the API, never by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Active,
    Completed,
    Cancelled,
}

string_enum!(BookingStatus, "booking status", {
    Pending => "pending",
    Confirmed => "confirmed",
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
});

/// Payment settlement status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

string_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
    Refunded => "refunded",
});

/// Accepted payment methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    #[default]
    CreditCard,
    EWallet,
    BankTransfer,
}

string_enum!(PaymentMethod, "payment method", {
    CreditCard => "credit-card",
    EWallet => "e-wallet",
    BankTransfer => "bank-transfer",
});

/// Operational status reported for a robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RobotStatus {
    Active,
    Charging,
    Maintenance,
    Broken,
    #[default]
    Offline,
    /// A status string this client does not recognize.
    #[serde(other)]
    Unknown,
}

string_enum!(RobotStatus, "robot status", {
    Active => "active",
    Charging => "charging",
    Maintenance => "maintenance",
    Broken => "broken",
    Offline => "offline",
    Unknown => "unknown",
});

impl RobotStatus {
    /// Whether a robot in this status may be offered for rental.
    #[must_use]
    pub const fn is_rentable(self) -> bool {
        !matches!(self, Self::Maintenance | Self::Broken | Self::Unknown)
    }
}

/// Robot control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    #[default]
    Manual,
    Auto,
}

string_enum!(ControlMode, "control mode", {
    Manual => "manual",
    Auto => "auto",
});

impl ControlMode {
    /// The other mode.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Manual => Self::Auto,
            Self::Auto => Self::Manual,
        }
    }
}

/// Manual drive direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

string_enum!(Direction, "direction", {
    Forward => "forward",
    Backward => "backward",
    Left => "left",
    Right => "right",
});
