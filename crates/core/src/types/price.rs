//! Type-safe price representation using decimal arithmetic.
//!
//! Amounts are kept in the currency's standard unit (rupiah, dollars) as a
//! [`Decimal`], never as floats. Rounding to the currency's minor unit only
//! happens when a caller asks for it, so intermediate pricing math stays
//! exact.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., rupiah, not sen).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a rupiah price from a whole number of rupiah.
    #[must_use]
    pub fn idr(rupiah: i64) -> Self {
        Self::new(Decimal::from(rupiah), CurrencyCode::IDR)
    }

    /// Round the amount to the currency's minor-unit precision.
    ///
    /// Midpoints round away from zero, so Rp 0,5 becomes Rp 1.
    #[must_use]
    pub fn rounded(self) -> Self {
        Self {
            amount: self.amount.round_dp_with_strategy(
                self.currency_code.minor_unit_digits(),
                RoundingStrategy::MidpointAwayFromZero,
            ),
            currency_code: self.currency_code,
        }
    }

    /// Whether the amount is strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }
}

impl fmt::Display for Price {
    /// Formats the rounded amount the way the currency's locale does,
    /// e.g. `Rp 40.500.000` or `$1,250.00`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.currency_code;
        let digits = code.minor_unit_digits() as usize;
        let rounded = self.rounded().amount;

        let plain = format!("{:.digits$}", rounded.abs());
        let (whole, fraction) = plain.split_once('.').unwrap_or((plain.as_str(), ""));

        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };

        write!(
            f,
            "{sign}{}{}",
            code.symbol(),
            group_thousands(whole, code.group_separator())
        )?;
        if !fraction.is_empty() {
            write!(f, "{}{fraction}", code.decimal_separator())?;
        }
        Ok(())
    }
}

/// Insert a separator between every group of three digits, from the right.
fn group_thousands(digits: &str, separator: char) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}

/// ISO 4217 currency codes the client can price in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    /// Indonesian rupiah. Displayed without fractional digits.
    #[default]
    IDR,
    USD,
    SGD,
}

impl CurrencyCode {
    /// Number of fractional digits shown and charged for this currency.
    #[must_use]
    pub const fn minor_unit_digits(self) -> u32 {
        match self {
            Self::IDR => 0,
            Self::USD | Self::SGD => 2,
        }
    }

    /// Display prefix.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::IDR => "Rp ",
            Self::USD => "$",
            Self::SGD => "S$",
        }
    }

    /// ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::IDR => "IDR",
            Self::USD => "USD",
            Self::SGD => "SGD",
        }
    }

    const fn group_separator(self) -> char {
        match self {
            Self::IDR => '.',
            Self::USD | Self::SGD => ',',
        }
    }

    const fn decimal_separator(self) -> char {
        match self {
            Self::IDR => ',',
            Self::USD | Self::SGD => '.',
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IDR" => Ok(Self::IDR),
            "USD" => Ok(Self::USD),
            "SGD" => Ok(Self::SGD),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}
