//! Rental pricing.
//!
//! A rental costs `rate × days`, reduced by one long-term discount. The
//! discount is picked from a table of `(minimum days, percent off)` tiers:
//! the tier with the highest threshold the duration reaches wins, and tiers
//! never stack.
//!
//! | Duration     | Discount |
//! |--------------|----------|
//! | ≥ 180 days   | 30 %     |
//! | ≥ 90 days    | 20 %     |
//! | ≥ 30 days    | 10 %     |
//! | otherwise    | none     |
//!
//! ```
//! use rust_decimal::Decimal;
//! use sealen_core::pricing::compute_rental_price;
//!
//! let total = compute_rental_price(30, Decimal::from(1_500_000));
//! assert_eq!(total, Decimal::from(40_500_000));
//! ```

use std::num::NonZeroU32;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CurrencyCode, Price};

/// Default rental rate: Rp 1.500.000 per robot per day.
pub const DEFAULT_DAILY_RATE_IDR: i64 = 1_500_000;

/// One row of a discount table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscountTier {
    /// Shortest rental, in days, that earns this discount.
    pub min_days: u32,
    /// Percentage taken off the undiscounted total.
    pub percent_off: u8,
}

impl DiscountTier {
    /// Create a tier.
    #[must_use]
    pub const fn new(min_days: u32, percent_off: u8) -> Self {
        Self {
            min_days,
            percent_off,
        }
    }

    /// Factor applied to the undiscounted total, e.g. `0.90` for 10 % off.
    #[must_use]
    pub fn multiplier(&self) -> Decimal {
        Decimal::new(100 - i64::from(self.percent_off.min(100)), 2)
    }
}

/// Long-term rental discounts.
pub const STANDARD_TIERS: &[DiscountTier] = &[
    DiscountTier::new(180, 30),
    DiscountTier::new(90, 20),
    DiscountTier::new(30, 10),
];

/// A discount table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscountSchedule<'a> {
    tiers: &'a [DiscountTier],
}

impl<'a> DiscountSchedule<'a> {
    /// Schedule over an arbitrary table. Row order does not matter.
    #[must_use]
    pub const fn new(tiers: &'a [DiscountTier]) -> Self {
        Self { tiers }
    }

    /// The tier a rental of `days` qualifies for, if any.
    #[must_use]
    pub fn tier_for(&self, days: u32) -> Option<DiscountTier> {
        self.tiers
            .iter()
            .filter(|tier| days >= tier.min_days)
            .max_by_key(|tier| tier.min_days)
            .copied()
    }

    /// Unrounded total for `days` at `base_rate_per_day`.
    #[must_use]
    pub fn price(&self, days: u32, base_rate_per_day: Decimal) -> Decimal {
        let multiplier = self
            .tier_for(days)
            .map_or(Decimal::ONE, |tier| tier.multiplier());
        base_rate_per_day * Decimal::from(days) * multiplier
    }
}

impl Default for DiscountSchedule<'static> {
    fn default() -> Self {
        Self::new(STANDARD_TIERS)
    }
}

/// Total rental cost under the standard discount table.
///
/// The result is exact; round it with [`Price::rounded`] for display or
/// charging. Callers must pass `days > 0` and a positive rate: this function
/// does not check. [`quote_rental`] takes types that cannot be invalid.
#[must_use]
pub fn compute_rental_price(days: u32, base_rate_per_day: Decimal) -> Decimal {
    DiscountSchedule::default().price(days, base_rate_per_day)
}

/// Rental duration in days, never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RentalDays(NonZeroU32);

impl RentalDays {
    /// `None` for zero.
    #[must_use]
    pub const fn new(days: u32) -> Option<Self> {
        match NonZeroU32::new(days) {
            Some(days) => Some(Self(days)),
            None => None,
        }
    }

    /// Number of days.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Display for RentalDays {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} days", self.0)
    }
}

/// Errors building pricing inputs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    /// Rates must be strictly positive.
    #[error("daily rate must be greater than zero (got {0})")]
    NonPositiveRate(Decimal),
}

/// A per-day rental rate, always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Price", into = "Price")]
pub struct DailyRate(Price);

impl DailyRate {
    /// Validate a rate.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::NonPositiveRate`] for zero or negative prices.
    pub fn new(price: Price) -> Result<Self, PricingError> {
        if price.is_positive() {
            Ok(Self(price))
        } else {
            Err(PricingError::NonPositiveRate(price.amount))
        }
    }

    /// The standard Rp 1.500.000/day rate.
    #[must_use]
    pub fn standard() -> Self {
        Self(Price::idr(DEFAULT_DAILY_RATE_IDR))
    }

    /// Rate as a price.
    #[must_use]
    pub const fn price(self) -> Price {
        self.0
    }
}

impl TryFrom<Price> for DailyRate {
    type Error = PricingError;

    fn try_from(price: Price) -> Result<Self, Self::Error> {
        Self::new(price)
    }
}

impl From<DailyRate> for Price {
    fn from(rate: DailyRate) -> Self {
        rate.0
    }
}

/// Itemised rental price, rounded to the rate currency's minor unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RentalQuote {
    pub days: RentalDays,
    pub daily_rate: Price,
    /// `rate × days`, before discount.
    pub subtotal: Price,
    pub tier: Option<DiscountTier>,
    /// `subtotal − total`.
    pub discount: Price,
    pub total: Price,
}

/// Quote a rental under the standard discount table.
#[must_use]
pub fn quote_rental(days: RentalDays, rate: DailyRate) -> RentalQuote {
    quote_rental_with(DiscountSchedule::default(), days, rate)
}

/// Quote a rental under a custom discount table.
#[must_use]
pub fn quote_rental_with(
    schedule: DiscountSchedule<'_>,
    days: RentalDays,
    rate: DailyRate,
) -> RentalQuote {
    let rate = rate.price();
    let currency: CurrencyCode = rate.currency_code;
    let n = days.get();

    let subtotal = Price::new(rate.amount * Decimal::from(n), currency).rounded();
    let total = Price::new(schedule.price(n, rate.amount), currency).rounded();

    RentalQuote {
        days,
        daily_rate: rate,
        subtotal,
        tier: schedule.tier_for(n),
        discount: Price::new(subtotal.amount - total.amount, currency),
        total,
    }
}
