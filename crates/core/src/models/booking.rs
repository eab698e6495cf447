//! Bookings (rentals and purchases) and their payments.
//!
//! A booking refers to exactly one thing: a robot for a rental or a product
//! for a purchase. The API encodes that as two nullable IDs next to a
//! `booking_type` string; here it is the [`BookingTarget`] union, and any
//! record that sets both references, neither, or the wrong one for its type
//! fails to decode.

use chrono::{DateTime, Days, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::access::{self, Denial};
use crate::pricing::RentalDays;
use crate::types::{
    BookingId, BookingKind, BookingStatus, CurrencyCode, PaymentId, PaymentMethod, PaymentStatus,
    Price, ProductId, RobotId, UserId,
};

use super::User;

/// What a booking is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingTarget {
    /// Time-bounded rental of a fleet robot.
    Rental {
        robot_id: RobotId,
        duration_days: RentalDays,
    },
    /// Outright purchase of a catalogue product.
    Purchase { product_id: ProductId },
}

impl BookingTarget {
    /// Rental or purchase.
    #[must_use]
    pub const fn kind(&self) -> BookingKind {
        match self {
            Self::Rental { .. } => BookingKind::Rental,
            Self::Purchase { .. } => BookingKind::Purchase,
        }
    }
}

/// Reasons an API booking record is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingDecodeError {
    /// Both `robot_id` and `product_id` were set.
    #[error("booking {0} references both a robot and a product")]
    AmbiguousTarget(BookingId),
    /// A rental without a robot.
    #[error("rental booking {0} has no robot_id")]
    MissingRobot(BookingId),
    /// A purchase without a product.
    #[error("purchase booking {0} has no product_id")]
    MissingProduct(BookingId),
    /// A rental without a positive duration.
    #[error("rental booking {0} has no positive duration_days")]
    MissingDuration(BookingId),
    /// A negative total.
    #[error("booking {0} has a negative total_cost")]
    NegativeCost(BookingId),
}

/// A booking as stored by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BookingRecord", into = "BookingRecord")]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub target: BookingTarget,
    pub start_date: DateTime<Utc>,
    /// Set for rentals only.
    pub end_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub status: BookingStatus,
    /// Total in rupiah, never negative.
    pub total_cost: Decimal,
    pub created_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Rental or purchase.
    #[must_use]
    pub const fn kind(&self) -> BookingKind {
        self.target.kind()
    }

    /// Total as a displayable rupiah amount.
    #[must_use]
    pub const fn total_price(&self) -> Price {
        Price::new(self.total_cost, CurrencyCode::IDR)
    }
}

/// Wire shape of a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BookingRecord {
    booking_id: BookingId,
    user_id: UserId,
    #[serde(default)]
    robot_id: Option<RobotId>,
    #[serde(default)]
    product_id: Option<ProductId>,
    booking_type: BookingKind,
    #[serde(with = "super::timestamp")]
    start_date: DateTime<Utc>,
    #[serde(default, with = "super::timestamp::option")]
    end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    duration_days: Option<u32>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    status: BookingStatus,
    total_cost: Decimal,
    #[serde(default, with = "super::timestamp::option")]
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<BookingRecord> for Booking {
    type Error = BookingDecodeError;

    fn try_from(record: BookingRecord) -> Result<Self, Self::Error> {
        let id = record.booking_id;

        let target = match (record.booking_type, record.robot_id, record.product_id) {
            (_, Some(_), Some(_)) => return Err(BookingDecodeError::AmbiguousTarget(id)),
            (BookingKind::Rental, Some(robot_id), None) => {
                let duration_days = record
                    .duration_days
                    .and_then(RentalDays::new)
                    .ok_or(BookingDecodeError::MissingDuration(id))?;
                BookingTarget::Rental {
                    robot_id,
                    duration_days,
                }
            }
            (BookingKind::Rental, None, _) => return Err(BookingDecodeError::MissingRobot(id)),
            (BookingKind::Purchase, None, Some(product_id)) => {
                BookingTarget::Purchase { product_id }
            }
            (BookingKind::Purchase, _, None) => {
                return Err(BookingDecodeError::MissingProduct(id));
            }
        };

        if record.total_cost.is_sign_negative() && !record.total_cost.is_zero() {
            return Err(BookingDecodeError::NegativeCost(id));
        }

        Ok(Self {
            id,
            user_id: record.user_id,
            target,
            start_date: record.start_date,
            end_date: record.end_date,
            location: record.location,
            status: record.status,
            total_cost: record.total_cost,
            created_at: record.created_at,
        })
    }
}

impl From<Booking> for BookingRecord {
    fn from(booking: Booking) -> Self {
        let (robot_id, product_id, duration_days) = match booking.target {
            BookingTarget::Rental {
                robot_id,
                duration_days,
            } => (Some(robot_id), None, Some(duration_days.get())),
            BookingTarget::Purchase { product_id } => (None, Some(product_id), None),
        };

        Self {
            booking_id: booking.id,
            user_id: booking.user_id,
            robot_id,
            product_id,
            booking_type: booking.target.kind(),
            start_date: booking.start_date,
            end_date: booking.end_date,
            duration_days,
            location: booking.location,
            status: booking.status,
            total_cost: booking.total_cost,
            created_at: booking.created_at,
        }
    }
}

/// A request to create a booking.
///
/// Fields are private: a purchase request can only be built through
/// [`BookingRequest::purchase`], which refuses uncertified buyers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "BookingRequestBody")]
pub struct BookingRequest {
    target: BookingTarget,
    start_date: DateTime<Utc>,
    location: String,
}

impl BookingRequest {
    /// Request a rental. Rentals carry no certification requirement.
    #[must_use]
    pub fn rental(
        robot_id: RobotId,
        duration_days: RentalDays,
        start_date: DateTime<Utc>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            target: BookingTarget::Rental {
                robot_id,
                duration_days,
            },
            start_date,
            location: location.into(),
        }
    }

    /// Request a purchase on behalf of `buyer`.
    ///
    /// # Errors
    ///
    /// Returns [`Denial::CertificationRequired`] if the buyer is not
    /// certified.
    pub fn purchase(
        buyer: &User,
        product_id: ProductId,
        start_date: DateTime<Utc>,
        location: impl Into<String>,
    ) -> Result<Self, Denial> {
        access::check_purchase(Some(buyer))?;
        Ok(Self {
            target: BookingTarget::Purchase { product_id },
            start_date,
            location: location.into(),
        })
    }

    /// What is being booked.
    #[must_use]
    pub const fn target(&self) -> BookingTarget {
        self.target
    }

    /// Rental or purchase.
    #[must_use]
    pub const fn kind(&self) -> BookingKind {
        self.target.kind()
    }

    /// When the booking starts.
    #[must_use]
    pub const fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    /// End of a rental, `None` for purchases.
    #[must_use]
    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        match self.target {
            BookingTarget::Rental { duration_days, .. } => self
                .start_date
                .checked_add_days(Days::new(u64::from(duration_days.get()))),
            BookingTarget::Purchase { .. } => None,
        }
    }

    /// Delivery or deployment location.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }
}

#[derive(Serialize)]
struct BookingRequestBody {
    booking_type: BookingKind,
    start_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_days: Option<u32>,
    location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    robot_id: Option<RobotId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_id: Option<ProductId>,
}

impl From<BookingRequest> for BookingRequestBody {
    fn from(request: BookingRequest) -> Self {
        let (robot_id, product_id, duration_days) = match request.target {
            BookingTarget::Rental {
                robot_id,
                duration_days,
            } => (Some(robot_id), None, Some(duration_days.get())),
            BookingTarget::Purchase { product_id } => (None, Some(product_id), None),
        };

        Self {
            booking_type: request.target.kind(),
            start_date: request.start_date.to_rfc3339(),
            duration_days,
            location: request.location,
            robot_id,
            product_id,
        }
    }
}

/// A payment made against a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    #[serde(rename = "payment_id")]
    pub id: PaymentId,
    pub booking_id: BookingId,
    pub amount: Decimal,
    pub method: PaymentMethod,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default, with = "super::timestamp::option")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub transaction_id: Option<String>,
}
