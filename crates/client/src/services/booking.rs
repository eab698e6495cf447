//! Purchases and rentals.

use chrono::Utc;
use tracing::instrument;

use sealen_core::access::{self, Denial};
use sealen_core::pricing::{DailyRate, RentalDays, RentalQuote, quote_rental};
use sealen_core::{
    Booking, BookingRequest, BookingStatus, Payment, PaymentMethod, PaymentStatus, ProductId,
    Robot,
};

use crate::api::MarineApi;
use crate::error::{self, ClientError, Result};
use crate::forms::RentalForm;
use crate::session::{SessionGuard, SessionStore};

/// Delivery location used for purchases.
pub const DEFAULT_DELIVERY_LOCATION: &str = "Jakarta";

/// A paid booking.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub booking: Booking,
    pub payment: Payment,
    /// Client-side quote, for rentals.
    pub quote: Option<RentalQuote>,
}

/// Booking service.
///
/// Every operation needs a logged-in user. Purchases also need a finished
/// certification; rentals do not.
pub struct BookingService<'a> {
    api: &'a dyn MarineApi,
    rate: DailyRate,
}

impl<'a> BookingService<'a> {
    /// Create a booking service quoting rentals at `rate`.
    #[must_use]
    pub const fn new(api: &'a dyn MarineApi, rate: DailyRate) -> Self {
        Self { api, rate }
    }

    /// Quote a rental without booking it.
    #[must_use]
    pub fn quote(&self, days: RentalDays) -> RentalQuote {
        quote_rental(days, self.rate)
    }

    /// Buy one product and pay for it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AccessDenied` when logged out or not certified,
    /// `ClientError::Unavailable` for products that cannot be ordered, and
    /// `ClientError::Api` if a call fails.
    #[instrument(skip_all, fields(product_id = %product_id, method = %method))]
    pub async fn purchase<S: SessionStore>(
        &self,
        guard: &SessionGuard<S>,
        product_id: ProductId,
        method: PaymentMethod,
    ) -> Result<Receipt> {
        let user = guard.current_user().ok_or(Denial::NotLoggedIn)?;
        access::check_purchase(Some(user))?;
        let token = guard.token()?;

        let product = self.api.product(product_id).await?;
        if !product.in_stock() {
            return Err(ClientError::Unavailable(format!(
                "{} is out of stock",
                product.name
            )));
        }

        let request =
            BookingRequest::purchase(user, product.id, Utc::now(), DEFAULT_DELIVERY_LOCATION)?;
        let mut booking = self.api.create_booking(token, &request).await?;
        let payment = self.pay(guard, &mut booking, method).await?;

        tracing::info!(
            booking_id = %booking.id,
            total = %booking.total_price(),
            "Purchase completed"
        );
        let product_id = product.id.to_string();
        error::add_breadcrumb(
            "booking",
            "Purchase completed",
            Some(&[("product_id", product_id.as_str())]),
        );

        Ok(Receipt {
            booking,
            payment,
            quote: None,
        })
    }

    /// Rent a robot and pay for it.
    ///
    /// The form is checked before any call. The robot must currently be
    /// rentable.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AccessDenied` when logged out,
    /// `ClientError::Validation` for bad input, `ClientError::Unavailable`
    /// for robots that cannot be rented, and `ClientError::Api` if a call
    /// fails.
    #[instrument(skip_all, fields(method = %method))]
    pub async fn rent<S: SessionStore>(
        &self,
        guard: &SessionGuard<S>,
        form: &RentalForm,
        method: PaymentMethod,
    ) -> Result<Receipt> {
        let token = guard.token()?;
        let order = form.validate()?;

        let robot = self.api.robot(token, order.robot_id).await?;
        if !robot.is_rentable() {
            return Err(ClientError::Unavailable(format!(
                "{} is not available for rent ({})",
                robot.name, robot.status
            )));
        }

        let quote = self.quote(order.days);
        let request =
            BookingRequest::rental(order.robot_id, order.days, order.start_date, order.location);
        let mut booking = self.api.create_booking(token, &request).await?;

        if booking.total_cost != quote.total.amount {
            tracing::info!(
                booking_id = %booking.id,
                quoted = %quote.total,
                charged = %booking.total_price(),
                "Server total differs from quote"
            );
        }

        let payment = self.pay(guard, &mut booking, method).await?;

        tracing::info!(
            booking_id = %booking.id,
            robot_id = %robot.id,
            days = order.days.get(),
            "Rental completed"
        );
        let (robot_id, days) = (robot.id.to_string(), order.days.get().to_string());
        error::add_breadcrumb(
            "booking",
            "Rental completed",
            Some(&[("robot_id", robot_id.as_str()), ("days", days.as_str())]),
        );

        Ok(Receipt {
            booking,
            payment,
            quote: Some(quote),
        })
    }

    /// Robots that can be chosen in the rental form.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AccessDenied` when logged out and
    /// `ClientError::Api` if the call fails.
    #[instrument(skip_all)]
    pub async fn rentable_robots<S: SessionStore>(
        &self,
        guard: &SessionGuard<S>,
    ) -> Result<Vec<Robot>> {
        let robots = self.api.robots(guard.token()?, true).await?;
        Ok(robots.into_iter().filter(Robot::is_rentable).collect())
    }

    /// The user's bookings, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AccessDenied` when logged out and
    /// `ClientError::Api` if the call fails.
    #[instrument(skip(self, guard))]
    pub async fn history<S: SessionStore>(
        &self,
        guard: &SessionGuard<S>,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>> {
        Ok(self.api.bookings(guard.token()?, status).await?)
    }

    /// Pay for `booking`. A completed payment confirms the booking, as the
    /// API does on its side.
    async fn pay<S: SessionStore>(
        &self,
        guard: &SessionGuard<S>,
        booking: &mut Booking,
        method: PaymentMethod,
    ) -> Result<Payment> {
        let payment = self
            .api
            .create_payment(guard.token()?, booking.id, method)
            .await
            .map_err(|e| {
                tracing::warn!(
                    booking_id = %booking.id,
                    error = %e,
                    "Payment failed, booking left pending"
                );
                ClientError::from(e)
            })?;

        if payment.status == PaymentStatus::Completed {
            booking.status = BookingStatus::Confirmed;
        }
        Ok(payment)
    }
}
