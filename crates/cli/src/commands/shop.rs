//! Catalogue, purchases and rentals.

use std::str::FromStr;

use tracing::info;

use sealen_client::forms::RentalForm;
use sealen_client::services::BookingService;
use sealen_client::session::SessionStore;
use sealen_client::{ClientError, Notice};
use sealen_core::access;
use sealen_core::pricing::RentalDays;
use sealen_core::{BookingStatus, PaymentMethod, ProductId};

use super::{CliError, Context, pages};
use crate::output;

fn booking_service<S: SessionStore>(ctx: &Context<S>) -> BookingService<'_> {
    BookingService::new(ctx.api(), ctx.config.rental_rate)
}

fn payment_method(raw: &str) -> Result<PaymentMethod, CliError> {
    PaymentMethod::from_str(raw).map_err(CliError::argument)
}

/// Quote a rental without booking it.
pub fn quote<S: SessionStore>(ctx: &Context<S>, days: u32) -> Result<(), CliError> {
    let days = RentalDays::new(days)
        .ok_or_else(|| CliError::argument("rental must be at least 1 day"))?;
    output::quote(&booking_service(ctx).quote(days));
    Ok(())
}

/// List the catalogue. Public.
pub async fn products<S: SessionStore>(
    ctx: &Context<S>,
    category: Option<&str>,
) -> Result<(), CliError> {
    let products = ctx
        .api()
        .products(category)
        .await
        .map_err(ClientError::from)?;
    output::products(&products);

    if !access::can_purchase(ctx.guard.current_user()) {
        output::notice(&Notice::info(
            "Complete the operator certification to purchase products",
        ));
    }
    Ok(())
}

/// Buy a product. A refusal opens the page that resolves it, usually the
/// certification course.
pub async fn buy<S: SessionStore>(
    ctx: &mut Context<S>,
    product: i64,
    method: &str,
) -> Result<(), CliError> {
    let method = payment_method(method)?;
    let result = booking_service(ctx)
        .purchase(&ctx.guard, ProductId::new(product), method)
        .await
        .map(|receipt| {
            info!(booking_id = %receipt.booking.id, "Purchase booked");
            output::receipt(&receipt);
        })
        .map_err(CliError::from);
    pages::follow_denial(ctx, result).await
}

/// Rent a robot. Arguments are validated as form fields.
pub async fn rent<S: SessionStore>(
    ctx: &mut Context<S>,
    robot: String,
    start_date: String,
    duration_days: String,
    location: String,
    method: &str,
) -> Result<(), CliError> {
    let method = payment_method(method)?;
    let form = RentalForm {
        robot,
        start_date,
        duration_days,
        location,
    };
    let result = booking_service(ctx)
        .rent(&ctx.guard, &form, method)
        .await
        .map(|receipt| {
            info!(booking_id = %receipt.booking.id, "Rental booked");
            output::receipt(&receipt);
        })
        .map_err(CliError::from);
    pages::follow_denial(ctx, result).await
}

/// List the user's bookings.
pub async fn bookings<S: SessionStore>(
    ctx: &Context<S>,
    status: Option<&str>,
) -> Result<(), CliError> {
    let status = status
        .map(BookingStatus::from_str)
        .transpose()
        .map_err(CliError::argument)?;
    let bookings = booking_service(ctx).history(&ctx.guard, status).await?;
    output::bookings(&bookings);
    Ok(())
}

/// List robots that can be rented now.
pub async fn robots<S: SessionStore>(ctx: &Context<S>) -> Result<(), CliError> {
    let robots = booking_service(ctx).rentable_robots(&ctx.guard).await?;
    output::robots(&robots);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sealen_core::access::Denial;

    use super::*;
    use crate::commands::testing;

    #[tokio::test]
    async fn test_quote_rejects_zero_days() {
        let (ctx, mock) = testing::context().await;
        assert!(matches!(quote(&ctx, 0), Err(CliError::Argument(_))));
        assert!(quote(&ctx, 90).is_ok());
        assert!(mock.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_products_are_public() {
        let (ctx, _mock) = testing::context().await;
        products(&ctx, Some("robot")).await.unwrap();
    }

    #[tokio::test]
    async fn test_uncertified_purchase_is_refused() {
        let (mut ctx, mock) = testing::logged_in("customer@sealen.id", "Customer123").await;
        let err = buy(&mut ctx, 1, "credit-card").await.unwrap_err();
        assert!(matches!(
            err,
            CliError::Client(ClientError::AccessDenied(Denial::CertificationRequired))
        ));
        let calls = mock.calls().await;
        assert!(!calls.contains(&"create_booking"));
        // Refusal opens the certification course
        assert!(calls.contains(&"certification_modules"));
    }

    #[tokio::test]
    async fn test_logged_out_rental_opens_login() {
        let (mut ctx, mock) = testing::context().await;
        let err = rent(
            &mut ctx,
            "2".to_string(),
            "2025-06-01".to_string(),
            "30".to_string(),
            "Teluk Jakarta".to_string(),
            "credit-card",
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            CliError::Client(ClientError::AccessDenied(Denial::NotLoggedIn))
        ));
        assert!(mock.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_certified_purchase_and_history() {
        let (mut ctx, _mock) = testing::logged_in("certified@sealen.id", "Certified123").await;
        buy(&mut ctx, 1, "e-wallet").await.unwrap();
        bookings(&ctx, Some("confirmed")).await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_payment_method() {
        let (mut ctx, _mock) = testing::logged_in("certified@sealen.id", "Certified123").await;
        let err = buy(&mut ctx, 1, "cash").await.unwrap_err();
        assert!(matches!(err, CliError::Argument(_)));
    }

    #[tokio::test]
    async fn test_rent_validates_form() {
        let (mut ctx, mock) = testing::logged_in("customer@sealen.id", "Customer123").await;
        let err = rent(
            &mut ctx,
            "2".to_string(),
            "01/06/2025".to_string(),
            "0".to_string(),
            String::new(),
            "credit-card",
        )
        .await
        .unwrap_err();
        let CliError::Client(ClientError::Validation(errors)) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 3);
        assert!(!mock.calls().await.contains(&"create_booking"));
    }

    #[tokio::test]
    async fn test_rent_books_robot() {
        let (mut ctx, mock) = testing::logged_in("customer@sealen.id", "Customer123").await;
        rent(
            &mut ctx,
            "2".to_string(),
            "2025-06-01".to_string(),
            "30".to_string(),
            "Teluk Jakarta".to_string(),
            "bank-transfer",
        )
        .await
        .unwrap();
        let calls = mock.calls().await;
        assert!(calls.contains(&"create_booking"));
        assert!(calls.contains(&"create_payment"));
    }

    #[tokio::test]
    async fn test_bookings_rejects_unknown_status() {
        let (ctx, _mock) = testing::logged_in("customer@sealen.id", "Customer123").await;
        let err = bookings(&ctx, Some("lost")).await.unwrap_err();
        assert!(matches!(err, CliError::Argument(_)));
    }
}
