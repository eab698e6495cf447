//! Scripted walkthrough against the in-memory backend.
//!
//! The simulated backend forgets its accounts when the process exits, so a
//! session saved by one `sealen --backend mock` invocation is rejected by the
//! next one. The demo runs a whole customer, operator and admin journey in a
//! single process instead.

use std::sync::Arc;

use tracing::info;

use sealen_client::api::MockApi;
use sealen_client::{ClientConfig, MemorySessionStore};

use super::{CliError, Context, auth, certification, pages, robot, shop};
use crate::output;

const CUSTOMER: (&str, &str) = ("customer@sealen.id", "Customer123");
const OPERATOR: (&str, &str) = ("operator@sealen.id", "Operator123");
const ADMIN: (&str, &str) = ("admin@sealen.id", "Admin123");

/// Rental robot and purchasable product in the seeded data.
const DEMO_ROBOT: i64 = 2;
const DEMO_PRODUCT: i64 = 1;

pub async fn run(config: ClientConfig) -> Result<(), CliError> {
    info!("Starting demo on the simulated backend");
    let mut ctx =
        Context::restore(config, Arc::new(MockApi::seeded()), MemorySessionStore::new()).await;

    step("Browse as a guest");
    pages::open(&mut ctx, "products").await?;
    pages::open(&mut ctx, "rent").await?;

    step("Customer logs in and is taken back to the rent page");
    auth::login(&mut ctx, CUSTOMER.0, Some(CUSTOMER.1.to_string())).await?;
    shop::quote(&ctx, 90)?;
    shop::rent(
        &mut ctx,
        DEMO_ROBOT.to_string(),
        chrono::Utc::now().format("%Y-%m-%d").to_string(),
        "30".to_string(),
        "Teluk Jakarta".to_string(),
        "bank-transfer",
    )
    .await?;

    step("Purchases wait for certification");
    expect_refusal(shop::buy(&mut ctx, DEMO_PRODUCT, "credit-card").await)?;
    for module in 1..=4 {
        certification::complete_module(&mut ctx, module).await?;
    }
    certification::complete(&mut ctx).await?;
    shop::buy(&mut ctx, DEMO_PRODUCT, "credit-card").await?;
    shop::bookings(&ctx, None).await?;
    expect_refusal(robot::start(&ctx, DEMO_ROBOT).await)?;
    auth::logout(&mut ctx).await;

    step("Operator drives the robot");
    auth::login(&mut ctx, OPERATOR.0, Some(OPERATOR.1.to_string())).await?;
    robot::start(&ctx, DEMO_ROBOT).await?;
    robot::drive(&ctx, DEMO_ROBOT, "forward", 60).await?;
    robot::status(&ctx, DEMO_ROBOT).await?;
    robot::emergency_stop(&ctx, DEMO_ROBOT).await?;
    pages::open(&mut ctx, "dashboard").await?;
    auth::logout(&mut ctx).await;

    step("Admin checks the fleet");
    auth::login(&mut ctx, ADMIN.0, Some(ADMIN.1.to_string())).await?;
    pages::open(&mut ctx, "dashboard").await?;
    auth::logout(&mut ctx).await;

    info!("Demo finished");
    Ok(())
}

fn step(title: &str) {
    output::line("");
    output::heading(&format!(">> {title}"));
}

/// Show a refusal the demo expects. Success, or any error other than a
/// client error, fails the demo.
fn expect_refusal(result: Result<(), CliError>) -> Result<(), CliError> {
    match result {
        Ok(()) => Err(CliError::argument("expected the action to be refused")),
        Err(CliError::Client(err)) => {
            output::notice(&err.notice());
            Ok(())
        }
        Err(other) => Err(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sealen_client::ClientError;
    use sealen_core::access::Denial;

    use super::*;
    use crate::commands::testing;

    #[tokio::test]
    async fn test_demo_runs_to_completion() {
        run(testing::config()).await.unwrap();
    }

    #[test]
    fn test_expect_refusal_rejects_success() {
        assert!(matches!(expect_refusal(Ok(())), Err(CliError::Argument(_))));
    }

    #[test]
    fn test_expect_refusal_accepts_client_error() {
        let refused = Err(CliError::Client(ClientError::AccessDenied(
            Denial::CertificationRequired,
        )));
        assert!(expect_refusal(refused).is_ok());
    }

    #[test]
    fn test_expect_refusal_passes_other_errors_through() {
        let err = expect_refusal(Err(CliError::argument("bad"))).unwrap_err();
        assert!(matches!(err, CliError::Argument(_)));
    }
}
