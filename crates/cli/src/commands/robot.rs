//! Robot control console.

use std::str::FromStr;

use sealen_client::services::RobotConsole;
use sealen_client::session::SessionStore;
use sealen_core::{ControlMode, Direction, RobotId};

use super::{CliError, Context};
use crate::output;

pub async fn status<S: SessionStore>(ctx: &Context<S>, robot: i64) -> Result<(), CliError> {
    let telemetry = RobotConsole::new(ctx.api())
        .telemetry(&ctx.guard, RobotId::new(robot))
        .await?;
    output::telemetry(&telemetry);
    Ok(())
}

pub async fn start<S: SessionStore>(ctx: &Context<S>, robot: i64) -> Result<(), CliError> {
    let ack = RobotConsole::new(ctx.api())
        .start(&ctx.guard, RobotId::new(robot))
        .await?;
    output::ack(&ack);
    Ok(())
}

pub async fn stop<S: SessionStore>(ctx: &Context<S>, robot: i64) -> Result<(), CliError> {
    let ack = RobotConsole::new(ctx.api())
        .stop(&ctx.guard, RobotId::new(robot))
        .await?;
    output::ack(&ack);
    Ok(())
}

/// Send one manual drive command.
pub async fn drive<S: SessionStore>(
    ctx: &Context<S>,
    robot: i64,
    direction: &str,
    speed: u32,
) -> Result<(), CliError> {
    let direction = Direction::from_str(direction).map_err(CliError::argument)?;
    let ack = RobotConsole::new(ctx.api())
        .drive(&ctx.guard, RobotId::new(robot), direction, speed)
        .await?;
    output::ack(&ack);
    Ok(())
}

pub async fn mode<S: SessionStore>(
    ctx: &Context<S>,
    robot: i64,
    mode: &str,
) -> Result<(), CliError> {
    let mode = ControlMode::from_str(mode).map_err(CliError::argument)?;
    let ack = RobotConsole::new(ctx.api())
        .set_mode(&ctx.guard, RobotId::new(robot), mode)
        .await?;
    output::ack(&ack);
    Ok(())
}

pub async fn emergency_stop<S: SessionStore>(
    ctx: &Context<S>,
    robot: i64,
) -> Result<(), CliError> {
    let ack = RobotConsole::new(ctx.api())
        .emergency_stop(&ctx.guard, RobotId::new(robot))
        .await?;
    output::ack(&ack);
    Ok(())
}

/// Fleet listing for the control panel.
pub async fn fleet<S: SessionStore>(ctx: &Context<S>) -> Result<(), CliError> {
    let robots = RobotConsole::new(ctx.api()).fleet(&ctx.guard).await?;
    output::robots(&robots);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sealen_client::ClientError;
    use sealen_core::access::Denial;

    use super::*;
    use crate::commands::testing;

    #[tokio::test]
    async fn test_customer_cannot_drive() {
        let (ctx, mock) = testing::logged_in("customer@sealen.id", "Customer123").await;
        let err = start(&ctx, 2).await.unwrap_err();
        assert!(matches!(
            err,
            CliError::Client(ClientError::AccessDenied(Denial::OperatorRequired))
        ));
        assert!(!mock.calls().await.contains(&"robot_start"));
    }

    #[tokio::test]
    async fn test_operator_session() {
        let (ctx, mock) = testing::logged_in("operator@sealen.id", "Operator123").await;
        start(&ctx, 2).await.unwrap();
        mode(&ctx, 2, "manual").await.unwrap();
        drive(&ctx, 2, "forward", 150).await.unwrap();
        status(&ctx, 2).await.unwrap();
        emergency_stop(&ctx, 2).await.unwrap();

        let calls = mock.calls().await;
        assert!(calls.contains(&"robot_manual"));
        assert!(calls.contains(&"robot_stop"));
    }

    #[tokio::test]
    async fn test_bad_direction_is_argument_error() {
        let (ctx, mock) = testing::logged_in("operator@sealen.id", "Operator123").await;
        let err = drive(&ctx, 1, "up", 10).await.unwrap_err();
        assert!(matches!(err, CliError::Argument(_)));
        assert!(!mock.calls().await.contains(&"robot_manual"));
    }
}
