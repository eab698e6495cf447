//! Robot control console.
//!
//! Every operation is refused locally unless the user may open the control
//! panel (admins and operators). The API enforces the same rule.

use tracing::instrument;

use sealen_core::access;
use sealen_core::{ControlMode, Direction, Robot, RobotId, RobotTelemetry};

use crate::api::{AccessToken, ControlAck, MarineApi, ManualCommand};
use crate::error::{self, Result};
use crate::session::{SessionGuard, SessionStore};

/// Robot control service.
pub struct RobotConsole<'a> {
    api: &'a dyn MarineApi,
}

impl<'a> RobotConsole<'a> {
    #[must_use]
    pub const fn new(api: &'a dyn MarineApi) -> Self {
        Self { api }
    }

    /// Robots the user can see.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AccessDenied` without control-panel access and
    /// `ClientError::Api` if the call fails.
    pub async fn fleet<S: SessionStore>(&self, guard: &SessionGuard<S>) -> Result<Vec<Robot>> {
        let token = operator_token(guard)?;
        Ok(self.api.robots(token, false).await?)
    }

    /// Live status of one robot.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AccessDenied` without control-panel access and
    /// `ClientError::Api` if the call fails.
    #[instrument(skip(self, guard), fields(robot_id = %id))]
    pub async fn telemetry<S: SessionStore>(
        &self,
        guard: &SessionGuard<S>,
        id: RobotId,
    ) -> Result<RobotTelemetry> {
        let token = operator_token(guard)?;
        Ok(self.api.robot_status(token, id).await?)
    }

    /// Power a robot on.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AccessDenied` without control-panel access and
    /// `ClientError::Api` if the call fails (e.g. already active).
    #[instrument(skip(self, guard), fields(robot_id = %id))]
    pub async fn start<S: SessionStore>(
        &self,
        guard: &SessionGuard<S>,
        id: RobotId,
    ) -> Result<ControlAck> {
        let token = operator_token(guard)?;
        let ack = self.api.robot_start(token, id).await?;
        record("Robot started", id);
        Ok(ack)
    }

    /// Power a robot off.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AccessDenied` without control-panel access and
    /// `ClientError::Api` if the call fails.
    #[instrument(skip(self, guard), fields(robot_id = %id))]
    pub async fn stop<S: SessionStore>(
        &self,
        guard: &SessionGuard<S>,
        id: RobotId,
    ) -> Result<ControlAck> {
        let token = operator_token(guard)?;
        let ack = self.api.robot_stop(token, id).await?;
        record("Robot stopped", id);
        Ok(ack)
    }

    /// Send one manual drive command. `speed` is a percentage and is
    /// clamped to 0..=100.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AccessDenied` without control-panel access and
    /// `ClientError::Api` if the call fails (e.g. robot not active).
    #[instrument(skip(self, guard), fields(robot_id = %id, direction = %direction))]
    pub async fn drive<S: SessionStore>(
        &self,
        guard: &SessionGuard<S>,
        id: RobotId,
        direction: Direction,
        speed: u32,
    ) -> Result<ControlAck> {
        let token = operator_token(guard)?;
        let command = ManualCommand::new(direction, speed);
        if u32::from(command.speed) != speed {
            tracing::debug!(requested = speed, sent = command.speed, "Speed clamped");
        }
        Ok(self.api.robot_manual(token, id, command).await?)
    }

    /// Switch between manual and autonomous operation.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AccessDenied` without control-panel access and
    /// `ClientError::Api` if the call fails.
    #[instrument(skip(self, guard), fields(robot_id = %id, mode = %mode))]
    pub async fn set_mode<S: SessionStore>(
        &self,
        guard: &SessionGuard<S>,
        id: RobotId,
        mode: ControlMode,
    ) -> Result<ControlAck> {
        let token = operator_token(guard)?;
        let ack = self.api.robot_mode(token, id, mode).await?;
        record("Mode switched", id);
        Ok(ack)
    }

    /// Stop a robot immediately, whatever mode it is in.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AccessDenied` without control-panel access and
    /// `ClientError::Api` if the call fails.
    #[instrument(skip(self, guard), fields(robot_id = %id))]
    pub async fn emergency_stop<S: SessionStore>(
        &self,
        guard: &SessionGuard<S>,
        id: RobotId,
    ) -> Result<ControlAck> {
        let token = operator_token(guard)?;
        tracing::warn!("Emergency stop requested");
        let ack = self.api.robot_stop(token, id).await?;
        record("Emergency stop", id);
        Ok(ack)
    }
}

fn operator_token<S: SessionStore>(guard: &SessionGuard<S>) -> Result<&AccessToken> {
    access::check_control_panel(guard.current_user())?;
    Ok(guard.token()?)
}

fn record(message: &str, id: RobotId) {
    let id = id.to_string();
    tracing::info!(robot_id = %id, "{message}");
    error::add_breadcrumb("robot", message, Some(&[("robot_id", id.as_str())]));
}
