//! Robots and their telemetry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{RobotId, RobotStatus, UserId};

/// A robot in the fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Robot {
    #[serde(rename = "robot_id")]
    pub id: RobotId,
    #[serde(rename = "robot_name")]
    pub name: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub model_type: Option<String>,
    #[serde(default, deserialize_with = "status_or_unknown")]
    pub status: RobotStatus,
    #[serde(rename = "battery_lvl", default)]
    pub battery: u8,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub current_position: Option<Position>,
    #[serde(default)]
    pub firmware_version: Option<String>,
    /// `None` for fleet robots available to rent.
    #[serde(default)]
    pub owner_id: Option<UserId>,
}

impl Robot {
    /// Whether the robot may be offered in the rental form.
    #[must_use]
    pub const fn is_rentable(&self) -> bool {
        self.status.is_rentable()
    }
}

/// A robot with a `null` status has never reported in and is treated as
/// unknown, which keeps it out of the rental list.
fn status_or_unknown<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RobotStatus, D::Error> {
    Ok(Option::<RobotStatus>::deserialize(deserializer)?.unwrap_or(RobotStatus::Unknown))
}

/// Geographic position. Every coordinate is optional because the API sends
/// `{}` for robots that have never reported in.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Metres below the surface.
    #[serde(default)]
    pub depth: Option<f64>,
}

/// Latest sensor readings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorReadings {
    /// Water temperature in degrees Celsius.
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub ph: Option<f64>,
    #[serde(default)]
    pub water_quality: Option<f64>,
}

/// Live status of one robot, as shown on the control panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotTelemetry {
    pub robot_id: RobotId,
    pub connected: bool,
    pub battery: u8,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub sensors: SensorReadings,
    #[serde(default)]
    pub speed: f64,
    #[serde(default, deserialize_with = "status_or_unknown")]
    pub status: RobotStatus,
    #[serde(default, with = "super::timestamp::option")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl RobotTelemetry {
    /// Battery band used for the gauge colour: above 50 is healthy,
    /// above 20 is low, anything else is critical.
    #[must_use]
    pub const fn battery_band(&self) -> BatteryBand {
        match self.battery {
            51.. => BatteryBand::Healthy,
            21..=50 => BatteryBand::Low,
            _ => BatteryBand::Critical,
        }
    }
}

/// Coarse battery level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryBand {
    Healthy,
    Low,
    Critical,
}
