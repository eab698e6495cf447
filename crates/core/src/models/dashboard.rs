//! Fleet dashboard metrics.

use serde::{Deserialize, Serialize};

/// Summary shown on the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardOverview {
    pub robots_active: u32,
    pub robots_total: u32,
    /// Square metres cleaned since midnight UTC.
    pub area_cleaned_today: f64,
    /// Kilograms collected since midnight UTC.
    pub waste_collected_today: f64,
    pub energy_efficiency: f64,
    pub water_quality_avg: f64,
    #[serde(default)]
    pub recent_activity: Vec<ActivityEntry>,
}

/// One line of the recent-activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: i64,
    #[serde(default)]
    pub time: Option<String>,
    pub activity: String,
    pub status: String,
}
