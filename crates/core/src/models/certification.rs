//! Operator certification course.
//!
//! Certification is earned by finishing every module of the course. Once a
//! user is certified they may purchase products; until then they may only
//! rent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CertificateId, ModuleId, UserId};

/// Course completion, clamped to 0..=100 percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct CertificationLevel(u8);

impl CertificationLevel {
    /// No modules completed.
    pub const NONE: Self = Self(0);
    /// Course finished.
    pub const COMPLETE: Self = Self(100);

    /// Create a level, clamping out-of-range input.
    #[must_use]
    pub fn new(percent: i64) -> Self {
        Self(u8::try_from(percent.clamp(0, 100)).unwrap_or(0))
    }

    /// Percentage value.
    #[must_use]
    pub const fn percent(self) -> u8 {
        self.0
    }

    /// Whether the course is finished.
    #[must_use]
    pub const fn is_complete(self) -> bool {
        self.0 >= 100
    }
}

impl From<i64> for CertificationLevel {
    fn from(percent: i64) -> Self {
        Self::new(percent)
    }
}

impl From<CertificationLevel> for u8 {
    fn from(level: CertificationLevel) -> Self {
        level.0
    }
}

impl std::fmt::Display for CertificationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// One module of the course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationModule {
    pub id: ModuleId,
    pub module_number: u32,
    pub title: String,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
    pub order_index: u32,
}

/// A module together with the current user's progress on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleProgress {
    #[serde(flatten)]
    pub module: CertificationModule,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub progress_percentage: CertificationLevel,
}

/// The current user's progress across the whole course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationProgress {
    pub modules: Vec<ModuleProgress>,
    pub overall_progress: CertificationLevel,
    pub completed_modules: u32,
    pub total_modules: u32,
    pub is_certified: bool,
}

impl CertificationProgress {
    /// Modules not yet completed, in course order.
    pub fn remaining(&self) -> impl Iterator<Item = &ModuleProgress> {
        let mut pending: Vec<&ModuleProgress> =
            self.modules.iter().filter(|m| !m.completed).collect();
        pending.sort_by_key(|m| m.module.order_index);
        pending.into_iter()
    }

    /// Progress entry for one module.
    #[must_use]
    pub fn module(&self, id: ModuleId) -> Option<&ModuleProgress> {
        self.modules.iter().find(|m| m.module.id == id)
    }
}

/// Stored progress for one module after an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleProgressUpdate {
    pub module_id: ModuleId,
    pub completed: bool,
    pub progress_percentage: CertificationLevel,
    #[serde(default, with = "super::timestamp::option")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Certificate issued on course completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    #[serde(rename = "cert_id")]
    pub id: CertificateId,
    pub user_id: UserId,
    pub cert_type: String,
    #[serde(with = "super::timestamp")]
    pub issued_date: DateTime<Utc>,
    #[serde(default, with = "super::timestamp::option")]
    pub expiry_date: Option<DateTime<Utc>>,
    pub status: String,
    pub cert_number: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_level_clamps() {
        assert_eq!(CertificationLevel::new(-5), CertificationLevel::NONE);
        assert_eq!(CertificationLevel::new(250), CertificationLevel::COMPLETE);
        assert_eq!(CertificationLevel::new(40).percent(), 40);
        assert!(!CertificationLevel::new(99).is_complete());
        assert_eq!(CertificationLevel::new(40).to_string(), "40%");
    }

    #[test]
    fn test_decode_progress() {
        let progress: CertificationProgress = serde_json::from_value(json!({
            "modules": [
                {"id": 2, "module_number": 2, "title": "Navigasi", "order_index": 2,
                 "completed": false, "progress_percentage": 0},
                {"id": 1, "module_number": 1, "title": "Dasar", "order_index": 1,
                 "duration_minutes": 45, "completed": true, "progress_percentage": 100},
                {"id": 3, "module_number": 3, "title": "Perawatan", "order_index": 3,
                 "completed": false, "progress_percentage": 30}
            ],
            "overall_progress": 43,
            "completed_modules": 1,
            "total_modules": 3,
            "is_certified": false
        }))
        .unwrap();

        assert_eq!(progress.overall_progress.percent(), 43);
        let remaining: Vec<ModuleId> = progress.remaining().map(|m| m.module.id).collect();
        assert_eq!(remaining, vec![ModuleId::new(2), ModuleId::new(3)]);
        assert!(progress.module(ModuleId::new(1)).unwrap().completed);
    }
}
