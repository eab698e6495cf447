//! Fleet dashboard.

use sealen_core::DashboardOverview;
use sealen_core::access;

use crate::api::MarineApi;
use crate::error::Result;
use crate::session::{SessionGuard, SessionStore};

/// Fleet metrics for admins.
pub struct DashboardService<'a> {
    api: &'a dyn MarineApi,
}

impl<'a> DashboardService<'a> {
    #[must_use]
    pub const fn new(api: &'a dyn MarineApi) -> Self {
        Self { api }
    }

    /// Current fleet metrics.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AccessDenied` for anyone but an admin and
    /// `ClientError::Api` if the call fails.
    pub async fn overview<S: SessionStore>(
        &self,
        guard: &SessionGuard<S>,
    ) -> Result<DashboardOverview> {
        access::check_dashboard(guard.current_user())?;
        Ok(self.api.dashboard_overview(guard.token()?).await?)
    }
}
