//! Operator certification course.

use tracing::instrument;

use sealen_core::{
    Certificate, CertificationLevel, CertificationModule, CertificationProgress, ModuleId,
    ModuleProgressUpdate,
};

use crate::api::MarineApi;
use crate::error::{self, Result};
use crate::session::{SessionGuard, SessionStore};

/// Certification service.
pub struct CertificationService<'a> {
    api: &'a dyn MarineApi,
}

impl<'a> CertificationService<'a> {
    #[must_use]
    pub const fn new(api: &'a dyn MarineApi) -> Self {
        Self { api }
    }

    /// The course outline. Needs no login.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the call fails.
    pub async fn modules(&self) -> Result<Vec<CertificationModule>> {
        Ok(self.api.certification_modules().await?)
    }

    /// The user's progress across the course.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AccessDenied` when logged out and
    /// `ClientError::Api` if the call fails.
    pub async fn progress<S: SessionStore>(
        &self,
        guard: &SessionGuard<S>,
    ) -> Result<CertificationProgress> {
        Ok(self.api.certification_progress(guard.token()?).await?)
    }

    /// Mark one module as finished.
    ///
    /// Returns `None` without calling the API when the module is already
    /// complete. The guard's course progress is updated either way.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AccessDenied` when logged out and
    /// `ClientError::Api` if a call fails (including an unknown module).
    #[instrument(skip(self, guard), fields(module_id = %module))]
    pub async fn complete_module<S: SessionStore>(
        &self,
        guard: &mut SessionGuard<S>,
        module: ModuleId,
    ) -> Result<Option<ModuleProgressUpdate>> {
        let token = guard.token()?.clone();

        let before = self.api.certification_progress(&token).await?;
        if before.module(module).is_some_and(|m| m.completed) {
            tracing::debug!("Module already completed");
            guard.set_certification(before.overall_progress);
            return Ok(None);
        }

        let update = self
            .api
            .update_module_progress(&token, module, CertificationLevel::COMPLETE, true)
            .await?;

        let after = self.api.certification_progress(&token).await?;
        guard.set_certification(after.overall_progress);

        tracing::info!(overall = %after.overall_progress, "Module completed");
        let module_id = module.to_string();
        error::add_breadcrumb(
            "certification",
            "Module completed",
            Some(&[("module_id", module_id.as_str())]),
        );
        Ok(Some(update))
    }

    /// Finish the course and receive the certificate.
    ///
    /// The session user is re-fetched afterwards so purchasing unlocks
    /// without logging in again.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AccessDenied` when logged out and
    /// `ClientError::Api` if a call fails.
    #[instrument(skip_all)]
    pub async fn complete<S: SessionStore>(
        &self,
        guard: &mut SessionGuard<S>,
    ) -> Result<Certificate> {
        let token = guard.token()?.clone();
        let certificate = self.api.complete_certification(&token).await?;

        guard.set_certification(CertificationLevel::COMPLETE);
        let user = guard.refresh_user(self.api).await?;
        tracing::info!(
            user_id = %user.id,
            certified = user.is_certified,
            cert_number = %certificate.cert_number,
            "Certification completed"
        );
        error::add_breadcrumb("certification", "Certification completed", None);
        Ok(certificate)
    }
}
