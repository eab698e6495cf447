//! Operator certification course.

use sealen_client::Notice;
use sealen_client::services::CertificationService;
use sealen_client::session::SessionStore;
use sealen_core::ModuleId;

use super::{CliError, Context};
use crate::output;

pub async fn modules<S: SessionStore>(ctx: &Context<S>) -> Result<(), CliError> {
    let modules = CertificationService::new(ctx.api()).modules().await?;
    output::modules(&modules);
    Ok(())
}

pub async fn progress<S: SessionStore>(ctx: &Context<S>) -> Result<(), CliError> {
    let progress = CertificationService::new(ctx.api())
        .progress(&ctx.guard)
        .await?;
    output::progress(&progress);
    Ok(())
}

/// Mark one module done. Completing a module twice is a no-op.
pub async fn complete_module<S: SessionStore>(
    ctx: &mut Context<S>,
    module: i64,
) -> Result<(), CliError> {
    let api = ctx.api.clone();
    let update = CertificationService::new(api.as_ref())
        .complete_module(&mut ctx.guard, ModuleId::new(module))
        .await?;

    match update {
        Some(_) => output::notice(&Notice::success(format!(
            "Module {module} completed, overall progress {}",
            ctx.guard.certification()
        ))),
        None => output::notice(&Notice::info(format!(
            "Module {module} was already completed"
        ))),
    }
    Ok(())
}

/// Finish the course.
pub async fn complete<S: SessionStore>(ctx: &mut Context<S>) -> Result<(), CliError> {
    let api = ctx.api.clone();
    let certificate = CertificationService::new(api.as_ref())
        .complete(&mut ctx.guard)
        .await?;
    output::notice(&Notice::success(
        "Certification complete, purchases are now unlocked",
    ));
    output::certificate(&certificate);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sealen_core::CertificationLevel;
    use sealen_core::access;

    use super::*;
    use crate::commands::testing;

    #[tokio::test]
    async fn test_modules_need_no_login() {
        let (ctx, _mock) = testing::context().await;
        modules(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_progress_needs_login() {
        let (ctx, mock) = testing::context().await;
        assert!(progress(&ctx).await.is_err());
        assert!(mock.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_course_unlocks_purchase() {
        let (mut ctx, _mock) = testing::logged_in("customer@sealen.id", "Customer123").await;
        for module in 1..=4 {
            complete_module(&mut ctx, module).await.unwrap();
        }
        complete(&mut ctx).await.unwrap();

        assert_eq!(ctx.guard.certification(), CertificationLevel::COMPLETE);
        assert!(access::can_purchase(ctx.guard.current_user()));
    }
}
