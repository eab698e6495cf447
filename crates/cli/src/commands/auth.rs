//! Session commands.

use secrecy::ExposeSecret;

use sealen_client::forms::{LoginForm, RegistrationForm};
use sealen_client::session::SessionStore;
use sealen_client::{ClientError, Notice};

use super::{CliError, Context, pages, secret_or_prompt};
use crate::output;

/// Log in, persist the session and return to the page that asked for it.
pub async fn login<S: SessionStore>(
    ctx: &mut Context<S>,
    email: &str,
    password: Option<String>,
) -> Result<(), CliError> {
    let form = LoginForm {
        email: email.to_string(),
        password: secret_or_prompt(password, "Password")?,
    };
    let credentials = form.validate().map_err(ClientError::from)?;

    let api = ctx.api.clone();
    let session = ctx.guard.login(api.as_ref(), &credentials).await?;

    output::notice(&Notice::success(format!(
        "Welcome, {}",
        session.user().full_name
    )));
    output::user(session.user(), session.certification());
    pages::resume(ctx).await
}

/// Create an account and log in.
pub async fn register<S: SessionStore>(
    ctx: &mut Context<S>,
    name: String,
    email: String,
    role: String,
    password: Option<String>,
    confirm_password: Option<String>,
) -> Result<(), CliError> {
    let password = secret_or_prompt(password, "Password")?;
    let confirm_password = match confirm_password {
        Some(confirm) => secret_or_prompt(Some(confirm), "Confirm password")?,
        None => password.expose_secret().to_string().into(),
    };

    let form = RegistrationForm {
        name,
        email,
        password,
        confirm_password,
        role,
    };
    let profile = form.validate().map_err(ClientError::from)?;

    let api = ctx.api.clone();
    let session = ctx.guard.register(api.as_ref(), &profile).await?;

    output::notice(&Notice::success("Account created"));
    output::user(session.user(), session.certification());
    pages::resume(ctx).await
}

/// End the session. Always succeeds locally.
pub async fn logout<S: SessionStore>(ctx: &mut Context<S>) {
    if !ctx.guard.is_authenticated() {
        output::notice(&Notice::info("Not logged in"));
        return;
    }
    let api = ctx.api.clone();
    ctx.guard.logout(api.as_ref()).await;
    output::notice(&Notice::success("Logged out"));
}

/// Show who is logged in.
pub fn whoami<S: SessionStore>(ctx: &Context<S>) {
    match ctx.guard.session() {
        Some(session) => output::user(session.user(), session.certification()),
        None => output::notice(&Notice::info("Not logged in")),
    }
}

/// Exchange the refresh token for a fresh access token.
pub async fn renew<S: SessionStore>(ctx: &mut Context<S>) -> Result<(), CliError> {
    let api = ctx.api.clone();
    ctx.guard.renew_token(api.as_ref()).await?;
    output::notice(&Notice::success("Session renewed"));
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sealen_core::Role;

    use super::*;
    use crate::commands::testing;

    #[tokio::test]
    async fn test_login_establishes_session() {
        let (ctx, _mock) = testing::logged_in("operator@sealen.id", "Operator123").await;
        assert_eq!(ctx.guard.current_user().unwrap().role, Role::Operator);
        assert!(ctx.guard.store().load().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalid_form_never_reaches_api() {
        let (mut ctx, mock) = testing::context().await;
        let err = login(&mut ctx, "not-an-email", Some("x".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Client(ClientError::Validation(_))));
        assert!(mock.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_register_defaults_confirmation_to_password() {
        let (mut ctx, _mock) = testing::context().await;
        register(
            &mut ctx,
            "Rina".to_string(),
            "rina@sealen.id".to_string(),
            "customer".to_string(),
            Some("Secret123".to_string()),
            None,
        )
        .await
        .unwrap();
        assert!(ctx.guard.is_authenticated());
    }

    #[tokio::test]
    async fn test_register_rejects_mismatched_confirmation() {
        let (mut ctx, _mock) = testing::context().await;
        let err = register(
            &mut ctx,
            "Rina".to_string(),
            "rina@sealen.id".to_string(),
            "customer".to_string(),
            Some("Secret123".to_string()),
            Some("Secret124".to_string()),
        )
        .await
        .unwrap_err();
        let CliError::Client(ClientError::Validation(errors)) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get("confirm_password"), Some("Passwords do not match"));
    }

    #[tokio::test]
    async fn test_logout_clears_store() {
        let (mut ctx, _mock) = testing::logged_in("admin@sealen.id", "Admin123").await;
        logout(&mut ctx).await;
        assert!(!ctx.guard.is_authenticated());
        assert!(ctx.guard.store().load().unwrap().is_none());
    }
}
