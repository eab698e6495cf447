//! The session state machine.

use secrecy::SecretString;
use tracing::instrument;

use sealen_core::access::Denial;
use sealen_core::{CertificationLevel, User};

use crate::api::{AccessToken, AuthResponse, AuthTokens, Credentials, MarineApi, RegistrationProfile};
use crate::error::{self, ClientError};
use crate::routes::{self, Navigation, Route};

use super::store::SessionStore;

/// An authenticated session.
#[derive(Debug, Clone)]
pub struct Session {
    user: User,
    tokens: AuthTokens,
    certification: CertificationLevel,
}

impl Session {
    #[must_use]
    pub const fn user(&self) -> &User {
        &self.user
    }

    /// Bearer token for API calls.
    #[must_use]
    pub const fn token(&self) -> &AccessToken {
        &self.tokens.access
    }

    /// Course progress as of the last refresh.
    #[must_use]
    pub const fn certification(&self) -> CertificationLevel {
        self.certification
    }
}

/// Whether someone is logged in.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticated(Session),
}

/// Owns the session and answers "who is logged in" for the rest of the
/// client.
///
/// The guard is an ordinary value passed to whoever needs it. Transitions
/// take `&mut self` and are the only way the state changes; reads and route
/// checks are synchronous and never touch the network.
#[derive(Debug)]
pub struct SessionGuard<S> {
    store: S,
    state: SessionState,
    return_to: Option<String>,
}

impl<S: SessionStore> SessionGuard<S> {
    /// A logged-out guard over `store`. Call [`restore`](Self::restore) to
    /// pick up a stored session.
    pub const fn new(store: S) -> Self {
        Self {
            store,
            state: SessionState::Unauthenticated,
            return_to: None,
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    pub const fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated(_))
    }

    pub const fn session(&self) -> Option<&Session> {
        match &self.state {
            SessionState::Authenticated(session) => Some(session),
            SessionState::Unauthenticated => None,
        }
    }

    /// The logged-in user, if any.
    pub fn current_user(&self) -> Option<&User> {
        self.session().map(Session::user)
    }

    /// Course progress; zero when logged out.
    pub fn certification(&self) -> CertificationLevel {
        self.session()
            .map_or(CertificationLevel::NONE, Session::certification)
    }

    /// Bearer token of the current session.
    ///
    /// # Errors
    ///
    /// Returns [`Denial::NotLoggedIn`] when logged out.
    pub fn token(&self) -> Result<&AccessToken, Denial> {
        self.session().map(Session::token).ok_or(Denial::NotLoggedIn)
    }

    /// Record new course progress, e.g. after a module is completed.
    pub fn set_certification(&mut self, level: CertificationLevel) {
        if let SessionState::Authenticated(session) = &mut self.state {
            session.certification = level;
        }
    }

    /// Pick up a stored session at startup.
    ///
    /// Without stored tokens this makes no API call. With tokens, the user
    /// is looked up; if that fails for any reason the tokens are discarded
    /// and the guard stays logged out. Failures are logged, not returned.
    #[instrument(skip_all)]
    pub async fn restore(&mut self, api: &dyn MarineApi) -> &SessionState {
        match self.store.load_return_to() {
            Ok(location) => self.return_to = location,
            Err(e) => tracing::warn!(error = %e, "Discarding unreadable return location"),
        }

        let tokens = match self.store.load() {
            Ok(Some(tokens)) => tokens,
            Ok(None) => {
                tracing::debug!("No stored session");
                return self.reset();
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable stored session");
                return self.reset();
            }
        };

        match api.current_user(&tokens.access).await {
            Ok(user) => {
                let certification = load_certification(api, &tokens.access, &user).await;
                tracing::info!(user_id = %user.id, role = %user.role, "Session restored");
                self.establish(user, tokens, certification);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stored session rejected, logging out");
                self.reset();
            }
        }
        &self.state
    }

    /// Log in and persist the tokens.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the API refuses the credentials and
    /// `ClientError::SessionStore` if the tokens cannot be saved.
    #[instrument(skip_all, fields(email = %credentials.email))]
    pub async fn login(
        &mut self,
        api: &dyn MarineApi,
        credentials: &Credentials,
    ) -> Result<&Session, ClientError> {
        let AuthResponse { tokens, user, .. } = api.login(credentials).await?;
        self.store.save(&tokens)?;

        let certification = load_certification(api, &tokens.access, &user).await;
        tracing::info!(user_id = %user.id, role = %user.role, "Logged in");
        error::add_breadcrumb("auth", "Logged in", Some(&[("role", user.role.as_str())]));
        self.establish(user, tokens, certification);
        self.established()
    }

    /// Create an account, log in and persist the tokens. New accounts start
    /// with no course progress.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if registration is refused and
    /// `ClientError::SessionStore` if the tokens cannot be saved.
    #[instrument(skip_all, fields(email = %profile.email, role = %profile.role))]
    pub async fn register(
        &mut self,
        api: &dyn MarineApi,
        profile: &RegistrationProfile,
    ) -> Result<&Session, ClientError> {
        let AuthResponse { tokens, user, .. } = api.register(profile).await?;
        self.store.save(&tokens)?;

        tracing::info!(user_id = %user.id, role = %user.role, "Account created");
        error::add_breadcrumb("auth", "Registered", Some(&[("role", user.role.as_str())]));
        self.establish(user, tokens, CertificationLevel::NONE);
        self.established()
    }

    /// Log out. The server is told on a best-effort basis; local state is
    /// cleared whatever it answers.
    #[instrument(skip_all)]
    pub async fn logout(&mut self, api: &dyn MarineApi) {
        if let SessionState::Authenticated(session) = &self.state {
            if let Err(e) = api.logout(session.token()).await {
                tracing::warn!(error = %e, "Remote logout failed");
            }
            tracing::info!(user_id = %session.user.id, "Logged out");
        }
        error::add_breadcrumb("auth", "Logged out", None);
        self.reset();
    }

    /// Re-fetch the user record and course progress, e.g. after the
    /// certification is completed.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AccessDenied` when logged out. If the API no
    /// longer accepts the token the session is ended and
    /// `ClientError::Api` is returned.
    #[instrument(skip_all)]
    pub async fn refresh_user(&mut self, api: &dyn MarineApi) -> Result<&User, ClientError> {
        let token = self.token()?.clone();
        match api.current_user(&token).await {
            Ok(user) => {
                let certification = load_certification(api, &token, &user).await;
                if let SessionState::Authenticated(session) = &mut self.state {
                    session.user = user;
                    session.certification = certification;
                }
                self.current_user().ok_or(ClientError::AccessDenied(Denial::NotLoggedIn))
            }
            Err(e) => Err(self.expire_on_unauthorized(e.into())),
        }
    }

    /// Trade the refresh token for a new access token and persist it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AccessDenied` when logged out or when the
    /// session has no refresh token, and `ClientError::Api` if the server
    /// refuses (which also ends the session).
    #[instrument(skip_all)]
    pub async fn renew_token(&mut self, api: &dyn MarineApi) -> Result<(), ClientError> {
        let refresh: SecretString = self
            .session()
            .and_then(|s| s.tokens.refresh.clone())
            .ok_or(ClientError::AccessDenied(Denial::NotLoggedIn))?;

        let access = match api.refresh_token(&refresh).await {
            Ok(access) => access,
            Err(e) => return Err(self.expire_on_unauthorized(e.into())),
        };

        if let SessionState::Authenticated(session) = &mut self.state {
            session.tokens.access = access;
            self.store.save(&session.tokens)?;
            tracing::info!(user_id = %session.user.id, "Access token renewed");
        }
        Ok(())
    }

    /// Check whether the current user may open `route`.
    ///
    /// A login redirect remembers the route, in the store as well so it
    /// survives a restart; read it back with
    /// [`take_return_to`](Self::take_return_to) once logged in.
    pub fn authorize<R: Route>(&mut self, route: R) -> Navigation<R> {
        let navigation = routes::authorize(route, self.current_user());
        match &navigation {
            Navigation::Allow(route) => {
                let location = route.location();
                error::add_breadcrumb("navigation", "Opened page", Some(&[("to", location.as_str())]));
            }
            Navigation::RedirectToLogin { return_to } => {
                let location = return_to.location();
                tracing::debug!(return_to = %location, "Login required");
                if let Err(e) = self.store.save_return_to(Some(&location)) {
                    tracing::warn!(error = %e, "Failed to store return location");
                }
                self.return_to = Some(location);
            }
            Navigation::RedirectHome { denial } => {
                tracing::info!(%denial, "Page refused");
            }
        }
        navigation
    }

    /// The route a login redirect interrupted, if any. Cleared by reading.
    pub fn take_return_to<R: Route>(&mut self) -> Option<R> {
        let location = self.return_to.take()?;
        if let Err(e) = self.store.save_return_to(None) {
            tracing::warn!(error = %e, "Failed to clear stored return location");
        }
        R::from_location(&location)
    }

    /// End the session locally if `err` says the token is no longer valid.
    fn expire_on_unauthorized(&mut self, err: ClientError) -> ClientError {
        if matches!(&err, ClientError::Api(api) if api.is_unauthorized()) {
            tracing::warn!("Session expired");
            self.reset();
        }
        err
    }

    fn establish(&mut self, user: User, tokens: AuthTokens, certification: CertificationLevel) {
        error::set_sentry_user(&user.id, Some(user.email.as_str()));
        self.state = SessionState::Authenticated(Session {
            user,
            tokens,
            certification,
        });
    }

    fn established(&self) -> Result<&Session, ClientError> {
        self.session()
            .ok_or(ClientError::AccessDenied(Denial::NotLoggedIn))
    }

    fn reset(&mut self) -> &SessionState {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "Failed to clear stored session");
        }
        error::clear_sentry_user();
        self.state = SessionState::Unauthenticated;
        &self.state
    }
}

/// Course progress shown after login. Certified users are complete
/// without asking; otherwise a failed lookup counts as no progress.
async fn load_certification(
    api: &dyn MarineApi,
    token: &AccessToken,
    user: &User,
) -> CertificationLevel {
    if user.is_certified {
        return CertificationLevel::COMPLETE;
    }
    match api.certification_progress(token).await {
        Ok(progress) => progress.overall_progress,
        Err(e) => {
            tracing::debug!(error = %e, "Certification progress unavailable");
            CertificationLevel::NONE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use sealen_core::{Email, Role};

    use super::*;
    use crate::api::MockApi;
    use crate::routes::{Page, ShellRoute};
    use crate::session::MemorySessionStore;

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: Email::parse(email).unwrap(),
            password: SecretString::from(password.to_string()),
        }
    }

    fn stale_tokens() -> AuthTokens {
        AuthTokens {
            access: SecretString::from("revoked".to_string()),
            refresh: None,
        }
    }

    #[tokio::test]
    async fn test_restore_without_token_makes_no_call() {
        let api = MockApi::seeded();
        let mut guard = SessionGuard::new(MemorySessionStore::new());

        let state = guard.restore(&api).await;
        assert!(matches!(state, SessionState::Unauthenticated));
        assert!(api.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_restore_with_rejected_token_clears_store() {
        let api = MockApi::seeded();
        let mut guard = SessionGuard::new(MemorySessionStore::with_tokens(stale_tokens()));

        guard.restore(&api).await;
        assert!(!guard.is_authenticated());
        assert!(guard.store().load().unwrap().is_none());
        assert_eq!(api.calls().await, vec!["current_user"]);
    }

    #[tokio::test]
    async fn test_restore_with_outage_clears_store() {
        let api = MockApi::seeded();
        let mut first = SessionGuard::new(MemorySessionStore::new());
        first
            .login(&api, &credentials("customer@sealen.id", "Customer123"))
            .await
            .unwrap();
        let tokens = first.store().load().unwrap().unwrap();

        api.fail("current_user").await;
        let mut guard = SessionGuard::new(MemorySessionStore::with_tokens(tokens));
        guard.restore(&api).await;
        assert!(!guard.is_authenticated());
        assert!(guard.store().load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_then_restore() {
        let api = MockApi::seeded();
        let mut guard = SessionGuard::new(MemorySessionStore::new());

        let session = guard
            .login(&api, &credentials("operator@sealen.id", "Operator123"))
            .await
            .unwrap();
        assert_eq!(session.user().role, Role::Operator);
        let tokens = guard.store().load().unwrap().unwrap();

        let mut next_run = SessionGuard::new(MemorySessionStore::with_tokens(tokens));
        next_run.restore(&api).await;
        assert_eq!(
            next_run.current_user().unwrap().email.as_str(),
            "operator@sealen.id"
        );
    }

    #[tokio::test]
    async fn test_failed_login_leaves_state_alone() {
        let api = MockApi::seeded();
        let mut guard = SessionGuard::new(MemorySessionStore::new());

        let err = guard
            .login(&api, &credentials("operator@sealen.id", "nope-nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Api(ref e) if e.is_unauthorized()));
        assert!(!guard.is_authenticated());
        assert!(guard.store().load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_certification_level_at_login() {
        let api = MockApi::seeded();

        let mut certified = SessionGuard::new(MemorySessionStore::new());
        certified
            .login(&api, &credentials("certified@sealen.id", "Certified123"))
            .await
            .unwrap();
        assert_eq!(certified.certification(), CertificationLevel::COMPLETE);
        assert!(!api.calls().await.contains(&"certification_progress"));

        // A failed progress lookup degrades to zero instead of failing login
        api.fail("certification_progress").await;
        let mut customer = SessionGuard::new(MemorySessionStore::new());
        customer
            .login(&api, &credentials("customer@sealen.id", "Customer123"))
            .await
            .unwrap();
        assert!(customer.is_authenticated());
        assert_eq!(customer.certification(), CertificationLevel::NONE);
    }

    #[tokio::test]
    async fn test_logout_is_best_effort() {
        let api = MockApi::seeded();
        let mut guard = SessionGuard::new(MemorySessionStore::new());
        guard
            .login(&api, &credentials("admin@sealen.id", "Admin123"))
            .await
            .unwrap();

        api.fail("logout").await;
        guard.logout(&api).await;
        assert!(!guard.is_authenticated());
        assert!(guard.store().load().unwrap().is_none());
        assert!(matches!(guard.token(), Err(Denial::NotLoggedIn)));
    }

    #[tokio::test]
    async fn test_expired_token_ends_session_on_refresh() {
        let api = MockApi::seeded();
        let mut guard = SessionGuard::new(MemorySessionStore::new());
        guard
            .login(&api, &credentials("customer@sealen.id", "Customer123"))
            .await
            .unwrap();

        api.expire_tokens().await;
        let err = guard.refresh_user(&api).await.unwrap_err();
        assert!(matches!(err, ClientError::Api(ref e) if e.is_unauthorized()));
        assert!(!guard.is_authenticated());
    }

    #[tokio::test]
    async fn test_renew_token_persists_new_access_token() {
        let api = MockApi::seeded();
        let mut guard = SessionGuard::new(MemorySessionStore::new());
        guard
            .login(&api, &credentials("customer@sealen.id", "Customer123"))
            .await
            .unwrap();
        let before = guard.token().unwrap().expose_secret().to_string();

        api.expire_tokens().await;
        guard.renew_token(&api).await.unwrap();

        let after = guard.token().unwrap().expose_secret().to_string();
        assert_ne!(before, after);
        let stored = guard.store().load().unwrap().unwrap();
        assert_eq!(stored.access.expose_secret(), after);
        assert!(guard.refresh_user(&api).await.is_ok());
    }

    #[tokio::test]
    async fn test_route_checks_preserve_return_location() {
        let api = MockApi::seeded();
        let mut guard = SessionGuard::new(MemorySessionStore::new());

        let nav = guard.authorize(Page::Rent);
        assert_eq!(nav, Navigation::RedirectToLogin { return_to: Page::Rent });

        guard
            .login(&api, &credentials("customer@sealen.id", "Customer123"))
            .await
            .unwrap();
        assert_eq!(guard.take_return_to::<Page>(), Some(Page::Rent));
        assert_eq!(guard.take_return_to::<Page>(), None);
        assert_eq!(guard.authorize(Page::Rent), Navigation::Allow(Page::Rent));
        assert_eq!(
            guard.authorize(Page::Dashboard),
            Navigation::RedirectHome {
                denial: Denial::AdminRequired
            }
        );
    }

    #[tokio::test]
    async fn test_return_location_survives_restore() {
        let api = MockApi::seeded();
        let mut first = SessionGuard::new(MemorySessionStore::new());
        first.authorize(Page::Certification);
        assert_eq!(
            first.store().load_return_to().unwrap().as_deref(),
            Some("certification")
        );

        // Same store, next run: restore picks the location back up
        let mut next_run = SessionGuard::new(first.store);
        next_run.restore(&api).await;
        next_run
            .login(&api, &credentials("customer@sealen.id", "Customer123"))
            .await
            .unwrap();
        assert_eq!(next_run.take_return_to::<Page>(), Some(Page::Certification));
        assert!(next_run.store().load_return_to().unwrap().is_none());
    }

    #[test]
    fn test_shell_redirect_remembers_path() {
        let mut guard = SessionGuard::new(MemorySessionStore::new());
        guard.authorize(ShellRoute::from_path("/education"));
        assert_eq!(
            guard.take_return_to::<ShellRoute>(),
            Some(ShellRoute::Education)
        );
    }

    #[test]
    fn test_logged_out_reads() {
        let guard = SessionGuard::new(MemorySessionStore::new());
        assert!(guard.current_user().is_none());
        assert_eq!(guard.certification(), CertificationLevel::NONE);
        assert!(guard.session().is_none());
    }
}
