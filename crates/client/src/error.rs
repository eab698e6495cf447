//! Unified error handling with Sentry integration.
//!
//! Every user flow returns `Result<T, ClientError>`. Front ends turn the
//! error into a [`Notice`] for display and call [`ClientError::report`],
//! which sends only faults worth investigating to Sentry: server failures,
//! transport errors and local storage problems. Refusals the user can act on
//! (bad form input, missing permissions) are not reported.

use thiserror::Error;

use sealen_core::access::Denial;

use crate::api::ApiError;
use crate::forms::FormErrors;
use crate::session::SessionStoreError;

/// Error type for client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The current user may not do this.
    #[error("Access denied: {0}")]
    AccessDenied(#[from] Denial),

    /// Form input failed validation; nothing was sent.
    #[error("Invalid input: {0}")]
    Validation(#[from] FormErrors),

    /// The API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// The session could not be read or written locally.
    #[error("Session storage error: {0}")]
    SessionStore(#[from] SessionStoreError),

    /// The product or robot cannot be booked right now.
    #[error("Unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Whether this error should be sent to Sentry.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        match self {
            Self::Api(err) => matches!(
                err,
                ApiError::Http(_) | ApiError::Parse(_) | ApiError::Url(_) | ApiError::Server { .. }
            ),
            Self::SessionStore(_) => true,
            Self::AccessDenied(_) | Self::Validation(_) | Self::Unavailable(_) => false,
        }
    }

    /// Capture reportable errors to Sentry and log them.
    pub fn report(&self) {
        if self.is_reportable() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Client error"
            );
        } else {
            tracing::debug!(error = %self, "Request refused");
        }
    }

    /// What to show the user.
    ///
    /// Server-provided reasons for refused requests are passed through;
    /// internal failures get a generic message.
    #[must_use]
    pub fn notice(&self) -> Notice {
        match self {
            Self::AccessDenied(denial) => Notice::warning(sentence(&denial.to_string())),
            Self::Validation(errors) => {
                Notice::error(format!("Please correct the form: {errors}"))
            }
            Self::Unavailable(reason) => Notice::warning(reason.clone()),
            Self::SessionStore(_) => {
                Notice::error("Could not save your session on this device")
            }
            Self::Api(ApiError::Unauthorized(_)) => {
                Notice::warning("Your session has expired, please log in again")
            }
            Self::Api(ApiError::RateLimited(secs)) => Notice::warning(format!(
                "Too many requests, please retry in {secs} seconds"
            )),
            Self::Api(err) => err.server_message().map_or_else(
                || Notice::error("Something went wrong talking to Sealen, please try again"),
                |message| Notice::error(message.to_string()),
            ),
        }
    }
}

/// Capitalise the first letter.
fn sentence(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl NoticeLevel {
    /// Lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// A short message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.level.as_str(), self.message)
    }
}

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user
/// actions leading up to an error.
///
/// ```rust,ignore
/// add_breadcrumb("booking", "Rental requested", Some(&[("robot_id", "2")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display() {
        let err = ClientError::from(Denial::AdminRequired);
        assert_eq!(
            err.to_string(),
            "Access denied: access denied: only admins can open the dashboard"
        );

        let err = ClientError::Unavailable("CleanBot Pro is out of stock".to_string());
        assert_eq!(err.to_string(), "Unavailable: CleanBot Pro is out of stock");
    }

    #[test]
    fn test_notice_passes_through_server_reason() {
        let err = ClientError::from(ApiError::Rejected {
            status: 400,
            message: "Robot is not active".to_string(),
        });
        assert_eq!(err.notice(), Notice::error("Robot is not active"));
        assert!(!err.is_reportable());
    }

    #[test]
    fn test_notice_hides_server_failures() {
        let err = ClientError::from(ApiError::Server {
            status: 500,
            message: "Traceback (most recent call last)".to_string(),
        });
        let notice = err.notice();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(!notice.message.contains("Traceback"));
        assert!(err.is_reportable());
    }

    #[test]
    fn test_notice_for_expired_session_and_rate_limit() {
        let expired = ClientError::from(ApiError::Unauthorized("Token has expired".to_string()));
        assert_eq!(
            expired.notice().message,
            "Your session has expired, please log in again"
        );

        let limited = ClientError::from(ApiError::RateLimited(60));
        assert_eq!(
            limited.notice().message,
            "Too many requests, please retry in 60 seconds"
        );
    }

    #[test]
    fn test_denial_notice_is_a_sentence() {
        let notice = ClientError::from(Denial::NotLoggedIn).notice();
        assert_eq!(notice, Notice::warning("Please log in first"));
        assert_eq!(notice.to_string(), "[warning] Please log in first");
    }

    #[test]
    fn test_sentence() {
        assert_eq!(sentence(""), "");
        assert_eq!(sentence("ok"), "Ok");
    }
}
