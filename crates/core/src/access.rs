//! Access rules.
//!
//! Pure predicates over the current user. `None` means nobody is logged in,
//! and every predicate answers `false` for it. Callers decide what to do on
//! refusal (redirect, notice); the `check_*` variants name the reason so the
//! notice can say why.

use crate::models::User;
use crate::types::Role;

/// Roles allowed on the robot control panel.
const CONTROL_PANEL_ROLES: &[Role] = &[Role::Admin, Role::Operator];

/// Roles allowed on the fleet dashboard.
const DASHBOARD_ROLES: &[Role] = &[Role::Admin];

/// Why an action was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Denial {
    /// Nobody is logged in.
    #[error("please log in first")]
    NotLoggedIn,
    /// Purchases need a finished certification.
    #[error("complete the certification before purchasing")]
    CertificationRequired,
    /// Control panel is for admins and operators.
    #[error("access denied: only admins and operators can control robots")]
    OperatorRequired,
    /// Dashboard is for admins.
    #[error("access denied: only admins can open the dashboard")]
    AdminRequired,
}

/// Whether `user` may purchase products.
#[must_use]
pub fn can_purchase(user: Option<&User>) -> bool {
    user.is_some_and(|u| u.is_certified)
}

/// Whether `user` may open the robot control panel.
#[must_use]
pub fn can_access_control_panel(user: Option<&User>) -> bool {
    user.is_some_and(|u| u.has_any_role(CONTROL_PANEL_ROLES))
}

/// Whether `user` may open the fleet dashboard.
#[must_use]
pub fn can_access_dashboard(user: Option<&User>) -> bool {
    user.is_some_and(|u| u.has_any_role(DASHBOARD_ROLES))
}

/// [`can_purchase`], with the reason on refusal.
///
/// # Errors
///
/// [`Denial::NotLoggedIn`] without a user, otherwise
/// [`Denial::CertificationRequired`] when the user is not certified.
pub fn check_purchase(user: Option<&User>) -> Result<(), Denial> {
    match user {
        None => Err(Denial::NotLoggedIn),
        Some(_) if can_purchase(user) => Ok(()),
        Some(_) => Err(Denial::CertificationRequired),
    }
}

/// [`can_access_control_panel`], with the reason on refusal.
///
/// # Errors
///
/// [`Denial::NotLoggedIn`] or [`Denial::OperatorRequired`].
pub fn check_control_panel(user: Option<&User>) -> Result<(), Denial> {
    match user {
        None => Err(Denial::NotLoggedIn),
        Some(_) if can_access_control_panel(user) => Ok(()),
        Some(_) => Err(Denial::OperatorRequired),
    }
}

/// [`can_access_dashboard`], with the reason on refusal.
///
/// # Errors
///
/// [`Denial::NotLoggedIn`] or [`Denial::AdminRequired`].
pub fn check_dashboard(user: Option<&User>) -> Result<(), Denial> {
    match user {
        None => Err(Denial::NotLoggedIn),
        Some(_) if can_access_dashboard(user) => Ok(()),
        Some(_) => Err(Denial::AdminRequired),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Email, UserId};

    fn user(role: Role, certified: bool) -> User {
        User {
            id: UserId::new(1),
            username: "u".to_owned(),
            email: Email::parse("u@sealen.id").unwrap(),
            full_name: "U".to_owned(),
            role,
            is_certified: certified,
            created_at: None,
        }
    }

    #[test]
    fn test_purchase_follows_certification() {
        assert!(!can_purchase(Some(&user(Role::Customer, false))));
        assert!(can_purchase(Some(&user(Role::Customer, true))));
        // Role does not matter, only the certificate does
        assert!(!can_purchase(Some(&user(Role::Admin, false))));
    }

    #[test]
    fn test_control_panel_roles() {
        assert!(can_access_control_panel(Some(&user(Role::Admin, false))));
        assert!(can_access_control_panel(Some(&user(Role::Operator, false))));
        assert!(!can_access_control_panel(Some(&user(Role::Customer, true))));
    }

    #[test]
    fn test_dashboard_is_admin_only() {
        assert!(can_access_dashboard(Some(&user(Role::Admin, false))));
        assert!(!can_access_dashboard(Some(&user(Role::Operator, true))));
        assert!(!can_access_dashboard(Some(&user(Role::Customer, true))));
    }

    #[test]
    fn test_anonymous_is_refused_everything() {
        assert!(!can_purchase(None));
        assert!(!can_access_control_panel(None));
        assert!(!can_access_dashboard(None));

        assert_eq!(check_purchase(None), Err(Denial::NotLoggedIn));
        assert_eq!(check_control_panel(None), Err(Denial::NotLoggedIn));
        assert_eq!(check_dashboard(None), Err(Denial::NotLoggedIn));
    }

    #[test]
    fn test_check_names_the_reason() {
        let operator = user(Role::Operator, false);
        assert_eq!(
            check_purchase(Some(&operator)),
            Err(Denial::CertificationRequired)
        );
        assert_eq!(check_control_panel(Some(&operator)), Ok(()));
        assert_eq!(check_dashboard(Some(&operator)), Err(Denial::AdminRequired));

        let customer = user(Role::Customer, true);
        assert_eq!(
            check_control_panel(Some(&customer)),
            Err(Denial::OperatorRequired)
        );
        assert_eq!(check_purchase(Some(&customer)), Ok(()));
    }
}
