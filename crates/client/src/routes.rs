//! Navigation targets and route guards.
//!
//! Two route sets exist: the customer-facing [`Page`]s and the operator
//! [`ShellRoute`]s. Both are closed enums. Unknown page names fail to parse
//! and unknown shell paths become [`ShellRoute::NotFound`]; nothing falls
//! back to the home page silently.
//!
//! [`authorize`] decides synchronously whether the current user may open a
//! route, from the user record alone.

use std::fmt;
use std::str::FromStr;

use sealen_core::User;
use sealen_core::access::{self, Denial};

/// What a route needs from the current user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Anyone, logged in or not.
    Public,
    /// Any logged-in user.
    Authenticated,
    /// An admin or operator.
    ControlPanel,
    /// An admin.
    Dashboard,
}

/// A set of routes the guard can protect.
pub trait Route: Sized {
    /// The login route of this set.
    fn login() -> Self;

    /// The landing route users are sent to after a refusal.
    fn home() -> Self;

    /// Access requirement of this route.
    fn requirement(&self) -> Requirement;

    /// Location string preserved across a login redirect.
    fn location(&self) -> String;

    /// Inverse of [`Route::location`].
    fn from_location(location: &str) -> Option<Self>;
}

/// Outcome of a route check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation<R> {
    /// Render the requested route.
    Allow(R),
    /// Nobody is logged in. Show the login route, then return to
    /// `return_to`.
    RedirectToLogin { return_to: R },
    /// Logged in without the right role. Show home with a notice.
    RedirectHome { denial: Denial },
}

impl<R: Route> Navigation<R> {
    /// The route to render now.
    #[must_use]
    pub fn destination(self) -> R {
        match self {
            Self::Allow(route) => route,
            Self::RedirectToLogin { .. } => R::login(),
            Self::RedirectHome { .. } => R::home(),
        }
    }
}

/// Decide whether `user` may open `route`.
#[must_use]
pub fn authorize<R: Route>(route: R, user: Option<&User>) -> Navigation<R> {
    let check = match route.requirement() {
        Requirement::Public => return Navigation::Allow(route),
        _ if user.is_none() => return Navigation::RedirectToLogin { return_to: route },
        Requirement::Authenticated => Ok(()),
        Requirement::ControlPanel => access::check_control_panel(user),
        Requirement::Dashboard => access::check_dashboard(user),
    };

    match check {
        Ok(()) => Navigation::Allow(route),
        Err(denial) => Navigation::RedirectHome { denial },
    }
}

/// Page to show after an action is refused for `denial`.
#[must_use]
pub const fn redirect_for(denial: Denial) -> Page {
    match denial {
        Denial::NotLoggedIn => Page::Login,
        Denial::CertificationRequired => Page::Certification,
        Denial::OperatorRequired | Denial::AdminRequired => Page::Home,
    }
}

// =============================================================================
// Customer-facing pages
// =============================================================================

/// A customer-facing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Page {
    #[default]
    Home,
    Certification,
    Products,
    Rent,
    Control,
    Dashboard,
    Login,
    Register,
    Technology,
}

impl Page {
    /// Every page, in navigation-bar order.
    pub const ALL: [Self; 9] = [
        Self::Home,
        Self::Products,
        Self::Rent,
        Self::Certification,
        Self::Technology,
        Self::Control,
        Self::Dashboard,
        Self::Login,
        Self::Register,
    ];

    /// Page name as used in links.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Certification => "certification",
            Self::Products => "products",
            Self::Rent => "rent",
            Self::Control => "control",
            Self::Dashboard => "dashboard",
            Self::Login => "login",
            Self::Register => "register",
            Self::Technology => "technology",
        }
    }

    /// Human-readable title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Certification => "Operator Certification",
            Self::Products => "Products",
            Self::Rent => "Rent a Robot",
            Self::Control => "Robot Control",
            Self::Dashboard => "Fleet Dashboard",
            Self::Login => "Log In",
            Self::Register => "Create Account",
            Self::Technology => "Technology",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a page name outside the closed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown page: {0}")]
pub struct UnknownPage(pub String);

impl FromStr for Page {
    type Err = UnknownPage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|page| page.as_str() == name)
            .ok_or_else(|| UnknownPage(s.trim().to_string()))
    }
}

impl Route for Page {
    fn login() -> Self {
        Self::Login
    }

    fn home() -> Self {
        Self::Home
    }

    fn requirement(&self) -> Requirement {
        match self {
            Self::Home
            | Self::Products
            | Self::Technology
            | Self::Login
            | Self::Register => Requirement::Public,
            Self::Certification | Self::Rent => Requirement::Authenticated,
            Self::Control => Requirement::ControlPanel,
            Self::Dashboard => Requirement::Dashboard,
        }
    }

    fn location(&self) -> String {
        self.as_str().to_string()
    }

    fn from_location(location: &str) -> Option<Self> {
        location.parse().ok()
    }
}

// =============================================================================
// Operator shell
// =============================================================================

/// A route of the operator shell, addressed by path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShellRoute {
    Welcome,
    Dashboard,
    ManualControl,
    Education,
    Login,
    /// Any other path, kept verbatim.
    NotFound(String),
}

impl ShellRoute {
    /// Route for a request path. Query strings and trailing slashes are
    /// ignored.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let trimmed = path.split(['?', '#']).next().unwrap_or_default();
        match trimmed.trim_end_matches('/') {
            "" => Self::Welcome,
            "/dashboard" => Self::Dashboard,
            "/manual-control" => Self::ManualControl,
            "/education" => Self::Education,
            "/login" => Self::Login,
            _ => Self::NotFound(path.to_string()),
        }
    }

    /// Canonical path.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Welcome => "/",
            Self::Dashboard => "/dashboard",
            Self::ManualControl => "/manual-control",
            Self::Education => "/education",
            Self::Login => "/login",
            Self::NotFound(path) => path,
        }
    }
}

impl Route for ShellRoute {
    fn login() -> Self {
        Self::Login
    }

    fn home() -> Self {
        Self::Welcome
    }

    fn requirement(&self) -> Requirement {
        match self {
            Self::Login => Requirement::Public,
            Self::Welcome
            | Self::Dashboard
            | Self::ManualControl
            | Self::Education
            | Self::NotFound(_) => Requirement::Authenticated,
        }
    }

    fn location(&self) -> String {
        self.path().to_string()
    }

    fn from_location(location: &str) -> Option<Self> {
        Some(Self::from_path(location))
    }
}
