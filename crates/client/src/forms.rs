//! Form validation.
//!
//! Forms hold raw user input. `validate` checks every field, collects all
//! problems at once, and on success yields the typed value the API layer
//! takes. Nothing is sent to the server until a form validates.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use sealen_core::pricing::RentalDays;
use sealen_core::{Email, EmailError, RobotId, Role};

use crate::api::{Credentials, RegistrationProfile};

const MIN_LOGIN_PASSWORD_LENGTH: usize = 6;
const MIN_REGISTRATION_PASSWORD_LENGTH: usize = 8;

/// Per-field validation messages, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", summarize(&self.errors))]
pub struct FormErrors {
    errors: BTreeMap<&'static str, String>,
}

fn summarize(errors: &BTreeMap<&'static str, String>) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl FormErrors {
    /// Record a message for `field`. The first message per field wins.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.entry(field).or_insert_with(|| message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Message for one field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    /// `(field, message)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.errors.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

/// Validate an email field, recording the problem under `email`.
fn check_email(raw: &str, errors: &mut FormErrors) -> Option<Email> {
    match Email::parse(raw.trim()) {
        Ok(email) => Some(email),
        Err(EmailError::Empty) => {
            errors.add("email", "Email is required");
            None
        }
        Err(_) => {
            errors.add("email", "Enter a valid email address");
            None
        }
    }
}

/// Login form.
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: SecretString,
}

impl LoginForm {
    /// Check the form and build credentials.
    ///
    /// # Errors
    ///
    /// Returns every field problem found.
    pub fn validate(&self) -> Result<Credentials, FormErrors> {
        let mut errors = FormErrors::default();
        let email = check_email(&self.email, &mut errors);

        let password = self.password.expose_secret();
        if password.is_empty() {
            errors.add("password", "Password is required");
        } else if password.chars().count() < MIN_LOGIN_PASSWORD_LENGTH {
            errors.add(
                "password",
                format!("Password must be at least {MIN_LOGIN_PASSWORD_LENGTH} characters"),
            );
        }

        match email {
            Some(email) if errors.is_empty() => Ok(Credentials {
                email,
                password: self.password.clone(),
            }),
            _ => Err(errors),
        }
    }
}

/// Registration form.
#[derive(Debug, Clone)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
    /// One of `admin`, `operator`, `customer`.
    pub role: String,
}

impl RegistrationForm {
    /// Check the form and build the registration profile.
    ///
    /// # Errors
    ///
    /// Returns every field problem found.
    pub fn validate(&self) -> Result<RegistrationProfile, FormErrors> {
        let mut errors = FormErrors::default();

        let name = self.name.trim();
        if name.is_empty() {
            errors.add("name", "Name is required");
        }

        let email = check_email(&self.email, &mut errors);

        let password = self.password.expose_secret();
        if password.is_empty() {
            errors.add("password", "Password is required");
        } else if !is_strong_password(password) {
            errors.add(
                "password",
                format!(
                    "Password needs at least {MIN_REGISTRATION_PASSWORD_LENGTH} characters \
                     with an uppercase letter, a lowercase letter and a digit"
                ),
            );
        }

        if password != self.confirm_password.expose_secret() {
            errors.add("confirm_password", "Passwords do not match");
        }

        let role = if self.role.trim().is_empty() {
            errors.add("role", "Choose a role");
            None
        } else if let Ok(role) = self.role.parse::<Role>() {
            Some(role)
        } else {
            errors.add("role", "Role must be admin, operator or customer");
            None
        };

        match (email, role) {
            (Some(email), Some(role)) if errors.is_empty() => Ok(RegistrationProfile {
                name: name.to_string(),
                email,
                password: self.password.clone(),
                role,
            }),
            _ => Err(errors),
        }
    }
}

fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= MIN_REGISTRATION_PASSWORD_LENGTH
        && password.chars().any(char::is_uppercase)
        && password.chars().any(char::is_lowercase)
        && password.chars().any(|c| c.is_ascii_digit())
}

/// Rental form, as typed.
#[derive(Debug, Clone, Default)]
pub struct RentalForm {
    pub robot: String,
    /// `YYYY-MM-DD`
    pub start_date: String,
    pub duration_days: String,
    pub location: String,
}

/// A validated rental form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RentalOrder {
    pub robot_id: RobotId,
    /// Midnight UTC on the chosen day.
    pub start_date: DateTime<Utc>,
    pub days: RentalDays,
    pub location: String,
}

impl RentalForm {
    /// Check the form.
    ///
    /// # Errors
    ///
    /// Returns every field problem found.
    pub fn validate(&self) -> Result<RentalOrder, FormErrors> {
        let mut errors = FormErrors::default();

        let robot_id = match self.robot.trim() {
            "" => {
                errors.add("robot", "Choose a robot");
                None
            }
            raw => raw.parse::<RobotId>().ok().or_else(|| {
                errors.add("robot", "Robot must be a numeric id");
                None
            }),
        };

        let start_date = match self.start_date.trim() {
            "" => {
                errors.add("start_date", "Start date is required");
                None
            }
            raw => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
                .or_else(|| {
                    errors.add("start_date", "Start date must be YYYY-MM-DD");
                    None
                }),
        };

        let days = match self.duration_days.trim() {
            "" => {
                errors.add("duration_days", "Duration is required");
                None
            }
            raw => raw.parse::<u32>().ok().and_then(RentalDays::new).or_else(|| {
                errors.add("duration_days", "Duration must be a whole number of days, at least 1");
                None
            }),
        };

        let location = self.location.trim();
        if location.is_empty() {
            errors.add("location", "Location is required");
        }

        match (robot_id, start_date, days) {
            (Some(robot_id), Some(start_date), Some(days)) if errors.is_empty() => Ok(RentalOrder {
                robot_id,
                start_date,
                days,
                location: location.to_string(),
            }),
            _ => Err(errors),
        }
    }
}
