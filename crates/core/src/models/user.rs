//! User accounts as reported by the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{Email, Role, UserId};

/// A registered user.
///
/// Created at registration; the only field this client ever sees change is
/// `is_certified`, which flips once the certification course is finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "user_id")]
    pub id: UserId,
    pub username: String,
    pub email: Email,
    pub full_name: String,
    /// Accounts with a missing or unrecognized role are treated as
    /// customers, the least privileged role.
    #[serde(default = "customer", deserialize_with = "role_or_customer")]
    pub role: Role,
    #[serde(default)]
    pub is_certified: bool,
    #[serde(default, with = "super::timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Whether the user holds one of the given roles.
    #[must_use]
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }
}

const fn customer() -> Role {
    Role::Customer
}

fn role_or_customer<'de, D: Deserializer<'de>>(d: D) -> Result<Role, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw
        .and_then(|role| role.parse().ok())
        .unwrap_or(Role::Customer))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_api_user() {
        let json = r#"{
            "user_id": 3,
            "username": "rina",
            "email": "rina@sealen.id",
            "full_name": "Rina Wulandari",
            "role": "operator",
            "is_certified": false,
            "created_at": "2025-01-10T09:00:00"
        }"#;

        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, UserId::new(3));
        assert_eq!(user.role, Role::Operator);
        assert!(!user.is_certified);
        assert!(user.created_at.is_some());
    }

    #[test]
    fn test_null_role_is_customer() {
        let json = r#"{
            "user_id": 4,
            "username": "guest",
            "email": "guest@sealen.id",
            "full_name": "Guest",
            "role": null,
            "is_certified": true,
            "created_at": null
        }"#;

        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.role, Role::Customer);
        assert!(user.has_any_role(&[Role::Customer]));
        assert!(!user.has_any_role(&[Role::Admin, Role::Operator]));
    }

    #[test]
    fn test_unknown_role_is_customer() {
        let json = r#"{
            "user_id": 5,
            "username": "x",
            "email": "x@sealen.id",
            "full_name": "X",
            "role": "root"
        }"#;

        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.role, Role::Customer);
    }

    #[test]
    fn test_missing_role_is_customer() {
        let json = r#"{
            "user_id": 6,
            "username": "y",
            "email": "y@sealen.id",
            "full_name": "Y"
        }"#;

        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.role, Role::Customer);
        assert!(!user.is_certified);
    }
}
