use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::models::User;

/// Access level carried by every user and every token. Encoded on the wire
/// and in the database as its numeric code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn code(self) -> i16 {
        match self {
            Role::User => 0,
            Role::Admin => 1,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(Role::User),
            1 => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i16(self.code())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = i16::deserialize(deserializer)?;
        Role::from_code(code)
            .ok_or_else(|| de::Error::custom(format!("role must be 0 (USER) or 1 (ADMIN), got {code}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Both fields are optional on the wire so an empty body can be reported as such.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,
}

impl ChangePasswordRequest {
    pub fn is_empty(&self) -> bool {
        self.old_password.is_none() && self.new_password.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_numeric_codes() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "1");
        let role: Role = serde_json::from_str("0").unwrap();
        assert_eq!(role, Role::User);
        assert!(serde_json::from_str::<Role>("2").is_err());
        assert!(serde_json::from_str::<Role>("\"admin\"").is_err());
    }

    #[test]
    fn change_password_request_detects_empty_body() {
        let empty: ChangePasswordRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());

        let partial: ChangePasswordRequest =
            serde_json::from_str(r#"{"oldPassword":"secret1"}"#).unwrap();
        assert!(!partial.is_empty());
        assert!(partial.new_password.is_none());
    }
}
