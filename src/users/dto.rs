use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::users::repo::User;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl RegisterRequest {
    /// Normalize then validate. Runs before any hashing or store access
    /// so failures leave no partial state behind.
    pub fn validate(&mut self) -> Result<(), ApiError> {
        self.full_name = self.full_name.trim().to_string();
        self.email = self.email.trim().to_lowercase();

        if self.full_name.is_empty()
            || self.email.is_empty()
            || self.password.is_empty()
            || self.confirm_password.is_empty()
        {
            return Err(ApiError::validation("All fields are required"));
        }
        if self.password != self.confirm_password {
            return Err(ApiError::validation("Passwords do not match"));
        }
        if self.full_name.chars().count() < 2 {
            return Err(ApiError::validation(
                "Full name must be at least 2 characters long",
            ));
        }
        if !is_valid_email(&self.email) {
            return Err(ApiError::validation("Please provide a valid email address"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::validation(
                "Password must be at least 6 characters long",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    pub address: Option<String>,
    pub username: Option<String>,
}

/// Slim projection returned by registration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
}

/// Full public profile. Optional attributes come back as empty strings,
/// matching what the client expects; `name` falls back to the full name.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: String,
    pub address: String,
    pub username: String,
    pub name: String,
    pub profile_picture_url: String,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        let name = user
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| user.full_name.clone());
        Self {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            phone: user.phone.unwrap_or_default(),
            date_of_birth: user.date_of_birth.unwrap_or_default(),
            address: user.address.unwrap_or_default(),
            username: user.username.unwrap_or_default(),
            name,
            profile_picture_url: user.profile_picture_url.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub user: RegisteredUser,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub message: String,
    pub user: UserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn request(full_name: &str, email: &str, password: &str, confirm: &str) -> RegisterRequest {
        RegisterRequest {
            full_name: full_name.into(),
            email: email.into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    fn message_of(err: ApiError) -> String {
        match err {
            ApiError::Validation(msg) => msg,
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn valid_registration_passes_and_canonicalizes_email() {
        let mut req = request("A B", "  A@B.com ", "secret1", "secret1");
        req.validate().expect("should validate");
        assert_eq!(req.email, "a@b.com");
    }

    #[test]
    fn missing_fields_are_rejected() {
        let mut req = request("", "a@b.com", "secret1", "secret1");
        assert_eq!(
            message_of(req.validate().unwrap_err()),
            "All fields are required"
        );
        let mut req = request("A B", "a@b.com", "", "");
        assert_eq!(
            message_of(req.validate().unwrap_err()),
            "All fields are required"
        );
    }

    #[test]
    fn password_mismatch_is_rejected() {
        let mut req = request("A B", "a@b.com", "secret1", "secret2");
        assert_eq!(
            message_of(req.validate().unwrap_err()),
            "Passwords do not match"
        );
    }

    #[test]
    fn mismatch_wins_over_other_password_complaints() {
        // Short AND mismatched: the mismatch is reported first.
        let mut req = request("A B", "a@b.com", "abc", "xyz");
        assert_eq!(
            message_of(req.validate().unwrap_err()),
            "Passwords do not match"
        );
    }

    #[test]
    fn short_password_is_rejected() {
        let mut req = request("A B", "a@b.com", "12345", "12345");
        assert_eq!(
            message_of(req.validate().unwrap_err()),
            "Password must be at least 6 characters long"
        );
    }

    #[test]
    fn malformed_email_is_rejected() {
        let mut req = request("A B", "not-an-email", "secret1", "secret1");
        assert_eq!(
            message_of(req.validate().unwrap_err()),
            "Please provide a valid email address"
        );
    }

    #[test]
    fn one_char_full_name_is_rejected() {
        let mut req = request("A", "a@b.com", "secret1", "secret1");
        assert_eq!(
            message_of(req.validate().unwrap_err()),
            "Full name must be at least 2 characters long"
        );
    }

    #[test]
    fn profile_uses_camel_case_and_backfills_empty_strings() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@b.com".into(),
            password_hash: "$argon2id$hash".into(),
            full_name: "A B".into(),
            name: None,
            phone: None,
            date_of_birth: None,
            address: None,
            username: None,
            profile_picture_url: None,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_value(UserProfile::from(user)).unwrap();
        assert_eq!(json["fullName"], "A B");
        assert_eq!(json["dateOfBirth"], "");
        assert_eq!(json["profilePictureUrl"], "");
        // name falls back to the full name when unset
        assert_eq!(json["name"], "A B");
        // the hash never leaves the server
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn update_request_distinguishes_absent_from_empty() {
        let req: UpdateProfileRequest =
            serde_json::from_str(r#"{"phone": "", "name": "New Name"}"#).unwrap();
        assert_eq!(req.phone.as_deref(), Some(""));
        assert_eq!(req.name.as_deref(), Some("New Name"));
        assert!(req.email.is_none());
        assert!(req.date_of_birth.is_none());
    }
}
