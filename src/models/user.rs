// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Account role. Stored as upper-case text in the 'users' table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Creator,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Creator => "CREATOR",
            Role::Student => "STUDENT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum SubscriptionTier {
    Free,
    Premium,
}

/// Where a user sits in the email verification flow.
/// Derived from the row, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationState {
    UnverifiedNoCode,
    CodeSent,
    Verified,
}

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,

    /// Unique (case-insensitive) login identifier.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub role: Role,
    pub subscription_tier: SubscriptionTier,
    pub is_2fa_enabled: bool,

    /// Pending one-time code, cleared once the account is verified.
    #[serde(skip)]
    pub verification_code: Option<String>,

    pub is_verified: bool,
    pub is_active: bool,
    pub date_joined: chrono::DateTime<chrono::Utc>,
}

impl User {
    pub fn verification_state(&self) -> VerificationState {
        if self.is_verified {
            VerificationState::Verified
        } else if self.verification_code.as_deref().is_some_and(|c| !c.is_empty()) {
            VerificationState::CodeSent
        } else {
            VerificationState::UnverifiedNoCode
        }
    }

    /// Active and verified: the only state in which login succeeds.
    pub fn can_login(&self) -> bool {
        self.is_active && self.is_verified
    }
}

/// Insert payload for the identity store. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub role: Role,
    pub subscription_tier: SubscriptionTier,
    pub is_active: bool,
    pub is_verified: bool,
}

impl NewUser {
    /// A self-registered account: student, free tier, inactive and unverified.
    pub fn registration(
        email: &str,
        password_hash: String,
        first_name: &str,
        last_name: &str,
    ) -> Self {
        Self {
            email: email.trim().to_string(),
            password_hash,
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            phone_number: None,
            role: Role::Student,
            subscription_tier: SubscriptionTier::Free,
            is_active: false,
            is_verified: false,
        }
    }
}

/// Partial update applied by administrators. `None` leaves a column alone.
/// `phone_number: Some(None)` clears the phone number.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone_number: Option<Option<String>>,
    pub role: Option<Role>,
    pub subscription_tier: Option<SubscriptionTier>,
    pub is_2fa_enabled: Option<bool>,
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
}

/// Distinguishes an absent field from an explicit `null`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// DTO for registration.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password length must be between 8 and 128 characters."
    ))]
    pub password: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
}

/// DTO for submitting a verification code, by form or by link.
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyEmailRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, max = 6, message = "Code must be at most 6 characters."))]
    pub code: String,
}

/// Query string of the activation link. Both fields are optional so a
/// truncated link still gets the HTML answer.
#[derive(Debug, Default, Deserialize)]
pub struct ActivationParams {
    pub email: Option<String>,
    pub code: Option<String>,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254, message = "Email and password required."))]
    pub email: String,
    #[validate(length(min = 1, max = 128, message = "Email and password required."))]
    pub password: String,
}

/// DTO for an administrator creating an account directly.
#[derive(Debug, Deserialize, Validate)]
pub struct AdminCreateUserRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
    #[validate(length(min = 1, max = 20))]
    pub phone_number: Option<String>,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default = "default_tier")]
    pub subscription_tier: SubscriptionTier,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_verified: bool,
}

fn default_role() -> Role {
    Role::Student
}

fn default_tier() -> SubscriptionTier {
    SubscriptionTier::Free
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(code: Option<&str>, active: bool, verified: bool) -> User {
        User {
            id: 1,
            email: "a@example.com".into(),
            password: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            phone_number: None,
            role: Role::Student,
            subscription_tier: SubscriptionTier::Free,
            is_2fa_enabled: false,
            verification_code: code.map(str::to_string),
            is_verified: verified,
            is_active: active,
            date_joined: chrono::Utc::now(),
        }
    }

    #[test]
    fn verification_state_follows_row() {
        assert_eq!(user(None, false, false).verification_state(), VerificationState::UnverifiedNoCode);
        assert_eq!(user(Some(""), false, false).verification_state(), VerificationState::UnverifiedNoCode);
        assert_eq!(user(Some("123456"), false, false).verification_state(), VerificationState::CodeSent);
        assert_eq!(user(None, true, true).verification_state(), VerificationState::Verified);
    }

    #[test]
    fn login_requires_both_flags() {
        assert!(!user(None, true, false).can_login());
        assert!(!user(None, false, true).can_login());
        assert!(user(None, true, true).can_login());
    }

    #[test]
    fn serialized_user_hides_secrets() {
        let json = serde_json::to_value(user(Some("123456"), false, false)).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("verification_code").is_none());
        assert_eq!(json["role"], "STUDENT");
    }

    #[test]
    fn explicit_null_phone_is_distinguished_from_absent() {
        let absent: UpdateUserRequest = serde_json::from_str("{}").unwrap();
        let cleared: UpdateUserRequest = serde_json::from_str(r#"{"phone_number": null}"#).unwrap();
        assert_eq!(absent.phone_number, None);
        assert_eq!(cleared.phone_number, Some(None));
    }
}
