use chrono::NaiveDateTime;
use db::models::user::User;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(email(message = "Valid email required"))]
    pub email_address: String,
}

impl LoginRequest {
    /// Trimmed and lower-cased, ready for validation.
    pub fn normalized(mut self) -> Self {
        self.email_address = normalize_email(&self.email_address);
        self
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    #[serde(default)]
    #[validate(email(message = "Valid email required"))]
    pub email_address: String,
    #[serde(default)]
    pub otp: Option<String>,
    #[serde(default)]
    pub fcm_token: Option<String>,
}

impl VerifyOtpRequest {
    pub fn normalized(mut self) -> Self {
        self.email_address = normalize_email(&self.email_address);
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponse {
    pub message: &'static str,
    pub token: String,
    pub is_verified: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: Uuid,
    pub role: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_address: String,
    pub phone_country_code: Option<String>,
    pub phone_number: Option<String>,
    pub email_verified_at: Option<NaiveDateTime>,
    pub phone_verified_at: Option<NaiveDateTime>,
    pub registered_at: NaiveDateTime,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        UserProfile {
            user_id: user.id,
            role: user.role,
            first_name: user.first_name,
            last_name: user.last_name,
            email_address: user.email_address,
            phone_country_code: user.phone_country_code,
            phone_number: user.phone_number,
            email_verified_at: user.email_verified_at,
            phone_verified_at: user.phone_verified_at,
            registered_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub message: &'static str,
    pub user: UserProfile,
}

#[cfg(test)]
mod tests {
    use common::error::AppError;

    use super::*;

    fn login(email: &str) -> LoginRequest {
        LoginRequest {
            email_address: email.to_string(),
        }
        .normalized()
    }

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        let request = login("  Jane.Doe@Example.COM ");
        assert_eq!(request.email_address, "jane.doe@example.com");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for raw in [
            "",
            "plain",
            "@example.com",
            "a@b@c.com",
            "a b@c.com",
            "a@.com",
            "a@b..com",
            "a\"b@x.com",
            "a@-x.com",
            "a@x_y.com",
            "(a)@x.com",
        ] {
            let err = login(raw).validate().unwrap_err();
            assert_eq!(
                AppError::from(err).to_string(),
                "Valid email required",
                "{raw}"
            );
        }
    }

    #[test]
    fn verify_request_checks_the_address() {
        let request = VerifyOtpRequest {
            email_address: "buyer@example..com".to_string(),
            otp: Some("123456".to_string()),
            fcm_token: None,
        }
        .normalized();
        assert!(request.validate().is_err());
    }
}
