use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::{Json, JsonValue};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub role: String,
    pub avatar: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_address: String,
    /// argon2 hash of the pending email OTP
    pub email_otp: Option<String>,
    pub email_verified_at: Option<NaiveDateTime>,
    pub phone_country_code: Option<String>,
    pub phone_number: Option<String>,
    pub phone_otp: Option<String>,
    pub phone_verified_at: Option<NaiveDateTime>,
    pub is_otp_verified: bool,
    pub providers: Json<Vec<LinkedProvider>>,
    pub auth_tokens: Json<Vec<AuthToken>>,
    pub user_settings: JsonValue,
    pub account_status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// External identity linked to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedProvider {
    pub provider_type: String,
    pub provider_id: String,
}

/// One device session. A user holds as many as they have logged in devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthToken {
    pub token: String,
    pub user_ip_address: Option<String>,
    pub fcm_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

impl User {
    /// The stored session for `token`, if it exists and has not expired.
    pub fn active_token(&self, token: &str, now: DateTime<Utc>) -> Option<&AuthToken> {
        self.auth_tokens
            .iter()
            .find(|t| t.token == token && t.is_active_at(now))
    }
}
