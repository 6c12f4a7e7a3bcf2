use chrono::NaiveDateTime;
use common::misc::{AccountStatus, UserRole};

pub struct UserCreateRequest {
    pub email_address: String,
    pub role: UserRole,
    pub account_status: AccountStatus,
    pub email_otp: Option<String>,
    pub email_verified_at: Option<NaiveDateTime>,
}
