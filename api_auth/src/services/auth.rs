use chrono::Utc;
use common::{
    env_config::Config,
    error::{AppError, Res},
    jwt::{self, ClaimsSpec},
    misc::{AccountStatus, UserRole},
};
use db::{dtos::user::UserCreateRequest, models::user::AuthToken, store::UserStore};
use uuid::Uuid;

use crate::{misc::mailer::OtpMailer, services::otp};

/// Stores a fresh OTP hash for the address, registering the user on first
/// contact, and hands the clear code to the mailer. `email` is already
/// normalized and validated.
pub async fn request_otp(
    users: &dyn UserStore,
    mailer: &dyn OtpMailer,
    config: &Config,
    email: &str,
) -> Res<()> {
    let code = otp::generate_otp(&config.otp);
    let otp_hash = otp::hash_otp(&code)?;

    match users.find_by_email(email).await? {
        Some(user) => {
            if user.account_status != AccountStatus::Active.as_str() {
                return Err(AppError::Forbidden("Account is not active".to_string()));
            }
            users.set_email_otp(user.id, Some(otp_hash)).await?;
        }
        None => {
            let user = users
                .create(UserCreateRequest {
                    email_address: email.to_string(),
                    role: UserRole::Consumer,
                    account_status: AccountStatus::Active,
                    email_otp: Some(otp_hash),
                    email_verified_at: Some(Utc::now().naive_utc()),
                })
                .await?;
            log::info!("Registered user {}", user.id);
        }
    }

    mailer.send_otp(email, &code).await
}

pub struct VerifiedLogin {
    pub token: String,
}

/// Checks the code, clears it and opens a new device session.
pub async fn verify_otp(
    users: &dyn UserStore,
    config: &Config,
    email: &str,
    code: Option<&str>,
    fcm_token: Option<String>,
    ip_address: Option<String>,
) -> Res<VerifiedLogin> {
    let code = code
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("OTP is required".to_string()))?;

    let user = users
        .find_by_email(email)
        .await?
        .ok_or_else(|| AppError::NotFound("User Not Found!".to_string()))?;

    let matches = user
        .email_otp
        .as_deref()
        .is_some_and(|hash| otp::verify_otp(code, hash));
    if !matches {
        return Err(AppError::BadRequest("Invalid OTP!".to_string()));
    }

    users.mark_otp_verified(user.id).await?;

    let role = user
        .role
        .parse::<UserRole>()
        .map_err(|_| AppError::Internal(format!("Unknown role {}", user.role)))?;
    let issued = jwt::generate_jwt(
        ClaimsSpec {
            user_id: user.id,
            role,
        },
        &config.jwt_config,
    )?;

    users
        .push_auth_token(
            user.id,
            AuthToken {
                token: issued.token.clone(),
                user_ip_address: ip_address,
                fcm_token: fcm_token.filter(|t| !t.is_empty()),
                expires_at: issued.expires_at,
            },
        )
        .await?;

    log::info!("User {} logged in", user.id);
    Ok(VerifiedLogin {
        token: issued.token,
    })
}

pub async fn logout(users: &dyn UserStore, user_id: Uuid, token: &str) -> Res<()> {
    users.remove_auth_token(user_id, token).await
}

