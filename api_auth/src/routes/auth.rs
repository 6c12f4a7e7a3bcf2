use std::sync::Arc;

use actix_web::{HttpRequest, Responder, post, web};
use common::{
    env_config::Config,
    error::Res,
    http::Success,
    jwt::{BearerToken, JwtClaims},
};
use db::store::UserStore;
use validator::Validate;

use crate::{
    dtos::auth::{LoginRequest, VerifyOtpRequest, VerifyOtpResponse},
    misc::mailer::OtpMailer,
    services,
};

/// Sends a one-time passcode to the given address, registering the user
/// on first contact.
///
/// # Input
/// - `body`: `{ "emailAddress": "..." }`
///
/// # Output
/// - Success: `{ "message": "OTP has been sent successfully" }`
/// - Error: 400 for a malformed address, 403 for a non-active account
#[post("/login")]
pub async fn post_login(
    body: web::Json<LoginRequest>,
    config: web::Data<Arc<Config>>,
    users: web::Data<Arc<dyn UserStore>>,
    mailer: web::Data<Arc<dyn OtpMailer>>,
) -> Res<impl Responder> {
    let body = body.into_inner().normalized();
    body.validate()?;

    services::auth::request_otp(
        users.get_ref().as_ref(),
        mailer.get_ref().as_ref(),
        &config,
        &body.email_address,
    )
    .await?;
    Success::message("OTP has been sent successfully")
}

/// Exchanges a valid OTP for a bearer token bound to a new device session.
///
/// # Input
/// - `body`: `{ "emailAddress": "...", "otp": "123456", "fcmToken": "..." }`
///
/// # Output
/// - Success: `{ "message", "token", "isVerified": true }`
/// - Error: 400 for a missing or wrong OTP, 404 for an unknown address
#[post("/verify-otp")]
pub async fn post_verify_otp(
    req: HttpRequest,
    body: web::Json<VerifyOtpRequest>,
    config: web::Data<Arc<Config>>,
    users: web::Data<Arc<dyn UserStore>>,
) -> Res<impl Responder> {
    let body = body.into_inner().normalized();
    body.validate()?;
    let ip_address = req
        .connection_info()
        .realip_remote_addr()
        .map(str::to_string);

    let login = services::auth::verify_otp(
        users.get_ref().as_ref(),
        &config,
        &body.email_address,
        body.otp.as_deref(),
        body.fcm_token,
        ip_address,
    )
    .await?;

    Success::ok(VerifyOtpResponse {
        message: "OTP has been verified successfully",
        token: login.token,
        is_verified: true,
    })
}

/// Revokes the presented token only; other devices stay logged in.
#[post("/logout")]
pub async fn post_logout(
    claims: web::ReqData<JwtClaims>,
    token: web::ReqData<BearerToken>,
    users: web::Data<Arc<dyn UserStore>>,
) -> Res<impl Responder> {
    services::auth::logout(users.get_ref().as_ref(), claims.user_id, &token.0).await?;
    Success::message("Logout successfully")
}
