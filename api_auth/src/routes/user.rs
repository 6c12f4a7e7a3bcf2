use std::sync::Arc;

use actix_web::{Responder, delete, get, web};
use common::{error::Res, http::Success, jwt::JwtClaims};
use db::store::{ListingStore, UserStore};
use storage::BlobStore;

use crate::{
    dtos::auth::{MeResponse, UserProfile},
    services,
};

/// Endpoint to retrieve the current authenticated user's profile.
///
/// # Output
/// - Success: `{ "message": "OK", "user": { "userId", "role", ... } }`
/// - Error: 401 without a live session, 404 if the user is gone
#[get("/me")]
pub async fn get_me(
    claims: web::ReqData<JwtClaims>,
    users: web::Data<Arc<dyn UserStore>>,
) -> Res<impl Responder> {
    let user = services::user::get_user_by_id(users.get_ref().as_ref(), claims.user_id).await?;
    Success::ok(MeResponse {
        message: "OK",
        user: UserProfile::from(user),
    })
}

#[delete("/delete-account")]
pub async fn delete_account(
    claims: web::ReqData<JwtClaims>,
    users: web::Data<Arc<dyn UserStore>>,
    listings: web::Data<Arc<dyn ListingStore>>,
    blobs: web::Data<Arc<BlobStore>>,
) -> Res<impl Responder> {
    services::user::delete_account(
        users.get_ref().as_ref(),
        listings.get_ref().as_ref(),
        &blobs,
        claims.user_id,
    )
    .await?;
    Success::message("Account deleted successfully")
}
