use common::error::{AppError, Res};
use db::{
    models::user::User,
    store::{ListingStore, UserStore},
};
use storage::BlobStore;
use uuid::Uuid;

pub async fn get_user_by_id(users: &dyn UserStore, user_id: Uuid) -> Res<User> {
    users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User Not Found!".to_string()))
}

/// Removes the user with every listing and gallery row they own, then the
/// blobs those rows pointed at.
pub async fn delete_account(
    users: &dyn UserStore,
    listings: &dyn ListingStore,
    blobs: &BlobStore,
    user_id: Uuid,
) -> Res<()> {
    let paths = listings.blob_paths_owned_by(user_id).await?;

    if !users.delete(user_id).await? {
        return Err(AppError::NotFound("User Not Found!".to_string()));
    }
    // Postgres has already cascaded; stores without foreign keys have not
    listings.delete_owned_by(user_id).await?;
    log::info!("Deleted user {} and {} blobs", user_id, paths.len());

    for path in paths {
        if let Err(err) = blobs.delete(&path).await {
            log::warn!("Failed to delete blob {} of user {}: {}", path, user_id, err);
        }
    }
    Ok(())
}
