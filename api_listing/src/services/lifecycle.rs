//! Listing writes that touch both the database and the blob store.
//!
//! Uploads arrive already written to the blob store. Blob deletes run before
//! the transaction commits and are not restored on rollback, so a failed save
//! or delete can leave a row pointing at a file that is gone. The uploads of
//! a failed save are removed again.

use common::{
    error::{AppError, Res},
    jwt::JwtClaims,
};
use db::{
    dtos::listing::{
        GalleryImageCreateRequest, GalleryScope, ListingCreateRequest, ListingFields,
        ListingUpdateRequest,
    },
    models::listing::Listing,
    store::{ListingStore, ListingTx},
};
use storage::{BlobStore, UploadedFile};
use uuid::Uuid;

/// Who is acting on a listing.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl From<&JwtClaims> for Actor {
    fn from(claims: &JwtClaims) -> Self {
        Actor {
            user_id: claims.user_id,
            is_admin: claims.is_admin(),
        }
    }
}

impl Actor {
    fn ensure_can_modify(&self, listing: &Listing) -> Res<()> {
        if self.is_admin || listing.user_id == self.user_id {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You are not allowed to modify this listing".to_string(),
            ))
        }
    }
}

pub struct SaveListing {
    /// `None` creates a new listing.
    pub listing_id: Option<Uuid>,
    pub fields: ListingFields,
    pub thumbnail: Option<UploadedFile>,
    pub gallery: Vec<UploadedFile>,
    pub deleted_image_ids: Option<Vec<Uuid>>,
    pub actor: Actor,
}

impl SaveListing {
    fn uploaded_paths(&self) -> Vec<String> {
        self.thumbnail
            .iter()
            .chain(&self.gallery)
            .map(|file| file.path.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created(Uuid),
    Updated(Uuid),
}

impl SaveOutcome {
    pub fn listing_id(&self) -> Uuid {
        match self {
            SaveOutcome::Created(id) | SaveOutcome::Updated(id) => *id,
        }
    }
}

/// Creates or updates a listing with its thumbnail and gallery.
///
/// New gallery files replace the whole existing gallery. `deleted_image_ids`
/// removes single images of this listing and works without new uploads.
pub async fn save_listing(
    listings: &dyn ListingStore,
    blobs: &BlobStore,
    request: SaveListing,
) -> Res<SaveOutcome> {
    let uploaded = request.uploaded_paths();
    let result = save(listings, blobs, request).await;
    match &result {
        Ok(outcome) => log::info!("Saved listing {}", outcome.listing_id()),
        Err(_) => blobs.delete_all(&uploaded).await,
    }
    result
}

async fn save(
    listings: &dyn ListingStore,
    blobs: &BlobStore,
    request: SaveListing,
) -> Res<SaveOutcome> {
    let existing = match request.listing_id {
        Some(listing_id) => {
            let record = listings
                .find_by_id(listing_id, false)
                .await?
                .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;
            request.actor.ensure_can_modify(&record.listing)?;
            Some(record.listing)
        }
        None => {
            if request.fields.title.is_none() {
                return Err(AppError::BadRequest("title is required".to_string()));
            }
            if request.fields.asking_price.is_none() {
                return Err(AppError::BadRequest("askingPrice is required".to_string()));
            }
            None
        }
    };

    let mut tx = listings.begin().await?;
    match apply_save(&mut *tx, blobs, existing.as_ref(), request).await {
        Ok(outcome) => tx.commit().await.map(|_| outcome),
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                log::error!("Rollback of listing save failed: {}", rollback_err);
            }
            Err(err)
        }
    }
}

async fn apply_save(
    tx: &mut dyn ListingTx,
    blobs: &BlobStore,
    existing: Option<&Listing>,
    request: SaveListing,
) -> Res<SaveOutcome> {
    let thumb_path = match &request.thumbnail {
        Some(file) => {
            if let Some(old) = existing.and_then(|l| l.thumb_resized_image.as_deref()) {
                blobs.delete(old).await?;
            }
            Some(file.path.clone())
        }
        None => None,
    };

    let listing = match existing {
        Some(existing) => {
            tx.update_listing(
                existing.id,
                ListingUpdateRequest {
                    fields: request.fields,
                    thumb_resized_image: thumb_path,
                },
            )
            .await?
        }
        None => {
            tx.insert_listing(ListingCreateRequest {
                user_id: request.actor.user_id,
                fields: request.fields,
                thumb_resized_image: thumb_path,
            })
            .await?
        }
    };

    if !request.gallery.is_empty() {
        if existing.is_some() {
            for image in tx.gallery_for_listing(listing.id).await? {
                if let Some(path) = image.photo_resized.as_deref() {
                    blobs.delete(path).await?;
                }
            }
            tx.delete_gallery(GalleryScope::Listing(listing.id)).await?;
        }

        let rows = request
            .gallery
            .iter()
            .map(|file| GalleryImageCreateRequest {
                listing_id: listing.id,
                photo_resized: file.path.clone(),
            })
            .collect();
        tx.bulk_insert_gallery(rows).await?;
    }

    if let Some(ids) = request.deleted_image_ids.filter(|ids| !ids.is_empty()) {
        for image in tx.gallery_by_ids(listing.id, &ids).await? {
            if let Some(path) = image.photo_resized.as_deref() {
                blobs.delete(path).await?;
            }
        }
        tx.delete_gallery(GalleryScope::Ids {
            listing_id: listing.id,
            ids,
        })
        .await?;
    }

    Ok(match existing {
        Some(_) => SaveOutcome::Updated(listing.id),
        None => SaveOutcome::Created(listing.id),
    })
}

/// Deletes a listing, its gallery rows and every blob they reference.
pub async fn delete_listing(
    listings: &dyn ListingStore,
    blobs: &BlobStore,
    listing_id: Uuid,
    actor: Actor,
) -> Res<()> {
    let record = listings
        .find_by_id(listing_id, true)
        .await?
        .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;
    actor.ensure_can_modify(&record.listing)?;

    let mut tx = listings.begin().await.map_err(delete_failed)?;

    let result = async {
        for path in record.blob_paths() {
            blobs.delete(&path).await?;
        }
        tx.delete_gallery(GalleryScope::Listing(listing_id)).await?;
        if tx.delete_listing(listing_id).await? == 0 {
            return Err(AppError::NotFound("Listing not found".to_string()));
        }
        Ok(())
    }
    .await;

    match result {
        Ok(()) => {
            tx.commit().await.map_err(delete_failed)?;
            log::info!("Deleted listing {}", listing_id);
            Ok(())
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                log::error!("Rollback of listing delete failed: {}", rollback_err);
            }
            match err {
                AppError::NotFound(_) => Err(err),
                err => Err(delete_failed(err)),
            }
        }
    }
}

fn delete_failed(err: AppError) -> AppError {
    log::error!("Failed to delete listing: {}", err);
    AppError::Internal("Failed to delete listing".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::env_config::StorageConfig;
    use db::{BigDecimal, memory::MemoryListingStore};
    use tempfile::TempDir;

    fn blob_store() -> (BlobStore, TempDir) {
        let root = tempfile::tempdir().unwrap();
        let blobs = BlobStore::new(&StorageConfig {
            root_dir: root.path().to_string_lossy().to_string(),
            ..Default::default()
        });
        (blobs, root)
    }

    /// A jpeg already written to the uploads directory.
    fn image(blobs: &BlobStore, field: &str) -> UploadedFile {
        let name = format!("{}-{}.jpg", field, Uuid::new_v4().simple());
        std::fs::create_dir_all(blobs.uploads_path()).unwrap();
        std::fs::write(blobs.uploads_path().join(&name), [0xFF, 0xD8, 0xFF]).unwrap();
        UploadedFile {
            field_name: field.to_string(),
            content_type: "image/jpeg".to_string(),
            path: format!("uploads/{}", name),
            size: 3,
        }
    }

    fn stored_files(blobs: &BlobStore) -> usize {
        std::fs::read_dir(blobs.uploads_path())
            .map(|dir| dir.count())
            .unwrap_or(0)
    }

    fn owner() -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            is_admin: false,
        }
    }

    fn create(blobs: &BlobStore, actor: Actor, gallery: usize) -> SaveListing {
        SaveListing {
            listing_id: None,
            fields: ListingFields {
                title: Some("1969 Camaro".to_string()),
                asking_price: Some(BigDecimal::from(55_000)),
                ..Default::default()
            },
            thumbnail: Some(image(blobs, "thumb_Resized_image")),
            gallery: (0..gallery).map(|_| image(blobs, "galleryImages")).collect(),
            deleted_image_ids: None,
            actor,
        }
    }

    fn update(listing_id: Uuid, actor: Actor) -> SaveListing {
        SaveListing {
            listing_id: Some(listing_id),
            fields: ListingFields::default(),
            thumbnail: None,
            gallery: Vec::new(),
            deleted_image_ids: None,
            actor,
        }
    }

    fn exists(blobs: &BlobStore, path: &str) -> bool {
        blobs.root().join(path).exists()
    }

    #[actix_web::test]
    async fn create_stores_thumbnail_and_gallery() {
        let (blobs, _root) = blob_store();
        let store = MemoryListingStore::new();
        let actor = owner();

        let outcome = save_listing(&store, &blobs, create(&blobs, actor, 2)).await.unwrap();
        assert!(matches!(outcome, SaveOutcome::Created(_)));

        let record = store.find_by_id(outcome.listing_id(), true).await.unwrap().unwrap();
        assert_eq!(record.listing.user_id, actor.user_id);
        assert_eq!(record.gallery.len(), 2);
        for path in record.blob_paths() {
            assert!(path.starts_with("uploads/"));
            assert!(exists(&blobs, &path));
        }
    }

    #[actix_web::test]
    async fn create_requires_title_and_price() {
        let (blobs, _root) = blob_store();
        let store = MemoryListingStore::new();

        let mut request = create(&blobs, owner(), 0);
        request.fields.asking_price = None;
        let err = save_listing(&store, &blobs, request).await.unwrap_err();
        assert_eq!(err.to_string(), "askingPrice is required");

        let mut request = create(&blobs, owner(), 0);
        request.fields.title = None;
        let err = save_listing(&store, &blobs, request).await.unwrap_err();
        assert_eq!(err.to_string(), "title is required");

        assert!(store.listings().await.is_empty());
        assert_eq!(stored_files(&blobs), 0);
    }

    #[actix_web::test]
    async fn failed_gallery_insert_rolls_back_and_removes_new_blobs() {
        let (blobs, _root) = blob_store();
        let store = MemoryListingStore::new();
        store.fail_gallery_inserts(true);

        assert!(save_listing(&store, &blobs, create(&blobs, owner(), 3)).await.is_err());
        assert!(store.listings().await.is_empty());
        assert!(store.gallery().await.is_empty());

        assert_eq!(stored_files(&blobs), 0);
    }

    #[actix_web::test]
    async fn new_gallery_replaces_old_one() {
        let (blobs, _root) = blob_store();
        let store = MemoryListingStore::new();
        let actor = owner();
        let listing_id = save_listing(&store, &blobs, create(&blobs, actor, 2))
            .await
            .unwrap()
            .listing_id();
        let old = store.find_by_id(listing_id, true).await.unwrap().unwrap();

        let mut request = update(listing_id, actor);
        request.gallery = vec![image(&blobs, "galleryImages")];
        let outcome = save_listing(&store, &blobs, request).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Updated(listing_id));

        let current = store.find_by_id(listing_id, true).await.unwrap().unwrap();
        assert_eq!(current.gallery.len(), 1);
        for img in &old.gallery {
            assert!(current.gallery.iter().all(|c| c.id != img.id));
            assert!(!exists(&blobs, img.photo_resized.as_deref().unwrap()));
        }
        assert_eq!(
            current.listing.thumb_resized_image,
            old.listing.thumb_resized_image
        );
    }

    #[actix_web::test]
    async fn deleted_ids_only_touch_the_target_listing() {
        let (blobs, _root) = blob_store();
        let store = MemoryListingStore::new();
        let actor = owner();
        let first = save_listing(&store, &blobs, create(&blobs, actor, 2)).await.unwrap().listing_id();
        let second = save_listing(&store, &blobs, create(&blobs, actor, 1)).await.unwrap().listing_id();

        let first_gallery = store.find_by_id(first, true).await.unwrap().unwrap().gallery;
        let second_gallery = store.find_by_id(second, true).await.unwrap().unwrap().gallery;

        let mut request = update(first, actor);
        request.deleted_image_ids = Some(vec![first_gallery[0].id, second_gallery[0].id]);
        save_listing(&store, &blobs, request).await.unwrap();

        let first_now = store.find_by_id(first, true).await.unwrap().unwrap().gallery;
        assert_eq!(first_now.len(), 1);
        assert_eq!(first_now[0].id, first_gallery[1].id);
        assert!(!exists(&blobs, first_gallery[0].photo_resized.as_deref().unwrap()));

        let second_now = store.find_by_id(second, true).await.unwrap().unwrap().gallery;
        assert_eq!(second_now.len(), 1);
        assert!(exists(&blobs, second_gallery[0].photo_resized.as_deref().unwrap()));
    }

    #[actix_web::test]
    async fn only_owner_or_admin_may_modify() {
        let (blobs, _root) = blob_store();
        let store = MemoryListingStore::new();
        let listing_id = save_listing(&store, &blobs, create(&blobs, owner(), 0))
            .await
            .unwrap()
            .listing_id();

        let mut request = update(listing_id, owner());
        request.thumbnail = Some(image(&blobs, "thumb_Resized_image"));
        let rejected = request.uploaded_paths();
        let err = save_listing(&store, &blobs, request).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(!exists(&blobs, &rejected[0]));
        let err = delete_listing(&store, &blobs, listing_id, owner()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let admin = Actor {
            user_id: Uuid::new_v4(),
            is_admin: true,
        };
        delete_listing(&store, &blobs, listing_id, admin).await.unwrap();
        assert!(store.listings().await.is_empty());
    }

    #[actix_web::test]
    async fn delete_removes_rows_and_blobs() {
        let (blobs, _root) = blob_store();
        let store = MemoryListingStore::new();
        let actor = owner();
        let listing_id = save_listing(&store, &blobs, create(&blobs, actor, 2))
            .await
            .unwrap()
            .listing_id();
        let paths = store
            .find_by_id(listing_id, true)
            .await
            .unwrap()
            .unwrap()
            .blob_paths();

        delete_listing(&store, &blobs, listing_id, actor).await.unwrap();
        assert!(store.listings().await.is_empty());
        assert!(store.gallery().await.is_empty());
        assert!(paths.iter().all(|p| !exists(&blobs, p)));

        let err = delete_listing(&store, &blobs, listing_id, actor).await.unwrap_err();
        assert_eq!(err.to_string(), "Listing not found");
    }
}
