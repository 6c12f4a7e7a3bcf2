use async_trait::async_trait;
use common::error::Res;
use uuid::Uuid;

use crate::{
    dtos::{
        listing::{
            GalleryImageCreateRequest, GalleryScope, ListingCreateRequest, ListingPageQuery,
            ListingUpdateRequest,
        },
        user::UserCreateRequest,
    },
    models::{
        listing::{GalleryImage, Listing, ListingWithGallery},
        user::{AuthToken, User},
    },
};

/// Read access to listings plus the entry point for transactional writes.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Opens a unit of work. Nothing written through it is visible to
    /// other readers until `commit`.
    async fn begin(&self) -> Res<Box<dyn ListingTx>>;

    async fn find_by_id(
        &self,
        listing_id: Uuid,
        include_gallery: bool,
    ) -> Res<Option<ListingWithGallery>>;

    /// One page of listings with their gallery, plus the filtered total.
    async fn find_page(&self, query: &ListingPageQuery) -> Res<(Vec<ListingWithGallery>, i64)>;

    async fn blob_paths_owned_by(&self, user_id: Uuid) -> Res<Vec<String>>;

    async fn delete_owned_by(&self, user_id: Uuid) -> Res<u64>;
}

/// Writes spanning the listings and gallery tables, committed or rolled
/// back as one unit.
#[async_trait]
pub trait ListingTx: Send {
    async fn insert_listing(&mut self, data: ListingCreateRequest) -> Res<Listing>;

    async fn update_listing(&mut self, listing_id: Uuid, data: ListingUpdateRequest)
    -> Res<Listing>;

    async fn gallery_for_listing(&mut self, listing_id: Uuid) -> Res<Vec<GalleryImage>>;

    async fn gallery_by_ids(&mut self, listing_id: Uuid, ids: &[Uuid])
    -> Res<Vec<GalleryImage>>;

    async fn bulk_insert_gallery(
        &mut self,
        rows: Vec<GalleryImageCreateRequest>,
    ) -> Res<Vec<GalleryImage>>;

    async fn delete_gallery(&mut self, scope: GalleryScope) -> Res<u64>;

    async fn delete_listing(&mut self, listing_id: Uuid) -> Res<u64>;

    async fn commit(self: Box<Self>) -> Res<()>;

    async fn rollback(self: Box<Self>) -> Res<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Res<Option<User>>;

    async fn find_by_id(&self, user_id: Uuid) -> Res<Option<User>>;

    async fn create(&self, data: UserCreateRequest) -> Res<User>;

    async fn set_email_otp(&self, user_id: Uuid, otp_hash: Option<String>) -> Res<()>;

    async fn mark_otp_verified(&self, user_id: Uuid) -> Res<()>;

    /// Appends a session and prunes expired ones.
    async fn push_auth_token(&self, user_id: Uuid, token: AuthToken) -> Res<()>;

    async fn remove_auth_token(&self, user_id: Uuid, token: &str) -> Res<()>;

    /// Returns false when no such user existed.
    async fn delete(&self, user_id: Uuid) -> Res<bool>;
}
