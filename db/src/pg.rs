use std::sync::Arc;

use async_trait::async_trait;
use common::error::{AppError, Res};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    dtos::{
        listing::{
            GalleryImageCreateRequest, GalleryScope, ListingCreateRequest, ListingPageQuery,
            ListingUpdateRequest,
        },
        user::UserCreateRequest,
    },
    listing,
    models::{
        listing::{GalleryImage, Listing, ListingWithGallery},
        user::{AuthToken, User},
    },
    retry::{RetryPolicy, with_retry},
    store::{ListingStore, ListingTx, UserStore},
    user,
};

pub struct PgListingStore {
    pool: Arc<PgPool>,
    retry: RetryPolicy,
}

impl PgListingStore {
    pub fn new(pool: Arc<PgPool>, retry: RetryPolicy) -> Self {
        PgListingStore { pool, retry }
    }
}

#[async_trait]
impl ListingStore for PgListingStore {
    async fn begin(&self) -> Res<Box<dyn ListingTx>> {
        let tx = with_retry(&self.retry, || async {
            self.pool.begin().await.map_err(AppError::from)
        })
        .await?;
        Ok(Box::new(PgListingTx { tx }))
    }

    async fn find_by_id(
        &self,
        listing_id: Uuid,
        include_gallery: bool,
    ) -> Res<Option<ListingWithGallery>> {
        let pool = &*self.pool;
        let Some(listing) =
            with_retry(&self.retry, || listing::get_listing_by_id(pool, listing_id)).await?
        else {
            return Ok(None);
        };

        let gallery = if include_gallery {
            with_retry(&self.retry, || listing::get_gallery_by_listing(pool, listing_id)).await?
        } else {
            Vec::new()
        };

        Ok(Some(ListingWithGallery { listing, gallery }))
    }

    async fn find_page(&self, query: &ListingPageQuery) -> Res<(Vec<ListingWithGallery>, i64)> {
        let pool = &*self.pool;
        let total = with_retry(&self.retry, || listing::count_listings(pool, &query.filter)).await?;
        let rows = with_retry(&self.retry, || listing::get_listings_page(pool, query)).await?;

        let ids: Vec<Uuid> = rows.iter().map(|l| l.id).collect();
        let mut galleries =
            with_retry(&self.retry, || listing::get_gallery_by_listings(pool, &ids)).await?;

        let page = rows
            .into_iter()
            .map(|listing| {
                let gallery = galleries.remove(&listing.id).unwrap_or_default();
                ListingWithGallery { listing, gallery }
            })
            .collect();

        Ok((page, total))
    }

    async fn blob_paths_owned_by(&self, user_id: Uuid) -> Res<Vec<String>> {
        let pool = &*self.pool;
        with_retry(&self.retry, || listing::get_blob_paths_by_user(pool, user_id)).await
    }

    async fn delete_owned_by(&self, user_id: Uuid) -> Res<u64> {
        let pool = &*self.pool;
        with_retry(&self.retry, || listing::delete_listings_by_user(pool, user_id)).await
    }
}

pub struct PgListingTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ListingTx for PgListingTx {
    async fn insert_listing(&mut self, data: ListingCreateRequest) -> Res<Listing> {
        listing::insert_listing(&mut *self.tx, data).await
    }

    async fn update_listing(
        &mut self,
        listing_id: Uuid,
        data: ListingUpdateRequest,
    ) -> Res<Listing> {
        listing::update_listing(&mut *self.tx, listing_id, data).await
    }

    async fn gallery_for_listing(&mut self, listing_id: Uuid) -> Res<Vec<GalleryImage>> {
        listing::get_gallery_by_listing(&mut *self.tx, listing_id).await
    }

    async fn gallery_by_ids(
        &mut self,
        listing_id: Uuid,
        ids: &[Uuid],
    ) -> Res<Vec<GalleryImage>> {
        listing::get_gallery_by_ids(&mut *self.tx, listing_id, ids).await
    }

    async fn bulk_insert_gallery(
        &mut self,
        rows: Vec<GalleryImageCreateRequest>,
    ) -> Res<Vec<GalleryImage>> {
        listing::insert_gallery_images(&mut *self.tx, rows).await
    }

    async fn delete_gallery(&mut self, scope: GalleryScope) -> Res<u64> {
        listing::delete_gallery_images(&mut *self.tx, scope).await
    }

    async fn delete_listing(&mut self, listing_id: Uuid) -> Res<u64> {
        listing::delete_listing(&mut *self.tx, listing_id).await
    }

    async fn commit(self: Box<Self>) -> Res<()> {
        self.tx.commit().await.map_err(AppError::from)
    }

    async fn rollback(self: Box<Self>) -> Res<()> {
        self.tx.rollback().await.map_err(AppError::from)
    }
}

pub struct PgUserStore {
    pool: Arc<PgPool>,
    retry: RetryPolicy,
}

impl PgUserStore {
    pub fn new(pool: Arc<PgPool>, retry: RetryPolicy) -> Self {
        PgUserStore { pool, retry }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Res<Option<User>> {
        let pool = &*self.pool;
        with_retry(&self.retry, || user::get_user_by_email(pool, email)).await
    }

    async fn find_by_id(&self, user_id: Uuid) -> Res<Option<User>> {
        let pool = &*self.pool;
        with_retry(&self.retry, || user::get_user_by_id(pool, user_id)).await
    }

    // not retried: a replayed insert could trip the unique email constraint
    async fn create(&self, data: UserCreateRequest) -> Res<User> {
        user::insert_user(&*self.pool, data).await
    }

    async fn set_email_otp(&self, user_id: Uuid, otp_hash: Option<String>) -> Res<()> {
        let pool = &*self.pool;
        with_retry(&self.retry, || {
            user::update_email_otp(pool, user_id, otp_hash.clone())
        })
        .await
    }

    async fn mark_otp_verified(&self, user_id: Uuid) -> Res<()> {
        let pool = &*self.pool;
        with_retry(&self.retry, || user::mark_otp_verified(pool, user_id)).await
    }

    async fn push_auth_token(&self, user_id: Uuid, token: AuthToken) -> Res<()> {
        let pool = &*self.pool;
        with_retry(&self.retry, || user::push_auth_token(pool, user_id, &token)).await
    }

    async fn remove_auth_token(&self, user_id: Uuid, token: &str) -> Res<()> {
        let pool = &*self.pool;
        with_retry(&self.retry, || user::remove_auth_token(pool, user_id, token)).await
    }

    async fn delete(&self, user_id: Uuid) -> Res<bool> {
        let pool = &*self.pool;
        let removed = with_retry(&self.retry, || user::delete_user(pool, user_id)).await?;
        Ok(removed > 0)
    }
}
