//! In-process stores with the same observable behaviour as the Postgres ones.
//! A transaction works on a private copy of the tables and records which rows
//! it wrote. Commit replays only those rows onto the shared tables, so
//! overlapping transactions on different listings both survive. Rollback
//! simply drops the copy.

use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicI64, Ordering},
    },
};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDateTime, Utc};
use common::error::{AppError, Res};
use sqlx::types::{Json, JsonValue};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    dtos::{
        listing::{
            DEFAULT_BIDDING_DURATION_SECONDS, GalleryImageCreateRequest, GalleryScope,
            ListingCreateRequest, ListingFilter, ListingPageQuery, ListingUpdateRequest,
        },
        user::UserCreateRequest,
    },
    models::{
        listing::{GalleryImage, Listing, ListingWithGallery},
        user::{AuthToken, User},
    },
    store::{ListingStore, ListingTx, UserStore},
};

/// Strictly increasing timestamps so insertion order survives sorting.
#[derive(Clone, Default)]
struct Clock(Arc<AtomicI64>);

impl Clock {
    fn tick(&self) -> NaiveDateTime {
        let now = Utc::now().timestamp_micros();
        let prev = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        let micros = now.max(prev + 1);
        DateTime::from_timestamp_micros(micros)
            .map(|t| t.naive_utc())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default)]
struct ListingTables {
    listings: Vec<Listing>,
    gallery: Vec<GalleryImage>,
}

impl ListingTables {
    fn listing(&self, listing_id: Uuid) -> Option<&Listing> {
        self.listings.iter().find(|l| l.id == listing_id)
    }

    fn gallery_of(&self, listing_id: Uuid) -> Vec<GalleryImage> {
        let mut images: Vec<GalleryImage> = self
            .gallery
            .iter()
            .filter(|img| img.listing_id == listing_id)
            .cloned()
            .collect();
        images.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        images
    }

    fn matches(listing: &Listing, filter: &ListingFilter) -> bool {
        if let Some(keywords) = filter.keywords.as_deref().filter(|k| !k.is_empty()) {
            if !listing
                .title
                .to_lowercase()
                .contains(&keywords.to_lowercase())
            {
                return false;
            }
        }
        if let Some(listing_type) = filter.listing_type {
            if listing.listing_type != listing_type.as_str() {
                return false;
            }
        }
        !filter.sponsored_only || listing.is_sponsored
    }

    /// Removes listings matching `pred` together with their gallery rows,
    /// returning the removed listing ids.
    fn remove_listings(&mut self, pred: impl Fn(&Listing) -> bool) -> Vec<Uuid> {
        let removed: Vec<Uuid> = self
            .listings
            .iter()
            .filter(|l| pred(l))
            .map(|l| l.id)
            .collect();
        self.listings.retain(|l| !removed.contains(&l.id));
        self.gallery.retain(|img| !removed.contains(&img.listing_id));
        removed
    }

    fn upsert_listing(&mut self, listing: Listing) {
        match self.listings.iter_mut().find(|l| l.id == listing.id) {
            Some(row) => *row = listing,
            None => self.listings.push(listing),
        }
    }
}

/// Rows written by one transaction.
#[derive(Default)]
struct TxWrites {
    listings: HashSet<Uuid>,
    removed_listings: HashSet<Uuid>,
    gallery: HashSet<Uuid>,
    removed_gallery: HashSet<Uuid>,
}

impl TxWrites {
    /// Applies the recorded writes, taking row contents from `local`.
    fn replay(&self, local: &ListingTables, shared: &mut ListingTables) {
        shared.remove_listings(|l| self.removed_listings.contains(&l.id));
        shared
            .gallery
            .retain(|img| !self.removed_gallery.contains(&img.id));

        for listing in local.listings.iter().filter(|l| self.listings.contains(&l.id)) {
            shared.upsert_listing(listing.clone());
        }
        for img in local.gallery.iter().filter(|img| self.gallery.contains(&img.id)) {
            if shared.listing(img.listing_id).is_some() {
                shared.gallery.push(img.clone());
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryListingStore {
    tables: Arc<Mutex<ListingTables>>,
    fail_gallery_inserts: Arc<AtomicBool>,
    clock: Clock,
}

impl MemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following gallery insert fail, to exercise rollback.
    pub fn fail_gallery_inserts(&self, fail: bool) {
        self.fail_gallery_inserts.store(fail, Ordering::SeqCst);
    }

    pub async fn listings(&self) -> Vec<Listing> {
        self.tables.lock().await.listings.clone()
    }

    pub async fn gallery(&self) -> Vec<GalleryImage> {
        self.tables.lock().await.gallery.clone()
    }
}

#[async_trait]
impl ListingStore for MemoryListingStore {
    async fn begin(&self) -> Res<Box<dyn ListingTx>> {
        let snapshot = self.tables.lock().await.clone();
        Ok(Box::new(MemoryListingTx {
            tables: snapshot,
            shared: Arc::clone(&self.tables),
            writes: TxWrites::default(),
            fail_gallery_inserts: self.fail_gallery_inserts.load(Ordering::SeqCst),
            clock: self.clock.clone(),
        }))
    }

    async fn find_by_id(
        &self,
        listing_id: Uuid,
        include_gallery: bool,
    ) -> Res<Option<ListingWithGallery>> {
        let tables = self.tables.lock().await;
        Ok(tables.listing(listing_id).cloned().map(|listing| {
            let gallery = if include_gallery {
                tables.gallery_of(listing_id)
            } else {
                Vec::new()
            };
            ListingWithGallery { listing, gallery }
        }))
    }

    async fn find_page(&self, query: &ListingPageQuery) -> Res<(Vec<ListingWithGallery>, i64)> {
        let tables = self.tables.lock().await;
        let mut matching: Vec<&Listing> = tables
            .listings
            .iter()
            .filter(|l| ListingTables::matches(l, &query.filter))
            .collect();
        matching.sort_by(|a, b| query.sort.compare(a, b));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .map(|listing| ListingWithGallery {
                listing: listing.clone(),
                gallery: tables.gallery_of(listing.id),
            })
            .collect();

        Ok((page, total))
    }

    async fn blob_paths_owned_by(&self, user_id: Uuid) -> Res<Vec<String>> {
        let tables = self.tables.lock().await;
        let owned: Vec<&Listing> = tables
            .listings
            .iter()
            .filter(|l| l.user_id == user_id)
            .collect();

        let gallery = owned.iter().flat_map(|l| {
            tables
                .gallery_of(l.id)
                .into_iter()
                .filter_map(|img| img.photo_resized)
        });
        let thumbs = owned.iter().filter_map(|l| l.thumb_resized_image.clone());
        Ok(gallery.chain(thumbs).collect())
    }

    async fn delete_owned_by(&self, user_id: Uuid) -> Res<u64> {
        let mut tables = self.tables.lock().await;
        Ok(tables.remove_listings(|l| l.user_id == user_id).len() as u64)
    }
}

pub struct MemoryListingTx {
    tables: ListingTables,
    shared: Arc<Mutex<ListingTables>>,
    writes: TxWrites,
    fail_gallery_inserts: bool,
    clock: Clock,
}

#[async_trait]
impl ListingTx for MemoryListingTx {
    async fn insert_listing(&mut self, data: ListingCreateRequest) -> Res<Listing> {
        if data.fields.title.is_none() {
            return Err(AppError::BadRequest("title is required".to_string()));
        }
        if data.fields.asking_price.is_none() {
            return Err(AppError::BadRequest("askingPrice is required".to_string()));
        }

        let now = self.clock.tick();
        let mut listing = Listing {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            title: String::new(),
            thumb_resized_image: data.thumb_resized_image,
            description: None,
            location: None,
            year: None,
            make: None,
            model: None,
            trim: None,
            engine: None,
            drivetrain: None,
            transmission: None,
            mileage: None,
            vin: None,
            body_style: None,
            exterior_color: None,
            interior_color: None,
            seller_type: None,
            chassis_description: None,
            suspension_description: None,
            modification_notes: None,
            asking_price: BigDecimal::from(0),
            fixed_price: None,
            reserve_price: None,
            starting_bid_price: None,
            current_highest_bid: None,
            min_bid_increment: None,
            listing_type: "fixed_price".to_string(),
            auction_start_time: None,
            auction_end_time: None,
            bidding_duration_seconds: DEFAULT_BIDDING_DURATION_SECONDS,
            is_sponsored: false,
            sponsored_plan: None,
            status: "active".to_string(),
            created_at: now,
            updated_at: now,
        };
        data.fields.apply_to(&mut listing);

        self.writes.listings.insert(listing.id);
        self.tables.listings.push(listing.clone());
        Ok(listing)
    }

    async fn update_listing(
        &mut self,
        listing_id: Uuid,
        data: ListingUpdateRequest,
    ) -> Res<Listing> {
        let now = self.clock.tick();
        let listing = self
            .tables
            .listings
            .iter_mut()
            .find(|l| l.id == listing_id)
            .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;

        data.fields.apply_to(listing);
        if let Some(path) = data.thumb_resized_image {
            listing.thumb_resized_image = Some(path);
        }
        listing.updated_at = now;
        self.writes.listings.insert(listing_id);
        Ok(listing.clone())
    }

    async fn gallery_for_listing(&mut self, listing_id: Uuid) -> Res<Vec<GalleryImage>> {
        Ok(self.tables.gallery_of(listing_id))
    }

    async fn gallery_by_ids(
        &mut self,
        listing_id: Uuid,
        ids: &[Uuid],
    ) -> Res<Vec<GalleryImage>> {
        Ok(self
            .tables
            .gallery_of(listing_id)
            .into_iter()
            .filter(|img| ids.contains(&img.id))
            .collect())
    }

    async fn bulk_insert_gallery(
        &mut self,
        rows: Vec<GalleryImageCreateRequest>,
    ) -> Res<Vec<GalleryImage>> {
        if self.fail_gallery_inserts {
            return Err(AppError::Internal("gallery insert failed".to_string()));
        }

        let mut inserted = Vec::with_capacity(rows.len());
        for (position, row) in rows.into_iter().enumerate() {
            if self.tables.listing(row.listing_id).is_none() {
                return Err(AppError::Internal(format!(
                    "gallery image references missing listing {}",
                    row.listing_id
                )));
            }
            let now = self.clock.tick();
            inserted.push(GalleryImage {
                id: Uuid::new_v4(),
                listing_id: row.listing_id,
                photo_resized: Some(row.photo_resized),
                position: position as i32,
                created_at: now,
                updated_at: now,
            });
        }

        self.writes.gallery.extend(inserted.iter().map(|img| img.id));
        self.tables.gallery.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn delete_gallery(&mut self, scope: GalleryScope) -> Res<u64> {
        let removed: Vec<Uuid> = self
            .tables
            .gallery
            .iter()
            .filter(|img| match &scope {
                GalleryScope::Listing(listing_id) => img.listing_id == *listing_id,
                GalleryScope::Ids { listing_id, ids } => {
                    img.listing_id == *listing_id && ids.contains(&img.id)
                }
            })
            .map(|img| img.id)
            .collect();

        self.tables.gallery.retain(|img| !removed.contains(&img.id));
        for id in &removed {
            self.writes.gallery.remove(id);
            self.writes.removed_gallery.insert(*id);
        }
        Ok(removed.len() as u64)
    }

    async fn delete_listing(&mut self, listing_id: Uuid) -> Res<u64> {
        let removed = self.tables.remove_listings(|l| l.id == listing_id);
        for id in &removed {
            self.writes.listings.remove(id);
            self.writes.removed_listings.insert(*id);
        }
        Ok(removed.len() as u64)
    }

    async fn commit(self: Box<Self>) -> Res<()> {
        let mut shared = self.shared.lock().await;
        self.writes.replay(&self.tables, &mut shared);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Res<()> {
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<Mutex<Vec<User>>>,
    clock: Clock,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `change` to the stored user, if any.
    pub async fn modify(&self, user_id: Uuid, change: impl FnOnce(&mut User)) {
        if let Some(user) = self.users.lock().await.iter_mut().find(|u| u.id == user_id) {
            change(user);
        }
    }

    pub async fn users(&self) -> Vec<User> {
        self.users.lock().await.clone()
    }

    async fn with_user<T>(&self, user_id: Uuid, f: impl FnOnce(&mut User) -> T) -> Res<T> {
        let now = self.clock.tick();
        let mut users = self.users.lock().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| AppError::NotFound("User Not Found!".to_string()))?;
        user.updated_at = now;
        Ok(f(user))
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Res<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.email_address == email).cloned())
    }

    async fn find_by_id(&self, user_id: Uuid) -> Res<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn create(&self, data: UserCreateRequest) -> Res<User> {
        let now = self.clock.tick();
        let mut users = self.users.lock().await;
        if users.iter().any(|u| u.email_address == data.email_address) {
            return Err(AppError::BadRequest(format!(
                "{} is already registered",
                data.email_address
            )));
        }

        let user = User {
            id: Uuid::new_v4(),
            role: data.role.as_str().to_string(),
            avatar: None,
            first_name: None,
            last_name: None,
            email_address: data.email_address,
            email_otp: data.email_otp,
            email_verified_at: data.email_verified_at,
            phone_country_code: None,
            phone_number: None,
            phone_otp: None,
            phone_verified_at: None,
            is_otp_verified: false,
            providers: Json(Vec::new()),
            auth_tokens: Json(Vec::new()),
            user_settings: JsonValue::Object(Default::default()),
            account_status: data.account_status.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn set_email_otp(&self, user_id: Uuid, otp_hash: Option<String>) -> Res<()> {
        self.with_user(user_id, |user| user.email_otp = otp_hash).await
    }

    async fn mark_otp_verified(&self, user_id: Uuid) -> Res<()> {
        self.with_user(user_id, |user| {
            user.email_otp = None;
            user.is_otp_verified = true;
        })
        .await
    }

    async fn push_auth_token(&self, user_id: Uuid, token: AuthToken) -> Res<()> {
        let now = Utc::now();
        self.with_user(user_id, |user| {
            user.auth_tokens.0.retain(|t| t.is_active_at(now));
            user.auth_tokens.0.push(token);
        })
        .await
    }

    async fn remove_auth_token(&self, user_id: Uuid, token: &str) -> Res<()> {
        self.with_user(user_id, |user| {
            user.auth_tokens.0.retain(|t| t.token != token);
        })
        .await
    }

    async fn delete(&self, user_id: Uuid) -> Res<bool> {
        let mut users = self.users.lock().await;
        let before = users.len();
        users.retain(|u| u.id != user_id);
        Ok(users.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use common::misc::{AccountStatus, ListingType, UserRole};

    use super::*;
    use crate::dtos::listing::{ListingFields, ListingSort, SortDirection, SortField};

    fn fields(title: &str, price: i64) -> ListingFields {
        ListingFields {
            title: Some(title.to_string()),
            asking_price: Some(BigDecimal::from(price)),
            ..Default::default()
        }
    }

    async fn create(store: &MemoryListingStore, user_id: Uuid, f: ListingFields) -> Listing {
        let mut tx = store.begin().await.unwrap();
        let listing = tx
            .insert_listing(ListingCreateRequest {
                user_id,
                fields: f,
                thumb_resized_image: None,
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();
        listing
    }

    fn page(filter: ListingFilter, sort: ListingSort) -> ListingPageQuery {
        ListingPageQuery {
            filter,
            sort,
            offset: 0,
            limit: 50,
        }
    }

    #[tokio::test]
    async fn insert_applies_column_defaults() {
        let store = MemoryListingStore::new();
        let listing = create(&store, Uuid::new_v4(), fields("Civic", 9000)).await;
        assert_eq!(listing.listing_type, "fixed_price");
        assert_eq!(listing.status, "active");
        assert_eq!(listing.bidding_duration_seconds, DEFAULT_BIDDING_DURATION_SECONDS);
        assert!(!listing.is_sponsored);
    }

    #[tokio::test]
    async fn rollback_discards_writes() {
        let store = MemoryListingStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_listing(ListingCreateRequest {
            user_id: Uuid::new_v4(),
            fields: fields("Golf", 12000),
            thumb_resized_image: None,
        })
        .await
        .unwrap();
        tx.rollback().await.unwrap();
        assert!(store.listings().await.is_empty());
    }

    #[tokio::test]
    async fn overlapping_transactions_keep_both_commits() {
        let store = MemoryListingStore::new();
        let owner = Uuid::new_v4();
        let existing = create(&store, owner, fields("Golf", 12000)).await;

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        let inserted = first
            .insert_listing(ListingCreateRequest {
                user_id: owner,
                fields: fields("Civic", 9000),
                thumb_resized_image: None,
            })
            .await
            .unwrap();
        second
            .update_listing(
                existing.id,
                ListingUpdateRequest {
                    fields: fields("Golf GTI", 15000),
                    thumb_resized_image: None,
                },
            )
            .await
            .unwrap();
        second
            .bulk_insert_gallery(vec![GalleryImageCreateRequest {
                listing_id: existing.id,
                photo_resized: "uploads/gti.png".to_string(),
            }])
            .await
            .unwrap();
        first.commit().await.unwrap();
        second.commit().await.unwrap();

        let listings = store.listings().await;
        assert_eq!(listings.len(), 2);
        assert!(listings.iter().any(|l| l.id == inserted.id));
        let updated = listings.iter().find(|l| l.id == existing.id).unwrap();
        assert_eq!(updated.title, "Golf GTI");
        assert_eq!(store.gallery().await.len(), 1);
    }

    #[tokio::test]
    async fn deleting_listing_cascades_gallery() {
        let store = MemoryListingStore::new();
        let listing = create(&store, Uuid::new_v4(), fields("Golf", 12000)).await;

        let mut tx = store.begin().await.unwrap();
        tx.bulk_insert_gallery(vec![
            GalleryImageCreateRequest {
                listing_id: listing.id,
                photo_resized: "uploads/a.png".to_string(),
            },
            GalleryImageCreateRequest {
                listing_id: listing.id,
                photo_resized: "uploads/b.png".to_string(),
            },
        ])
        .await
        .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.gallery().await.len(), 2);

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.delete_listing(listing.id).await.unwrap(), 1);
        tx.commit().await.unwrap();
        assert!(store.gallery().await.is_empty());
    }

    #[tokio::test]
    async fn scoped_gallery_delete_ignores_other_listings() {
        let store = MemoryListingStore::new();
        let owner = Uuid::new_v4();
        let first = create(&store, owner, fields("A", 1)).await;
        let second = create(&store, owner, fields("B", 2)).await;

        let mut tx = store.begin().await.unwrap();
        let foreign = tx
            .bulk_insert_gallery(vec![GalleryImageCreateRequest {
                listing_id: second.id,
                photo_resized: "uploads/x.png".to_string(),
            }])
            .await
            .unwrap();
        let removed = tx
            .delete_gallery(GalleryScope::Ids {
                listing_id: first.id,
                ids: vec![foreign[0].id],
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(removed, 0);
        assert_eq!(store.gallery().await.len(), 1);
    }

    #[tokio::test]
    async fn page_filters_and_sorts() {
        let store = MemoryListingStore::new();
        let owner = Uuid::new_v4();
        create(&store, owner, fields("Tesla Model S", 45000)).await;
        create(
            &store,
            owner,
            ListingFields {
                listing_type: Some(ListingType::LiveAuction),
                ..fields("Porsche 911", 90000)
            },
        )
        .await;
        create(&store, owner, fields("tesla model 3", 30000)).await;

        let (rows, total) = store
            .find_page(&page(
                ListingFilter {
                    keywords: Some("TESLA".to_string()),
                    ..Default::default()
                },
                ListingSort {
                    field: SortField::AskingPrice,
                    direction: SortDirection::Asc,
                },
            ))
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows[0].listing.title, "tesla model 3");

        let (rows, total) = store
            .find_page(&page(
                ListingFilter {
                    listing_type: Some(ListingType::LiveAuction),
                    ..Default::default()
                },
                ListingSort::default(),
            ))
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].listing.title, "Porsche 911");

        // default sort is newest first
        let (rows, _) = store
            .find_page(&page(ListingFilter::default(), ListingSort::default()))
            .await
            .unwrap();
        assert_eq!(rows[0].listing.title, "tesla model 3");
    }

    #[tokio::test]
    async fn nullable_sort_keeps_missing_values_last() {
        let store = MemoryListingStore::new();
        let owner = Uuid::new_v4();
        create(&store, owner, fields("no year", 1)).await;
        create(
            &store,
            owner,
            ListingFields {
                year: Some(2001),
                ..fields("old", 1)
            },
        )
        .await;
        create(
            &store,
            owner,
            ListingFields {
                year: Some(2020),
                ..fields("new", 1)
            },
        )
        .await;

        for direction in [SortDirection::Asc, SortDirection::Desc] {
            let (rows, _) = store
                .find_page(&page(
                    ListingFilter::default(),
                    ListingSort {
                        field: SortField::Year,
                        direction,
                    },
                ))
                .await
                .unwrap();
            assert_eq!(rows[2].listing.title, "no year");
        }
    }

    #[tokio::test]
    async fn owned_blob_paths_and_cascade() {
        let store = MemoryListingStore::new();
        let owner = Uuid::new_v4();
        let mut tx = store.begin().await.unwrap();
        let listing = tx
            .insert_listing(ListingCreateRequest {
                user_id: owner,
                fields: fields("Mini", 5000),
                thumb_resized_image: Some("uploads/thumb.png".to_string()),
            })
            .await
            .unwrap();
        tx.bulk_insert_gallery(vec![GalleryImageCreateRequest {
            listing_id: listing.id,
            photo_resized: "uploads/g.png".to_string(),
        }])
        .await
        .unwrap();
        tx.commit().await.unwrap();
        create(&store, Uuid::new_v4(), fields("other", 1)).await;

        let paths = store.blob_paths_owned_by(owner).await.unwrap();
        assert_eq!(paths, vec!["uploads/g.png", "uploads/thumb.png"]);

        assert_eq!(store.delete_owned_by(owner).await.unwrap(), 1);
        assert_eq!(store.listings().await.len(), 1);
        assert!(store.gallery().await.is_empty());
    }

    #[tokio::test]
    async fn pushing_a_token_prunes_expired_ones() {
        let store = MemoryUserStore::new();
        let user = store
            .create(UserCreateRequest {
                email_address: "a@b.co".to_string(),
                role: UserRole::Consumer,
                account_status: AccountStatus::Active,
                email_otp: None,
                email_verified_at: None,
            })
            .await
            .unwrap();

        let token = |name: &str, offset: Duration| AuthToken {
            token: name.to_string(),
            user_ip_address: None,
            fcm_token: None,
            expires_at: Utc::now() + offset,
        };
        store
            .push_auth_token(user.id, token("old", Duration::hours(-1)))
            .await
            .unwrap();
        store
            .push_auth_token(user.id, token("new", Duration::hours(1)))
            .await
            .unwrap();

        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        let names: Vec<&str> = stored.auth_tokens.iter().map(|t| t.token.as_str()).collect();
        assert_eq!(names, vec!["new"]);

        store.remove_auth_token(user.id, "new").await.unwrap();
        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.auth_tokens.is_empty());
    }
}
