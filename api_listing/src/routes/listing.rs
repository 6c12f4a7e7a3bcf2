use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{Responder, delete, get, post, put, web};
use common::{
    env_config::Config,
    error::{AppError, Res},
    http::Success,
    jwt::JwtClaims,
};
use db::store::ListingStore;
use storage::BlobStore;
use uuid::Uuid;

use crate::{
    dtos::listing::{ListingDetailResponse, ListingQuery, SaveListingResponse, parse_listing_fields},
    misc::form::{ListingForm, read_listing_form},
    services::{
        lifecycle::{self, Actor, SaveListing},
        query,
    },
};

const SAVED: &str = "Listing saved successfully";

fn parse_listing_id(raw: &str) -> Res<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::NotFound("Listing not found".to_string()))
}

/// Parses the text fields, dropping the uploaded files when they are invalid.
async fn save_request(
    form: ListingForm,
    listing_id: Option<Uuid>,
    claims: &JwtClaims,
    blobs: &BlobStore,
) -> Res<SaveListing> {
    let parsed = parse_listing_fields(&form.fields)
        .and_then(|fields| Ok((fields, form.deleted_ids()?)));
    match parsed {
        Ok((fields, deleted_image_ids)) => Ok(SaveListing {
            listing_id,
            fields,
            deleted_image_ids,
            thumbnail: form.thumbnail,
            gallery: form.gallery,
            actor: Actor::from(claims),
        }),
        Err(err) => {
            form.discard(blobs).await;
            Err(err)
        }
    }
}

/// Paginated listings, newest first unless `orderBy`/`orderType` say otherwise.
///
/// # Input
/// - `page`, `size`: pagination, defaults 1 and 10
/// - `keywords`: case-insensitive title substring
/// - `orderBy`, `orderType`: sort column and `ASC`/`DESC`
/// - `listingType`: `fixed_price` or `live_auction`, other values are ignored
///
/// # Output
/// `{ "pagination": { totalItems, perPage, currentPage, lastPage }, "listings": [...] }`
#[get("")]
pub async fn get_listings(
    query: web::Query<ListingQuery>,
    listings: web::Data<Arc<dyn ListingStore>>,
    blobs: web::Data<Arc<BlobStore>>,
) -> Res<impl Responder> {
    let filter = query::listing_filter(&query);
    let page = query::get_page(listings.get_ref().as_ref(), &blobs, filter, &query).await?;
    Success::ok(page)
}

/// Same as the list endpoint, restricted to sponsored listings.
#[get("/sponsored")]
pub async fn get_sponsored(
    query: web::Query<ListingQuery>,
    listings: web::Data<Arc<dyn ListingStore>>,
    blobs: web::Data<Arc<BlobStore>>,
) -> Res<impl Responder> {
    let filter = query::sponsored_filter();
    let page = query::get_page(listings.get_ref().as_ref(), &blobs, filter, &query).await?;
    Success::ok(page)
}

#[get("/{listing_id}")]
pub async fn get_listing(
    path: web::Path<String>,
    listings: web::Data<Arc<dyn ListingStore>>,
    blobs: web::Data<Arc<BlobStore>>,
) -> Res<impl Responder> {
    let listing_id = parse_listing_id(&path)?;
    let listing = query::get_by_id(listings.get_ref().as_ref(), &blobs, listing_id).await?;
    Success::ok(ListingDetailResponse { listing })
}

/// Creates a listing from a `multipart/form-data` body.
///
/// # Input
/// - text fields: `title` and `askingPrice` are required
/// - `thumb_Resized_image`: at most one file
/// - `galleryImages`: at most ten files
///
/// # Output
/// - Success: 201 `{ "message": "Listing saved successfully", "listingId" }`
/// - Error: 400 for invalid fields or uploads
#[post("/create")]
pub async fn post_create(
    claims: web::ReqData<JwtClaims>,
    payload: Multipart,
    config: web::Data<Arc<Config>>,
    listings: web::Data<Arc<dyn ListingStore>>,
    blobs: web::Data<Arc<BlobStore>>,
) -> Res<impl Responder> {
    let form = read_listing_form(payload, &blobs, config.storage.max_file_size).await?;
    let request = save_request(form, None, &claims, &blobs).await?;
    let outcome = lifecycle::save_listing(listings.get_ref().as_ref(), &blobs, request).await?;
    Success::created(SaveListingResponse {
        message: SAVED,
        listing_id: outcome.listing_id(),
    })
}

/// Partially updates a listing. New `galleryImages` replace the gallery,
/// `deletedImageIds` removes single images.
#[put("/update/{listing_id}")]
pub async fn put_update(
    path: web::Path<String>,
    claims: web::ReqData<JwtClaims>,
    payload: Multipart,
    config: web::Data<Arc<Config>>,
    listings: web::Data<Arc<dyn ListingStore>>,
    blobs: web::Data<Arc<BlobStore>>,
) -> Res<impl Responder> {
    let listing_id = parse_listing_id(&path)?;
    let form = read_listing_form(payload, &blobs, config.storage.max_file_size).await?;
    let request = save_request(form, Some(listing_id), &claims, &blobs).await?;
    let outcome = lifecycle::save_listing(listings.get_ref().as_ref(), &blobs, request).await?;
    Success::ok(SaveListingResponse {
        message: SAVED,
        listing_id: outcome.listing_id(),
    })
}

#[delete("/{listing_id}")]
pub async fn delete_listing(
    path: web::Path<String>,
    claims: web::ReqData<JwtClaims>,
    listings: web::Data<Arc<dyn ListingStore>>,
    blobs: web::Data<Arc<BlobStore>>,
) -> Res<impl Responder> {
    let listing_id = parse_listing_id(&path)?;
    let actor = Actor::from(&*claims);
    lifecycle::delete_listing(listings.get_ref().as_ref(), &blobs, listing_id, actor).await?;
    Success::message("Listing and related images deleted successfully")
}
