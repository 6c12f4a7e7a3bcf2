use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Listing {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    /// Path relative to the storage root, never a URL.
    pub thumb_resized_image: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub year: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub trim: Option<String>,
    pub engine: Option<String>,
    pub drivetrain: Option<String>,
    pub transmission: Option<String>,
    pub mileage: Option<String>,
    pub vin: Option<String>,
    pub body_style: Option<String>,
    pub exterior_color: Option<String>,
    pub interior_color: Option<String>,
    pub seller_type: Option<String>,
    pub chassis_description: Option<String>,
    pub suspension_description: Option<String>,
    pub modification_notes: Option<String>,
    pub asking_price: BigDecimal,
    pub fixed_price: Option<BigDecimal>,
    pub reserve_price: Option<BigDecimal>,
    pub starting_bid_price: Option<BigDecimal>,
    pub current_highest_bid: Option<BigDecimal>,
    pub min_bid_increment: Option<BigDecimal>,
    pub listing_type: String,
    pub auction_start_time: Option<NaiveDateTime>,
    pub auction_end_time: Option<NaiveDateTime>,
    pub bidding_duration_seconds: i32,
    pub is_sponsored: bool,
    pub sponsored_plan: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GalleryImage {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub photo_resized: Option<String>,
    pub position: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct ListingWithGallery {
    pub listing: Listing,
    pub gallery: Vec<GalleryImage>,
}

impl ListingWithGallery {
    /// Every blob path the listing references, gallery first.
    pub fn blob_paths(&self) -> Vec<String> {
        self.gallery
            .iter()
            .filter_map(|img| img.photo_resized.clone())
            .chain(self.listing.thumb_resized_image.clone())
            .collect()
    }
}
