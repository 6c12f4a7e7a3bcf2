use std::cmp::Ordering;

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use common::misc::{ListingStatus, ListingType, SellerType, SponsoredPlan};
use uuid::Uuid;

use crate::models::listing::Listing;

pub const DEFAULT_BIDDING_DURATION_SECONDS: i32 = 30 * 24 * 60 * 60;

/// Client-mutable listing columns. `None` leaves a column untouched on
/// update and falls back to the column default on create.
#[derive(Debug, Clone, Default)]
pub struct ListingFields {
    pub title: Option<String>,
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
    pub seller_type: Option<SellerType>,
    pub chassis_description: Option<String>,
    pub suspension_description: Option<String>,
    pub modification_notes: Option<String>,
    pub asking_price: Option<BigDecimal>,
    pub fixed_price: Option<BigDecimal>,
    pub reserve_price: Option<BigDecimal>,
    pub starting_bid_price: Option<BigDecimal>,
    pub min_bid_increment: Option<BigDecimal>,
    pub listing_type: Option<ListingType>,
    pub auction_start_time: Option<NaiveDateTime>,
    pub auction_end_time: Option<NaiveDateTime>,
    pub bidding_duration_seconds: Option<i32>,
    pub is_sponsored: Option<bool>,
    pub sponsored_plan: Option<SponsoredPlan>,
    pub status: Option<ListingStatus>,
}

impl ListingFields {
    /// Copies every present field onto `listing`.
    pub fn apply_to(&self, listing: &mut Listing) {
        macro_rules! copy {
            ($($field:ident),+) => {
                $(if let Some(value) = &self.$field {
                    listing.$field = Some(value.clone());
                })+
            };
        }
        copy!(
            description,
            location,
            year,
            make,
            model,
            trim,
            engine,
            drivetrain,
            transmission,
            mileage,
            vin,
            body_style,
            exterior_color,
            interior_color,
            chassis_description,
            suspension_description,
            modification_notes,
            fixed_price,
            reserve_price,
            starting_bid_price,
            min_bid_increment,
            auction_start_time,
            auction_end_time
        );

        if let Some(title) = &self.title {
            listing.title = title.clone();
        }
        if let Some(price) = &self.asking_price {
            listing.asking_price = price.clone();
        }
        if let Some(seller_type) = self.seller_type {
            listing.seller_type = Some(seller_type.as_str().to_string());
        }
        if let Some(listing_type) = self.listing_type {
            listing.listing_type = listing_type.as_str().to_string();
        }
        if let Some(seconds) = self.bidding_duration_seconds {
            listing.bidding_duration_seconds = seconds;
        }
        if let Some(sponsored) = self.is_sponsored {
            listing.is_sponsored = sponsored;
        }
        if let Some(plan) = self.sponsored_plan {
            listing.sponsored_plan = Some(plan.as_str().to_string());
        }
        if let Some(status) = self.status {
            listing.status = status.as_str().to_string();
        }
    }
}

pub struct ListingCreateRequest {
    pub user_id: Uuid,
    pub fields: ListingFields,
    pub thumb_resized_image: Option<String>,
}

pub struct ListingUpdateRequest {
    pub fields: ListingFields,
    /// Replaces the stored thumbnail path when present.
    pub thumb_resized_image: Option<String>,
}

pub struct GalleryImageCreateRequest {
    pub listing_id: Uuid,
    pub photo_resized: String,
}

/// Which gallery rows a delete touches.
#[derive(Debug, Clone)]
pub enum GalleryScope {
    /// Every image of the listing.
    Listing(Uuid),
    /// The given ids, restricted to images of the listing.
    Ids { listing_id: Uuid, ids: Vec<Uuid> },
}

#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    /// Case-insensitive substring of the title.
    pub keywords: Option<String>,
    pub listing_type: Option<ListingType>,
    pub sponsored_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    Year,
    AskingPrice,
    AuctionStartTime,
    AuctionEndTime,
}

impl SortField {
    /// Maps an `orderBy` parameter; unknown names fall back to `createdAt`.
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("updatedAt") => SortField::UpdatedAt,
            Some("title") => SortField::Title,
            Some("year") => SortField::Year,
            Some("askingPrice") => SortField::AskingPrice,
            Some("auctionStartTime") => SortField::AuctionStartTime,
            Some("auctionEndTime") => SortField::AuctionEndTime,
            _ => SortField::CreatedAt,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Title => "title",
            SortField::Year => "year",
            SortField::AskingPrice => "asking_price",
            SortField::AuctionStartTime => "auction_start_time",
            SortField::AuctionEndTime => "auction_end_time",
        }
    }

    /// Ascending comparison with missing values ordered last.
    pub fn compare(&self, a: &Listing, b: &Listing) -> Ordering {
        match self {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::Title => a.title.cmp(&b.title),
            SortField::Year => nulls_last(&a.year, &b.year),
            SortField::AskingPrice => a.asking_price.cmp(&b.asking_price),
            SortField::AuctionStartTime => {
                nulls_last(&a.auction_start_time, &b.auction_start_time)
            }
            SortField::AuctionEndTime => nulls_last(&a.auction_end_time, &b.auction_end_time),
        }
    }

    /// True when the compared column can be NULL.
    pub fn nullable(&self) -> bool {
        matches!(
            self,
            SortField::Year | SortField::AuctionStartTime | SortField::AuctionEndTime
        )
    }
}

fn nulls_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// `ASC` in any letter case sorts ascending, anything else descending.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("asc") => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListingSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl ListingSort {
    /// Full ordering used for a page, ties broken by id.
    pub fn compare(&self, a: &Listing, b: &Listing) -> Ordering {
        let primary = match (self.direction, self.field.nullable()) {
            (SortDirection::Asc, _) => self.field.compare(a, b),
            // keep NULLs last when descending as well
            (SortDirection::Desc, true) => match self.field.compare(a, b) {
                ord if is_null_pair(self.field, a, b) => ord,
                ord => ord.reverse(),
            },
            (SortDirection::Desc, false) => self.field.compare(a, b).reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

fn is_null_pair(field: SortField, a: &Listing, b: &Listing) -> bool {
    let (x, y) = match field {
        SortField::Year => (a.year.is_none(), b.year.is_none()),
        SortField::AuctionStartTime => {
            (a.auction_start_time.is_none(), b.auction_start_time.is_none())
        }
        SortField::AuctionEndTime => (a.auction_end_time.is_none(), b.auction_end_time.is_none()),
        _ => (false, false),
    };
    x || y
}

#[derive(Debug, Clone)]
pub struct ListingPageQuery {
    pub filter: ListingFilter,
    pub sort: ListingSort,
    pub offset: i64,
    pub limit: i64,
}
