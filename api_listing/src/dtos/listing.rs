use std::{collections::HashMap, str::FromStr};

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use common::error::{AppError, Res};
use db::{
    dtos::listing::ListingFields,
    models::listing::{GalleryImage, ListingWithGallery},
};
use serde::{Deserialize, Serialize};
use storage::BlobStore;
use uuid::Uuid;

/// Query string of the list and sponsored endpoints. Everything is kept as
/// text so malformed values fall back to defaults instead of failing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingQuery {
    pub page: Option<String>,
    pub size: Option<String>,
    pub keywords: Option<String>,
    pub order_by: Option<String>,
    pub order_type: Option<String>,
    pub listing_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImageResponse {
    pub id: Uuid,
    pub photo_resized: Option<String>,
}

/// Client view of a listing. Image paths are already absolute URLs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(rename = "thumb_Resized_image")]
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
    pub gallery_images: Vec<GalleryImageResponse>,
}

impl ListingResponse {
    pub fn from_record(record: ListingWithGallery, blobs: &BlobStore) -> Self {
        let ListingWithGallery { listing: l, gallery } = record;
        ListingResponse {
            id: l.id,
            user_id: l.user_id,
            title: l.title,
            thumb_resized_image: blobs.url_for(l.thumb_resized_image.as_deref()),
            description: l.description,
            location: l.location,
            year: l.year,
            make: l.make,
            model: l.model,
            trim: l.trim,
            engine: l.engine,
            drivetrain: l.drivetrain,
            transmission: l.transmission,
            mileage: l.mileage,
            vin: l.vin,
            body_style: l.body_style,
            exterior_color: l.exterior_color,
            interior_color: l.interior_color,
            seller_type: l.seller_type,
            chassis_description: l.chassis_description,
            suspension_description: l.suspension_description,
            modification_notes: l.modification_notes,
            asking_price: l.asking_price,
            fixed_price: l.fixed_price,
            reserve_price: l.reserve_price,
            starting_bid_price: l.starting_bid_price,
            current_highest_bid: l.current_highest_bid,
            min_bid_increment: l.min_bid_increment,
            listing_type: l.listing_type,
            auction_start_time: l.auction_start_time,
            auction_end_time: l.auction_end_time,
            bidding_duration_seconds: l.bidding_duration_seconds,
            is_sponsored: l.is_sponsored,
            sponsored_plan: l.sponsored_plan,
            status: l.status,
            created_at: l.created_at,
            updated_at: l.updated_at,
            gallery_images: gallery
                .into_iter()
                .map(|img: GalleryImage| GalleryImageResponse {
                    id: img.id,
                    photo_resized: blobs.url_for(img.photo_resized.as_deref()),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub total_items: i64,
    pub per_page: i64,
    pub current_page: i64,
    pub last_page: i64,
}

#[derive(Debug, Serialize)]
pub struct ListingPageResponse {
    pub pagination: PaginationMeta,
    pub listings: Vec<ListingResponse>,
}

#[derive(Debug, Serialize)]
pub struct ListingDetailResponse {
    pub listing: ListingResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveListingResponse {
    pub message: &'static str,
    pub listing_id: Uuid,
}

/// Largest value a NUMERIC(12, 2) column holds.
const MAX_PRICE: i64 = 9_999_999_999;

/// Builds the typed field set from form text fields. Names outside the
/// mutable allow-list are ignored and empty values count as absent.
pub fn parse_listing_fields(form: &HashMap<String, String>) -> Res<ListingFields> {
    let get = |name: &str| {
        form.get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    };
    let text = |name: &str| get(name).map(str::to_string);

    Ok(ListingFields {
        title: text("title"),
        description: text("description"),
        location: text("location"),
        year: parse_with(get("year"), "year", |v| v.parse::<i32>().ok())?,
        make: text("make"),
        model: text("model"),
        trim: text("trim"),
        engine: text("engine"),
        drivetrain: text("drivetrain"),
        transmission: text("transmission"),
        mileage: text("mileage"),
        vin: text("vin"),
        body_style: text("bodyStyle"),
        exterior_color: text("exteriorColor"),
        interior_color: text("interiorColor"),
        seller_type: parse_enum(get("sellerType"), "sellerType")?,
        chassis_description: text("chassisDescription"),
        suspension_description: text("suspensionDescription"),
        modification_notes: text("modificationNotes"),
        asking_price: parse_with(get("askingPrice"), "askingPrice", parse_price)?,
        fixed_price: parse_with(get("fixedPrice"), "fixedPrice", parse_price)?,
        reserve_price: parse_with(get("reservePrice"), "reservePrice", parse_price)?,
        starting_bid_price: parse_with(get("startingBidPrice"), "startingBidPrice", parse_price)?,
        min_bid_increment: parse_with(get("minBidIncrement"), "minBidIncrement", parse_price)?,
        listing_type: parse_enum(get("listingType"), "listingType")?,
        auction_start_time: parse_with(get("auctionStartTime"), "auctionStartTime", parse_time)?,
        auction_end_time: parse_with(get("auctionEndTime"), "auctionEndTime", parse_time)?,
        bidding_duration_seconds: parse_with(
            get("biddingDurationSeconds"),
            "biddingDurationSeconds",
            |v| v.parse::<i32>().ok().filter(|s| *s >= 0),
        )?,
        is_sponsored: parse_with(get("isSponsored"), "isSponsored", parse_bool)?,
        sponsored_plan: parse_enum(get("sponsoredPlan"), "sponsoredPlan")?,
        status: parse_enum(get("status"), "status")?,
    })
}

fn parse_with<T>(value: Option<&str>, name: &str, parse: impl Fn(&str) -> Option<T>) -> Res<Option<T>> {
    value
        .map(|v| parse(v).ok_or_else(|| invalid(name)))
        .transpose()
}

fn parse_enum<T: FromStr>(value: Option<&str>, name: &str) -> Res<Option<T>> {
    parse_with(value, name, |v| v.parse::<T>().ok())
}

fn invalid(name: &str) -> AppError {
    AppError::BadRequest(format!("Invalid value for {}", name))
}

/// Fits `NUMERIC(12,2)`: non-negative, at most `MAX_PRICE`, at most two decimals.
fn parse_price(value: &str) -> Option<BigDecimal> {
    let price = BigDecimal::from_str(value).ok()?;
    let (_, scale) = price.normalized().as_bigint_and_exponent();
    let in_range = price >= BigDecimal::from(0) && price <= BigDecimal::from(MAX_PRICE);
    (in_range && scale <= 2).then_some(price)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// RFC 3339 (converted to UTC), a naive date-time, or a bare date.
fn parse_time(value: &str) -> Option<NaiveDateTime> {
    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Some(time.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::misc::{ListingStatus, ListingType, SellerType};

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_known_fields_and_ignores_the_rest() {
        let fields = parse_listing_fields(&form(&[
            ("title", " 2015 Tesla Model S "),
            ("askingPrice", "45000.50"),
            ("listingType", "live_auction"),
            ("sellerType", "dealer"),
            ("status", "pending"),
            ("year", "2015"),
            ("isSponsored", "true"),
            ("auctionStartTime", "2025-03-01T10:00:00Z"),
            ("userId", "someone-else"),
            ("currentHighestBid", "99999"),
            ("description", ""),
        ]))
        .unwrap();

        assert_eq!(fields.title.as_deref(), Some("2015 Tesla Model S"));
        assert_eq!(fields.asking_price, Some(BigDecimal::from_str("45000.50").unwrap()));
        assert_eq!(fields.listing_type, Some(ListingType::LiveAuction));
        assert_eq!(fields.seller_type, Some(SellerType::Dealer));
        assert_eq!(fields.status, Some(ListingStatus::Pending));
        assert_eq!(fields.year, Some(2015));
        assert_eq!(fields.is_sponsored, Some(true));
        assert!(fields.auction_start_time.is_some());
        assert_eq!(fields.description, None);
    }

    #[test]
    fn invalid_values_name_the_field() {
        for (name, value) in [
            ("askingPrice", "-1"),
            ("askingPrice", "lots"),
            ("askingPrice", "9999999999.999"),
            ("fixedPrice", "1.005"),
            ("listingType", "barter"),
            ("year", "MMXV"),
            ("isSponsored", "maybe"),
            ("auctionEndTime", "tomorrow"),
        ] {
            let err = parse_listing_fields(&form(&[(name, value)])).unwrap_err();
            assert_eq!(err.to_string(), format!("Invalid value for {}", name));
        }
    }

    #[test]
    fn prices_keep_at_most_two_decimals() {
        assert_eq!(parse_price("45000.50"), BigDecimal::from_str("45000.50").ok());
        assert_eq!(parse_price("1.500"), BigDecimal::from_str("1.5").ok());
        assert_eq!(parse_price("9999999999.99"), None);
        assert!(parse_price("9999999999").is_some());
        assert!(parse_price("0.125").is_none());
    }

    #[test]
    fn time_formats() {
        assert!(parse_time("2025-03-01 10:00:00").is_some());
        assert!(parse_time("2025-03-01").is_some());
        assert_eq!(
            parse_time("2025-03-01T12:00:00+02:00"),
            parse_time("2025-03-01T10:00:00")
        );
    }
}
