use common::{
    error::{AppError, Res},
    misc::ListingType,
};
use db::{
    dtos::listing::{ListingFilter, ListingPageQuery, ListingSort, SortDirection, SortField},
    store::ListingStore,
};
use storage::BlobStore;
use uuid::Uuid;

use crate::dtos::listing::{ListingPageResponse, ListingQuery, ListingResponse, PaginationMeta};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: i64,
    pub size: i64,
}

impl PageParams {
    /// Missing, malformed and non-positive values fall back to the defaults.
    pub fn from_query(page: Option<&str>, size: Option<&str>) -> Self {
        let positive = |value: Option<&str>, default: i64| {
            value
                .and_then(|v| v.trim().parse::<i64>().ok())
                .filter(|v| *v >= 1)
                .unwrap_or(default)
        };
        PageParams {
            page: positive(page, DEFAULT_PAGE),
            size: positive(size, DEFAULT_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.size)
    }

    pub fn last_page(&self, total_items: i64) -> i64 {
        if total_items <= 0 {
            return 0;
        }
        (total_items - 1) / self.size + 1
    }
}

fn sort_from(query: &ListingQuery) -> ListingSort {
    ListingSort {
        field: SortField::from_param(query.order_by.as_deref()),
        direction: SortDirection::from_param(query.order_type.as_deref()),
    }
}

/// Filter of the public list endpoint. An unknown `listingType` is ignored.
pub fn listing_filter(query: &ListingQuery) -> ListingFilter {
    ListingFilter {
        keywords: query
            .keywords
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string),
        listing_type: query
            .listing_type
            .as_deref()
            .and_then(|v| v.trim().parse::<ListingType>().ok()),
        sponsored_only: false,
    }
}

pub fn sponsored_filter() -> ListingFilter {
    ListingFilter {
        sponsored_only: true,
        ..Default::default()
    }
}

pub async fn get_page(
    listings: &dyn ListingStore,
    blobs: &BlobStore,
    filter: ListingFilter,
    query: &ListingQuery,
) -> Res<ListingPageResponse> {
    let params = PageParams::from_query(query.page.as_deref(), query.size.as_deref());
    let (rows, total_items) = listings
        .find_page(&ListingPageQuery {
            filter,
            sort: sort_from(query),
            offset: params.offset(),
            limit: params.size,
        })
        .await?;

    Ok(ListingPageResponse {
        pagination: PaginationMeta {
            total_items,
            per_page: params.size,
            current_page: params.page,
            last_page: params.last_page(total_items),
        },
        listings: rows
            .into_iter()
            .map(|row| ListingResponse::from_record(row, blobs))
            .collect(),
    })
}

pub async fn get_by_id(
    listings: &dyn ListingStore,
    blobs: &BlobStore,
    listing_id: Uuid,
) -> Res<ListingResponse> {
    let record = listings
        .find_by_id(listing_id, true)
        .await?
        .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;
    Ok(ListingResponse::from_record(record, blobs))
}
