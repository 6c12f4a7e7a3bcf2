use std::collections::HashMap;

use common::error::{AppError, Res};
use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    dtos::listing::{
        DEFAULT_BIDDING_DURATION_SECONDS, GalleryImageCreateRequest, GalleryScope,
        ListingCreateRequest, ListingFilter, ListingPageQuery, ListingUpdateRequest,
    },
    models::listing::{GalleryImage, Listing},
};

const NOW_UTC: &str = "(NOW() AT TIME ZONE 'utc')";

pub async fn get_listing_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    listing_id: Uuid,
) -> Res<Option<Listing>> {
    sqlx::query_as::<_, Listing>("SELECT * FROM listings WHERE id = $1")
        .bind(listing_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn insert_listing<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: ListingCreateRequest,
) -> Res<Listing> {
    let f = data.fields;
    sqlx::query_as::<_, Listing>(
        r#"
        INSERT INTO listings (
            user_id, title, thumb_resized_image, description, location, year, make, model,
            trim, engine, drivetrain, transmission, mileage, vin, body_style, exterior_color,
            interior_color, seller_type, chassis_description, suspension_description,
            modification_notes, asking_price, fixed_price, reserve_price, starting_bid_price,
            min_bid_increment, listing_type, auction_start_time, auction_end_time,
            bidding_duration_seconds, is_sponsored, sponsored_plan, status
        )
        VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18,
            $19, $20, $21, $22, $23, $24, $25, $26, COALESCE($27, 'fixed_price'), $28, $29,
            COALESCE($30, $31), COALESCE($32, FALSE), $33, COALESCE($34, 'active')
        )
        RETURNING *
        "#,
    )
    .bind(data.user_id)
    .bind(f.title)
    .bind(data.thumb_resized_image)
    .bind(f.description)
    .bind(f.location)
    .bind(f.year)
    .bind(f.make)
    .bind(f.model)
    .bind(f.trim)
    .bind(f.engine)
    .bind(f.drivetrain)
    .bind(f.transmission)
    .bind(f.mileage)
    .bind(f.vin)
    .bind(f.body_style)
    .bind(f.exterior_color)
    .bind(f.interior_color)
    .bind(f.seller_type.map(|v| v.as_str()))
    .bind(f.chassis_description)
    .bind(f.suspension_description)
    .bind(f.modification_notes)
    .bind(f.asking_price)
    .bind(f.fixed_price)
    .bind(f.reserve_price)
    .bind(f.starting_bid_price)
    .bind(f.min_bid_increment)
    .bind(f.listing_type.map(|v| v.as_str()))
    .bind(f.auction_start_time)
    .bind(f.auction_end_time)
    .bind(f.bidding_duration_seconds)
    .bind(DEFAULT_BIDDING_DURATION_SECONDS)
    .bind(f.is_sponsored)
    .bind(f.sponsored_plan.map(|v| v.as_str()))
    .bind(f.status.map(|v| v.as_str()))
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

/// Partial update: only fields present in the request are written.
pub async fn update_listing<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    listing_id: Uuid,
    data: ListingUpdateRequest,
) -> Res<Listing> {
    let f = data.fields;
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE listings SET updated_at = ");
    qb.push(NOW_UTC);

    macro_rules! set {
        ($column:literal, $value:expr) => {
            if let Some(value) = $value {
                qb.push(concat!(", ", $column, " = ")).push_bind(value);
            }
        };
    }

    set!("title", f.title);
    set!("thumb_resized_image", data.thumb_resized_image);
    set!("description", f.description);
    set!("location", f.location);
    set!("year", f.year);
    set!("make", f.make);
    set!("model", f.model);
    set!("trim", f.trim);
    set!("engine", f.engine);
    set!("drivetrain", f.drivetrain);
    set!("transmission", f.transmission);
    set!("mileage", f.mileage);
    set!("vin", f.vin);
    set!("body_style", f.body_style);
    set!("exterior_color", f.exterior_color);
    set!("interior_color", f.interior_color);
    set!("seller_type", f.seller_type.map(|v| v.as_str()));
    set!("chassis_description", f.chassis_description);
    set!("suspension_description", f.suspension_description);
    set!("modification_notes", f.modification_notes);
    set!("asking_price", f.asking_price);
    set!("fixed_price", f.fixed_price);
    set!("reserve_price", f.reserve_price);
    set!("starting_bid_price", f.starting_bid_price);
    set!("min_bid_increment", f.min_bid_increment);
    set!("listing_type", f.listing_type.map(|v| v.as_str()));
    set!("auction_start_time", f.auction_start_time);
    set!("auction_end_time", f.auction_end_time);
    set!("bidding_duration_seconds", f.bidding_duration_seconds);
    set!("is_sponsored", f.is_sponsored);
    set!("sponsored_plan", f.sponsored_plan.map(|v| v.as_str()));
    set!("status", f.status.map(|v| v.as_str()));

    qb.push(" WHERE id = ").push_bind(listing_id);
    qb.push(" RETURNING *");

    qb.build_query_as::<Listing>()
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))
}

pub async fn delete_listing<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    listing_id: Uuid,
) -> Res<u64> {
    let result = sqlx::query("DELETE FROM listings WHERE id = $1")
        .bind(listing_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Deletes every listing of a user. Gallery rows go with them through the
/// foreign key.
pub async fn delete_listings_by_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<u64> {
    let result = sqlx::query("DELETE FROM listings WHERE user_id = $1")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Thumbnail and gallery paths of every listing owned by `user_id`.
pub async fn get_blob_paths_by_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT g.photo_resized
        FROM listing_car_gallery_images g
        JOIN listings l ON l.id = g.listing_id
        WHERE l.user_id = $1 AND g.photo_resized IS NOT NULL
        UNION ALL
        SELECT thumb_resized_image
        FROM listings
        WHERE user_id = $1 AND thumb_resized_image IS NOT NULL
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

pub async fn get_gallery_by_listing<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    listing_id: Uuid,
) -> Res<Vec<GalleryImage>> {
    sqlx::query_as::<_, GalleryImage>(
        "SELECT * FROM listing_car_gallery_images WHERE listing_id = $1 ORDER BY position, created_at",
    )
    .bind(listing_id)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

/// Gallery images of several listings, grouped by listing id.
pub async fn get_gallery_by_listings<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    listing_ids: &[Uuid],
) -> Res<HashMap<Uuid, Vec<GalleryImage>>> {
    if listing_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = sqlx::query_as::<_, GalleryImage>(
        r#"
        SELECT * FROM listing_car_gallery_images
        WHERE listing_id = ANY($1)
        ORDER BY position, created_at
        "#,
    )
    .bind(listing_ids)
    .fetch_all(executor)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<GalleryImage>> = HashMap::new();
    for row in rows {
        grouped.entry(row.listing_id).or_default().push(row);
    }
    Ok(grouped)
}

pub async fn get_gallery_by_ids<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    listing_id: Uuid,
    ids: &[Uuid],
) -> Res<Vec<GalleryImage>> {
    sqlx::query_as::<_, GalleryImage>(
        "SELECT * FROM listing_car_gallery_images WHERE listing_id = $1 AND id = ANY($2)",
    )
    .bind(listing_id)
    .bind(ids)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

pub async fn insert_gallery_images<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    rows: Vec<GalleryImageCreateRequest>,
) -> Res<Vec<GalleryImage>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO listing_car_gallery_images (listing_id, photo_resized, position) ",
    );
    qb.push_values(rows.into_iter().enumerate(), |mut b, (position, row)| {
        b.push_bind(row.listing_id)
            .push_bind(row.photo_resized)
            .push_bind(position as i32);
    });
    qb.push(" RETURNING *");

    qb.build_query_as::<GalleryImage>()
        .fetch_all(executor)
        .await
        .map_err(AppError::from)
}

pub async fn delete_gallery_images<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    scope: GalleryScope,
) -> Res<u64> {
    let result = match scope {
        GalleryScope::Listing(listing_id) => {
            sqlx::query("DELETE FROM listing_car_gallery_images WHERE listing_id = $1")
                .bind(listing_id)
                .execute(executor)
                .await?
        }
        GalleryScope::Ids { listing_id, ids } => {
            sqlx::query(
                "DELETE FROM listing_car_gallery_images WHERE listing_id = $1 AND id = ANY($2)",
            )
            .bind(listing_id)
            .bind(ids)
            .execute(executor)
            .await?
        }
    };
    Ok(result.rows_affected())
}

pub async fn count_listings<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    filter: &ListingFilter,
) -> Res<i64> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM listings");
    push_filter(&mut qb, filter);
    qb.build_query_scalar::<i64>()
        .fetch_one(executor)
        .await
        .map_err(AppError::from)
}

pub async fn get_listings_page<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    query: &ListingPageQuery,
) -> Res<Vec<Listing>> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM listings");
    push_filter(&mut qb, &query.filter);

    // column names come from a closed enum, never from user input
    qb.push(" ORDER BY ")
        .push(query.sort.field.column())
        .push(" ")
        .push(query.sort.direction.as_sql())
        .push(" NULLS LAST, id ASC");
    qb.push(" LIMIT ").push_bind(query.limit);
    qb.push(" OFFSET ").push_bind(query.offset);

    qb.build_query_as::<Listing>()
        .fetch_all(executor)
        .await
        .map_err(AppError::from)
}

fn push_filter(qb: &mut QueryBuilder<Postgres>, filter: &ListingFilter) {
    let mut conditions_added = false;

    // Helper to add WHERE or AND
    let mut add_condition_separator = |qb: &mut QueryBuilder<Postgres>| {
        if !conditions_added {
            qb.push(" WHERE ");
            conditions_added = true;
        } else {
            qb.push(" AND ");
        }
    };

    if let Some(keywords) = filter.keywords.as_deref().filter(|k| !k.is_empty()) {
        add_condition_separator(qb);
        qb.push("title ILIKE ")
            .push_bind(format!("%{}%", escape_like(keywords)));
    }

    if let Some(listing_type) = filter.listing_type {
        add_condition_separator(qb);
        qb.push("listing_type = ").push_bind(listing_type.as_str());
    }

    if filter.sponsored_only {
        add_condition_separator(qb);
        qb.push("is_sponsored = TRUE");
    }
}

/// Escapes LIKE wildcards so keywords match literally.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::misc::ListingType;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("Tesla"), "Tesla");
    }

    #[test]
    fn filter_builds_where_clause() {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM listings");
        push_filter(
            &mut qb,
            &ListingFilter {
                keywords: Some("tesla".to_string()),
                listing_type: Some(ListingType::LiveAuction),
                sponsored_only: true,
            },
        );
        assert_eq!(
            qb.sql(),
            "SELECT * FROM listings WHERE title ILIKE $1 AND listing_type = $2 AND is_sponsored = TRUE"
        );
    }

    #[test]
    fn empty_filter_adds_nothing() {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM listings");
        push_filter(&mut qb, &ListingFilter::default());
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM listings");
    }
}
