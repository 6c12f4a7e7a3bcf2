use common::error::{AppError, Res};
use sqlx::{Executor, Postgres, types::Json};
use uuid::Uuid;

use crate::{
    dtos::user::UserCreateRequest,
    models::user::{AuthToken, User},
};

pub async fn get_user_by_email<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    email: &str,
) -> Res<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email_address = $1")
        .bind(email)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn get_user_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn insert_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: UserCreateRequest,
) -> Res<User> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email_address, role, account_status, email_otp, email_verified_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(data.email_address)
    .bind(data.role.as_str())
    .bind(data.account_status.as_str())
    .bind(data.email_otp)
    .bind(data.email_verified_at)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

pub async fn update_email_otp<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    otp_hash: Option<String>,
) -> Res<()> {
    sqlx::query(
        "UPDATE users SET email_otp = $1, updated_at = (NOW() AT TIME ZONE 'utc') WHERE id = $2",
    )
    .bind(otp_hash)
    .bind(user_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Clears the pending OTP and flags the user as verified.
pub async fn mark_otp_verified<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET email_otp = NULL, is_otp_verified = TRUE, updated_at = (NOW() AT TIME ZONE 'utc')
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Appends a session token and drops the ones that already expired, in a
/// single statement so concurrent logins do not overwrite each other.
pub async fn push_auth_token<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    token: &AuthToken,
) -> Res<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET auth_tokens = COALESCE(
                (SELECT jsonb_agg(t)
                 FROM jsonb_array_elements(auth_tokens) t
                 WHERE (t->>'expiresAt')::timestamptz > NOW()),
                '[]'::jsonb
            ) || jsonb_build_array($2::jsonb),
            updated_at = (NOW() AT TIME ZONE 'utc')
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(Json(token))
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn remove_auth_token<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    token: &str,
) -> Res<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET auth_tokens = COALESCE(
                (SELECT jsonb_agg(t)
                 FROM jsonb_array_elements(auth_tokens) t
                 WHERE t->>'token' <> $2),
                '[]'::jsonb
            ),
            updated_at = (NOW() AT TIME ZONE 'utc')
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(token)
    .execute(executor)
    .await?;
    Ok(())
}

/// Hard delete. Listings and their gallery rows cascade.
pub async fn delete_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<u64> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
