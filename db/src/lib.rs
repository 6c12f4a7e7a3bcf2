use common::env_config::Config;
use sqlx::{
    PgPool,
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
};
use std::{str::FromStr, sync::Arc};

pub mod listing;
pub mod memory;
pub mod pg;
pub mod retry;
pub mod store;
pub mod user;

pub mod models {
    pub mod listing;
    pub mod user;
}

pub mod dtos {
    pub mod listing;
    pub mod user;
}

pub use bigdecimal::BigDecimal;

/// Connects to Postgres, creating the database when it does not exist yet,
/// and applies pending migrations.
pub async fn setup(config: &Config) -> Result<Arc<PgPool>, Box<dyn std::error::Error>> {
    let require_ssl = config.is_production();
    let url = url::Url::parse(&config.database_url)?;
    let db_name = url.path().trim_start_matches('/');
    let username = url.username();
    let password = url.password().unwrap_or("");
    let host = url.host_str().unwrap_or("localhost");
    let port = url.port().unwrap_or(5432);

    let admin_url = format!(
        "postgresql://{}:{}@{}:{}/postgres",
        username, password, host, port
    );

    let mut admin_options = PgConnectOptions::from_str(&admin_url)?;
    if require_ssl {
        admin_options = admin_options.ssl_mode(PgSslMode::Require);
    }

    let admin_pool = PgPool::connect_with(admin_options).await?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(&admin_pool)
            .await?;

    if !exists {
        log::info!("Creating database {}", db_name);
        sqlx::query(&format!("CREATE DATABASE \"{}\"", db_name))
            .execute(&admin_pool)
            .await?;
    }

    admin_pool.close().await;

    let mut options = PgConnectOptions::from_str(&config.database_url)?;
    if require_ssl {
        options = options.ssl_mode(PgSslMode::Require);
    }
    let pool = PgPoolOptions::new()
        .max_connections(config.db.max_connections)
        .acquire_timeout(config.db.acquire_timeout)
        .idle_timeout(config.db.idle_timeout)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    log::info!("Database ready, migrations applied");

    Ok(Arc::new(pool))
}
