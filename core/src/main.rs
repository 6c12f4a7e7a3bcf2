mod cors;

use std::sync::Arc;

use actix_files::Files;
use actix_web::{
    App, HttpResponse, HttpServer,
    middleware::{Compress, Condition, ErrorHandlers},
    web::{self},
};
use api_auth::misc::mailer::{LogMailer, OtpMailer};
use common::{env_config::Config, error::AppError, http::hide_internal_details};
use db::{
    pg::{PgListingStore, PgUserStore},
    retry::RetryPolicy,
    store::{ListingStore, UserStore},
};
use storage::BlobStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();
    let config_data = config.clone();
    let origin = config.cors_allowed_origin.clone();
    let production = config.is_production();

    // init logger
    if config.console_logging_enabled {
        logger::setup(&config).expect("Failed to set up logger");
    }

    // init db connection
    let pool = db::setup(&config)
        .await
        .expect("Failed to set up database");
    let retry = RetryPolicy::from_config(&config.db);
    let listings: Arc<dyn ListingStore> = Arc::new(PgListingStore::new(pool.clone(), retry.clone()));
    let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool, retry));

    // init blob storage
    let blobs = Arc::new(BlobStore::new(&config.storage));
    blobs
        .ensure_dirs()
        .await
        .expect("Failed to create uploads directory");
    let uploads_path = blobs.uploads_path();

    let mailer: Arc<dyn OtpMailer> = Arc::new(LogMailer::new(&config.otp));

    log::info!(
        "Starting {} on {}:{}",
        config.project_name,
        config.server_host,
        config.server_port
    );

    HttpServer::new(move || {
        let project_name = config_data.project_name.clone();
        App::new()
            .app_data(web::Data::new(config_data.clone()))
            .app_data(web::Data::new(listings.clone()))
            .app_data(web::Data::new(users.clone()))
            .app_data(web::Data::new(blobs.clone()))
            .app_data(web::Data::new(mailer.clone()))
            .app_data(
                web::JsonConfig::default()
                    .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
            )
            .wrap(Condition::new(
                production,
                ErrorHandlers::new().default_handler_server(hide_internal_details),
            )) // 4th
            .wrap(Compress::default()) // 3rd
            .wrap(cors::middleware(&origin)) // 2nd
            .wrap(logger::middleware()) // 1st
            .service(Files::new("/uploads", uploads_path.clone()))
            .route(
                "/",
                web::get().to(move || {
                    let project_name = project_name.clone();
                    async move { HttpResponse::Ok().body(project_name) }
                }),
            )
            .service(api_auth::mount_auth())
            .service(api_listing::mount_listing())
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
