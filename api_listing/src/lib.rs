use actix_web::web;

pub mod routes {
    pub mod listing;
}
pub mod services {
    pub mod lifecycle;
    pub mod query;
}
pub mod dtos {
    pub mod listing;
}
pub mod misc {
    pub mod form;
}

/// `/listing` routes. Browsing is public, reading a single listing and
/// every write require a bearer token.
pub fn mount_listing() -> actix_web::Scope {
    web::scope("/listing")
        .service(routes::listing::get_listings)
        .service(routes::listing::get_sponsored)
        .service(
            web::scope("")
                .wrap(api_auth::auth_middleware())
                .service(routes::listing::post_create)
                .service(routes::listing::put_update)
                .service(routes::listing::get_listing)
                .service(routes::listing::delete_listing),
        )
}
