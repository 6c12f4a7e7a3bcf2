use actix_cors::Cors;
use actix_web::http::header;

/// `*` allows any origin, anything else is taken as the single allowed origin.
pub fn middleware(origin: &str) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ])
        .max_age(3600);

    if origin.trim() == "*" {
        cors.allow_any_origin()
    } else {
        cors.allowed_origin(origin).supports_credentials()
    }
}
