use actix_web::web;
use middleware::auth::AuthMiddleware;

pub mod routes {
    pub mod auth;
    pub mod user;
}
pub mod middleware {
    pub mod auth;
}
pub mod misc {
    pub mod mailer;
}

mod services {
    pub(crate) mod auth;
    pub(crate) mod otp;
    pub(crate) mod user;
}
mod dtos {
    pub(crate) mod auth;
}

/// `/auth` routes. Login and OTP verification are public, everything else
/// sits behind the bearer token middleware.
pub fn mount_auth() -> actix_web::Scope {
    web::scope("/auth")
        .service(routes::auth::post_login)
        .service(routes::auth::post_verify_otp)
        .service(
            web::scope("")
                .wrap(auth_middleware())
                .service(routes::user::get_me)
                .service(routes::auth::post_logout)
                .service(routes::user::delete_account),
        )
}

// Auth middleware
pub fn auth_middleware() -> AuthMiddleware {
    AuthMiddleware::new()
}
