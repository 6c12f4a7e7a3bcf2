use std::{future::Future, pin::Pin, sync::Arc};

use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::AUTHORIZATION,
    web,
};
use chrono::Utc;
use common::{
    env_config::Config,
    error::AppError,
    jwt::{self, BearerToken},
};
use db::store::UserStore;
use futures::future::{Ready, ok};
use jsonwebtoken::errors::ErrorKind;

const UNAUTHORIZED: &str = "Unauthorized";
const TOKEN_EXPIRED: &str = "Token Has Been Expired";

/// Requires a bearer JWT that is also one of the user's live sessions.
/// Stores `JwtClaims` and `BearerToken` in the request extensions.
pub struct AuthMiddleware {}

impl AuthMiddleware {
    pub fn new() -> Self {
        AuthMiddleware {}
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareService {
            service: Arc::new(service),
        })
    }
}

pub struct AuthMiddlewareService<S> {
    service: Arc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = Arc::clone(&self.service);

        let token = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .and_then(jwt::bearer_from_header)
            .map(str::to_string);
        let config = req.app_data::<web::Data<Arc<Config>>>().cloned();
        let users = req.app_data::<web::Data<Arc<dyn UserStore>>>().cloned();

        Box::pin(async move {
            let (Some(config), Some(users)) = (config, users) else {
                return Ok(req.error_response(AppError::Internal(
                    "Authentication is not configured".to_string(),
                )));
            };

            // no token passed - 401
            let Some(token) = token else {
                return Ok(req.error_response(AppError::Unauthorized(UNAUTHORIZED.to_string())));
            };

            let claims = match jwt::validate_jwt(&token, &config.jwt_config.secret) {
                Ok(claims) => claims,
                Err(AppError::JWT(err)) if matches!(err.kind(), ErrorKind::ExpiredSignature) => {
                    return Ok(
                        req.error_response(AppError::Unauthorized(TOKEN_EXPIRED.to_string()))
                    );
                }
                Err(err) => {
                    log::debug!("Rejected bearer token: {}", err);
                    return Ok(req.error_response(AppError::Unauthorized(UNAUTHORIZED.to_string())));
                }
            };

            // the JWT alone is not enough, the session must still be stored
            let user = match users.find_by_id(claims.user_id).await {
                Ok(Some(user)) => user,
                Ok(None) => {
                    return Ok(req.error_response(AppError::Unauthorized(UNAUTHORIZED.to_string())));
                }
                Err(err) => return Ok(req.error_response(err)),
            };
            if user.active_token(&token, Utc::now()).is_none() {
                return Ok(req.error_response(AppError::Unauthorized(TOKEN_EXPIRED.to_string())));
            }

            req.extensions_mut().insert(claims);
            req.extensions_mut().insert(BearerToken(token));
            srv.call(req).await.map(|res| res.map_into_boxed_body())
        })
    }
}
