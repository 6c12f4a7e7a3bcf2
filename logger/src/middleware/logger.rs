use std::{collections::BTreeMap, sync::Arc, time::Instant};

use actix_web::{
    Error, HttpMessage, HttpResponse, ResponseError,
    body::{self, BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    web,
};
use colored::Colorize;
use common::{env_config::Config, jwt::JwtClaims};
use futures::future::{LocalBoxFuture, Ready, ready};
use log::{debug, info};
use serde_json::{Value, json};

/// Writes one line per request: status, method, path, elapsed time, the
/// authenticated user and the query parameters.
pub struct LoggerMiddleware {}

impl LoggerMiddleware {
    pub fn new() -> Self {
        Self {}
    }
}

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
    <B as MessageBody>::Error: ResponseError,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = LoggerMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LoggerMiddlewareService {
            service: Arc::new(service),
        }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: Arc<S>,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
    <B as MessageBody>::Error: ResponseError,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let started = Instant::now();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let params = query_params(req.query_string());
        let enabled = req
            .app_data::<web::Data<Arc<Config>>>()
            .map_or(true, |config| config.console_logging_enabled);
        let srv = Arc::clone(&self.service);

        Box::pin(async move {
            let res = srv.call(req).await?;
            if !enabled {
                return Ok(res.map_into_boxed_body());
            }

            let status = res.status();
            // claims are only present when the auth middleware accepted the token
            let user_id = res
                .request()
                .extensions()
                .get::<JwtClaims>()
                .map(|claims| claims.user_id);

            let status_code = status.as_u16();
            let colored_status = match status_code {
                200..=299 => status_code.to_string().green(),
                300..=399 => status_code.to_string().yellow(),
                400..=499 => status_code.to_string().bright_red(),
                _ => status_code.to_string().red(),
            };
            let colored_method = match method.as_str() {
                "GET" => method.blue(),
                "POST" => method.yellow(),
                "PUT" => method.purple(),
                "DELETE" => method.red(),
                _ => method.normal(),
            };

            info!(
                "[{}] {} {} {} user_id={} params={}",
                colored_status,
                colored_method,
                path.bright_white(),
                format!("({}ms)", started.elapsed().as_millis()).bright_black(),
                user_id
                    .map_or("None".to_string(), |id| id.to_string())
                    .bright_blue(),
                params.to_string().bright_cyan(),
            );

            if status_code < 400 {
                return Ok(res.map_into_boxed_body());
            }

            // Copy the error body and rebuild the response around it
            let (req, res) = res.into_parts();
            let headers = res.headers().clone();
            let bytes = body::to_bytes(res.into_body()).await?;
            let response_body = serde_json::from_slice::<Value>(&bytes).unwrap_or(Value::Null);
            debug!(
                "  Response: {}",
                serde_json::to_string(&response_body)
                    .unwrap_or_default()
                    .bright_yellow()
            );

            let mut rebuilt = HttpResponse::build(status);
            for (key, value) in headers.iter() {
                rebuilt.insert_header((key.clone(), value.clone()));
            }
            Ok(ServiceResponse::new(req, rebuilt.body(bytes)))
        })
    }
}

/// `a=1&b` becomes `{"a":"1","b":true}`.
fn query_params(query_string: &str) -> Value {
    let params: BTreeMap<&str, Value> = query_string
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key, json!(value)),
            None => (pair, json!(true)),
        })
        .collect();
    json!(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, http::StatusCode, test::{self as actix_test, TestRequest}};

    #[test]
    fn query_params_become_json() {
        assert_eq!(query_params(""), json!({}));
        assert_eq!(
            query_params("page=2&size=5&sponsored"),
            json!({ "page": "2", "size": "5", "sponsored": true })
        );
    }

    #[actix_web::test]
    async fn error_bodies_pass_through_unchanged() {
        let app = actix_test::init_service(
            App::new()
                .wrap(LoggerMiddleware::new())
                .route(
                    "/missing",
                    web::get().to(|| async {
                        HttpResponse::NotFound().json(json!({ "message": "Listing not found" }))
                    }),
                )
                .route("/ok", web::get().to(|| async { HttpResponse::Ok().body("fine") })),
        )
        .await;

        let res = actix_test::call_service(&app, TestRequest::get().uri("/missing").to_request()).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            res.headers().get("content-type").unwrap(),
            "application/json"
        );
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["message"], "Listing not found");

        let res = actix_test::call_service(&app, TestRequest::get().uri("/ok").to_request()).await;
        assert_eq!(actix_test::read_body(res).await, "fine");
    }
}
