use actix_web::{
    HttpResponse, Responder,
    body::{self, MessageBody},
    dev::ServiceResponse,
    middleware::ErrorHandlerResponse,
    web::Bytes,
};
use serde::Serialize;
use serde_json::Value;

use super::error::Res;

pub struct Success;
impl Success {
    pub fn created<T: Serialize>(body: T) -> Res<impl Responder> {
        Result::Ok(HttpResponse::Created().json(body))
    }
    pub fn ok<T: Serialize>(body: T) -> Res<impl Responder> {
        Result::Ok(HttpResponse::Ok().json(body))
    }
    /// `{"message": ...}` with 200 OK.
    pub fn message(message: &str) -> Res<impl Responder> {
        Result::Ok(HttpResponse::Ok().json(serde_json::json!({ "message": message })))
    }
}

/// Error handler for 5xx responses that drops the `error` detail from JSON
/// bodies and keeps `message`. Installed only in production.
pub fn hide_internal_details<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>>
where
    B: MessageBody + 'static,
{
    Ok(ErrorHandlerResponse::Future(Box::pin(async move {
        let (req, res) = res.into_parts();
        let (head, body) = res.into_parts();
        let bytes = body::to_bytes(body).await.unwrap_or_default();

        let body = match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(mut map)) => {
                map.remove("error");
                serde_json::to_vec(&map).map(Bytes::from).unwrap_or(bytes)
            }
            _ => bytes,
        };

        let res = ServiceResponse::new(req, head.set_body(body));
        Ok(res.map_into_boxed_body().map_into_right_body())
    })))
}

#[cfg(test)]
mod tests {
    use actix_web::{App, middleware::ErrorHandlers, test, web};

    use super::*;
    use crate::error::AppError;

    async fn failing_query() -> Res<HttpResponse> {
        Err(AppError::Database(sqlx::Error::RowNotFound))
    }

    async fn failing_delete() -> Res<HttpResponse> {
        Err(AppError::Internal("Failed to delete listing".to_string()))
    }

    async fn missing() -> Res<HttpResponse> {
        Err(AppError::NotFound("Listing not found".to_string()))
    }

    #[actix_web::test]
    async fn server_errors_lose_their_detail() {
        let app = test::init_service(
            App::new()
                .wrap(ErrorHandlers::new().default_handler_server(hide_internal_details))
                .route("/query", web::get().to(failing_query))
                .route("/delete", web::get().to(failing_delete))
                .route("/missing", web::get().to(missing)),
        )
        .await;

        let req = test::TestRequest::get().uri("/query").to_request();
        let json: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(json, serde_json::json!({ "message": "Internal server error" }));

        let req = test::TestRequest::get().uri("/delete").to_request();
        let json: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(json["message"], "Failed to delete listing");

        let req = test::TestRequest::get().uri("/missing").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), actix_web::http::StatusCode::NOT_FOUND);
        let json: Value = test::read_body_json(res).await;
        assert_eq!(json["message"], "Listing not found");
    }
}
