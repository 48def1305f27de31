use api_types::envelope::ApiErrorResponse;
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};
use engine::{BULK_LIMIT, EngineError};
use serde_json::json;

pub use server::{
    ApiDoc, RateLimitConfig, ServerConfig, ServerState, router, run, run_with_listener,
    spawn_with_listener,
};

mod analytics;
mod budgets;
mod categories;
mod extract;
mod server;
mod transactions;

pub enum ServerError {
    Engine(EngineError),
    BadRequest(String),
    /// Bulk body with no items or more than [`BULK_LIMIT`].
    BatchSize(usize),
    RateLimited,
}

pub(crate) fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) | EngineError::CategoryInUse(_) => StatusCode::CONFLICT,
        EngineError::Database(_) | EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InvalidAmount(_)
        | EngineError::Validation(_)
        | EngineError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
    }
}

/// Stable code carried in the error envelope.
pub(crate) fn code_for_engine_error(err: &EngineError) -> &'static str {
    match err {
        EngineError::KeyNotFound(_) => "NOT_FOUND",
        EngineError::ExistingKey(_) => "CONFLICT",
        EngineError::CategoryInUse(_) => "CATEGORY_IN_USE",
        EngineError::InvalidQuery(_) => "INVALID_QUERY",
        EngineError::InvalidAmount(_) | EngineError::Validation(_) => "VALIDATION_ERROR",
        EngineError::Database(_) | EngineError::Storage(_) => "DATABASE_ERROR",
    }
}

pub(crate) fn message_for_engine_error(err: &EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::Storage(storage_err) => {
            tracing::error!("storage error: {storage_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ServerError::Engine(err) => (
                status_for_engine_error(&err),
                ApiErrorResponse::new(code_for_engine_error(&err), message_for_engine_error(&err)),
            ),
            ServerError::BadRequest(err) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("BAD_REQUEST", err),
            ),
            ServerError::BatchSize(received) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new(
                    "VALIDATION_ERROR",
                    format!("between 1 and {BULK_LIMIT} items per request, got {received}"),
                )
                .with_details(json!({ "limit": BULK_LIMIT, "received": received })),
            ),
            ServerError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                ApiErrorResponse::new("RATE_LIMITED", "too many requests, retry later"),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<JsonRejection> for ServerError {
    fn from(value: JsonRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

impl From<QueryRejection> for ServerError {
    fn from(value: QueryRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

impl From<PathRejection> for ServerError {
    fn from(value: PathRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    async fn body_json(res: axum::response::Response) -> serde_json::Value {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn batch_size_error_carries_details() {
        let res = ServerError::BatchSize(501).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_json(res).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"]["limit"], 500);
        assert_eq!(body["error"]["details"]["received"], 501);
    }

    #[tokio::test]
    async fn engine_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::KeyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body = body_json(res).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[test]
    fn engine_conflict_maps_to_409() {
        let res = ServerError::from(EngineError::ExistingKey("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn category_in_use_maps_to_409() {
        let res = ServerError::from(EngineError::CategoryInUse("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(res).await["error"]["code"], "CATEGORY_IN_USE");
    }

    #[tokio::test]
    async fn engine_validation_maps_to_400() {
        let res = ServerError::from(EngineError::InvalidAmount("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["error"]["code"], "VALIDATION_ERROR");

        let res = ServerError::from(EngineError::InvalidQuery("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["error"]["code"], "INVALID_QUERY");
    }

    #[tokio::test]
    async fn storage_errors_hide_details() {
        let res = ServerError::from(EngineError::Storage("disk on fire".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(res).await;
        assert_eq!(body["error"]["code"], "DATABASE_ERROR");
        assert_eq!(body["error"]["message"], "internal server error");
    }

    #[test]
    fn bad_request_maps_to_400() {
        let res = ServerError::BadRequest("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn rate_limited_maps_to_429() {
        let res = ServerError::RateLimited.into_response();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
