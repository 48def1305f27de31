use std::{net::SocketAddr, num::NonZeroU32, sync::Arc, time::Duration};

use api_types::{
    envelope::{ApiErrorResponse, ApiResponse, ListMeta},
    health::HealthView,
};
use axum::{
    Json, Router,
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use engine::{Engine, ListQuery, Page};
use governor::{Quota, RateLimiter};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::{ServerError, analytics, budgets, categories, transactions};

type GlobalRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Global request budget: `requests` per `period_secs`, with bursts up to
/// `requests`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub requests: u32,
    pub period_secs: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerConfig {
    /// Allowed CORS origins; empty allows any origin.
    pub cors_origins: Vec<String>,
    /// `None` disables rate limiting.
    pub rate_limit: Option<RateLimitConfig>,
}

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    rate_limiter: Option<Arc<GlobalRateLimiter>>,
}

impl ServerState {
    pub fn new(engine: Engine, config: &ServerConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            rate_limiter: config.rate_limit.and_then(rate_limiter),
        }
    }
}

fn rate_limiter(config: RateLimitConfig) -> Option<Arc<GlobalRateLimiter>> {
    let burst = NonZeroU32::new(config.requests);
    let replenish = Duration::from_secs(config.period_secs) / config.requests.max(1);
    match (Quota::with_period(replenish), burst) {
        (Some(quota), Some(burst)) => {
            tracing::info!(
                requests = config.requests,
                period_secs = config.period_secs,
                "rate limiting enabled"
            );
            Some(Arc::new(RateLimiter::direct(quota.allow_burst(burst))))
        }
        _ => {
            tracing::warn!("rate limit needs non-zero requests and period_secs, disabled");
            None
        }
    }
}

async fn rate_limit(
    State(state): State<ServerState>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    if let Some(limiter) = &state.rate_limiter
        && limiter.check().is_err()
    {
        tracing::warn!("rate limit exceeded");
        return Err(ServerError::RateLimited);
    }
    Ok(next.run(request).await)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring invalid CORS origin {origin:?}");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Wrap a repository page, attaching pagination metadata when the query
/// asked for a page.
pub(crate) fn page_response<T, V>(
    page: Page<T>,
    query: &ListQuery,
    map: impl FnMut(T) -> V,
) -> ApiResponse<Vec<V>> {
    let total = page.count;
    let data = page.data.into_iter().map(map).collect();
    match query.pagination {
        Some(pagination) => ApiResponse::ok(data).with_meta(ListMeta {
            total,
            page: pagination.page,
            limit: pagination.limit,
            total_pages: pagination.total_pages(total),
        }),
        None => ApiResponse::ok(data),
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Budget Tracker API",
        description = "Transactions, categories, budgets and spending analytics"
    ),
    paths(
        health,
        categories::list, categories::create, categories::tree, categories::get,
        categories::update, categories::delete, categories::deactivate, categories::usage,
        transactions::list, transactions::create, transactions::get, transactions::update,
        transactions::delete, transactions::bulk_create, transactions::bulk_delete,
        transactions::import, transactions::summary,
        budgets::list, budgets::create, budgets::progress, budgets::alerts, budgets::get,
        budgets::update, budgets::delete,
        analytics::dashboard, analytics::categories, analytics::monthly, analytics::trends,
        analytics::health_score,
    ),
    components(schemas(ApiErrorResponse, ListMeta)),
    tags(
        (name = "Health"),
        (name = "Categories"),
        (name = "Transactions"),
        (name = "Budgets"),
        (name = "Analytics"),
    )
)]
pub struct ApiDoc;

#[utoipa::path(get, path = "/health", tag = "Health",
    responses((status = 200, description = "Service is up", body = ApiResponse<HealthView>)))]
async fn health(State(state): State<ServerState>) -> Json<ApiResponse<HealthView>> {
    Json(ApiResponse::ok(HealthView {
        status: "ok".to_string(),
        storage: state.engine.storage().as_str().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn route_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiErrorResponse::new("NOT_FOUND", "route not found")),
    )
}

pub fn router(state: ServerState, config: &ServerConfig) -> Router {
    let api = Router::new()
        .route(
            "/categories",
            get(categories::list).post(categories::create),
        )
        .route("/categories/tree", get(categories::tree))
        .route(
            "/categories/{id}",
            get(categories::get)
                .patch(categories::update)
                .delete(categories::delete),
        )
        .route("/categories/{id}/deactivate", post(categories::deactivate))
        .route("/categories/{id}/usage", get(categories::usage))
        .route(
            "/transactions",
            get(transactions::list).post(transactions::create),
        )
        .route(
            "/transactions/bulk",
            post(transactions::bulk_create).delete(transactions::bulk_delete),
        )
        .route("/transactions/import", post(transactions::import))
        .route("/transactions/summary", get(transactions::summary))
        .route(
            "/transactions/{id}",
            get(transactions::get)
                .patch(transactions::update)
                .delete(transactions::delete),
        )
        .route("/budgets", get(budgets::list).post(budgets::create))
        .route("/budgets/progress", get(budgets::progress))
        .route("/budgets/alerts", get(budgets::alerts))
        .route(
            "/budgets/{id}",
            get(budgets::get)
                .patch(budgets::update)
                .delete(budgets::delete),
        )
        .route("/analytics/dashboard", get(analytics::dashboard))
        .route("/analytics/categories", get(analytics::categories))
        .route("/analytics/monthly", get(analytics::monthly))
        .route("/analytics/trends", get(analytics::trends))
        .route("/analytics/health-score", get(analytics::health_score));

    Router::new()
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest("/api", api)
        .fallback(route_not_found)
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(engine: Engine, config: ServerConfig, addr: SocketAddr) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, config, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    config: ServerConfig,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState::new(engine, &config);
    axum::serve(listener, router(state, &config)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    config: ServerConfig,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, config, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
