//! Analytics API endpoints. All of them are read-only aggregations over
//! the transactions in an optional inclusive `from`/`to` range.

use api_types::{
    TransactionType,
    analytics::{
        BreakdownQuery, CategoryTotalView, DashboardView, HealthScoreView, MonthlyBucketView,
        RangeQuery, TrendDirection as ApiTrendDirection, TrendView, TrendsQuery,
    },
    envelope::ApiResponse,
};
use axum::{Json, extract::State};
use chrono::Utc;
use engine::{CategoryTotal, DEFAULT_TREND_MONTHS, DateRange, MonthlyBucket, TrendDirection};

use crate::{
    ServerError,
    budgets::map_budget,
    extract::ApiQuery,
    server::ServerState,
    transactions::{kind_from_api, map_summary},
};

fn map_category_total(total: CategoryTotal) -> CategoryTotalView {
    CategoryTotalView {
        category_id: total.category_id,
        name: total.name,
        color: total.color,
        total: total.total.to_major(),
        percentage: total.percentage,
        count: total.count,
    }
}

fn map_bucket(bucket: MonthlyBucket) -> MonthlyBucketView {
    MonthlyBucketView {
        month: bucket.month,
        income: bucket.income.to_major(),
        expense: bucket.expense.to_major(),
        net: bucket.net.to_major(),
        count: bucket.count,
    }
}

fn map_direction(direction: TrendDirection) -> ApiTrendDirection {
    match direction {
        TrendDirection::Increasing => ApiTrendDirection::Increasing,
        TrendDirection::Decreasing => ApiTrendDirection::Decreasing,
        TrendDirection::Stable => ApiTrendDirection::Stable,
    }
}

#[utoipa::path(get, path = "/api/analytics/dashboard", tag = "Analytics",
    params(
        ("from" = Option<String>, Query, description = "First date, inclusive"),
        ("to" = Option<String>, Query, description = "Last date, inclusive"),
    ),
    responses((status = 200, description = "Summary, breakdown, months and budgets", body = ApiResponse<DashboardView>)))]
pub async fn dashboard(
    State(state): State<ServerState>,
    ApiQuery(range): ApiQuery<RangeQuery>,
) -> Result<Json<ApiResponse<DashboardView>>, ServerError> {
    let range = DateRange::new(range.from, range.to)?;
    let dashboard = state.engine.dashboard(range).await?;
    Ok(Json(ApiResponse::ok(DashboardView {
        summary: map_summary(dashboard.summary),
        categories: dashboard
            .categories
            .into_iter()
            .map(map_category_total)
            .collect(),
        monthly: dashboard.monthly.into_iter().map(map_bucket).collect(),
        budgets: dashboard.budgets.into_iter().map(map_budget).collect(),
    })))
}

#[utoipa::path(get, path = "/api/analytics/categories", tag = "Analytics",
    params(
        ("from" = Option<String>, Query, description = "First date, inclusive"),
        ("to" = Option<String>, Query, description = "Last date, inclusive"),
        ("type" = Option<String>, Query, description = "income or expense, default expense"),
    ),
    responses((status = 200, description = "Totals per category, largest first", body = ApiResponse<Vec<CategoryTotalView>>)))]
pub async fn categories(
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<BreakdownQuery>,
) -> Result<Json<ApiResponse<Vec<CategoryTotalView>>>, ServerError> {
    let range = DateRange::new(query.from, query.to)?;
    let kind = kind_from_api(query.kind.unwrap_or(TransactionType::Expense));
    let totals = state
        .engine
        .category_breakdown(range, kind)
        .await?
        .into_iter()
        .map(map_category_total)
        .collect();
    Ok(Json(ApiResponse::ok(totals)))
}

#[utoipa::path(get, path = "/api/analytics/monthly", tag = "Analytics",
    params(
        ("from" = Option<String>, Query, description = "First date, inclusive"),
        ("to" = Option<String>, Query, description = "Last date, inclusive"),
    ),
    responses((status = 200, description = "Income and expense per month", body = ApiResponse<Vec<MonthlyBucketView>>)))]
pub async fn monthly(
    State(state): State<ServerState>,
    ApiQuery(range): ApiQuery<RangeQuery>,
) -> Result<Json<ApiResponse<Vec<MonthlyBucketView>>>, ServerError> {
    let range = DateRange::new(range.from, range.to)?;
    let buckets = state
        .engine
        .monthly(range)
        .await?
        .into_iter()
        .map(map_bucket)
        .collect();
    Ok(Json(ApiResponse::ok(buckets)))
}

#[utoipa::path(get, path = "/api/analytics/trends", tag = "Analytics",
    params(("months" = Option<u32>, Query, description = "1 to 24, default 6")),
    responses((status = 200, description = "Averages, direction and projection", body = ApiResponse<TrendView>)))]
pub async fn trends(
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<TrendsQuery>,
) -> Result<Json<ApiResponse<TrendView>>, ServerError> {
    let months = query.months.unwrap_or(DEFAULT_TREND_MONTHS);
    let today = Utc::now().date_naive();
    let trend = state.engine.trends(months, today).await?;
    Ok(Json(ApiResponse::ok(TrendView {
        months: trend.months.into_iter().map(map_bucket).collect(),
        average_income: trend.average_income.to_major(),
        average_expense: trend.average_expense.to_major(),
        average_change: trend.average_change.to_major(),
        direction: map_direction(trend.direction),
        projected_expense: trend.projected_expense.to_major(),
    })))
}

#[utoipa::path(get, path = "/api/analytics/health-score", tag = "Analytics",
    params(
        ("from" = Option<String>, Query, description = "First date, inclusive"),
        ("to" = Option<String>, Query, description = "Last date, inclusive"),
    ),
    responses((status = 200, description = "Weighted 0-100 score and its parts", body = ApiResponse<HealthScoreView>)))]
pub async fn health_score(
    State(state): State<ServerState>,
    ApiQuery(range): ApiQuery<RangeQuery>,
) -> Result<Json<ApiResponse<HealthScoreView>>, ServerError> {
    let range = DateRange::new(range.from, range.to)?;
    let score = state.engine.health_score(range).await?;
    Ok(Json(ApiResponse::ok(HealthScoreView {
        score: score.score,
        budget_adherence: score.budget_adherence,
        spending_consistency: score.spending_consistency,
        income_stability: score.income_stability,
    })))
}
