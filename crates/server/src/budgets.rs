//! Budgets API endpoints.

use api_types::{
    budget::{BudgetNew, BudgetPeriod as ApiBudgetPeriod, BudgetUpdate, BudgetView},
    envelope::ApiResponse,
};
use axum::{Json, extract::State, http::StatusCode};
use engine::{BudgetPatch, BudgetPeriod, BudgetProgress, ListQuery, Money, NewBudget};
use uuid::Uuid;

use crate::{
    ServerError,
    extract::{ApiJson, ApiPath, ApiQuery},
    server::{ServerState, page_response},
};

fn period_from_api(period: ApiBudgetPeriod) -> BudgetPeriod {
    match period {
        ApiBudgetPeriod::Weekly => BudgetPeriod::Weekly,
        ApiBudgetPeriod::Monthly => BudgetPeriod::Monthly,
        ApiBudgetPeriod::Yearly => BudgetPeriod::Yearly,
    }
}

fn period_to_api(period: BudgetPeriod) -> ApiBudgetPeriod {
    match period {
        BudgetPeriod::Weekly => ApiBudgetPeriod::Weekly,
        BudgetPeriod::Monthly => ApiBudgetPeriod::Monthly,
        BudgetPeriod::Yearly => ApiBudgetPeriod::Yearly,
    }
}

pub(crate) fn map_budget(progress: BudgetProgress) -> BudgetView {
    let budget = progress.budget;
    BudgetView {
        id: budget.id,
        name: budget.name,
        category_id: budget.category_id,
        amount: budget.amount.to_major(),
        period: period_to_api(budget.period),
        start_date: budget.start_date,
        end_date: budget.end_date,
        alert_threshold: budget.alert_threshold,
        is_active: budget.is_active,
        created_at: budget.created_at,
        updated_at: budget.updated_at,
        spent: progress.spent.to_major(),
        remaining: progress.remaining.to_major(),
        utilization: progress.utilization,
        alert: progress.alert,
        over_budget: progress.over_budget,
    }
}

#[utoipa::path(get, path = "/api/budgets", tag = "Budgets",
    params(
        ("category_id" = Option<Uuid>, Query, description = "Budgets of one category"),
        ("is_active" = Option<bool>, Query, description = "Only active or inactive budgets"),
        ("period" = Option<String>, Query, description = "weekly, monthly or yearly"),
        ("sort" = Option<String>, Query, description = "Field to sort by, default start_date"),
        ("order" = Option<String>, Query, description = "asc or desc"),
        ("page" = Option<u64>, Query, description = "1-based page"),
        ("limit" = Option<u64>, Query, description = "Page size, at most 100"),
    ),
    responses((status = 200, description = "Budgets with progress", body = ApiResponse<Vec<BudgetView>>)))]
pub async fn list(
    State(state): State<ServerState>,
    ApiQuery(params): ApiQuery<Vec<(String, String)>>,
) -> Result<Json<ApiResponse<Vec<BudgetView>>>, ServerError> {
    let query = ListQuery::from_params(params)?;
    let page = state.engine.list_budgets(&query).await?;
    Ok(Json(page_response(page, &query, map_budget)))
}

#[utoipa::path(post, path = "/api/budgets", tag = "Budgets",
    request_body = BudgetNew,
    responses((status = 201, description = "Created", body = ApiResponse<BudgetView>)))]
pub async fn create(
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<BudgetNew>,
) -> Result<(StatusCode, Json<ApiResponse<BudgetView>>), ServerError> {
    let mut cmd = NewBudget::new(
        payload.name,
        payload.category_id,
        Money::try_from_major(payload.amount)?,
        period_from_api(payload.period),
        payload.start_date,
    );
    if let Some(end_date) = payload.end_date {
        cmd = cmd.end_date(end_date);
    }
    if let Some(threshold) = payload.alert_threshold {
        cmd = cmd.alert_threshold(threshold);
    }
    cmd.is_active = payload.is_active;

    let progress = state.engine.create_budget(cmd).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(map_budget(progress)).with_message("Budget created")),
    ))
}

#[utoipa::path(get, path = "/api/budgets/progress", tag = "Budgets",
    responses((status = 200, description = "Progress of active budgets", body = ApiResponse<Vec<BudgetView>>)))]
pub async fn progress(
    State(state): State<ServerState>,
) -> Result<Json<ApiResponse<Vec<BudgetView>>>, ServerError> {
    let budgets = state
        .engine
        .budget_progress()
        .await?
        .into_iter()
        .map(map_budget)
        .collect();
    Ok(Json(ApiResponse::ok(budgets)))
}

#[utoipa::path(get, path = "/api/budgets/alerts", tag = "Budgets",
    responses((status = 200, description = "Active budgets at or over their threshold", body = ApiResponse<Vec<BudgetView>>)))]
pub async fn alerts(
    State(state): State<ServerState>,
) -> Result<Json<ApiResponse<Vec<BudgetView>>>, ServerError> {
    let budgets = state
        .engine
        .budget_alerts()
        .await?
        .into_iter()
        .map(map_budget)
        .collect();
    Ok(Json(ApiResponse::ok(budgets)))
}

#[utoipa::path(get, path = "/api/budgets/{id}", tag = "Budgets",
    params(("id" = Uuid, Path, description = "Budget ID")),
    responses((status = 200, description = "Budget with progress", body = ApiResponse<BudgetView>)))]
pub async fn get(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<BudgetView>>, ServerError> {
    let progress = state.engine.budget(id).await?;
    Ok(Json(ApiResponse::ok(map_budget(progress))))
}

#[utoipa::path(patch, path = "/api/budgets/{id}", tag = "Budgets",
    params(("id" = Uuid, Path, description = "Budget ID")),
    request_body = BudgetUpdate,
    responses((status = 200, description = "Updated", body = ApiResponse<BudgetView>)))]
pub async fn update(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<BudgetUpdate>,
) -> Result<Json<ApiResponse<BudgetView>>, ServerError> {
    if payload == BudgetUpdate::default() {
        return Err(ServerError::BadRequest(
            "provide at least one field to update".to_string(),
        ));
    }

    let patch = BudgetPatch {
        name: payload.name,
        category_id: payload.category_id,
        amount: payload.amount.map(Money::try_from_major).transpose()?,
        period: payload.period.map(period_from_api),
        start_date: payload.start_date,
        end_date: payload.end_date,
        alert_threshold: payload.alert_threshold,
        is_active: payload.is_active,
    };
    let progress = state.engine.update_budget(id, patch).await?;
    Ok(Json(
        ApiResponse::ok(map_budget(progress)).with_message("Budget updated"),
    ))
}

#[utoipa::path(delete, path = "/api/budgets/{id}", tag = "Budgets",
    params(("id" = Uuid, Path, description = "Budget ID")),
    responses((status = 200, description = "Deleted", body = ApiResponse<Uuid>)))]
pub async fn delete(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<Uuid>>, ServerError> {
    state.engine.delete_budget(id).await?;
    Ok(Json(ApiResponse::ok(id).with_message("Budget deleted")))
}
