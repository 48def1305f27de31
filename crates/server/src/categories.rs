//! Categories API endpoints.

use api_types::{
    category::{CategoryNew, CategoryNodeView, CategoryUpdate, CategoryUsageView, CategoryView},
    envelope::ApiResponse,
};
use axum::{Json, extract::State, http::StatusCode};
use engine::{Category, CategoryNode, CategoryPatch, ListQuery, NewCategory};
use uuid::Uuid;

use crate::{
    ServerError,
    extract::{ApiJson, ApiPath, ApiQuery},
    server::{ServerState, page_response},
    transactions::{kind_from_api, kind_to_api},
};

pub(crate) fn map_category(category: Category) -> CategoryView {
    CategoryView {
        id: category.id,
        name: category.name,
        kind: kind_to_api(category.kind),
        color: category.color,
        icon: category.icon,
        parent_id: category.parent_id,
        is_active: category.is_active,
        is_default: category.is_default,
        created_at: category.created_at,
        updated_at: category.updated_at,
    }
}

fn map_node(node: CategoryNode) -> CategoryNodeView {
    CategoryNodeView {
        category: map_category(node.category),
        children: node.children.into_iter().map(map_node).collect(),
    }
}

#[utoipa::path(get, path = "/api/categories", tag = "Categories",
    params(
        ("type" = Option<String>, Query, description = "income or expense"),
        ("is_active" = Option<bool>, Query, description = "Only active or inactive categories"),
        ("ilike_name" = Option<String>, Query, description = "Case-insensitive name match"),
        ("sort" = Option<String>, Query, description = "Field to sort by, default name"),
        ("order" = Option<String>, Query, description = "asc or desc"),
        ("page" = Option<u64>, Query, description = "1-based page"),
        ("limit" = Option<u64>, Query, description = "Page size, at most 100"),
    ),
    responses((status = 200, description = "Categories", body = ApiResponse<Vec<CategoryView>>)))]
pub async fn list(
    State(state): State<ServerState>,
    ApiQuery(params): ApiQuery<Vec<(String, String)>>,
) -> Result<Json<ApiResponse<Vec<CategoryView>>>, ServerError> {
    let query = ListQuery::from_params(params)?;
    let page = state.engine.list_categories(&query).await?;
    Ok(Json(page_response(page, &query, map_category)))
}

#[utoipa::path(post, path = "/api/categories", tag = "Categories",
    request_body = CategoryNew,
    responses(
        (status = 201, description = "Created", body = ApiResponse<CategoryView>),
        (status = 409, description = "Name already used for this type"),
    ))]
pub async fn create(
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<CategoryNew>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryView>>), ServerError> {
    let mut cmd = NewCategory::new(payload.name, kind_from_api(payload.kind), payload.color);
    if let Some(icon) = payload.icon {
        cmd = cmd.icon(icon);
    }
    if let Some(parent_id) = payload.parent_id {
        cmd = cmd.parent(parent_id);
    }

    let category = state.engine.create_category(cmd).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(map_category(category)).with_message("Category created")),
    ))
}

#[utoipa::path(get, path = "/api/categories/tree", tag = "Categories",
    responses((status = 200, description = "Root categories with nested children", body = ApiResponse<Vec<CategoryNodeView>>)))]
pub async fn tree(
    State(state): State<ServerState>,
) -> Result<Json<ApiResponse<Vec<CategoryNodeView>>>, ServerError> {
    let roots = state
        .engine
        .category_tree()
        .await?
        .into_iter()
        .map(map_node)
        .collect();
    Ok(Json(ApiResponse::ok(roots)))
}

#[utoipa::path(get, path = "/api/categories/{id}", tag = "Categories",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses((status = 200, description = "Category", body = ApiResponse<CategoryView>)))]
pub async fn get(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<CategoryView>>, ServerError> {
    let category = state.engine.category(id).await?;
    Ok(Json(ApiResponse::ok(map_category(category))))
}

#[utoipa::path(patch, path = "/api/categories/{id}", tag = "Categories",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = CategoryUpdate,
    responses((status = 200, description = "Updated", body = ApiResponse<CategoryView>)))]
pub async fn update(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CategoryUpdate>,
) -> Result<Json<ApiResponse<CategoryView>>, ServerError> {
    if payload == CategoryUpdate::default() {
        return Err(ServerError::BadRequest(
            "provide at least one field to update".to_string(),
        ));
    }

    let patch = CategoryPatch {
        name: payload.name,
        kind: payload.kind.map(kind_from_api),
        color: payload.color,
        icon: payload.icon,
        parent_id: payload.parent_id,
        is_active: payload.is_active,
    };
    let category = state.engine.update_category(id, patch).await?;
    Ok(Json(
        ApiResponse::ok(map_category(category)).with_message("Category updated"),
    ))
}

#[utoipa::path(delete, path = "/api/categories/{id}", tag = "Categories",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Deleted", body = ApiResponse<Uuid>),
        (status = 409, description = "Category still referenced", body = api_types::envelope::ApiErrorResponse),
    ))]
pub async fn delete(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<Uuid>>, ServerError> {
    state.engine.delete_category(id).await?;
    Ok(Json(ApiResponse::ok(id).with_message("Category deleted")))
}

#[utoipa::path(post, path = "/api/categories/{id}/deactivate", tag = "Categories",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses((status = 200, description = "Deactivated", body = ApiResponse<CategoryView>)))]
pub async fn deactivate(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<CategoryView>>, ServerError> {
    let category = state.engine.deactivate_category(id).await?;
    Ok(Json(
        ApiResponse::ok(map_category(category)).with_message("Category deactivated"),
    ))
}

#[utoipa::path(get, path = "/api/categories/{id}/usage", tag = "Categories",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses((status = 200, description = "Reference counts", body = ApiResponse<CategoryUsageView>)))]
pub async fn usage(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<CategoryUsageView>>, ServerError> {
    let usage = state.engine.category_usage(id).await?;
    Ok(Json(ApiResponse::ok(CategoryUsageView {
        transactions: usage.transactions,
        budgets: usage.budgets,
        in_use: usage.in_use(),
    })))
}
