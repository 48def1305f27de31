//! Transactions API endpoints.

use api_types::{
    TransactionType,
    analytics::RangeQuery,
    envelope::ApiResponse,
    transaction::{
        BulkCreateRequest, BulkCreateResponse, BulkDeleteRequest, BulkDeleteResponse,
        BulkItemErrorView, ImportResponse, SummaryView, TransactionNew, TransactionUpdate,
        TransactionView,
    },
};
use axum::{Json, extract::State, http::StatusCode};
use engine::{
    BULK_LIMIT, BulkItemError, DateRange, EngineError, ListQuery, Money, NewTransaction, Summary,
    Transaction, TransactionKind, TransactionPatch,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    ServerError, code_for_engine_error,
    extract::{ApiJson, ApiPath, ApiQuery},
    message_for_engine_error,
    server::{ServerState, page_response},
};

pub(crate) fn kind_from_api(kind: TransactionType) -> TransactionKind {
    match kind {
        TransactionType::Income => TransactionKind::Income,
        TransactionType::Expense => TransactionKind::Expense,
    }
}

pub(crate) fn kind_to_api(kind: TransactionKind) -> TransactionType {
    match kind {
        TransactionKind::Income => TransactionType::Income,
        TransactionKind::Expense => TransactionType::Expense,
    }
}

fn map_transaction(tx: Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        kind: kind_to_api(tx.kind),
        amount: tx.amount.to_major(),
        description: tx.description,
        category_id: tx.category_id,
        date: tx.date,
        created_at: tx.created_at,
        updated_at: tx.updated_at,
    }
}

pub(crate) fn map_summary(summary: Summary) -> SummaryView {
    SummaryView {
        total_income: summary.total_income.to_major(),
        total_expense: summary.total_expense.to_major(),
        net: summary.net.to_major(),
        savings_rate: summary.savings_rate,
        count: summary.count,
    }
}

fn map_item_error(err: BulkItemError) -> BulkItemErrorView {
    BulkItemErrorView {
        index: err.index,
        id: err.id,
        code: code_for_engine_error(&err.error).to_string(),
        message: message_for_engine_error(&err.error),
    }
}

fn new_transaction(payload: TransactionNew) -> Result<NewTransaction, EngineError> {
    Ok(NewTransaction::new(
        kind_from_api(payload.kind),
        Money::try_from_major(payload.amount)?,
        payload.description,
        payload.category_id,
        payload.date,
    ))
}

fn check_batch_size(len: usize) -> Result<(), ServerError> {
    if len == 0 || len > BULK_LIMIT {
        return Err(ServerError::BatchSize(len));
    }
    Ok(())
}

/// Body of bulk create and import. Items stay raw until [`DecodedBatch`]
/// decodes them one by one, so a malformed item fails alone.
#[derive(Deserialize)]
pub(crate) struct RawBatch {
    transactions: Vec<Value>,
}

fn decode_item(item: Value) -> Result<NewTransaction, EngineError> {
    let payload = serde_json::from_value::<TransactionNew>(item)
        .map_err(|err| EngineError::Validation(format!("invalid transaction: {err}")))?;
    new_transaction(payload)
}

/// Items of a batch that decoded into commands, with their request indexes,
/// plus the errors of those that did not.
struct DecodedBatch {
    commands: Vec<NewTransaction>,
    indexes: Vec<usize>,
    errors: Vec<BulkItemError>,
}

impl DecodedBatch {
    fn decode(items: Vec<Value>) -> Self {
        let mut batch = DecodedBatch {
            commands: Vec::with_capacity(items.len()),
            indexes: Vec::with_capacity(items.len()),
            errors: Vec::new(),
        };
        for (index, item) in items.into_iter().enumerate() {
            match decode_item(item) {
                Ok(cmd) => {
                    batch.commands.push(cmd);
                    batch.indexes.push(index);
                }
                Err(error) => batch.errors.push(BulkItemError {
                    index,
                    id: None,
                    error,
                }),
            }
        }
        batch
    }

    fn request_index(&self, engine_index: usize) -> usize {
        self.indexes.get(engine_index).copied().unwrap_or(engine_index)
    }

    fn merge_errors(self, engine_errors: Vec<BulkItemError>) -> Vec<BulkItemErrorView> {
        let mut errors: Vec<BulkItemError> = engine_errors
            .into_iter()
            .map(|err| BulkItemError {
                index: self.request_index(err.index),
                ..err
            })
            .collect();
        errors.extend(self.errors);
        errors.sort_by_key(|err| err.index);
        errors.into_iter().map(map_item_error).collect()
    }
}

#[utoipa::path(get, path = "/api/transactions", tag = "Transactions",
    params(
        ("type" = Option<String>, Query, description = "income or expense"),
        ("gte_date" = Option<String>, Query, description = "Earliest date, inclusive"),
        ("lte_date" = Option<String>, Query, description = "Latest date, inclusive"),
        ("ilike_description" = Option<String>, Query, description = "Case-insensitive match"),
        ("sort" = Option<String>, Query, description = "Field to sort by"),
        ("order" = Option<String>, Query, description = "asc or desc"),
        ("page" = Option<u64>, Query, description = "1-based page"),
        ("limit" = Option<u64>, Query, description = "Page size, at most 100"),
    ),
    responses((status = 200, description = "Transactions", body = ApiResponse<Vec<TransactionView>>)))]
pub async fn list(
    State(state): State<ServerState>,
    ApiQuery(params): ApiQuery<Vec<(String, String)>>,
) -> Result<Json<ApiResponse<Vec<TransactionView>>>, ServerError> {
    let query = ListQuery::from_params(params)?;
    let page = state.engine.list_transactions(&query).await?;
    Ok(Json(page_response(page, &query, map_transaction)))
}

#[utoipa::path(post, path = "/api/transactions", tag = "Transactions",
    request_body = TransactionNew,
    responses((status = 201, description = "Created", body = ApiResponse<TransactionView>)))]
pub async fn create(
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<TransactionNew>,
) -> Result<(StatusCode, Json<ApiResponse<TransactionView>>), ServerError> {
    let tx = state
        .engine
        .create_transaction(new_transaction(payload)?)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(map_transaction(tx)).with_message("Transaction created")),
    ))
}

#[utoipa::path(get, path = "/api/transactions/{id}", tag = "Transactions",
    params(("id" = Uuid, Path, description = "Transaction ID")),
    responses((status = 200, description = "Transaction", body = ApiResponse<TransactionView>)))]
pub async fn get(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<TransactionView>>, ServerError> {
    let tx = state.engine.transaction(id).await?;
    Ok(Json(ApiResponse::ok(map_transaction(tx))))
}

#[utoipa::path(patch, path = "/api/transactions/{id}", tag = "Transactions",
    params(("id" = Uuid, Path, description = "Transaction ID")),
    request_body = TransactionUpdate,
    responses((status = 200, description = "Updated", body = ApiResponse<TransactionView>)))]
pub async fn update(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<TransactionUpdate>,
) -> Result<Json<ApiResponse<TransactionView>>, ServerError> {
    if payload == TransactionUpdate::default() {
        return Err(ServerError::BadRequest(
            "provide at least one field to update".to_string(),
        ));
    }

    let patch = TransactionPatch {
        kind: payload.kind.map(kind_from_api),
        amount: payload.amount.map(Money::try_from_major).transpose()?,
        description: payload.description,
        category_id: payload.category_id,
        date: payload.date,
    };
    let tx = state.engine.update_transaction(id, patch).await?;
    Ok(Json(
        ApiResponse::ok(map_transaction(tx)).with_message("Transaction updated"),
    ))
}

#[utoipa::path(delete, path = "/api/transactions/{id}", tag = "Transactions",
    params(("id" = Uuid, Path, description = "Transaction ID")),
    responses((status = 200, description = "Deleted", body = ApiResponse<Uuid>)))]
pub async fn delete(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<Uuid>>, ServerError> {
    state.engine.delete_transaction(id).await?;
    Ok(Json(ApiResponse::ok(id).with_message("Transaction deleted")))
}

#[utoipa::path(post, path = "/api/transactions/bulk", tag = "Transactions",
    request_body = BulkCreateRequest,
    responses((status = 201, description = "Per-item outcome", body = ApiResponse<BulkCreateResponse>)))]
pub async fn bulk_create(
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<RawBatch>,
) -> Result<(StatusCode, Json<ApiResponse<BulkCreateResponse>>), ServerError> {
    check_batch_size(payload.transactions.len())?;

    let mut batch = DecodedBatch::decode(payload.transactions);
    let commands = std::mem::take(&mut batch.commands);
    let result = if commands.is_empty() {
        Default::default()
    } else {
        state.engine.bulk_create_transactions(commands).await?
    };

    let response = BulkCreateResponse {
        created: result.created.into_iter().map(map_transaction).collect(),
        errors: batch.merge_errors(result.errors),
    };
    let message = format!(
        "{} created, {} failed",
        response.created.len(),
        response.errors.len()
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(response).with_message(message)),
    ))
}

#[utoipa::path(delete, path = "/api/transactions/bulk", tag = "Transactions",
    request_body = BulkDeleteRequest,
    responses((status = 200, description = "Per-item outcome", body = ApiResponse<BulkDeleteResponse>)))]
pub async fn bulk_delete(
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<BulkDeleteRequest>,
) -> Result<Json<ApiResponse<BulkDeleteResponse>>, ServerError> {
    check_batch_size(payload.ids.len())?;
    let result = state.engine.bulk_delete_transactions(payload.ids).await?;
    let response = BulkDeleteResponse {
        deleted: result.deleted,
        errors: result.errors.into_iter().map(map_item_error).collect(),
    };
    let message = format!(
        "{} deleted, {} failed",
        response.deleted.len(),
        response.errors.len()
    );
    Ok(Json(ApiResponse::ok(response).with_message(message)))
}

#[utoipa::path(post, path = "/api/transactions/import", tag = "Transactions",
    request_body = BulkCreateRequest,
    responses((status = 200, description = "Imported, duplicates and failures", body = ApiResponse<ImportResponse>)))]
pub async fn import(
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<RawBatch>,
) -> Result<Json<ApiResponse<ImportResponse>>, ServerError> {
    check_batch_size(payload.transactions.len())?;

    let mut batch = DecodedBatch::decode(payload.transactions);
    let commands = std::mem::take(&mut batch.commands);
    let result = if commands.is_empty() {
        Default::default()
    } else {
        state.engine.import_transactions(commands).await?
    };

    let duplicates = result
        .duplicates
        .into_iter()
        .map(|index| batch.request_index(index))
        .collect();
    let response = ImportResponse {
        imported: result.imported.into_iter().map(map_transaction).collect(),
        duplicates,
        errors: batch.merge_errors(result.errors),
    };
    let message = format!(
        "{} imported, {} duplicates skipped, {} failed",
        response.imported.len(),
        response.duplicates.len(),
        response.errors.len()
    );
    Ok(Json(ApiResponse::ok(response).with_message(message)))
}

#[utoipa::path(get, path = "/api/transactions/summary", tag = "Transactions",
    params(
        ("from" = Option<String>, Query, description = "First date, inclusive"),
        ("to" = Option<String>, Query, description = "Last date, inclusive"),
    ),
    responses((status = 200, description = "Totals over the range", body = ApiResponse<SummaryView>)))]
pub async fn summary(
    State(state): State<ServerState>,
    ApiQuery(range): ApiQuery<RangeQuery>,
) -> Result<Json<ApiResponse<SummaryView>>, ServerError> {
    let range = DateRange::new(range.from, range.to)?;
    let summary = state.engine.transaction_summary(range).await?;
    Ok(Json(ApiResponse::ok(map_summary(summary))))
}
