//! JSON request and response bodies of the budget tracker API.
//!
//! Amounts travel as decimal numbers in major units (`45.5`), dates as
//! `YYYY-MM-DD` and timestamps as RFC 3339. Every response is wrapped in an
//! [`envelope::ApiResponse`] or an [`envelope::ApiErrorResponse`].

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

/// Distinguish a missing field (`None`) from an explicit `null`
/// (`Some(None)`) in PATCH bodies.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub mod envelope {
    use super::*;

    /// Pagination metadata of list responses.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
    pub struct ListMeta {
        pub total: u64,
        pub page: u64,
        pub limit: u64,
        pub total_pages: u64,
    }

    /// Successful response: `{ "success": true, "data": ..., "message"?, "meta"? }`.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct ApiResponse<T> {
        pub success: bool,
        pub data: T,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub meta: Option<ListMeta>,
    }

    impl<T> ApiResponse<T> {
        pub fn ok(data: T) -> Self {
            Self {
                success: true,
                data,
                message: None,
                meta: None,
            }
        }

        pub fn with_message(mut self, message: impl Into<String>) -> Self {
            self.message = Some(message.into());
            self
        }

        pub fn with_meta(mut self, meta: ListMeta) -> Self {
            self.meta = Some(meta);
            self
        }
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct ApiErrorBody {
        /// Stable machine-readable code, e.g. `VALIDATION_ERROR`.
        pub code: String,
        pub message: String,
        #[serde(default)]
        #[schema(value_type = Option<Object>)]
        pub details: Option<serde_json::Value>,
    }

    /// Failed response: `{ "success": false, "error": { code, message, details } }`.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct ApiErrorResponse {
        pub success: bool,
        pub error: ApiErrorBody,
    }

    impl ApiErrorResponse {
        pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
            Self {
                success: false,
                error: ApiErrorBody {
                    code: code.into(),
                    message: message.into(),
                    details: None,
                },
            }
        }

        pub fn with_details(mut self, details: serde_json::Value) -> Self {
            self.error.details = Some(details);
            self
        }
    }
}

pub mod health {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
    pub struct HealthView {
        pub status: String,
        /// `database` or `json`.
        pub storage: String,
        pub version: String,
    }
}

pub mod category {
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    use super::*;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct CategoryNew {
        pub name: String,
        #[serde(rename = "type")]
        pub kind: TransactionType,
        /// `#RRGGBB`.
        pub color: String,
        /// Defaults to `tag`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub icon: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub parent_id: Option<Uuid>,
    }

    /// Partial update; absent fields are left unchanged.
    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct CategoryUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub name: Option<String>,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        pub kind: Option<TransactionType>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub color: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub icon: Option<String>,
        /// `null` detaches the category from its parent.
        #[serde(
            default,
            deserialize_with = "double_option",
            skip_serializing_if = "Option::is_none"
        )]
        #[schema(value_type = Option<Uuid>)]
        pub parent_id: Option<Option<Uuid>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub is_active: Option<bool>,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct CategoryView {
        pub id: Uuid,
        pub name: String,
        #[serde(rename = "type")]
        pub kind: TransactionType,
        pub color: String,
        pub icon: String,
        pub parent_id: Option<Uuid>,
        pub is_active: bool,
        pub is_default: bool,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct CategoryNodeView {
        #[serde(flatten)]
        pub category: CategoryView,
        #[schema(no_recursion)]
        pub children: Vec<CategoryNodeView>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
    pub struct CategoryUsageView {
        pub transactions: u64,
        pub budgets: u64,
        pub in_use: bool,
    }
}

pub mod transaction {
    use chrono::{DateTime, NaiveDate, Utc};
    use uuid::Uuid;

    use super::*;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct TransactionNew {
        #[serde(rename = "type")]
        pub kind: TransactionType,
        /// Positive amount, at most two decimals.
        pub amount: f64,
        pub description: String,
        pub category_id: Uuid,
        pub date: NaiveDate,
    }

    /// Partial update; absent fields are left unchanged.
    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct TransactionUpdate {
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        pub kind: Option<TransactionType>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub amount: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub category_id: Option<Uuid>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub date: Option<NaiveDate>,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct TransactionView {
        pub id: Uuid,
        #[serde(rename = "type")]
        pub kind: TransactionType,
        pub amount: f64,
        pub description: String,
        pub category_id: Uuid,
        pub date: NaiveDate,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct BulkCreateRequest {
        pub transactions: Vec<TransactionNew>,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct BulkDeleteRequest {
        pub ids: Vec<Uuid>,
    }

    /// Failure of one item of a bulk request.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct BulkItemErrorView {
        pub index: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub id: Option<Uuid>,
        pub code: String,
        pub message: String,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct BulkCreateResponse {
        pub created: Vec<TransactionView>,
        pub errors: Vec<BulkItemErrorView>,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct BulkDeleteResponse {
        pub deleted: Vec<Uuid>,
        pub errors: Vec<BulkItemErrorView>,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct ImportResponse {
        pub imported: Vec<TransactionView>,
        /// Request indexes skipped as duplicates.
        pub duplicates: Vec<usize>,
        pub errors: Vec<BulkItemErrorView>,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct SummaryView {
        pub total_income: f64,
        pub total_expense: f64,
        pub net: f64,
        /// Percent of income kept.
        pub savings_rate: f64,
        pub count: usize,
    }
}

pub mod budget {
    use chrono::{DateTime, NaiveDate, Utc};
    use uuid::Uuid;

    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
    #[serde(rename_all = "snake_case")]
    pub enum BudgetPeriod {
        Weekly,
        Monthly,
        Yearly,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct BudgetNew {
        pub name: String,
        pub category_id: Uuid,
        pub amount: f64,
        pub period: BudgetPeriod,
        pub start_date: NaiveDate,
        /// Derived from the period when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub end_date: Option<NaiveDate>,
        /// Percent of the amount that triggers an alert, default 80.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub alert_threshold: Option<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub is_active: Option<bool>,
    }

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct BudgetUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub category_id: Option<Uuid>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub amount: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub period: Option<BudgetPeriod>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub start_date: Option<NaiveDate>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub end_date: Option<NaiveDate>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub alert_threshold: Option<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub is_active: Option<bool>,
    }

    /// A budget together with its spending progress.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct BudgetView {
        pub id: Uuid,
        pub name: String,
        pub category_id: Uuid,
        pub amount: f64,
        pub period: BudgetPeriod,
        pub start_date: NaiveDate,
        pub end_date: NaiveDate,
        pub alert_threshold: u8,
        pub is_active: bool,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub spent: f64,
        pub remaining: f64,
        /// Spent over amount, in percent.
        pub utilization: f64,
        pub alert: bool,
        pub over_budget: bool,
    }
}

pub mod analytics {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::*;
    use crate::budget::BudgetView;

    /// Inclusive date range of analytics queries.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
    pub struct RangeQuery {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub from: Option<NaiveDate>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub to: Option<NaiveDate>,
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
    pub struct BreakdownQuery {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub from: Option<NaiveDate>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub to: Option<NaiveDate>,
        /// Defaults to `expense`.
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        pub kind: Option<TransactionType>,
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
    pub struct TrendsQuery {
        /// 1..=24, default 6.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub months: Option<u32>,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct CategoryTotalView {
        pub category_id: Uuid,
        pub name: Option<String>,
        pub color: Option<String>,
        pub total: f64,
        pub percentage: f64,
        pub count: usize,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct MonthlyBucketView {
        /// `YYYY-MM`.
        pub month: String,
        pub income: f64,
        pub expense: f64,
        pub net: f64,
        pub count: usize,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
    #[serde(rename_all = "snake_case")]
    pub enum TrendDirection {
        Increasing,
        Decreasing,
        Stable,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct TrendView {
        pub months: Vec<MonthlyBucketView>,
        pub average_income: f64,
        pub average_expense: f64,
        pub average_change: f64,
        pub direction: TrendDirection,
        pub projected_expense: f64,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct HealthScoreView {
        /// 0..=100.
        pub score: f64,
        pub budget_adherence: f64,
        pub spending_consistency: f64,
        pub income_stability: f64,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
    pub struct DashboardView {
        pub summary: crate::transaction::SummaryView,
        pub categories: Vec<CategoryTotalView>,
        pub monthly: Vec<MonthlyBucketView>,
        pub budgets: Vec<BudgetView>,
    }
}

#[cfg(test)]
mod tests {
    use super::category::CategoryUpdate;
    use super::envelope::{ApiErrorResponse, ApiResponse, ListMeta};
    use super::transaction::TransactionNew;
    use super::*;

    #[test]
    fn patch_distinguishes_null_from_missing() {
        let missing: CategoryUpdate = serde_json::from_str(r#"{"name":"Food"}"#).unwrap();
        assert_eq!(missing.parent_id, None);

        let null: CategoryUpdate = serde_json::from_str(r#"{"parent_id":null}"#).unwrap();
        assert_eq!(null.parent_id, Some(None));

        let id = uuid::Uuid::new_v4();
        let set: CategoryUpdate =
            serde_json::from_str(&format!(r#"{{"parent_id":"{id}"}}"#)).unwrap();
        assert_eq!(set.parent_id, Some(Some(id)));
    }

    #[test]
    fn transaction_uses_type_key() {
        let body = serde_json::json!({
            "type": "expense",
            "amount": 45.0,
            "description": "Groceries",
            "category_id": uuid::Uuid::nil(),
            "date": "2024-01-15"
        });
        let tx: TransactionNew = serde_json::from_value(body).unwrap();
        assert_eq!(tx.kind, TransactionType::Expense);
        assert_eq!(tx.date.to_string(), "2024-01-15");
    }

    #[test]
    fn envelope_omits_empty_optionals() {
        let json = serde_json::to_value(ApiResponse::ok(1)).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "data": 1}));

        let json = serde_json::to_value(ApiResponse::ok(Vec::<u8>::new()).with_meta(ListMeta {
            total: 0,
            page: 1,
            limit: 20,
            total_pages: 0,
        }))
        .unwrap();
        assert_eq!(json["meta"]["limit"], 20);

        let json = serde_json::to_value(ApiErrorResponse::new("NOT_FOUND", "missing")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert!(json["error"]["details"].is_null());
    }
}
