//! Typed wrapper over the REST API, one method per endpoint.

use api_types::{
    analytics::{
        BreakdownQuery, CategoryTotalView, DashboardView, HealthScoreView, MonthlyBucketView,
        RangeQuery, TrendView, TrendsQuery,
    },
    budget::{BudgetNew, BudgetUpdate, BudgetView},
    category::{CategoryNew, CategoryNodeView, CategoryUpdate, CategoryUsageView, CategoryView},
    envelope::{ApiErrorResponse, ApiResponse, ListMeta},
    health::HealthView,
    transaction::{
        BulkCreateRequest, BulkCreateResponse, BulkDeleteRequest, BulkDeleteResponse,
        ImportResponse, SummaryView, TransactionNew, TransactionUpdate, TransactionView,
    },
};
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::ClientError;

/// One page of a list endpoint. `meta` is only present when the request
/// asked for `page` or `limit`.
#[derive(Clone, Debug, PartialEq)]
pub struct Listed<T> {
    pub data: Vec<T>,
    pub meta: Option<ListMeta>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let mut base_url =
            Url::parse(base_url).map_err(|err| ClientError::InvalidUrl(err.to_string()))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|err| ClientError::InvalidUrl(err.to_string()))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<ApiResponse<T>, ClientError> {
        let res = request.send().await?;
        let status = res.status();
        if status.is_success() {
            return Ok(res.json::<ApiResponse<T>>().await?);
        }

        let body = res.json::<ApiErrorResponse>().await.ok();
        let err = ClientError::from_response(status.as_u16(), body);
        tracing::debug!("request failed with {status}: {err}");
        Err(err)
    }

    async fn data<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        Ok(self.send::<T>(request).await?.data)
    }

    async fn listed<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Listed<T>, ClientError> {
        let response = self.send::<Vec<T>>(request).await?;
        Ok(Listed {
            data: response.data,
            meta: response.meta,
        })
    }

    pub async fn health(&self) -> Result<HealthView, ClientError> {
        let url = self.endpoint("health")?;
        self.data(self.http.get(url)).await
    }

    // Categories

    pub async fn list_categories(
        &self,
        params: &[(&str, &str)],
    ) -> Result<Listed<CategoryView>, ClientError> {
        let url = self.endpoint("api/categories")?;
        self.listed(self.http.get(url).query(params)).await
    }

    pub async fn category_tree(&self) -> Result<Vec<CategoryNodeView>, ClientError> {
        let url = self.endpoint("api/categories/tree")?;
        self.data(self.http.get(url)).await
    }

    pub async fn get_category(&self, id: Uuid) -> Result<CategoryView, ClientError> {
        let url = self.endpoint(&format!("api/categories/{id}"))?;
        self.data(self.http.get(url)).await
    }

    pub async fn create_category(&self, payload: &CategoryNew) -> Result<CategoryView, ClientError> {
        let url = self.endpoint("api/categories")?;
        self.data(self.http.post(url).json(payload)).await
    }

    pub async fn update_category(
        &self,
        id: Uuid,
        payload: &CategoryUpdate,
    ) -> Result<CategoryView, ClientError> {
        let url = self.endpoint(&format!("api/categories/{id}"))?;
        self.data(self.http.patch(url).json(payload)).await
    }

    pub async fn delete_category(&self, id: Uuid) -> Result<(), ClientError> {
        let url = self.endpoint(&format!("api/categories/{id}"))?;
        self.data::<Uuid>(self.http.delete(url)).await.map(|_| ())
    }

    pub async fn deactivate_category(&self, id: Uuid) -> Result<CategoryView, ClientError> {
        let url = self.endpoint(&format!("api/categories/{id}/deactivate"))?;
        self.data(self.http.post(url)).await
    }

    pub async fn category_usage(&self, id: Uuid) -> Result<CategoryUsageView, ClientError> {
        let url = self.endpoint(&format!("api/categories/{id}/usage"))?;
        self.data(self.http.get(url)).await
    }

    // Transactions

    pub async fn list_transactions(
        &self,
        params: &[(&str, &str)],
    ) -> Result<Listed<TransactionView>, ClientError> {
        let url = self.endpoint("api/transactions")?;
        self.listed(self.http.get(url).query(params)).await
    }

    pub async fn get_transaction(&self, id: Uuid) -> Result<TransactionView, ClientError> {
        let url = self.endpoint(&format!("api/transactions/{id}"))?;
        self.data(self.http.get(url)).await
    }

    pub async fn create_transaction(
        &self,
        payload: &TransactionNew,
    ) -> Result<TransactionView, ClientError> {
        let url = self.endpoint("api/transactions")?;
        self.data(self.http.post(url).json(payload)).await
    }

    pub async fn update_transaction(
        &self,
        id: Uuid,
        payload: &TransactionUpdate,
    ) -> Result<TransactionView, ClientError> {
        let url = self.endpoint(&format!("api/transactions/{id}"))?;
        self.data(self.http.patch(url).json(payload)).await
    }

    pub async fn delete_transaction(&self, id: Uuid) -> Result<(), ClientError> {
        let url = self.endpoint(&format!("api/transactions/{id}"))?;
        self.data::<Uuid>(self.http.delete(url)).await.map(|_| ())
    }

    pub async fn bulk_create_transactions(
        &self,
        transactions: Vec<TransactionNew>,
    ) -> Result<BulkCreateResponse, ClientError> {
        let url = self.endpoint("api/transactions/bulk")?;
        let payload = BulkCreateRequest { transactions };
        self.data(self.http.post(url).json(&payload)).await
    }

    pub async fn bulk_delete_transactions(
        &self,
        ids: Vec<Uuid>,
    ) -> Result<BulkDeleteResponse, ClientError> {
        let url = self.endpoint("api/transactions/bulk")?;
        let payload = BulkDeleteRequest { ids };
        self.data(self.http.delete(url).json(&payload)).await
    }

    pub async fn import_transactions(
        &self,
        transactions: Vec<TransactionNew>,
    ) -> Result<ImportResponse, ClientError> {
        let url = self.endpoint("api/transactions/import")?;
        let payload = BulkCreateRequest { transactions };
        self.data(self.http.post(url).json(&payload)).await
    }

    pub async fn transaction_summary(&self, range: &RangeQuery) -> Result<SummaryView, ClientError> {
        let url = self.endpoint("api/transactions/summary")?;
        self.data(self.http.get(url).query(range)).await
    }

    // Budgets

    pub async fn list_budgets(
        &self,
        params: &[(&str, &str)],
    ) -> Result<Listed<BudgetView>, ClientError> {
        let url = self.endpoint("api/budgets")?;
        self.listed(self.http.get(url).query(params)).await
    }

    pub async fn get_budget(&self, id: Uuid) -> Result<BudgetView, ClientError> {
        let url = self.endpoint(&format!("api/budgets/{id}"))?;
        self.data(self.http.get(url)).await
    }

    pub async fn create_budget(&self, payload: &BudgetNew) -> Result<BudgetView, ClientError> {
        let url = self.endpoint("api/budgets")?;
        self.data(self.http.post(url).json(payload)).await
    }

    pub async fn update_budget(
        &self,
        id: Uuid,
        payload: &BudgetUpdate,
    ) -> Result<BudgetView, ClientError> {
        let url = self.endpoint(&format!("api/budgets/{id}"))?;
        self.data(self.http.patch(url).json(payload)).await
    }

    pub async fn delete_budget(&self, id: Uuid) -> Result<(), ClientError> {
        let url = self.endpoint(&format!("api/budgets/{id}"))?;
        self.data::<Uuid>(self.http.delete(url)).await.map(|_| ())
    }

    pub async fn budget_progress(&self) -> Result<Vec<BudgetView>, ClientError> {
        let url = self.endpoint("api/budgets/progress")?;
        self.data(self.http.get(url)).await
    }

    pub async fn budget_alerts(&self) -> Result<Vec<BudgetView>, ClientError> {
        let url = self.endpoint("api/budgets/alerts")?;
        self.data(self.http.get(url)).await
    }

    // Analytics

    pub async fn dashboard(&self, range: &RangeQuery) -> Result<DashboardView, ClientError> {
        let url = self.endpoint("api/analytics/dashboard")?;
        self.data(self.http.get(url).query(range)).await
    }

    pub async fn category_breakdown(
        &self,
        query: &BreakdownQuery,
    ) -> Result<Vec<CategoryTotalView>, ClientError> {
        let url = self.endpoint("api/analytics/categories")?;
        self.data(self.http.get(url).query(query)).await
    }

    pub async fn monthly(&self, range: &RangeQuery) -> Result<Vec<MonthlyBucketView>, ClientError> {
        let url = self.endpoint("api/analytics/monthly")?;
        self.data(self.http.get(url).query(range)).await
    }

    pub async fn trends(&self, query: &TrendsQuery) -> Result<TrendView, ClientError> {
        let url = self.endpoint("api/analytics/trends")?;
        self.data(self.http.get(url).query(query)).await
    }

    pub async fn health_score(&self, range: &RangeQuery) -> Result<HealthScoreView, ClientError> {
        let url = self.endpoint("api/analytics/health-score")?;
        self.data(self.http.get(url).query(range)).await
    }
}
