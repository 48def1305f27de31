//! Per-entity stores: an [`EntityStore`] wired to the matching endpoints,
//! with the filters and sorts the budget screens use.

use std::cmp::Ordering;

use api_types::{
    TransactionType,
    budget::{BudgetNew, BudgetUpdate, BudgetView},
    category::{CategoryNew, CategoryUpdate, CategoryView},
    envelope::ListMeta,
    transaction::{
        BulkCreateResponse, BulkDeleteResponse, TransactionNew, TransactionUpdate, TransactionView,
    },
};
use chrono::NaiveDate;
use uuid::Uuid;

use crate::{ApiClient, ClientError, EntityStore, Operation};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionSort {
    Date,
    Amount,
    Description,
}

pub struct TransactionsStore {
    client: ApiClient,
    store: EntityStore<TransactionView>,
    meta: Option<ListMeta>,
}

impl TransactionsStore {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            store: EntityStore::new(),
            meta: None,
        }
    }

    pub fn store(&self) -> &EntityStore<TransactionView> {
        &self.store
    }

    /// Pagination of the last load, when it asked for a page.
    pub fn meta(&self) -> Option<ListMeta> {
        self.meta
    }

    pub fn visible(&self) -> Vec<&TransactionView> {
        self.store.visible()
    }

    pub fn is_loading(&self, op: Operation) -> bool {
        self.store.is_loading(op)
    }

    pub fn error(&self, op: Operation) -> Option<&str> {
        self.store.error(op)
    }

    /// Load with server-side filters, e.g. `[("gte_date", "2024-01-01")]`.
    pub async fn load(&mut self, params: &[(&str, &str)]) -> Result<(), ClientError> {
        let client = &self.client;
        let mut meta = None;
        let meta_slot = &mut meta;
        self.store
            .load(async move {
                let listed = client.list_transactions(params).await?;
                *meta_slot = listed.meta;
                Ok::<_, ClientError>(listed.data)
            })
            .await?;
        self.meta = meta;
        Ok(())
    }

    pub async fn create(&mut self, payload: &TransactionNew) -> Result<TransactionView, ClientError> {
        let client = &self.client;
        self.store.create(client.create_transaction(payload)).await
    }

    pub async fn update(
        &mut self,
        id: Uuid,
        payload: &TransactionUpdate,
    ) -> Result<TransactionView, ClientError> {
        let client = &self.client;
        self.store.update(client.update_transaction(id, payload)).await
    }

    pub async fn delete(&mut self, id: Uuid) -> Result<(), ClientError> {
        let client = &self.client;
        self.store.delete(id, client.delete_transaction(id)).await
    }

    /// Create many at once; only the created items enter the list. Tracked
    /// as [`Operation::Create`].
    pub async fn bulk_create(
        &mut self,
        items: Vec<TransactionNew>,
    ) -> Result<BulkCreateResponse, ClientError> {
        let client = &self.client;
        let response = self
            .store
            .track(Operation::Create, client.bulk_create_transactions(items))
            .await?;
        self.store.apply_batch(response.created.clone(), &[]);
        Ok(response)
    }

    /// Delete many at once; only confirmed deletions leave the list. Tracked
    /// as [`Operation::Delete`].
    pub async fn bulk_delete(&mut self, ids: Vec<Uuid>) -> Result<BulkDeleteResponse, ClientError> {
        let client = &self.client;
        let response = self
            .store
            .track(Operation::Delete, client.bulk_delete_transactions(ids))
            .await?;
        self.store.apply_batch(Vec::new(), &response.deleted);
        Ok(response)
    }

    pub fn filter_type(&mut self, kind: Option<TransactionType>) {
        match kind {
            Some(kind) => self
                .store
                .set_filter("type", move |tx: &TransactionView| tx.kind == kind),
            None => self.store.clear_filter("type"),
        }
    }

    pub fn filter_category(&mut self, category_id: Option<Uuid>) {
        match category_id {
            Some(id) => self
                .store
                .set_filter("category", move |tx: &TransactionView| tx.category_id == id),
            None => self.store.clear_filter("category"),
        }
    }

    /// Keep transactions dated within `from..=to`; a missing bound is open.
    pub fn filter_dates(&mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) {
        if from.is_none() && to.is_none() {
            self.store.clear_filter("dates");
            return;
        }
        self.store.set_filter("dates", move |tx: &TransactionView| {
            from.is_none_or(|from| tx.date >= from) && to.is_none_or(|to| tx.date <= to)
        });
    }

    pub fn search(&mut self, text: &str) {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            self.store.clear_filter("search");
            return;
        }
        self.store.set_filter("search", move |tx: &TransactionView| {
            contains_ignore_case(&tx.description, &needle)
        });
    }

    pub fn sort_by(&mut self, field: TransactionSort, order: SortOrder) {
        self.store
            .set_sort(move |a: &TransactionView, b: &TransactionView| {
                let ordering = match field {
                    TransactionSort::Date => a.date.cmp(&b.date),
                    TransactionSort::Amount => a.amount.total_cmp(&b.amount),
                    TransactionSort::Description => a
                        .description
                        .to_lowercase()
                        .cmp(&b.description.to_lowercase()),
                };
                order.apply(ordering)
            });
    }

    pub fn clear_filters(&mut self) {
        self.store.clear_filters();
        self.store.clear_sort();
    }
}

pub struct CategoriesStore {
    client: ApiClient,
    store: EntityStore<CategoryView>,
}

impl CategoriesStore {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            store: EntityStore::new(),
        }
    }

    pub fn store(&self) -> &EntityStore<CategoryView> {
        &self.store
    }

    pub fn visible(&self) -> Vec<&CategoryView> {
        self.store.visible()
    }

    pub fn error(&self, op: Operation) -> Option<&str> {
        self.store.error(op)
    }

    pub async fn load(&mut self) -> Result<(), ClientError> {
        let client = &self.client;
        self.store
            .load(async move { Ok::<_, ClientError>(client.list_categories(&[]).await?.data) })
            .await
    }

    pub async fn create(&mut self, payload: &CategoryNew) -> Result<CategoryView, ClientError> {
        let client = &self.client;
        self.store.create(client.create_category(payload)).await
    }

    pub async fn update(
        &mut self,
        id: Uuid,
        payload: &CategoryUpdate,
    ) -> Result<CategoryView, ClientError> {
        let client = &self.client;
        self.store.update(client.update_category(id, payload)).await
    }

    pub async fn deactivate(&mut self, id: Uuid) -> Result<CategoryView, ClientError> {
        let client = &self.client;
        self.store.update(client.deactivate_category(id)).await
    }

    pub async fn delete(&mut self, id: Uuid) -> Result<(), ClientError> {
        let client = &self.client;
        self.store.delete(id, client.delete_category(id)).await
    }

    pub fn filter_type(&mut self, kind: Option<TransactionType>) {
        match kind {
            Some(kind) => self
                .store
                .set_filter("type", move |category: &CategoryView| category.kind == kind),
            None => self.store.clear_filter("type"),
        }
    }

    pub fn active_only(&mut self, active_only: bool) {
        if active_only {
            self.store
                .set_filter("active", |category: &CategoryView| category.is_active);
        } else {
            self.store.clear_filter("active");
        }
    }

    pub fn search(&mut self, text: &str) {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            self.store.clear_filter("search");
            return;
        }
        self.store.set_filter("search", move |category: &CategoryView| {
            contains_ignore_case(&category.name, &needle)
        });
    }

    pub fn sort_by_name(&mut self, order: SortOrder) {
        self.store
            .set_sort(move |a: &CategoryView, b: &CategoryView| {
                order.apply(a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            });
    }
}

pub struct BudgetsStore {
    client: ApiClient,
    store: EntityStore<BudgetView>,
}

impl BudgetsStore {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            store: EntityStore::new(),
        }
    }

    pub fn store(&self) -> &EntityStore<BudgetView> {
        &self.store
    }

    pub fn visible(&self) -> Vec<&BudgetView> {
        self.store.visible()
    }

    pub fn error(&self, op: Operation) -> Option<&str> {
        self.store.error(op)
    }

    pub async fn load(&mut self) -> Result<(), ClientError> {
        let client = &self.client;
        self.store
            .load(async move { Ok::<_, ClientError>(client.list_budgets(&[]).await?.data) })
            .await
    }

    pub async fn create(&mut self, payload: &BudgetNew) -> Result<BudgetView, ClientError> {
        let client = &self.client;
        self.store.create(client.create_budget(payload)).await
    }

    pub async fn update(&mut self, id: Uuid, payload: &BudgetUpdate) -> Result<BudgetView, ClientError> {
        let client = &self.client;
        self.store.update(client.update_budget(id, payload)).await
    }

    pub async fn delete(&mut self, id: Uuid) -> Result<(), ClientError> {
        let client = &self.client;
        self.store.delete(id, client.delete_budget(id)).await
    }

    pub fn active_only(&mut self, active_only: bool) {
        if active_only {
            self.store
                .set_filter("active", |budget: &BudgetView| budget.is_active);
        } else {
            self.store.clear_filter("active");
        }
    }

    /// Keep budgets at or over their alert threshold.
    pub fn alerting_only(&mut self, alerting_only: bool) {
        if alerting_only {
            self.store
                .set_filter("alerting", |budget: &BudgetView| budget.alert);
        } else {
            self.store.clear_filter("alerting");
        }
    }

    pub fn sort_by_utilization(&mut self, order: SortOrder) {
        self.store
            .set_sort(move |a: &BudgetView, b: &BudgetView| {
                order.apply(a.utilization.total_cmp(&b.utilization))
            });
    }
}
