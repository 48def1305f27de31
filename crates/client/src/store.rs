//! In-memory entity lists mirroring the server state.
//!
//! A store keeps the last loaded list, a loading/error flag per operation and
//! a set of named filter predicates plus an optional sort. Filters and sort
//! are applied locally by [`EntityStore::visible`]; changing them never hits
//! the server. The list itself only changes after the server confirmed the
//! operation.

use std::{cmp::Ordering, collections::BTreeMap, future::Future};

use api_types::{budget::BudgetView, category::CategoryView, transaction::TransactionView};
use uuid::Uuid;

use crate::ClientError;

pub trait StoreEntity: Clone {
    fn id(&self) -> Uuid;
}

impl StoreEntity for CategoryView {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl StoreEntity for TransactionView {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl StoreEntity for BudgetView {
    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    Load,
    Create,
    Update,
    Delete,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperationState {
    pub loading: bool,
    /// Message of the last failure, cleared when the operation starts again.
    pub error: Option<String>,
}

type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;
type Comparator<T> = Box<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

pub struct EntityStore<T> {
    items: Vec<T>,
    states: BTreeMap<Operation, OperationState>,
    filters: BTreeMap<String, Predicate<T>>,
    sort: Option<Comparator<T>>,
}

impl<T> Default for EntityStore<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            states: BTreeMap::new(),
            filters: BTreeMap::new(),
            sort: None,
        }
    }
}

impl<T: StoreEntity> EntityStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything loaded, in server order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn get(&self, id: Uuid) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Loaded items passing every filter, sorted when a sort is set.
    pub fn visible(&self) -> Vec<&T> {
        let mut visible: Vec<&T> = self
            .items
            .iter()
            .filter(|item| self.filters.values().all(|keep| keep(item)))
            .collect();
        if let Some(cmp) = &self.sort {
            visible.sort_by(|a, b| cmp(a, b));
        }
        visible
    }

    /// Set or replace the filter registered under `name`.
    pub fn set_filter(
        &mut self,
        name: impl Into<String>,
        predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) {
        self.filters.insert(name.into(), Box::new(predicate));
    }

    pub fn clear_filter(&mut self, name: &str) {
        self.filters.remove(name);
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
    }

    pub fn set_sort(&mut self, cmp: impl Fn(&T, &T) -> Ordering + Send + Sync + 'static) {
        self.sort = Some(Box::new(cmp));
    }

    pub fn clear_sort(&mut self) {
        self.sort = None;
    }

    pub fn state(&self, op: Operation) -> OperationState {
        self.states.get(&op).cloned().unwrap_or_default()
    }

    pub fn is_loading(&self, op: Operation) -> bool {
        self.states.get(&op).is_some_and(|state| state.loading)
    }

    pub fn error(&self, op: Operation) -> Option<&str> {
        self.states.get(&op).and_then(|state| state.error.as_deref())
    }

    fn start(&mut self, op: Operation) {
        self.states.insert(
            op,
            OperationState {
                loading: true,
                error: None,
            },
        );
    }

    fn finish<R>(&mut self, op: Operation, result: &Result<R, ClientError>) {
        let state = self.states.entry(op).or_default();
        state.loading = false;
        state.error = result.as_ref().err().map(ToString::to_string);
    }

    /// Run `call` under the loading/error state of `op` without touching
    /// the list.
    pub async fn track<R, F>(&mut self, op: Operation, call: F) -> Result<R, ClientError>
    where
        F: Future<Output = Result<R, ClientError>>,
    {
        self.start(op);
        let result = call.await;
        self.finish(op, &result);
        result
    }

    /// Replace the list with the result of `call`.
    pub async fn load<F>(&mut self, call: F) -> Result<(), ClientError>
    where
        F: Future<Output = Result<Vec<T>, ClientError>>,
    {
        self.items = self.track(Operation::Load, call).await?;
        Ok(())
    }

    /// Append the created item returned by `call`.
    pub async fn create<F>(&mut self, call: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        let item = self.track(Operation::Create, call).await?;
        self.items.push(item.clone());
        Ok(item)
    }

    /// Replace the stored copy with the updated item returned by `call`.
    pub async fn update<F>(&mut self, call: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        let item = self.track(Operation::Update, call).await?;
        match self.items.iter_mut().find(|stored| stored.id() == item.id()) {
            Some(stored) => *stored = item.clone(),
            None => self.items.push(item.clone()),
        }
        Ok(item)
    }

    /// Drop `id` once `call` succeeded.
    pub async fn delete<F>(&mut self, id: Uuid, call: F) -> Result<(), ClientError>
    where
        F: Future<Output = Result<(), ClientError>>,
    {
        self.track(Operation::Delete, call).await?;
        self.items.retain(|item| item.id() != id);
        Ok(())
    }

    /// Apply a batch outcome computed elsewhere: drop `removed`, append
    /// `added`.
    pub fn apply_batch(&mut self, added: Vec<T>, removed: &[Uuid]) {
        self.items.retain(|item| !removed.contains(&item.id()));
        self.items.extend(added);
    }
}

#[cfg(test)]
mod tests {
    use api_types::TransactionType;
    use chrono::{NaiveDate, Utc};

    use super::*;

    fn tx(amount: f64, kind: TransactionType, description: &str) -> TransactionView {
        TransactionView {
            id: Uuid::new_v4(),
            kind,
            amount,
            description: description.to_string(),
            category_id: Uuid::nil(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn loaded() -> EntityStore<TransactionView> {
        let mut store = EntityStore::new();
        let items = vec![
            tx(20.0, TransactionType::Expense, "Lunch"),
            tx(1000.0, TransactionType::Income, "Salary"),
            tx(5.0, TransactionType::Expense, "Coffee"),
        ];
        store.load(async move { Ok::<_, ClientError>(items) }).await.unwrap();
        store
    }

    #[tokio::test]
    async fn filters_and_sort_apply_locally() {
        let mut store = loaded().await;

        store.set_filter("type", |tx: &TransactionView| {
            tx.kind == TransactionType::Expense
        });
        store.set_sort(|a: &TransactionView, b: &TransactionView| {
            a.amount.total_cmp(&b.amount)
        });
        let visible: Vec<&str> = store
            .visible()
            .iter()
            .map(|tx| tx.description.as_str())
            .collect();
        assert_eq!(visible, vec!["Coffee", "Lunch"]);

        store.clear_filter("type");
        assert_eq!(store.visible().len(), 3);
        assert_eq!(store.items().len(), 3);
    }

    #[tokio::test]
    async fn failed_calls_leave_the_list_untouched() {
        let mut store = loaded().await;
        let first = store.items()[0].id;

        let err = store
            .delete(first, async {
                Err::<(), _>(ClientError::CategoryInUse("busy".to_string()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::CategoryInUse(_)));
        assert_eq!(store.items().len(), 3);
        assert!(!store.is_loading(Operation::Delete));
        assert_eq!(store.error(Operation::Delete), Some("category in use: busy"));

        let created = store
            .create(async {
                Err::<TransactionView, _>(ClientError::Validation("amount".to_string()))
            })
            .await;
        assert!(created.is_err());
        assert_eq!(store.items().len(), 3);
        assert!(store.error(Operation::Create).is_some());
        assert_eq!(store.error(Operation::Load), None);
    }

    #[tokio::test]
    async fn successful_calls_update_the_list() {
        let mut store = loaded().await;
        let first = store.items()[0].clone();

        let mut changed = first.clone();
        changed.amount = 25.0;
        store.update(async move { Ok::<_, ClientError>(changed) }).await.unwrap();
        assert_eq!(store.get(first.id).unwrap().amount, 25.0);

        store.delete(first.id, async { Ok::<_, ClientError>(()) }).await.unwrap();
        assert!(store.get(first.id).is_none());
        assert_eq!(store.state(Operation::Delete), OperationState::default());

        let added = tx(7.0, TransactionType::Expense, "Bus");
        store.create(async move { Ok::<_, ClientError>(added) }).await.unwrap();
        assert_eq!(store.items().len(), 3);
    }

    #[tokio::test]
    async fn tracked_calls_record_state_only() {
        let mut store = loaded().await;

        let err = store
            .track(Operation::Create, async {
                Err::<usize, _>(ClientError::Validation("empty batch".to_string()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert_eq!(
            store.error(Operation::Create),
            Some("validation failed: empty batch")
        );
        assert!(!store.is_loading(Operation::Create));

        let count = store
            .track(Operation::Create, async { Ok::<_, ClientError>(2) })
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(store.error(Operation::Create), None);
        assert_eq!(store.items().len(), 3);
    }
}
