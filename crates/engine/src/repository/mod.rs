//! # Repository layer
//!
//! Generic CRUD over a [`Record`] type. The engine only talks to
//! [`Repository`] trait objects, so the storage backend (SQL database or
//! JSON files) is chosen once at startup.
//!
//! Single-row lookups of a missing id are not errors: `find_by_id` and
//! `update` return `Ok(None)`, `delete` returns `Ok(false)`.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    ResultEngine,
    query::{Filter, ListQuery, Record},
};

mod json_file;
mod sql;

pub use json_file::JsonFileRepository;
pub use sql::{SqlRecord, SqlRepository};

/// One page of results plus the total number of matching rows.
#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub count: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            count: self.count,
        }
    }
}

/// Storage operations for one record type.
#[async_trait]
pub trait Repository<R: Record>: Send + Sync {
    /// List records matching the query's filters, sorted and paginated.
    async fn find_all(&self, query: &ListQuery) -> ResultEngine<Page<R>>;

    async fn find_by_id(&self, id: Uuid) -> ResultEngine<Option<R>>;

    /// Insert a new record and return it as stored.
    async fn create(&self, record: R) -> ResultEngine<R>;

    /// Replace the stored record with the same id.
    async fn update(&self, record: R) -> ResultEngine<Option<R>>;

    async fn delete(&self, id: Uuid) -> ResultEngine<bool>;

    /// Count records matching all filters.
    async fn count(&self, filters: &[Filter]) -> ResultEngine<u64>;
}
