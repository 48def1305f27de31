//! Repository persisted as one JSON array file per collection.
//!
//! Every operation loads the whole file and mutating operations rewrite it.
//! A mutex serializes access within the process; the store is not meant to
//! be shared between processes.

use std::{
    cmp::Ordering,
    marker::PhantomData,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    ResultEngine,
    query::{Condition, Filter, ListQuery, Record, SortDirection},
};

use super::{Page, Repository};

#[derive(Debug)]
pub struct JsonFileRepository<R> {
    path: PathBuf,
    lock: Mutex<()>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> JsonFileRepository<R> {
    /// Store records in `<dir>/<collection>.json`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", R::COLLECTION)),
            lock: Mutex::new(()),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<R> JsonFileRepository<R>
where
    R: Record + Serialize + DeserializeOwned,
{
    async fn load(&self) -> ResultEngine<Vec<R>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, records: &[R]) -> ResultEngine<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn matches_all<R: Record>(conditions: &[Condition], record: &R) -> bool {
    conditions.iter().all(|condition| condition.matches(record))
}

/// Nulls sort after values in ascending order and before them in descending.
fn compare_column<R: Record>(a: &R, b: &R, column: &str, direction: SortDirection) -> Ordering {
    let ordering = match (a.value(column), b.value(column)) {
        (Some(x), Some(y)) => x.compare(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

#[async_trait]
impl<R> Repository<R> for JsonFileRepository<R>
where
    R: Record + Serialize + DeserializeOwned,
{
    async fn find_all(&self, query: &ListQuery) -> ResultEngine<Page<R>> {
        let resolved = query.resolve::<R>()?;
        let _guard = self.lock.lock().await;

        let mut records: Vec<R> = self
            .load()
            .await?
            .into_iter()
            .filter(|record| matches_all(&resolved.conditions, record))
            .collect();
        let count = records.len() as u64;

        let (column, direction) = resolved.sort;
        records.sort_by(|a, b| {
            compare_column(a, b, column, direction).then_with(|| a.id().cmp(&b.id()))
        });

        let data = match resolved.pagination {
            Some(pagination) => records
                .into_iter()
                .skip(usize::try_from(pagination.offset()).unwrap_or(usize::MAX))
                .take(usize::try_from(pagination.limit).unwrap_or(usize::MAX))
                .collect(),
            None => records,
        };

        Ok(Page { data, count })
    }

    async fn find_by_id(&self, id: Uuid) -> ResultEngine<Option<R>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.into_iter().find(|record| record.id() == id))
    }

    async fn create(&self, record: R) -> ResultEngine<R> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        records.push(record.clone());
        self.save(&records).await?;
        tracing::debug!("inserted {} into {}", record.id(), self.path.display());
        Ok(record)
    }

    async fn update(&self, record: R) -> ResultEngine<Option<R>> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        let Some(slot) = records.iter_mut().find(|r| r.id() == record.id()) else {
            return Ok(None);
        };
        *slot = record.clone();
        self.save(&records).await?;
        Ok(Some(record))
    }

    async fn delete(&self, id: Uuid) -> ResultEngine<bool> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        let before = records.len();
        records.retain(|record| record.id() != id);
        if records.len() == before {
            return Ok(false);
        }
        self.save(&records).await?;
        Ok(true)
    }

    async fn count(&self, filters: &[Filter]) -> ResultEngine<u64> {
        let query = ListQuery {
            filters: filters.to_vec(),
            ..Default::default()
        };
        let resolved = query.resolve::<R>()?;
        let _guard = self.lock.lock().await;
        let records = self.load().await?;
        Ok(records
            .iter()
            .filter(|record| matches_all(&resolved.conditions, *record))
            .count() as u64)
    }
}
