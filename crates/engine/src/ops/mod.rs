use std::{fmt, path::PathBuf, sync::Arc};

use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    Budget, Category, EngineError, ResultEngine, Transaction,
    query::{Filter, ListQuery, Record},
    repository::{JsonFileRepository, Repository, SqlRepository},
};

mod analytics;
mod budgets;
mod categories;
mod transactions;

pub use analytics::{DEFAULT_TREND_MONTHS, MAX_TREND_MONTHS};
pub use transactions::{BulkCreateResult, BulkDeleteResult, BulkItemError, ImportResult};

/// Largest number of items accepted by one bulk call.
pub const BULK_LIMIT: usize = 500;

/// Where records are persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Database,
    Json,
}

impl StorageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Json => "json",
        }
    }
}

/// Service layer over the category, transaction and budget repositories.
///
/// All operations take `&self`; the engine is shared behind an `Arc`.
pub struct Engine {
    categories: Arc<dyn Repository<Category>>,
    transactions: Arc<dyn Repository<Transaction>>,
    budgets: Arc<dyn Repository<Budget>>,
    storage: StorageKind,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn storage(&self) -> StorageKind {
        self.storage
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }
}

/// Load every record matching `filters`, in default order.
async fn fetch_all<R: Record>(
    repo: &dyn Repository<R>,
    filters: Vec<Filter>,
) -> ResultEngine<Vec<R>> {
    let query = ListQuery {
        filters,
        ..Default::default()
    };
    Ok(repo.find_all(&query).await?.data)
}

fn not_found(label: &str, id: Uuid) -> EngineError {
    EngineError::KeyNotFound(format!("{label} {id} not exists"))
}

enum StorageConfig {
    Database(DatabaseConnection),
    Json(PathBuf),
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    storage: Option<StorageConfig>,
}

impl EngineBuilder {
    /// Persist through a database connection. The schema must already be
    /// migrated.
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.storage = Some(StorageConfig::Database(db));
        self
    }

    /// Persist as JSON files inside `dir`, created on build if missing.
    pub fn json_dir(mut self, dir: impl Into<PathBuf>) -> EngineBuilder {
        self.storage = Some(StorageConfig::Json(dir.into()));
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        match self.storage {
            Some(StorageConfig::Database(db)) => Ok(Engine {
                categories: Arc::new(SqlRepository::<Category>::new(db.clone())),
                transactions: Arc::new(SqlRepository::<Transaction>::new(db.clone())),
                budgets: Arc::new(SqlRepository::<Budget>::new(db)),
                storage: StorageKind::Database,
            }),
            Some(StorageConfig::Json(dir)) => {
                tokio::fs::create_dir_all(&dir).await?;
                tracing::info!("json storage in {}", dir.display());
                Ok(Engine {
                    categories: Arc::new(JsonFileRepository::<Category>::new(&dir)),
                    transactions: Arc::new(JsonFileRepository::<Transaction>::new(&dir)),
                    budgets: Arc::new(JsonFileRepository::<Budget>::new(&dir)),
                    storage: StorageKind::Json,
                })
            }
            None => Err(EngineError::Storage(
                "no storage configured: call database() or json_dir()".to_string(),
            )),
        }
    }
}
