//! Budget tracking domain: categories, transactions, budgets and the
//! analytics computed over them.
//!
//! [`Engine`] is the service layer. It validates input, enforces the
//! cross-record rules (a transaction's category must exist, be active and
//! share its type; referenced categories cannot be deleted) and persists
//! through a [`repository::Repository`] per record type, backed either by a
//! SQL database or by JSON files.

pub use analytics::{
    CategoryTotal, Dashboard, DateRange, HealthScore, MonthlyBucket, Summary, Trend,
    TrendDirection,
};
pub use budgets::{Budget, BudgetPeriod, BudgetProgress};
pub use categories::{Category, CategoryNode, CategoryUsage};
pub use commands::{
    BudgetPatch, CategoryPatch, NewBudget, NewCategory, NewTransaction, TransactionPatch,
};
pub use error::EngineError;
pub use money::Money;
pub use ops::{
    BULK_LIMIT, BulkCreateResult, BulkDeleteResult, BulkItemError, DEFAULT_TREND_MONTHS, Engine,
    EngineBuilder, ImportResult, MAX_TREND_MONTHS, StorageKind,
};
pub use query::{Filter, FilterOp, ListQuery, Pagination, SortDirection};
pub use repository::Page;
pub use transactions::{Transaction, TransactionKind};

pub mod analytics;
mod budgets;
mod categories;
mod commands;
mod error;
mod money;
mod ops;
pub mod query;
pub mod repository;
mod transactions;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
