//! Client for the budget tracker API.
//!
//! [`ApiClient`] maps every endpoint to a typed method and turns error
//! envelopes into [`ClientError`]. The stores in [`stores`] keep loaded
//! entities in memory for UIs that filter and sort without refetching.

pub use api::{ApiClient, Listed};
pub use error::ClientError;
pub use store::{EntityStore, Operation, OperationState, StoreEntity};
pub use stores::{BudgetsStore, CategoriesStore, SortOrder, TransactionSort, TransactionsStore};

mod api;
mod error;
mod store;
pub mod stores;
