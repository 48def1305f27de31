use std::collections::HashSet;

use uuid::Uuid;

use crate::{
    EngineError, NewTransaction, ResultEngine, Transaction, TransactionPatch,
    analytics::{DateRange, Summary, summarize},
    query::{Filter, ListQuery},
    repository::Page,
};

use super::{BULK_LIMIT, Engine, fetch_all, not_found};

/// Failure of one item of a bulk call.
#[derive(Debug, PartialEq)]
pub struct BulkItemError {
    /// Position of the item in the request.
    pub index: usize,
    /// Target id, for deletes.
    pub id: Option<Uuid>,
    pub error: EngineError,
}

#[derive(Debug, Default, PartialEq)]
pub struct BulkCreateResult {
    pub created: Vec<Transaction>,
    pub errors: Vec<BulkItemError>,
}

#[derive(Debug, Default, PartialEq)]
pub struct BulkDeleteResult {
    pub deleted: Vec<Uuid>,
    pub errors: Vec<BulkItemError>,
}

#[derive(Debug, Default, PartialEq)]
pub struct ImportResult {
    pub imported: Vec<Transaction>,
    /// Indexes of items skipped as duplicates.
    pub duplicates: Vec<usize>,
    pub errors: Vec<BulkItemError>,
}

fn check_batch_size(len: usize) -> ResultEngine<()> {
    if len == 0 {
        return Err(EngineError::Validation("no items supplied".to_string()));
    }
    if len > BULK_LIMIT {
        return Err(EngineError::Validation(format!(
            "at most {BULK_LIMIT} items per request, got {len}"
        )));
    }
    Ok(())
}

impl Engine {
    pub async fn list_transactions(&self, query: &ListQuery) -> ResultEngine<Page<Transaction>> {
        self.transactions.find_all(query).await
    }

    pub async fn transaction(&self, id: Uuid) -> ResultEngine<Transaction> {
        self.transactions
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found("transaction", id))
    }

    pub async fn create_transaction(&self, cmd: NewTransaction) -> ResultEngine<Transaction> {
        let tx = Transaction::new(cmd, Self::now())?;
        self.ensure_category_accepts(tx.category_id, tx.kind)
            .await?;
        let tx = self.transactions.create(tx).await?;
        tracing::info!(
            "transaction {} created: {} {}",
            tx.id,
            tx.kind.as_str(),
            tx.amount
        );
        Ok(tx)
    }

    pub async fn update_transaction(
        &self,
        id: Uuid,
        patch: TransactionPatch,
    ) -> ResultEngine<Transaction> {
        let current = self.transaction(id).await?;
        let mut tx = current.clone();
        tx.apply(patch, Self::now())?;
        if tx.category_id != current.category_id || tx.kind != current.kind {
            self.ensure_category_accepts(tx.category_id, tx.kind)
                .await?;
        }
        self.transactions
            .update(tx)
            .await?
            .ok_or_else(|| not_found("transaction", id))
    }

    pub async fn delete_transaction(&self, id: Uuid) -> ResultEngine<()> {
        if !self.transactions.delete(id).await? {
            return Err(not_found("transaction", id));
        }
        tracing::info!("transaction {id} deleted");
        Ok(())
    }

    /// Create each item independently; failures do not stop the batch.
    pub async fn bulk_create_transactions(
        &self,
        items: Vec<NewTransaction>,
    ) -> ResultEngine<BulkCreateResult> {
        check_batch_size(items.len())?;
        let mut result = BulkCreateResult::default();
        for (index, cmd) in items.into_iter().enumerate() {
            match self.create_transaction(cmd).await {
                Ok(tx) => result.created.push(tx),
                Err(error) => result.errors.push(BulkItemError {
                    index,
                    id: None,
                    error,
                }),
            }
        }
        tracing::info!(
            "bulk create: {} created, {} failed",
            result.created.len(),
            result.errors.len()
        );
        Ok(result)
    }

    pub async fn bulk_delete_transactions(
        &self,
        ids: Vec<Uuid>,
    ) -> ResultEngine<BulkDeleteResult> {
        check_batch_size(ids.len())?;
        let mut result = BulkDeleteResult::default();
        for (index, id) in ids.into_iter().enumerate() {
            match self.delete_transaction(id).await {
                Ok(()) => result.deleted.push(id),
                Err(error) => result.errors.push(BulkItemError {
                    index,
                    id: Some(id),
                    error,
                }),
            }
        }
        tracing::info!(
            "bulk delete: {} deleted, {} failed",
            result.deleted.len(),
            result.errors.len()
        );
        Ok(result)
    }

    /// Bulk create that skips items equal to a stored transaction or to an
    /// earlier item of the batch.
    pub async fn import_transactions(
        &self,
        items: Vec<NewTransaction>,
    ) -> ResultEngine<ImportResult> {
        check_batch_size(items.len())?;

        let range = DateRange {
            from: items.iter().map(|item| item.date).min(),
            to: items.iter().map(|item| item.date).max(),
        };
        let mut seen: HashSet<_> = fetch_all(self.transactions.as_ref(), range.filters())
            .await?
            .iter()
            .map(Transaction::duplicate_key)
            .collect();

        let now = Self::now();
        let mut result = ImportResult::default();
        for (index, cmd) in items.into_iter().enumerate() {
            let candidate = match Transaction::new(cmd, now) {
                Ok(tx) => tx,
                Err(error) => {
                    result.errors.push(BulkItemError {
                        index,
                        id: None,
                        error,
                    });
                    continue;
                }
            };
            let key = candidate.duplicate_key();
            if seen.contains(&key) {
                result.duplicates.push(index);
                continue;
            }

            let stored = match self
                .ensure_category_accepts(candidate.category_id, candidate.kind)
                .await
            {
                Ok(_) => self.transactions.create(candidate).await,
                Err(error) => Err(error),
            };
            match stored {
                Ok(tx) => {
                    seen.insert(key);
                    result.imported.push(tx);
                }
                Err(error) => result.errors.push(BulkItemError {
                    index,
                    id: None,
                    error,
                }),
            }
        }
        tracing::info!(
            "import: {} imported, {} duplicates, {} failed",
            result.imported.len(),
            result.duplicates.len(),
            result.errors.len()
        );
        Ok(result)
    }

    /// Transactions with a date inside `range`, newest first.
    pub(super) async fn transactions_in(&self, range: DateRange) -> ResultEngine<Vec<Transaction>> {
        fetch_all(self.transactions.as_ref(), range.filters()).await
    }

    pub async fn transaction_summary(&self, range: DateRange) -> ResultEngine<Summary> {
        Ok(summarize(&self.transactions_in(range).await?))
    }

    pub(super) async fn expenses_for(
        &self,
        category_id: Uuid,
        range: DateRange,
    ) -> ResultEngine<Vec<Transaction>> {
        let mut filters = range.filters();
        filters.push(Filter::eq("category_id", category_id.to_string()));
        filters.push(Filter::eq("type", "expense"));
        fetch_all(self.transactions.as_ref(), filters).await
    }
}
