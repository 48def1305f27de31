use std::collections::HashSet;

use uuid::Uuid;

use crate::{
    Category, CategoryNode, CategoryPatch, CategoryUsage, EngineError, NewCategory, ResultEngine,
    TransactionKind,
    categories::{build_tree, default_categories},
    query::{Filter, ListQuery},
    repository::Page,
    util::normalize_key,
};

use super::{Engine, fetch_all, not_found};

impl Engine {
    pub async fn list_categories(&self, query: &ListQuery) -> ResultEngine<Page<Category>> {
        self.categories.find_all(query).await
    }

    pub async fn category(&self, id: Uuid) -> ResultEngine<Category> {
        self.categories
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found("category", id))
    }

    pub async fn create_category(&self, cmd: NewCategory) -> ResultEngine<Category> {
        let category = Category::new(cmd, Self::now())?;
        if let Some(parent_id) = category.parent_id {
            self.check_parent(&category, parent_id).await?;
        }
        self.ensure_unique_name(&category).await?;

        let category = self.categories.create(category).await?;
        tracing::info!("category {} created ({})", category.id, category.name);
        Ok(category)
    }

    pub async fn update_category(&self, id: Uuid, patch: CategoryPatch) -> ResultEngine<Category> {
        let current = self.category(id).await?;
        let mut category = current.clone();
        category.apply(patch, Self::now())?;

        if category.kind != current.kind {
            let usage = self.category_usage(id).await?;
            if usage.transactions > 0 {
                return Err(EngineError::CategoryInUse(format!(
                    "cannot change the type of category '{}': {} transactions use it",
                    current.name, usage.transactions
                )));
            }
            let children = self
                .categories
                .count(&[Filter::eq("parent_id", id.to_string())])
                .await?;
            if children > 0 {
                return Err(EngineError::Validation(format!(
                    "cannot change the type of category '{}' while it has subcategories",
                    current.name
                )));
            }
        }
        if let Some(parent_id) = category.parent_id
            && (category.parent_id != current.parent_id || category.kind != current.kind)
        {
            self.check_parent(&category, parent_id).await?;
        }
        if normalize_key(&category.name) != normalize_key(&current.name)
            || category.kind != current.kind
        {
            self.ensure_unique_name(&category).await?;
        }

        self.categories
            .update(category)
            .await?
            .ok_or_else(|| not_found("category", id))
    }

    /// Delete a category nothing references. Default categories are kept.
    pub async fn delete_category(&self, id: Uuid) -> ResultEngine<()> {
        let category = self.category(id).await?;
        if category.is_default {
            return Err(EngineError::Validation(format!(
                "default category '{}' cannot be deleted; deactivate it instead",
                category.name
            )));
        }

        let usage = self.category_usage(id).await?;
        if usage.in_use() {
            return Err(EngineError::CategoryInUse(format!(
                "category '{}' is used by {} transactions and {} budgets; deactivate it instead",
                category.name, usage.transactions, usage.budgets
            )));
        }
        let children = self
            .categories
            .count(&[Filter::eq("parent_id", id.to_string())])
            .await?;
        if children > 0 {
            return Err(EngineError::CategoryInUse(format!(
                "category '{}' has {children} subcategories",
                category.name
            )));
        }

        if !self.categories.delete(id).await? {
            return Err(not_found("category", id));
        }
        tracing::info!("category {id} deleted");
        Ok(())
    }

    pub async fn deactivate_category(&self, id: Uuid) -> ResultEngine<Category> {
        self.update_category(
            id,
            CategoryPatch {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    /// All categories nested under their parents, siblings by name.
    pub async fn category_tree(&self) -> ResultEngine<Vec<CategoryNode>> {
        let categories = fetch_all(self.categories.as_ref(), Vec::new()).await?;
        Ok(build_tree(categories))
    }

    pub async fn category_usage(&self, id: Uuid) -> ResultEngine<CategoryUsage> {
        let filter = [Filter::eq("category_id", id.to_string())];
        Ok(CategoryUsage {
            transactions: self.transactions.count(&filter).await?,
            budgets: self.budgets.count(&filter).await?,
        })
    }

    /// Create the default categories when the store has none. Returns how
    /// many were created.
    pub async fn seed_default_categories(&self) -> ResultEngine<usize> {
        if self.categories.count(&[]).await? > 0 {
            return Ok(0);
        }
        let now = Self::now();
        let mut created = 0;
        for cmd in default_categories() {
            self.categories.create(Category::new(cmd, now)?).await?;
            created += 1;
        }
        tracing::info!("seeded {created} default categories");
        Ok(created)
    }

    /// Check that `category_id` can classify a record of `kind`.
    pub(super) async fn ensure_category_accepts(
        &self,
        category_id: Uuid,
        kind: TransactionKind,
    ) -> ResultEngine<Category> {
        let category = self
            .categories
            .find_by_id(category_id)
            .await?
            .ok_or_else(|| {
                EngineError::Validation(format!("category {category_id} does not exist"))
            })?;
        if !category.is_active {
            return Err(EngineError::Validation(format!(
                "category '{}' is inactive",
                category.name
            )));
        }
        if category.kind != kind {
            return Err(EngineError::Validation(format!(
                "category '{}' is an {} category, not {}",
                category.name,
                category.kind.as_str(),
                kind.as_str()
            )));
        }
        Ok(category)
    }

    async fn check_parent(&self, category: &Category, parent_id: Uuid) -> ResultEngine<()> {
        let parent = self.categories.find_by_id(parent_id).await?.ok_or_else(|| {
            EngineError::Validation(format!("parent category {parent_id} does not exist"))
        })?;
        if parent.kind != category.kind {
            return Err(EngineError::Validation(format!(
                "parent category '{}' has a different type",
                parent.name
            )));
        }

        // Walk up from the parent; reaching the category itself means a cycle.
        let mut seen = HashSet::from([category.id]);
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if !seen.insert(current.id) {
                return Err(EngineError::Validation(
                    "parent would create a category cycle".to_string(),
                ));
            }
            cursor = match current.parent_id {
                Some(next) => self.categories.find_by_id(next).await?,
                None => None,
            };
        }
        Ok(())
    }

    async fn ensure_unique_name(&self, category: &Category) -> ResultEngine<()> {
        let key = normalize_key(&category.name);
        let same_kind = fetch_all(
            self.categories.as_ref(),
            vec![Filter::eq("type", category.kind.as_str())],
        )
        .await?;
        if same_kind
            .iter()
            .any(|other| other.id != category.id && normalize_key(&other.name) == key)
        {
            return Err(EngineError::ExistingKey(format!(
                "{} category '{}'",
                category.kind.as_str(),
                category.name
            )));
        }
        Ok(())
    }
}
