use uuid::Uuid;

use crate::{
    Budget, BudgetPatch, BudgetProgress, EngineError, NewBudget, ResultEngine,
    analytics::DateRange,
    query::{Filter, ListQuery},
    repository::Page,
};

use super::{Engine, fetch_all, not_found};

impl Engine {
    /// List budgets with their progress.
    pub async fn list_budgets(&self, query: &ListQuery) -> ResultEngine<Page<BudgetProgress>> {
        let page = self.budgets.find_all(query).await?;
        let mut data = Vec::with_capacity(page.data.len());
        for budget in page.data {
            data.push(self.progress_of(budget).await?);
        }
        Ok(Page {
            data,
            count: page.count,
        })
    }

    pub async fn budget(&self, id: Uuid) -> ResultEngine<BudgetProgress> {
        let budget = self
            .budgets
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found("budget", id))?;
        self.progress_of(budget).await
    }

    pub async fn create_budget(&self, cmd: NewBudget) -> ResultEngine<BudgetProgress> {
        let budget = Budget::new(cmd, Self::now())?;
        self.ensure_category_exists(budget.category_id).await?;
        let budget = self.budgets.create(budget).await?;
        tracing::info!("budget {} created ({})", budget.id, budget.name);
        self.progress_of(budget).await
    }

    pub async fn update_budget(&self, id: Uuid, patch: BudgetPatch) -> ResultEngine<BudgetProgress> {
        let current = self
            .budgets
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found("budget", id))?;
        let mut budget = current.clone();
        budget.apply(patch, Self::now())?;
        if budget.category_id != current.category_id {
            self.ensure_category_exists(budget.category_id).await?;
        }
        let budget = self
            .budgets
            .update(budget)
            .await?
            .ok_or_else(|| not_found("budget", id))?;
        self.progress_of(budget).await
    }

    pub async fn delete_budget(&self, id: Uuid) -> ResultEngine<()> {
        if !self.budgets.delete(id).await? {
            return Err(not_found("budget", id));
        }
        tracing::info!("budget {id} deleted");
        Ok(())
    }

    /// Progress of every active budget.
    pub async fn budget_progress(&self) -> ResultEngine<Vec<BudgetProgress>> {
        let budgets = fetch_all(
            self.budgets.as_ref(),
            vec![Filter::eq("is_active", "true")],
        )
        .await?;
        let mut out = Vec::with_capacity(budgets.len());
        for budget in budgets {
            out.push(self.progress_of(budget).await?);
        }
        Ok(out)
    }

    /// Active budgets at or above their alert threshold.
    pub async fn budget_alerts(&self) -> ResultEngine<Vec<BudgetProgress>> {
        let alerts: Vec<BudgetProgress> = self
            .budget_progress()
            .await?
            .into_iter()
            .filter(|progress| progress.alert)
            .collect();
        if !alerts.is_empty() {
            tracing::debug!("{} budgets over their alert threshold", alerts.len());
        }
        Ok(alerts)
    }

    async fn progress_of(&self, budget: Budget) -> ResultEngine<BudgetProgress> {
        let range = DateRange {
            from: Some(budget.start_date),
            to: Some(budget.end_date),
        };
        let expenses = self.expenses_for(budget.category_id, range).await?;
        Ok(BudgetProgress::compute(budget, &expenses))
    }

    async fn ensure_category_exists(&self, category_id: Uuid) -> ResultEngine<()> {
        if self.categories.find_by_id(category_id).await?.is_none() {
            return Err(EngineError::Validation(format!(
                "category {category_id} does not exist"
            )));
        }
        Ok(())
    }
}
