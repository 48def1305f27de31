use chrono::NaiveDate;

use crate::{
    EngineError, ResultEngine, Transaction, TransactionKind,
    analytics::{
        CategoryTotal, Dashboard, DateRange, HealthScore, MonthlyBucket, Trend, category_breakdown,
        health_score, monthly_buckets, monthly_buckets_between, summarize, trend,
    },
};

use super::{Engine, fetch_all};

pub const MAX_TREND_MONTHS: u32 = 24;
pub const DEFAULT_TREND_MONTHS: u32 = 6;

fn buckets_for(transactions: &[Transaction], range: DateRange) -> Vec<MonthlyBucket> {
    match (range.from, range.to) {
        (Some(from), Some(to)) => monthly_buckets_between(transactions, from, to),
        _ => monthly_buckets(transactions),
    }
}

impl Engine {
    pub async fn dashboard(&self, range: DateRange) -> ResultEngine<Dashboard> {
        let transactions = self.transactions_in(range).await?;
        let categories = fetch_all(self.categories.as_ref(), Vec::new()).await?;
        Ok(Dashboard {
            summary: summarize(&transactions),
            categories: category_breakdown(&transactions, &categories, TransactionKind::Expense),
            monthly: buckets_for(&transactions, range),
            budgets: self.budget_progress().await?,
        })
    }

    pub async fn category_breakdown(
        &self,
        range: DateRange,
        kind: TransactionKind,
    ) -> ResultEngine<Vec<CategoryTotal>> {
        let transactions = self.transactions_in(range).await?;
        let categories = fetch_all(self.categories.as_ref(), Vec::new()).await?;
        Ok(category_breakdown(&transactions, &categories, kind))
    }

    pub async fn monthly(&self, range: DateRange) -> ResultEngine<Vec<MonthlyBucket>> {
        let transactions = self.transactions_in(range).await?;
        Ok(buckets_for(&transactions, range))
    }

    /// Trend over the `months` calendar months ending with `today`'s month.
    pub async fn trends(&self, months: u32, today: NaiveDate) -> ResultEngine<Trend> {
        if !(1..=MAX_TREND_MONTHS).contains(&months) {
            return Err(EngineError::Validation(format!(
                "months must be between 1 and {MAX_TREND_MONTHS}"
            )));
        }
        let range = DateRange::last_months(months, today)?;
        let transactions = self.transactions_in(range).await?;
        Ok(trend(buckets_for(&transactions, range)))
    }

    pub async fn health_score(&self, range: DateRange) -> ResultEngine<HealthScore> {
        let transactions = self.transactions_in(range).await?;
        let budgets = self.budget_progress().await?;
        Ok(health_score(&buckets_for(&transactions, range), &budgets))
    }
}
