//! Aggregations over already-fetched transactions and budgets.
//!
//! Everything here is pure: the engine loads the records, these functions
//! only fold them.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    BudgetProgress, Category, EngineError, Money, ResultEngine, Transaction, TransactionKind,
    query::Filter,
};

/// Band around the average inside which the last month counts as stable.
const TREND_BAND: f64 = 0.05;

const ADHERENCE_WEIGHT: f64 = 0.4;
const CONSISTENCY_WEIGHT: f64 = 0.3;
const STABILITY_WEIGHT: f64 = 0.3;

/// Inclusive date range; open on either side when a bound is missing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> ResultEngine<Self> {
        if let (Some(from), Some(to)) = (from, to)
            && to < from
        {
            return Err(EngineError::Validation(
                "'to' must not be before 'from'".to_string(),
            ));
        }
        Ok(Self { from, to })
    }

    /// The `months` calendar months ending with the month of `today`.
    pub fn last_months(months: u32, today: NaiveDate) -> ResultEngine<Self> {
        let first_of_month = today.with_day(1).unwrap_or(today);
        let from = first_of_month
            .checked_sub_months(Months::new(months.saturating_sub(1)))
            .ok_or_else(|| EngineError::Validation(format!("months {months} out of range")))?;
        Ok(Self {
            from: Some(from),
            to: Some(today),
        })
    }

    pub(crate) fn filters(&self) -> Vec<Filter> {
        let mut filters = Vec::new();
        if let Some(from) = self.from {
            filters.push(Filter::gte("date", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = self.to {
            filters.push(Filter::lte("date", to.format("%Y-%m-%d").to_string()));
        }
        filters
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percentage(part: Money, whole: Money) -> f64 {
    if whole.is_zero() {
        return 0.0;
    }
    round2(part.cents() as f64 / whole.cents() as f64 * 100.0)
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total_income: Money,
    pub total_expense: Money,
    pub net: Money,
    /// Net over income, in percent. Zero without income.
    pub savings_rate: f64,
    pub count: usize,
}

pub fn summarize(transactions: &[Transaction]) -> Summary {
    let mut summary = Summary::default();
    for tx in transactions {
        match tx.kind {
            TransactionKind::Income => summary.total_income += tx.amount,
            TransactionKind::Expense => summary.total_expense += tx.amount,
        }
    }
    summary.net = summary.total_income - summary.total_expense;
    summary.savings_rate = percentage(summary.net, summary.total_income);
    summary.count = transactions.len();
    summary
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category_id: Uuid,
    /// `None` when the category no longer exists.
    pub name: Option<String>,
    pub color: Option<String>,
    pub total: Money,
    /// Share of the total of the requested kind, in percent.
    pub percentage: f64,
    pub count: usize,
}

/// Per-category totals of one kind, largest first.
pub fn category_breakdown(
    transactions: &[Transaction],
    categories: &[Category],
    kind: TransactionKind,
) -> Vec<CategoryTotal> {
    let mut totals: HashMap<Uuid, (Money, usize)> = HashMap::new();
    for tx in transactions.iter().filter(|tx| tx.kind == kind) {
        let entry = totals.entry(tx.category_id).or_default();
        entry.0 += tx.amount;
        entry.1 += 1;
    }
    let grand_total: Money = totals.values().map(|(total, _)| *total).sum();
    let by_id: HashMap<Uuid, &Category> = categories.iter().map(|c| (c.id, c)).collect();

    let mut out: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category_id, (total, count))| {
            let category = by_id.get(&category_id);
            CategoryTotal {
                category_id,
                name: category.map(|c| c.name.clone()),
                color: category.map(|c| c.color.clone()),
                total,
                percentage: percentage(total, grand_total),
                count,
            }
        })
        .collect();
    out.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.category_id.cmp(&b.category_id))
    });
    out
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MonthlyBucket {
    /// `YYYY-MM`.
    pub month: String,
    pub income: Money,
    pub expense: Money,
    pub net: Money,
    pub count: usize,
}

impl MonthlyBucket {
    fn empty(year: i32, month: u32) -> Self {
        Self {
            month: format!("{year:04}-{month:02}"),
            income: Money::ZERO,
            expense: Money::ZERO,
            net: Money::ZERO,
            count: 0,
        }
    }
}

fn fold_months(
    transactions: &[Transaction],
    mut buckets: BTreeMap<(i32, u32), MonthlyBucket>,
) -> Vec<MonthlyBucket> {
    for tx in transactions {
        let (year, month) = (tx.date.year(), tx.date.month());
        let bucket = buckets
            .entry((year, month))
            .or_insert_with(|| MonthlyBucket::empty(year, month));
        match tx.kind {
            TransactionKind::Income => bucket.income += tx.amount,
            TransactionKind::Expense => bucket.expense += tx.amount,
        }
        bucket.net = bucket.income - bucket.expense;
        bucket.count += 1;
    }
    buckets.into_values().collect()
}

/// Months that have transactions, in chronological order.
pub fn monthly_buckets(transactions: &[Transaction]) -> Vec<MonthlyBucket> {
    fold_months(transactions, BTreeMap::new())
}

/// Every month from `from` to `to`, empty ones included.
pub fn monthly_buckets_between(
    transactions: &[Transaction],
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<MonthlyBucket> {
    let mut buckets = BTreeMap::new();
    let mut cursor = from.with_day(1).unwrap_or(from);
    while cursor <= to {
        let key = (cursor.year(), cursor.month());
        buckets.insert(key, MonthlyBucket::empty(key.0, key.1));
        match cursor.checked_add_months(Months::new(1)) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    let in_range: Vec<Transaction> = transactions
        .iter()
        .filter(|tx| tx.date >= from && tx.date <= to)
        .cloned()
        .collect();
    fold_months(&in_range, buckets)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Trend {
    pub months: Vec<MonthlyBucket>,
    pub average_income: Money,
    pub average_expense: Money,
    /// Average month-over-month change of expenses.
    pub average_change: Money,
    pub direction: TrendDirection,
    /// Naive next-month expense estimate, never negative.
    pub projected_expense: Money,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn cents(value: f64) -> Money {
    Money::new(value.round() as i64)
}

pub fn trend(months: Vec<MonthlyBucket>) -> Trend {
    let expenses: Vec<f64> = months.iter().map(|m| m.expense.cents() as f64).collect();
    let incomes: Vec<f64> = months.iter().map(|m| m.income.cents() as f64).collect();

    let average_expense = mean(&expenses);
    let changes: Vec<f64> = expenses.windows(2).map(|w| w[1] - w[0]).collect();
    let slope = mean(&changes);

    let direction = match expenses.last() {
        Some(last) if average_expense > 0.0 && *last > average_expense * (1.0 + TREND_BAND) => {
            TrendDirection::Increasing
        }
        Some(last) if average_expense > 0.0 && *last < average_expense * (1.0 - TREND_BAND) => {
            TrendDirection::Decreasing
        }
        _ => TrendDirection::Stable,
    };

    Trend {
        average_income: cents(mean(&incomes)),
        average_expense: cents(average_expense),
        average_change: cents(slope),
        direction,
        projected_expense: cents((average_expense + slope).max(0.0)),
        months,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HealthScore {
    pub score: f64,
    pub budget_adherence: f64,
    pub spending_consistency: f64,
    pub income_stability: f64,
}

/// `100 × (1 − coefficient of variation)`, clamped to `[0, 100]`.
fn variation_score(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 100.0;
    }
    let avg = mean(values);
    if avg <= 0.0 {
        return 100.0;
    }
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    (100.0 * (1.0 - variance.sqrt() / avg)).clamp(0.0, 100.0)
}

pub fn health_score(months: &[MonthlyBucket], budgets: &[BudgetProgress]) -> HealthScore {
    let active: Vec<&BudgetProgress> = budgets.iter().filter(|b| b.budget.is_active).collect();
    let budget_adherence = if active.is_empty() {
        100.0
    } else {
        let kept = active.iter().filter(|b| !b.over_budget).count();
        kept as f64 / active.len() as f64 * 100.0
    };

    let expenses: Vec<f64> = months.iter().map(|m| m.expense.cents() as f64).collect();
    let incomes: Vec<f64> = months.iter().map(|m| m.income.cents() as f64).collect();

    let spending_consistency = variation_score(&expenses);
    let income_stability = if incomes.iter().all(|v| *v <= 0.0) {
        0.0
    } else {
        variation_score(&incomes)
    };

    let score = ADHERENCE_WEIGHT * budget_adherence
        + CONSISTENCY_WEIGHT * spending_consistency
        + STABILITY_WEIGHT * income_stability;

    HealthScore {
        score: round2(score),
        budget_adherence: round2(budget_adherence),
        spending_consistency: round2(spending_consistency),
        income_stability: round2(income_stability),
    }
}

/// Everything the dashboard shows, in one response.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Dashboard {
    pub summary: Summary,
    pub categories: Vec<CategoryTotal>,
    pub monthly: Vec<MonthlyBucket>,
    pub budgets: Vec<BudgetProgress>,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{Budget, BudgetPeriod, NewBudget, NewCategory, NewTransaction};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn tx(kind: TransactionKind, category_id: Uuid, cents: i64, on: &str) -> Transaction {
        Transaction::new(
            NewTransaction::new(kind, Money::new(cents), "item", category_id, date(on)),
            Utc::now(),
        )
        .unwrap()
    }

    fn bucket(month: &str, income: i64, expense: i64) -> MonthlyBucket {
        MonthlyBucket {
            month: month.to_string(),
            income: Money::new(income),
            expense: Money::new(expense),
            net: Money::new(income - expense),
            count: 1,
        }
    }

    #[test]
    fn summary_totals_and_savings_rate() {
        let c = Uuid::new_v4();
        let txs = vec![
            tx(TransactionKind::Income, c, 100_000, "2024-01-01"),
            tx(TransactionKind::Expense, c, 25_000, "2024-01-02"),
            tx(TransactionKind::Expense, c, 15_000, "2024-01-03"),
        ];
        let s = summarize(&txs);
        assert_eq!(s.total_income, Money::new(100_000));
        assert_eq!(s.total_expense, Money::new(40_000));
        assert_eq!(s.net, Money::new(60_000));
        assert_eq!(s.savings_rate, 60.0);
        assert_eq!(s.count, 3);

        assert_eq!(summarize(&[]).savings_rate, 0.0);
    }

    #[test]
    fn breakdown_sorted_descending_with_percentages() {
        let food = Category::new(
            NewCategory::new("Food", TransactionKind::Expense, "#FF0000"),
            Utc::now(),
        )
        .unwrap();
        let rent = Category::new(
            NewCategory::new("Rent", TransactionKind::Expense, "#00FF00"),
            Utc::now(),
        )
        .unwrap();
        let txs = vec![
            tx(TransactionKind::Expense, food.id, 2_500, "2024-01-01"),
            tx(TransactionKind::Expense, rent.id, 7_000, "2024-01-01"),
            tx(TransactionKind::Expense, food.id, 500, "2024-01-05"),
            tx(TransactionKind::Income, food.id, 99_999, "2024-01-05"),
        ];
        let breakdown = category_breakdown(
            &txs,
            &[food.clone(), rent.clone()],
            TransactionKind::Expense,
        );
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].category_id, rent.id);
        assert_eq!(breakdown[0].percentage, 70.0);
        assert_eq!(breakdown[1].name.as_deref(), Some("Food"));
        assert_eq!(breakdown[1].total, Money::new(3_000));
        assert_eq!(breakdown[1].count, 2);
    }

    #[test]
    fn monthly_buckets_are_chronological() {
        let c = Uuid::new_v4();
        let txs = vec![
            tx(TransactionKind::Expense, c, 300, "2024-03-10"),
            tx(TransactionKind::Income, c, 1_000, "2024-01-10"),
            tx(TransactionKind::Expense, c, 200, "2024-01-20"),
        ];
        let months = monthly_buckets(&txs);
        assert_eq!(
            months.iter().map(|m| m.month.as_str()).collect::<Vec<_>>(),
            vec!["2024-01", "2024-03"]
        );
        assert_eq!(months[0].net, Money::new(800));
        assert_eq!(months[0].count, 2);

        let filled = monthly_buckets_between(&txs, date("2024-01-01"), date("2024-03-31"));
        assert_eq!(filled.len(), 3);
        assert_eq!(filled[1].month, "2024-02");
        assert_eq!(filled[1].count, 0);
    }

    #[test]
    fn last_months_starts_on_first_day() {
        let range = DateRange::last_months(3, date("2024-03-15")).unwrap();
        assert_eq!(range.from, Some(date("2024-01-01")));
        assert_eq!(range.to, Some(date("2024-03-15")));
        assert!(DateRange::new(Some(date("2024-02-01")), Some(date("2024-01-01"))).is_err());
    }

    #[test]
    fn trend_detects_increase_and_projects() {
        let t = trend(vec![
            bucket("2024-01", 0, 10_000),
            bucket("2024-02", 0, 12_000),
            bucket("2024-03", 0, 14_000),
        ]);
        assert_eq!(t.average_expense, Money::new(12_000));
        assert_eq!(t.average_change, Money::new(2_000));
        assert_eq!(t.direction, TrendDirection::Increasing);
        assert_eq!(t.projected_expense, Money::new(14_000));
    }

    #[test]
    fn trend_projection_never_negative() {
        let t = trend(vec![bucket("2024-01", 0, 10_000), bucket("2024-02", 0, 0)]);
        assert_eq!(t.direction, TrendDirection::Decreasing);
        assert_eq!(t.average_change, Money::new(-10_000));
        assert_eq!(t.projected_expense, Money::ZERO);
    }

    #[test]
    fn trend_within_band_is_stable() {
        let t = trend(vec![bucket("2024-01", 0, 10_000), bucket("2024-02", 0, 10_400)]);
        assert_eq!(t.direction, TrendDirection::Stable);
        assert_eq!(trend(Vec::new()).direction, TrendDirection::Stable);
    }

    #[test]
    fn health_score_weights_components() {
        let months = vec![bucket("2024-01", 5_000, 2_000), bucket("2024-02", 5_000, 2_000)];
        let score = health_score(&months, &[]);
        assert_eq!(score.budget_adherence, 100.0);
        assert_eq!(score.spending_consistency, 100.0);
        assert_eq!(score.income_stability, 100.0);
        assert_eq!(score.score, 100.0);
    }

    #[test]
    fn health_score_without_income_and_with_overspend() {
        let months = vec![bucket("2024-01", 0, 1_000), bucket("2024-02", 0, 3_000)];
        let budget = Budget::new(
            NewBudget::new(
                "Food",
                Uuid::new_v4(),
                Money::new(1_000),
                BudgetPeriod::Monthly,
                date("2024-01-01"),
            ),
            Utc::now(),
        )
        .unwrap();
        let over = BudgetProgress::compute(
            budget.clone(),
            &[tx(TransactionKind::Expense, budget.category_id, 2_000, "2024-01-03")],
        );
        let score = health_score(&months, &[over]);
        assert_eq!(score.budget_adherence, 0.0);
        // mean 2000, population sd 1000 -> cv 0.5
        assert_eq!(score.spending_consistency, 50.0);
        assert_eq!(score.income_stability, 0.0);
        assert_eq!(score.score, 15.0);
    }

    #[test]
    fn health_score_single_month_is_full() {
        let score = health_score(&[bucket("2024-01", 1_000, 500)], &[]);
        assert_eq!(score.spending_consistency, 100.0);
        assert_eq!(score.income_stability, 100.0);
    }
}
