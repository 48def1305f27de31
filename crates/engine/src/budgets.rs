//! Budgets and their progress.
//!
//! A budget caps expenses of one category over a date range. The range is
//! usually derived from a period starting at `start_date`.

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine, Transaction, TransactionKind,
    commands::{BudgetPatch, NewBudget},
    query::{FieldKind, FieldSpec, FieldValue, Record, SortDirection},
    repository::SqlRecord,
    util::{parse_uuid, required_text},
};

pub const NAME_MAX_LEN: usize = 100;
pub const DEFAULT_ALERT_THRESHOLD: u8 = 80;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPeriod {
    Weekly,
    Monthly,
    Yearly,
}

impl BudgetPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Last day of the period starting at `start`, inclusive.
    pub fn end_date(self, start: NaiveDate) -> ResultEngine<NaiveDate> {
        let next = match self {
            Self::Weekly => start.checked_add_days(Days::new(7)),
            Self::Monthly => start.checked_add_months(Months::new(1)),
            Self::Yearly => start.checked_add_months(Months::new(12)),
        };
        next.and_then(|d| d.pred_opt())
            .ok_or_else(|| EngineError::Validation(format!("start_date {start} out of range")))
    }
}

impl TryFrom<&str> for BudgetPeriod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(EngineError::Validation(format!(
                "invalid period '{other}': expected weekly, monthly or yearly"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub name: String,
    pub category_id: Uuid,
    pub amount: Money,
    pub period: BudgetPeriod,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub alert_threshold: u8,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn validate_threshold(value: u8) -> ResultEngine<u8> {
    if !(1..=100).contains(&value) {
        return Err(EngineError::Validation(
            "alert_threshold must be between 1 and 100".to_string(),
        ));
    }
    Ok(value)
}

fn validate_range(start: NaiveDate, end: NaiveDate) -> ResultEngine<()> {
    if end < start {
        return Err(EngineError::Validation(
            "end_date must not be before start_date".to_string(),
        ));
    }
    Ok(())
}

impl Budget {
    pub fn new(cmd: NewBudget, now: DateTime<Utc>) -> ResultEngine<Self> {
        let end_date = match cmd.end_date {
            Some(end) => end,
            None => cmd.period.end_date(cmd.start_date)?,
        };
        validate_range(cmd.start_date, end_date)?;
        Ok(Self {
            id: Uuid::new_v4(),
            name: required_text(&cmd.name, "name", NAME_MAX_LEN)?,
            category_id: cmd.category_id,
            amount: cmd.amount.ensure_valid_amount("amount")?,
            period: cmd.period,
            start_date: cmd.start_date,
            end_date,
            alert_threshold: validate_threshold(
                cmd.alert_threshold.unwrap_or(DEFAULT_ALERT_THRESHOLD),
            )?,
            is_active: cmd.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply the supplied fields. A new period or start date re-derives the
    /// end date unless one is supplied too.
    pub(crate) fn apply(&mut self, patch: BudgetPatch, now: DateTime<Utc>) -> ResultEngine<()> {
        let rederive = patch.end_date.is_none()
            && (patch.period.is_some() || patch.start_date.is_some());

        if let Some(name) = patch.name {
            self.name = required_text(&name, "name", NAME_MAX_LEN)?;
        }
        if let Some(category_id) = patch.category_id {
            self.category_id = category_id;
        }
        if let Some(amount) = patch.amount {
            self.amount = amount.ensure_valid_amount("amount")?;
        }
        if let Some(period) = patch.period {
            self.period = period;
        }
        if let Some(start_date) = patch.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            self.end_date = end_date;
        }
        if rederive {
            self.end_date = self.period.end_date(self.start_date)?;
        }
        validate_range(self.start_date, self.end_date)?;
        if let Some(threshold) = patch.alert_threshold {
            self.alert_threshold = validate_threshold(threshold)?;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Whether a transaction counts against this budget.
    pub fn covers(&self, tx: &Transaction) -> bool {
        tx.kind == TransactionKind::Expense
            && tx.category_id == self.category_id
            && tx.date >= self.start_date
            && tx.date <= self.end_date
    }
}

/// Spending of a budget over its range.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BudgetProgress {
    #[serde(flatten)]
    pub budget: Budget,
    pub spent: Money,
    pub remaining: Money,
    /// Spent over amount, in percent, rounded to two decimals.
    pub utilization: f64,
    pub alert: bool,
    pub over_budget: bool,
}

impl BudgetProgress {
    /// Compute progress from any set of transactions; non-matching ones are
    /// ignored.
    pub fn compute(budget: Budget, transactions: &[Transaction]) -> Self {
        let spent: Money = transactions
            .iter()
            .filter(|tx| budget.covers(tx))
            .map(|tx| tx.amount)
            .sum();
        let amount = budget.amount.cents();
        let utilization = if amount > 0 {
            (spent.cents() as f64 / amount as f64 * 10_000.0).round() / 100.0
        } else {
            0.0
        };
        let alert = i128::from(spent.cents()) * 100
            >= i128::from(budget.alert_threshold) * i128::from(amount);
        Self {
            remaining: budget.amount - spent,
            over_budget: spent > budget.amount,
            spent,
            utilization,
            alert,
            budget,
        }
    }
}

impl Record for Budget {
    const COLLECTION: &'static str = "budgets";
    const DEFAULT_SORT: (&'static str, SortDirection) = ("start_date", SortDirection::Desc);

    fn id(&self) -> Uuid {
        self.id
    }

    fn field(name: &str) -> Option<FieldSpec> {
        let spec = match name {
            "id" => FieldSpec::new("id", FieldKind::Id),
            "name" => FieldSpec::new("name", FieldKind::Text),
            "category_id" => FieldSpec::new("category_id", FieldKind::Id),
            "amount" => FieldSpec::new("amount_minor", FieldKind::Money),
            "period" => FieldSpec::new("period", FieldKind::Text),
            "start_date" => FieldSpec::new("start_date", FieldKind::Date),
            "end_date" => FieldSpec::new("end_date", FieldKind::Date),
            "alert_threshold" => FieldSpec::new("alert_threshold", FieldKind::Integer),
            "is_active" => FieldSpec::new("is_active", FieldKind::Bool),
            "created_at" => FieldSpec::new("created_at", FieldKind::Timestamp),
            "updated_at" => FieldSpec::new("updated_at", FieldKind::Timestamp),
            _ => return None,
        };
        Some(spec)
    }

    fn value(&self, column: &str) -> Option<FieldValue> {
        let value = match column {
            "id" => FieldValue::Text(self.id.to_string()),
            "name" => FieldValue::Text(self.name.clone()),
            "category_id" => FieldValue::Text(self.category_id.to_string()),
            "amount_minor" => FieldValue::Integer(self.amount.cents()),
            "period" => FieldValue::Text(self.period.as_str().to_string()),
            "start_date" => FieldValue::Date(self.start_date),
            "end_date" => FieldValue::Date(self.end_date),
            "alert_threshold" => FieldValue::Integer(i64::from(self.alert_threshold)),
            "is_active" => FieldValue::Bool(self.is_active),
            "created_at" => FieldValue::Timestamp(self.created_at),
            "updated_at" => FieldValue::Timestamp(self.updated_at),
            _ => return None,
        };
        Some(value)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub category_id: String,
    pub amount_minor: i64,
    pub period: String,
    pub start_date: Date,
    pub end_date: Date,
    pub alert_threshold: i32,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Category,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Budget> for ActiveModel {
    fn from(budget: &Budget) -> Self {
        Self {
            id: ActiveValue::Set(budget.id.to_string()),
            name: ActiveValue::Set(budget.name.clone()),
            category_id: ActiveValue::Set(budget.category_id.to_string()),
            amount_minor: ActiveValue::Set(budget.amount.cents()),
            period: ActiveValue::Set(budget.period.as_str().to_string()),
            start_date: ActiveValue::Set(budget.start_date),
            end_date: ActiveValue::Set(budget.end_date),
            alert_threshold: ActiveValue::Set(i32::from(budget.alert_threshold)),
            is_active: ActiveValue::Set(budget.is_active),
            created_at: ActiveValue::Set(budget.created_at),
            updated_at: ActiveValue::Set(budget.updated_at),
        }
    }
}

impl TryFrom<Model> for Budget {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let alert_threshold = u8::try_from(model.alert_threshold).map_err(|_| {
            EngineError::Storage(format!(
                "invalid alert_threshold {} for budget {}",
                model.alert_threshold, model.id
            ))
        })?;
        Ok(Self {
            id: parse_uuid(&model.id, "budget")?,
            name: model.name,
            category_id: parse_uuid(&model.category_id, "category")?,
            amount: Money::new(model.amount_minor),
            period: BudgetPeriod::try_from(model.period.as_str())?,
            start_date: model.start_date,
            end_date: model.end_date,
            alert_threshold,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl SqlRecord for Budget {
    type Entity = Entity;

    fn from_model(model: Model) -> ResultEngine<Self> {
        Self::try_from(model)
    }

    fn to_active_model(&self) -> ActiveModel {
        ActiveModel::from(self)
    }
}
