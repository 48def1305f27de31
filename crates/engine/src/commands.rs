//! Command structs for engine operations.
//!
//! `New*` types carry the fields of a create call, `*Patch` types the
//! optional fields of a partial update. A `None` patch field leaves the
//! stored value unchanged.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{BudgetPeriod, Money, TransactionKind};

/// Create a transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub amount: Money,
    pub description: String,
    pub category_id: Uuid,
    pub date: NaiveDate,
}

impl NewTransaction {
    #[must_use]
    pub fn new(
        kind: TransactionKind,
        amount: Money,
        description: impl Into<String>,
        category_id: Uuid,
        date: NaiveDate,
    ) -> Self {
        Self {
            kind,
            amount,
            description: description.into(),
            category_id,
            date,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransactionPatch {
    pub kind: Option<TransactionKind>,
    pub amount: Option<Money>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
}

/// Create a category.
#[derive(Clone, Debug, PartialEq)]
pub struct NewCategory {
    pub name: String,
    pub kind: TransactionKind,
    pub color: String,
    pub icon: Option<String>,
    pub parent_id: Option<Uuid>,
    pub is_default: bool,
}

impl NewCategory {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: TransactionKind, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            color: color.into(),
            icon: None,
            parent_id: None,
            is_default: false,
        }
    }

    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    #[must_use]
    pub fn parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    #[must_use]
    pub(crate) fn default_category(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// Partial category update. `parent_id: Some(None)` detaches from the parent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub kind: Option<TransactionKind>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub parent_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}

/// Create a budget. Without `end_date` the period end is derived.
#[derive(Clone, Debug, PartialEq)]
pub struct NewBudget {
    pub name: String,
    pub category_id: Uuid,
    pub amount: Money,
    pub period: BudgetPeriod,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub alert_threshold: Option<u8>,
    pub is_active: Option<bool>,
}

impl NewBudget {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        category_id: Uuid,
        amount: Money,
        period: BudgetPeriod,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            name: name.into(),
            category_id,
            amount,
            period,
            start_date,
            end_date: None,
            alert_threshold: None,
            is_active: None,
        }
    }

    #[must_use]
    pub fn end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    #[must_use]
    pub fn alert_threshold(mut self, threshold: u8) -> Self {
        self.alert_threshold = Some(threshold);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BudgetPatch {
    pub name: Option<String>,
    pub category_id: Option<Uuid>,
    pub amount: Option<Money>,
    pub period: Option<BudgetPeriod>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub alert_threshold: Option<u8>,
    pub is_active: Option<bool>,
}
