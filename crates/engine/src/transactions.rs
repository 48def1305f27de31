//! Transaction primitives.
//!
//! A `Transaction` is a single income or expense booked against one
//! category on a calendar date.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine,
    commands::{NewTransaction, TransactionPatch},
    query::{FieldKind, FieldSpec, FieldValue, Record, SortDirection},
    repository::SqlRecord,
    util::{parse_uuid, required_text},
};

pub const DESCRIPTION_MAX_LEN: usize = 255;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::Validation(format!(
                "invalid type '{other}': expected income or expense"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Money,
    pub description: String,
    pub category_id: Uuid,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Validate the input and build a new transaction stamped with `now`.
    pub fn new(cmd: NewTransaction, now: DateTime<Utc>) -> ResultEngine<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            kind: cmd.kind,
            amount: cmd.amount.ensure_valid_amount("amount")?,
            description: required_text(&cmd.description, "description", DESCRIPTION_MAX_LEN)?,
            category_id: cmd.category_id,
            date: cmd.date,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply the supplied fields; untouched fields keep their value.
    pub(crate) fn apply(&mut self, patch: TransactionPatch, now: DateTime<Utc>) -> ResultEngine<()> {
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(amount) = patch.amount {
            self.amount = amount.ensure_valid_amount("amount")?;
        }
        if let Some(description) = patch.description {
            self.description = required_text(&description, "description", DESCRIPTION_MAX_LEN)?;
        }
        if let Some(category_id) = patch.category_id {
            self.category_id = category_id;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Key used to detect duplicate imports.
    pub(crate) fn duplicate_key(&self) -> (TransactionKind, Money, NaiveDate, Uuid, String) {
        (
            self.kind,
            self.amount,
            self.date,
            self.category_id,
            self.description.trim().to_lowercase(),
        )
    }
}

impl Record for Transaction {
    const COLLECTION: &'static str = "transactions";
    const DEFAULT_SORT: (&'static str, SortDirection) = ("date", SortDirection::Desc);

    fn id(&self) -> Uuid {
        self.id
    }

    fn field(name: &str) -> Option<FieldSpec> {
        let spec = match name {
            "id" => FieldSpec::new("id", FieldKind::Id),
            "type" => FieldSpec::new("kind", FieldKind::Text),
            "amount" => FieldSpec::new("amount_minor", FieldKind::Money),
            "description" => FieldSpec::new("description", FieldKind::Text),
            "category_id" => FieldSpec::new("category_id", FieldKind::Id),
            "date" => FieldSpec::new("date", FieldKind::Date),
            "created_at" => FieldSpec::new("created_at", FieldKind::Timestamp),
            "updated_at" => FieldSpec::new("updated_at", FieldKind::Timestamp),
            _ => return None,
        };
        Some(spec)
    }

    fn value(&self, column: &str) -> Option<FieldValue> {
        let value = match column {
            "id" => FieldValue::Text(self.id.to_string()),
            "kind" => FieldValue::Text(self.kind.as_str().to_string()),
            "amount_minor" => FieldValue::Integer(self.amount.cents()),
            "description" => FieldValue::Text(self.description.clone()),
            "category_id" => FieldValue::Text(self.category_id.to_string()),
            "date" => FieldValue::Date(self.date),
            "created_at" => FieldValue::Timestamp(self.created_at),
            "updated_at" => FieldValue::Timestamp(self.updated_at),
            _ => return None,
        };
        Some(value)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub description: String,
    pub category_id: String,
    pub date: Date,
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

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount.cents()),
            description: ActiveValue::Set(tx.description.clone()),
            category_id: ActiveValue::Set(tx.category_id.to_string()),
            date: ActiveValue::Set(tx.date),
            created_at: ActiveValue::Set(tx.created_at),
            updated_at: ActiveValue::Set(tx.updated_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount: Money::new(model.amount_minor),
            description: model.description,
            category_id: parse_uuid(&model.category_id, "category")?,
            date: model.date,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl SqlRecord for Transaction {
    type Entity = Entity;

    fn from_model(model: Model) -> ResultEngine<Self> {
        Self::try_from(model)
    }

    fn to_active_model(&self) -> ActiveModel {
        ActiveModel::from(self)
    }
}
