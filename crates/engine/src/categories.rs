//! Category registry.
//!
//! Categories classify transactions and budgets. Each category has a kind
//! (income or expense) and may sit under a parent of the same kind.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, TransactionKind,
    commands::{CategoryPatch, NewCategory},
    query::{FieldKind, FieldSpec, FieldValue, Record, SortDirection},
    repository::SqlRecord,
    util::{parse_uuid, required_text, validate_color},
};

pub const NAME_MAX_LEN: usize = 50;
pub const ICON_MAX_LEN: usize = 50;
pub const DEFAULT_ICON: &str = "tag";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub color: String,
    pub icon: String,
    pub parent_id: Option<Uuid>,
    pub is_active: bool,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(cmd: NewCategory, now: DateTime<Utc>) -> ResultEngine<Self> {
        let icon = match cmd.icon {
            Some(icon) => required_text(&icon, "icon", ICON_MAX_LEN)?,
            None => DEFAULT_ICON.to_string(),
        };
        Ok(Self {
            id: Uuid::new_v4(),
            name: required_text(&cmd.name, "name", NAME_MAX_LEN)?,
            kind: cmd.kind,
            color: validate_color(&cmd.color)?,
            icon,
            parent_id: cmd.parent_id,
            is_active: true,
            is_default: cmd.is_default,
            created_at: now,
            updated_at: now,
        })
    }

    pub(crate) fn apply(&mut self, patch: CategoryPatch, now: DateTime<Utc>) -> ResultEngine<()> {
        if let Some(name) = patch.name {
            self.name = required_text(&name, "name", NAME_MAX_LEN)?;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(color) = patch.color {
            self.color = validate_color(&color)?;
        }
        if let Some(icon) = patch.icon {
            self.icon = required_text(&icon, "icon", ICON_MAX_LEN)?;
        }
        if let Some(parent_id) = patch.parent_id {
            if parent_id == Some(self.id) {
                return Err(EngineError::Validation(
                    "a category cannot be its own parent".to_string(),
                ));
            }
            self.parent_id = parent_id;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        self.updated_at = now;
        Ok(())
    }
}

impl Record for Category {
    const COLLECTION: &'static str = "categories";
    const DEFAULT_SORT: (&'static str, SortDirection) = ("name", SortDirection::Asc);

    fn id(&self) -> Uuid {
        self.id
    }

    fn field(name: &str) -> Option<FieldSpec> {
        let spec = match name {
            "id" => FieldSpec::new("id", FieldKind::Id),
            "name" => FieldSpec::new("name", FieldKind::Text),
            "type" => FieldSpec::new("kind", FieldKind::Text),
            "color" => FieldSpec::new("color", FieldKind::Text),
            "icon" => FieldSpec::new("icon", FieldKind::Text),
            "parent_id" => FieldSpec::new("parent_id", FieldKind::Id),
            "is_active" => FieldSpec::new("is_active", FieldKind::Bool),
            "is_default" => FieldSpec::new("is_default", FieldKind::Bool),
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
            "kind" => FieldValue::Text(self.kind.as_str().to_string()),
            "color" => FieldValue::Text(self.color.clone()),
            "icon" => FieldValue::Text(self.icon.clone()),
            "parent_id" => FieldValue::Text(self.parent_id?.to_string()),
            "is_active" => FieldValue::Bool(self.is_active),
            "is_default" => FieldValue::Bool(self.is_default),
            "created_at" => FieldValue::Timestamp(self.created_at),
            "updated_at" => FieldValue::Timestamp(self.updated_at),
            _ => return None,
        };
        Some(value)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub kind: String,
    pub color: String,
    pub icon: String,
    pub parent_id: Option<String>,
    pub is_active: bool,
    pub is_default: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
    #[sea_orm(has_many = "super::budgets::Entity")]
    Budgets,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::budgets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budgets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Category> for ActiveModel {
    fn from(category: &Category) -> Self {
        Self {
            id: ActiveValue::Set(category.id.to_string()),
            name: ActiveValue::Set(category.name.clone()),
            kind: ActiveValue::Set(category.kind.as_str().to_string()),
            color: ActiveValue::Set(category.color.clone()),
            icon: ActiveValue::Set(category.icon.clone()),
            parent_id: ActiveValue::Set(category.parent_id.map(|id| id.to_string())),
            is_active: ActiveValue::Set(category.is_active),
            is_default: ActiveValue::Set(category.is_default),
            created_at: ActiveValue::Set(category.created_at),
            updated_at: ActiveValue::Set(category.updated_at),
        }
    }
}

impl TryFrom<Model> for Category {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "category")?,
            name: model.name,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            color: model.color,
            icon: model.icon,
            parent_id: model
                .parent_id
                .as_deref()
                .map(|id| parse_uuid(id, "parent category"))
                .transpose()?,
            is_active: model.is_active,
            is_default: model.is_default,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl SqlRecord for Category {
    type Entity = Entity;

    fn from_model(model: Model) -> ResultEngine<Self> {
        Self::try_from(model)
    }

    fn to_active_model(&self) -> ActiveModel {
        ActiveModel::from(self)
    }
}

/// A category with its children, for hierarchical views.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<CategoryNode>,
}

/// Number of records referencing a category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CategoryUsage {
    pub transactions: u64,
    pub budgets: u64,
}

impl CategoryUsage {
    pub fn in_use(&self) -> bool {
        self.transactions > 0 || self.budgets > 0
    }
}

/// Nest categories under their parents. Categories whose parent is missing
/// from `categories` become roots. Siblings keep the input order.
pub fn build_tree(categories: Vec<Category>) -> Vec<CategoryNode> {
    fn attach(parent: Option<Uuid>, pool: &[Category], depth: usize) -> Vec<CategoryNode> {
        if depth > pool.len() {
            return Vec::new();
        }
        pool.iter()
            .filter(|c| c.parent_id == parent)
            .map(|c| CategoryNode {
                category: c.clone(),
                children: attach(Some(c.id), pool, depth + 1),
            })
            .collect()
    }

    let known: std::collections::HashSet<Uuid> = categories.iter().map(|c| c.id).collect();
    let mut roots = attach(None, &categories, 0);
    for orphan in categories
        .iter()
        .filter(|c| c.parent_id.is_some_and(|p| !known.contains(&p)))
    {
        roots.push(CategoryNode {
            category: orphan.clone(),
            children: attach(Some(orphan.id), &categories, 1),
        });
    }
    roots
}

/// Categories created on an empty store.
pub(crate) fn default_categories() -> Vec<NewCategory> {
    let income = [
        ("Salary", "#10B981", "briefcase"),
        ("Freelance", "#3B82F6", "laptop"),
        ("Investments", "#8B5CF6", "trending-up"),
        ("Other Income", "#6B7280", "plus-circle"),
    ];
    let expense = [
        ("Food & Dining", "#EF4444", "utensils"),
        ("Transportation", "#F59E0B", "car"),
        ("Housing", "#6366F1", "home"),
        ("Utilities", "#14B8A6", "zap"),
        ("Entertainment", "#EC4899", "film"),
        ("Healthcare", "#22C55E", "heart"),
        ("Shopping", "#F97316", "shopping-bag"),
        ("Other Expenses", "#9CA3AF", "more-horizontal"),
    ];

    income
        .into_iter()
        .map(|entry| (TransactionKind::Income, entry))
        .chain(
            expense
                .into_iter()
                .map(|entry| (TransactionKind::Expense, entry)),
        )
        .map(|(kind, (name, color, icon))| {
            NewCategory::new(name, kind, color).icon(icon).default_category()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(name: &str, parent_id: Option<Uuid>) -> Category {
        let mut category = Category::new(
            NewCategory::new(name, TransactionKind::Expense, "#ff0000"),
            Utc::now(),
        )
        .unwrap();
        category.parent_id = parent_id;
        category
    }

    #[test]
    fn new_applies_defaults_and_validates() {
        let c = category("Food", None);
        assert_eq!(c.icon, DEFAULT_ICON);
        assert_eq!(c.color, "#FF0000");
        assert!(c.is_active);
        assert!(!c.is_default);

        let bad = Category::new(
            NewCategory::new("Food", TransactionKind::Expense, "red"),
            Utc::now(),
        );
        assert!(matches!(bad, Err(EngineError::Validation(_))));

        let long = Category::new(
            NewCategory::new("x".repeat(NAME_MAX_LEN + 1), TransactionKind::Expense, "#000000"),
            Utc::now(),
        );
        assert!(long.is_err());
    }

    #[test]
    fn apply_rejects_self_parent() {
        let mut c = category("Food", None);
        let patch = CategoryPatch {
            parent_id: Some(Some(c.id)),
            ..Default::default()
        };
        assert!(c.apply(patch, Utc::now()).is_err());
    }

    #[test]
    fn tree_nests_children_and_keeps_orphans() {
        let food = category("Food", None);
        let groceries = category("Groceries", Some(food.id));
        let snacks = category("Snacks", Some(groceries.id));
        let orphan = category("Orphan", Some(Uuid::new_v4()));

        let tree = build_tree(vec![food.clone(), groceries, snacks, orphan.clone()]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].category.id, food.id);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].children.len(), 1);
        assert_eq!(tree[1].category.id, orphan.id);
    }

    #[test]
    fn defaults_cover_both_kinds() {
        let defaults = default_categories();
        assert!(defaults.iter().all(|c| c.is_default));
        assert!(defaults.iter().any(|c| c.kind == TransactionKind::Income));
        assert!(defaults.iter().any(|c| c.kind == TransactionKind::Expense));
    }
}
