//! Repository backed by a relational database through sea-orm.
//!
//! Works against any backend sea-orm is built with (Postgres for the hosted
//! database, SQLite for local runs and tests).

use std::{marker::PhantomData, str::FromStr};

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    IntoSimpleExpr, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    sea_query::{Expr, Func, NullOrdering, SimpleExpr},
};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    query::{Condition, FieldValue, Filter, FilterOp, ListQuery, Record, SortDirection},
};

use super::{Page, Repository};

type ColumnOf<R> = <<R as SqlRecord>::Entity as EntityTrait>::Column;
type ModelOf<R> = <<R as SqlRecord>::Entity as EntityTrait>::Model;
type ActiveModelOf<R> = <<R as SqlRecord>::Entity as EntityTrait>::ActiveModel;

/// A record with a sea-orm entity behind it.
pub trait SqlRecord: Record + Sized {
    type Entity: EntityTrait;

    fn from_model(model: ModelOf<Self>) -> ResultEngine<Self>;

    fn to_active_model(&self) -> ActiveModelOf<Self>;
}

#[derive(Debug)]
pub struct SqlRepository<R> {
    db: DatabaseConnection,
    _record: PhantomData<fn() -> R>,
}

impl<R> SqlRepository<R> {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            _record: PhantomData,
        }
    }
}

fn column<R: SqlRecord>(name: &str) -> ResultEngine<ColumnOf<R>> {
    ColumnOf::<R>::from_str(name).map_err(|_| {
        EngineError::InvalidQuery(format!("unknown column '{name}' in {}", R::COLLECTION))
    })
}

fn condition_expr<R: SqlRecord>(condition: &Condition) -> ResultEngine<SimpleExpr> {
    let col = column::<R>(condition.column)?;
    let expr = match (condition.op, &condition.value) {
        (FilterOp::Eq, value) => col.eq(sea_orm::Value::from(value.clone())),
        (FilterOp::Gte, value) => col.gte(sea_orm::Value::from(value.clone())),
        (FilterOp::Lte, value) => col.lte(sea_orm::Value::from(value.clone())),
        (FilterOp::ILike, FieldValue::Text(pattern)) => {
            // SQLite's lower() folds ASCII only; the pattern is folded the same way.
            Expr::expr(Func::lower(col.into_simple_expr())).like(pattern.to_ascii_lowercase())
        }
        (FilterOp::ILike, _) => {
            return Err(EngineError::InvalidQuery(format!(
                "ilike is only supported on text columns, not '{}'",
                condition.column
            )));
        }
    };
    Ok(expr)
}

/// Nulls last when ascending and first when descending, whatever the backend
/// default is.
fn order(direction: SortDirection) -> (Order, NullOrdering) {
    match direction {
        SortDirection::Asc => (Order::Asc, NullOrdering::Last),
        SortDirection::Desc => (Order::Desc, NullOrdering::First),
    }
}

#[async_trait]
impl<R> Repository<R> for SqlRepository<R>
where
    R: SqlRecord,
    R::Entity: Send + Sync,
    ModelOf<R>: IntoActiveModel<ActiveModelOf<R>> + Send + Sync,
    ActiveModelOf<R>: ActiveModelTrait<Entity = R::Entity> + Send,
{
    async fn find_all(&self, query: &ListQuery) -> ResultEngine<Page<R>> {
        let resolved = query.resolve::<R>()?;

        let mut select = R::Entity::find();
        for condition in &resolved.conditions {
            select = select.filter(condition_expr::<R>(condition)?);
        }

        let count = select.clone().count(&self.db).await?;

        let (sort_column, direction) = resolved.sort;
        let (order, nulls) = order(direction);
        select = select
            .order_by_with_nulls(column::<R>(sort_column)?, order, nulls)
            .order_by(column::<R>("id")?, Order::Asc);
        if let Some(pagination) = resolved.pagination {
            select = select.offset(pagination.offset()).limit(pagination.limit);
        }

        let data = select
            .all(&self.db)
            .await?
            .into_iter()
            .map(R::from_model)
            .collect::<ResultEngine<Vec<_>>>()?;

        Ok(Page { data, count })
    }

    async fn find_by_id(&self, id: Uuid) -> ResultEngine<Option<R>> {
        R::Entity::find()
            .filter(column::<R>("id")?.eq(id.to_string()))
            .one(&self.db)
            .await?
            .map(R::from_model)
            .transpose()
    }

    async fn create(&self, record: R) -> ResultEngine<R> {
        R::Entity::insert(record.to_active_model())
            .exec_without_returning(&self.db)
            .await?;
        tracing::debug!("inserted {} into {}", record.id(), R::COLLECTION);
        Ok(record)
    }

    async fn update(&self, record: R) -> ResultEngine<Option<R>> {
        let result = R::Entity::update_many()
            .set(record.to_active_model())
            .filter(column::<R>("id")?.eq(record.id().to_string()))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Ok(None);
        }
        Ok(Some(record))
    }

    async fn delete(&self, id: Uuid) -> ResultEngine<bool> {
        let result = R::Entity::delete_many()
            .filter(column::<R>("id")?.eq(id.to_string()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn count(&self, filters: &[Filter]) -> ResultEngine<u64> {
        let query = ListQuery {
            filters: filters.to_vec(),
            ..Default::default()
        };
        let resolved = query.resolve::<R>()?;

        let mut select = R::Entity::find();
        for condition in &resolved.conditions {
            select = select.filter(condition_expr::<R>(condition)?);
        }
        Ok(select.count(&self.db).await?)
    }
}
