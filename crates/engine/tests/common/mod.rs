#![allow(dead_code)]

use chrono::NaiveDate;
use sea_orm::Database;
use uuid::Uuid;

use engine::{Category, Engine, Money, NewCategory, NewTransaction, TransactionKind};
use migration::MigratorTrait;

pub async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build().await.unwrap()
}

pub async fn engine_with_json() -> (Engine, std::path::PathBuf) {
    let dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../target/test_json")
        .join(Uuid::new_v4().to_string());
    let engine = Engine::builder().json_dir(&dir).build().await.unwrap();
    (engine, dir)
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub async fn expense_category(engine: &Engine, name: &str) -> Category {
    engine
        .create_category(NewCategory::new(name, TransactionKind::Expense, "#EF4444"))
        .await
        .unwrap()
}

pub async fn income_category(engine: &Engine, name: &str) -> Category {
    engine
        .create_category(NewCategory::new(name, TransactionKind::Income, "#10B981"))
        .await
        .unwrap()
}

pub fn expense(category_id: Uuid, cents: i64, description: &str, on: &str) -> NewTransaction {
    NewTransaction::new(
        TransactionKind::Expense,
        Money::new(cents),
        description,
        category_id,
        date(on),
    )
}

pub fn income(category_id: Uuid, cents: i64, description: &str, on: &str) -> NewTransaction {
    NewTransaction::new(
        TransactionKind::Income,
        Money::new(cents),
        description,
        category_id,
        date(on),
    )
}
