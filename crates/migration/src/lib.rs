pub use sea_orm_migration::prelude::*;

mod m20260301_000001_categories;
mod m20260301_000002_transactions;
mod m20260301_000003_budgets;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_categories::Migration),
            Box::new(m20260301_000002_transactions::Migration),
            Box::new(m20260301_000003_budgets::Migration),
        ]
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{ConnectionTrait, Database, Statement};

    use super::*;

    #[tokio::test]
    async fn up_creates_tables_and_down_removes_them() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let manager = SchemaManager::new(&db);
        for table in ["categories", "transactions", "budgets"] {
            assert!(manager.has_table(table).await.unwrap(), "{table} missing");
        }

        let backend = db.get_database_backend();
        db.execute(Statement::from_string(
            backend,
            "INSERT INTO categories (id, name, kind, color, created_at, updated_at) \
             VALUES ('c1', 'Food', 'expense', '#FF0000', '2024-01-01', '2024-01-01')",
        ))
        .await
        .unwrap();
        let row = db
            .query_one(Statement::from_string(
                backend,
                "SELECT icon, is_active, is_default FROM categories WHERE id = 'c1'",
            ))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.try_get::<String>("", "icon").unwrap(), "tag");
        assert!(row.try_get::<bool>("", "is_active").unwrap());
        assert!(!row.try_get::<bool>("", "is_default").unwrap());

        Migrator::down(&db, None).await.unwrap();
        assert!(!manager.has_table("budgets").await.unwrap());
    }
}
