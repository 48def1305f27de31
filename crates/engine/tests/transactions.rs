mod common;

use common::{
    date, engine_with_db, engine_with_json, expense, expense_category, income, income_category,
};
use engine::{
    BULK_LIMIT, DateRange, Engine, EngineError, ListQuery, Money, TransactionKind,
    TransactionPatch,
};
use uuid::Uuid;

async fn create_echoes_fields(engine: &Engine) {
    let food = expense_category(engine, "Groceries").await;
    let tx = engine
        .create_transaction(expense(food.id, 4500, "Groceries", "2024-01-15"))
        .await
        .unwrap();

    assert_eq!(tx.kind, TransactionKind::Expense);
    assert_eq!(tx.amount, Money::new(4500));
    assert_eq!(tx.description, "Groceries");
    assert_eq!(tx.category_id, food.id);
    assert_eq!(tx.date, date("2024-01-15"));

    let stored = engine.transaction(tx.id).await.unwrap();
    assert_eq!(stored.id, tx.id);
    assert_eq!(stored.amount, tx.amount);
    assert_eq!(stored.date, tx.date);
    assert_eq!(stored.category_id, food.id);
}

#[tokio::test]
async fn create_echoes_fields_db() {
    create_echoes_fields(&engine_with_db().await).await;
}

#[tokio::test]
async fn create_echoes_fields_json() {
    create_echoes_fields(&engine_with_json().await.0).await;
}

async fn filters_sort_and_paginate(engine: &Engine) {
    let food = expense_category(engine, "Food").await;
    for (cents, on) in [
        (1_000, "2023-12-31"),
        (3_000, "2024-01-05"),
        (2_000, "2024-01-20"),
        (5_000, "2024-01-31"),
        (9_000, "2024-02-01"),
    ] {
        engine
            .create_transaction(expense(food.id, cents, "Weekly groceries", on))
            .await
            .unwrap();
    }

    let query = ListQuery::from_params([
        ("gte_date", "2024-01-01"),
        ("lte_date", "2024-01-31"),
        ("sort", "amount"),
        ("order", "desc"),
    ])
    .unwrap();
    let page = engine.list_transactions(&query).await.unwrap();
    assert_eq!(page.count, 3);
    let amounts: Vec<i64> = page.data.iter().map(|tx| tx.amount.cents()).collect();
    assert_eq!(amounts, vec![5_000, 3_000, 2_000]);

    let query = ListQuery::from_params([
        ("sort", "amount"),
        ("order", "asc"),
        ("page", "2"),
        ("limit", "2"),
    ])
    .unwrap();
    let page = engine.list_transactions(&query).await.unwrap();
    assert_eq!(page.count, 5);
    let amounts: Vec<i64> = page.data.iter().map(|tx| tx.amount.cents()).collect();
    assert_eq!(amounts, vec![3_000, 5_000]);

    let query = ListQuery::from_params([("ilike_description", "GROC"), ("gte_amount", "50")])
        .unwrap();
    let page = engine.list_transactions(&query).await.unwrap();
    assert_eq!(page.count, 2);

    let default_order = engine.list_transactions(&ListQuery::new()).await.unwrap();
    assert_eq!(default_order.data[0].date, date("2024-02-01"));
}

#[tokio::test]
async fn filters_sort_and_paginate_db() {
    filters_sort_and_paginate(&engine_with_db().await).await;
}

#[tokio::test]
async fn filters_sort_and_paginate_json() {
    filters_sort_and_paginate(&engine_with_json().await.0).await;
}

#[tokio::test]
async fn unknown_filter_field_is_rejected() {
    let engine = engine_with_db().await;
    let query = ListQuery::from_params([("colour", "red")]).unwrap();
    let err = engine.list_transactions(&query).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidQuery(_)));
}

#[tokio::test]
async fn category_must_exist_be_active_and_match_type() {
    let engine = engine_with_db().await;
    let salary = income_category(&engine, "Salary").await;
    let food = expense_category(&engine, "Food").await;

    let err = engine
        .create_transaction(expense(Uuid::new_v4(), 100, "x", "2024-01-01"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .create_transaction(expense(salary.id, 100, "x", "2024-01-01"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    engine.deactivate_category(food.id).await.unwrap();
    let err = engine
        .create_transaction(expense(food.id, 100, "x", "2024-01-01"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    engine
        .create_transaction(income(salary.id, 100, "Pay", "2024-01-01"))
        .await
        .unwrap();
}

#[tokio::test]
async fn invalid_amounts_are_not_persisted() {
    let engine = engine_with_db().await;
    let food = expense_category(&engine, "Food").await;

    for cents in [0, -100, Money::MAX.cents() + 1] {
        let err = engine
            .create_transaction(expense(food.id, cents, "x", "2024-01-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }
    let page = engine.list_transactions(&ListQuery::new()).await.unwrap();
    assert_eq!(page.count, 0);
}

async fn update_and_delete(engine: &Engine) {
    let food = expense_category(engine, "Food").await;
    let rent = expense_category(engine, "Rent").await;
    let tx = engine
        .create_transaction(expense(food.id, 4500, "Groceries", "2024-01-15"))
        .await
        .unwrap();

    let updated = engine
        .update_transaction(
            tx.id,
            TransactionPatch {
                amount: Some(Money::new(5000)),
                category_id: Some(rent.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.amount, Money::new(5000));
    assert_eq!(updated.category_id, rent.id);
    assert_eq!(updated.description, "Groceries");
    assert!(updated.updated_at >= tx.updated_at);

    let err = engine
        .update_transaction(
            tx.id,
            TransactionPatch {
                kind: Some(TransactionKind::Income),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    engine.delete_transaction(tx.id).await.unwrap();
    assert!(matches!(
        engine.transaction(tx.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert!(matches!(
        engine.delete_transaction(tx.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn update_and_delete_db() {
    update_and_delete(&engine_with_db().await).await;
}

#[tokio::test]
async fn update_and_delete_json() {
    update_and_delete(&engine_with_json().await.0).await;
}

#[tokio::test]
async fn bulk_create_reports_each_item() {
    let engine = engine_with_db().await;
    let food = expense_category(&engine, "Food").await;

    let items = vec![
        expense(food.id, 100, "ok 1", "2024-01-01"),
        expense(food.id, 0, "bad amount", "2024-01-01"),
        expense(food.id, 200, "ok 2", "2024-01-02"),
        expense(Uuid::new_v4(), 300, "missing category", "2024-01-03"),
    ];
    let result = engine.bulk_create_transactions(items).await.unwrap();
    assert_eq!(result.created.len() + result.errors.len(), 4);
    assert_eq!(result.created.len(), 2);
    let failed: Vec<usize> = result.errors.iter().map(|e| e.index).collect();
    assert_eq!(failed, vec![1, 3]);
}

#[tokio::test]
async fn bulk_limits_batch_size() {
    let engine = engine_with_db().await;
    let food = expense_category(&engine, "Food").await;

    assert!(matches!(
        engine.bulk_create_transactions(Vec::new()).await,
        Err(EngineError::Validation(_))
    ));
    let too_many = (0..=BULK_LIMIT)
        .map(|_| expense(food.id, 100, "x", "2024-01-01"))
        .collect();
    assert!(matches!(
        engine.bulk_create_transactions(too_many).await,
        Err(EngineError::Validation(_))
    ));
}

#[tokio::test]
async fn bulk_delete_reports_missing_ids() {
    let engine = engine_with_db().await;
    let food = expense_category(&engine, "Food").await;
    let tx = engine
        .create_transaction(expense(food.id, 100, "x", "2024-01-01"))
        .await
        .unwrap();
    let missing = Uuid::new_v4();

    let result = engine
        .bulk_delete_transactions(vec![tx.id, missing])
        .await
        .unwrap();
    assert_eq!(result.deleted, vec![tx.id]);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].id, Some(missing));
    assert!(matches!(result.errors[0].error, EngineError::KeyNotFound(_)));
}

async fn import_skips_duplicates(engine: &Engine) {
    let food = expense_category(engine, "Food").await;
    engine
        .create_transaction(expense(food.id, 4500, "Groceries", "2024-01-15"))
        .await
        .unwrap();

    let result = engine
        .import_transactions(vec![
            expense(food.id, 4500, "  groceries ", "2024-01-15"),
            expense(food.id, 1200, "Coffee", "2024-01-16"),
            expense(food.id, 1200, "COFFEE", "2024-01-16"),
            expense(food.id, 1200, "Coffee", "2024-01-17"),
            expense(food.id, 0, "Broken", "2024-01-17"),
        ])
        .await
        .unwrap();
    assert_eq!(result.imported.len(), 2);
    assert_eq!(result.duplicates, vec![0, 2]);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].index, 4);

    let page = engine.list_transactions(&ListQuery::new()).await.unwrap();
    assert_eq!(page.count, 3);
}

#[tokio::test]
async fn import_skips_duplicates_db() {
    import_skips_duplicates(&engine_with_db().await).await;
}

#[tokio::test]
async fn import_skips_duplicates_json() {
    import_skips_duplicates(&engine_with_json().await.0).await;
}

#[tokio::test]
async fn summary_covers_date_range() {
    let engine = engine_with_db().await;
    let food = expense_category(&engine, "Food").await;
    let salary = income_category(&engine, "Salary").await;
    engine
        .create_transaction(income(salary.id, 300_000, "Pay", "2024-01-01"))
        .await
        .unwrap();
    engine
        .create_transaction(expense(food.id, 75_000, "Food", "2024-01-10"))
        .await
        .unwrap();
    engine
        .create_transaction(expense(food.id, 99_000, "Outside", "2024-02-10"))
        .await
        .unwrap();

    let range = DateRange::new(Some(date("2024-01-01")), Some(date("2024-01-31"))).unwrap();
    let summary = engine.transaction_summary(range).await.unwrap();
    assert_eq!(summary.total_income, Money::new(300_000));
    assert_eq!(summary.total_expense, Money::new(75_000));
    assert_eq!(summary.net, Money::new(225_000));
    assert_eq!(summary.savings_rate, 75.0);
    assert_eq!(summary.count, 2);
}
