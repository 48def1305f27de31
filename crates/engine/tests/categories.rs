mod common;

use common::{engine_with_db, engine_with_json, expense, expense_category, income_category};
use engine::{
    CategoryPatch, Engine, EngineError, ListQuery, Money, NewBudget, NewCategory, BudgetPeriod,
    TransactionKind,
};

async fn delete_blocked_while_referenced(engine: &Engine) {
    let food = expense_category(engine, "Food").await;
    let tx = engine
        .create_transaction(expense(food.id, 100, "Lunch", "2024-01-01"))
        .await
        .unwrap();

    let err = engine.delete_category(food.id).await.unwrap_err();
    assert!(matches!(err, EngineError::CategoryInUse(_)));

    let usage = engine.category_usage(food.id).await.unwrap();
    assert_eq!(usage.transactions, 1);
    assert_eq!(usage.budgets, 0);

    engine.delete_transaction(tx.id).await.unwrap();
    engine.delete_category(food.id).await.unwrap();
    assert!(matches!(
        engine.category(food.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn delete_blocked_while_referenced_db() {
    delete_blocked_while_referenced(&engine_with_db().await).await;
}

#[tokio::test]
async fn delete_blocked_while_referenced_json() {
    delete_blocked_while_referenced(&engine_with_json().await.0).await;
}

#[tokio::test]
async fn budgets_also_block_deletion() {
    let engine = engine_with_db().await;
    let food = expense_category(&engine, "Food").await;
    engine
        .create_budget(NewBudget::new(
            "Food",
            food.id,
            Money::new(10_000),
            BudgetPeriod::Monthly,
            common::date("2024-01-01"),
        ))
        .await
        .unwrap();

    let err = engine.delete_category(food.id).await.unwrap_err();
    assert!(matches!(err, EngineError::CategoryInUse(_)));
}

#[tokio::test]
async fn default_categories_are_seeded_once_and_kept() {
    let engine = engine_with_db().await;
    let created = engine.seed_default_categories().await.unwrap();
    assert!(created > 0);
    assert_eq!(engine.seed_default_categories().await.unwrap(), 0);

    let page = engine
        .list_categories(&ListQuery::from_params([("is_default", "true")]).unwrap())
        .await
        .unwrap();
    assert_eq!(page.count as usize, created);

    let err = engine
        .delete_category(page.data[0].id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn duplicate_names_conflict_per_type() {
    let engine = engine_with_db().await;
    expense_category(&engine, "Café").await;

    let err = engine
        .create_category(NewCategory::new("cafe", TransactionKind::Expense, "#000000"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    income_category(&engine, "Cafe").await;
}

async fn hierarchy_rules(engine: &Engine) {
    let food = expense_category(engine, "Food").await;
    let salary = income_category(engine, "Salary").await;
    let groceries = engine
        .create_category(
            NewCategory::new("Groceries", TransactionKind::Expense, "#00FF00").parent(food.id),
        )
        .await
        .unwrap();
    assert_eq!(groceries.parent_id, Some(food.id));

    let err = engine
        .create_category(
            NewCategory::new("Bonus", TransactionKind::Expense, "#00FF00").parent(salary.id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .update_category(
            food.id,
            CategoryPatch {
                parent_id: Some(Some(groceries.id)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let tree = engine.category_tree().await.unwrap();
    let food_node = tree
        .iter()
        .find(|node| node.category.id == food.id)
        .unwrap();
    assert_eq!(food_node.children.len(), 1);
    assert_eq!(food_node.children[0].category.id, groceries.id);

    let err = engine.delete_category(food.id).await.unwrap_err();
    assert!(matches!(err, EngineError::CategoryInUse(_)));

    let detached = engine
        .update_category(
            groceries.id,
            CategoryPatch {
                parent_id: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(detached.parent_id, None);
}

#[tokio::test]
async fn hierarchy_rules_db() {
    hierarchy_rules(&engine_with_db().await).await;
}

#[tokio::test]
async fn hierarchy_rules_json() {
    hierarchy_rules(&engine_with_json().await.0).await;
}

async fn sort_and_match_agree_across_stores(engine: &Engine) {
    let food = expense_category(engine, "Food").await;
    engine
        .create_category(
            NewCategory::new("Groceries", TransactionKind::Expense, "#00FF00").parent(food.id),
        )
        .await
        .unwrap();
    expense_category(engine, "Café").await;

    let names = |page: engine::Page<engine::Category>| -> Vec<String> {
        page.data.into_iter().map(|category| category.name).collect()
    };

    let asc = ListQuery::from_params([("sort", "parent_id"), ("order", "asc")]).unwrap();
    let listed = names(engine.list_categories(&asc).await.unwrap());
    assert_eq!(listed[0], "Groceries");

    let desc = ListQuery::from_params([("sort", "parent_id"), ("order", "desc")]).unwrap();
    let listed = names(engine.list_categories(&desc).await.unwrap());
    assert_eq!(listed[2], "Groceries");

    let ascii = ListQuery::from_params([("ilike_name", "CAF")]).unwrap();
    assert_eq!(names(engine.list_categories(&ascii).await.unwrap()), vec!["Café"]);

    let accented = ListQuery::from_params([("ilike_name", "CAFÉ")]).unwrap();
    assert!(engine.list_categories(&accented).await.unwrap().data.is_empty());
}

#[tokio::test]
async fn sort_and_match_agree_across_stores_db() {
    sort_and_match_agree_across_stores(&engine_with_db().await).await;
}

#[tokio::test]
async fn sort_and_match_agree_across_stores_json() {
    sort_and_match_agree_across_stores(&engine_with_json().await.0).await;
}

#[tokio::test]
async fn type_change_blocked_while_used() {
    let engine = engine_with_db().await;
    let food = expense_category(&engine, "Food").await;
    engine
        .create_transaction(expense(food.id, 100, "Lunch", "2024-01-01"))
        .await
        .unwrap();

    let err = engine
        .update_category(
            food.id,
            CategoryPatch {
                kind: Some(TransactionKind::Income),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::CategoryInUse(_)));

    let renamed = engine
        .update_category(
            food.id,
            CategoryPatch {
                name: Some("Eating".to_string()),
                color: Some("#abcdef".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Eating");
    assert_eq!(renamed.color, "#ABCDEF");
    assert_eq!(renamed.kind, TransactionKind::Expense);
}

#[tokio::test]
async fn deactivate_keeps_category() {
    let engine = engine_with_db().await;
    let food = expense_category(&engine, "Food").await;
    let deactivated = engine.deactivate_category(food.id).await.unwrap();
    assert!(!deactivated.is_active);

    let active = engine
        .list_categories(&ListQuery::from_params([("is_active", "true")]).unwrap())
        .await
        .unwrap();
    assert_eq!(active.count, 0);
}
