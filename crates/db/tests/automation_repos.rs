//! Repository-level tests for automation rules and executions.
//!
//! Each test gets a fresh database with the workspace migrations applied.

use chrono::{Duration, Utc};
use serde_json::json;
use socialhub_db::models::automation_execution::NewAutomationExecution;
use socialhub_db::models::automation_rule::{AutomationRuleContent, NewAutomationRule};
use socialhub_db::repositories::{AutomationExecutionRepo, AutomationRuleRepo};
use sqlx::PgPool;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_rule(business_id: i64, name: &str, priority: i32) -> NewAutomationRule {
    NewAutomationRule {
        business_id,
        name: name.to_string(),
        description: None,
        trigger_type: "EVENT_BASED".to_string(),
        trigger_config: json!({"event_type": "order.created"}),
        conditions: json!({"combinator": "AND", "predicates": []}),
        actions: json!([]),
        status: "ACTIVE".to_string(),
        priority,
        created_by: None,
    }
}

fn new_execution(
    rule_id: i64,
    business_id: i64,
    triggered_at: chrono::DateTime<Utc>,
) -> NewAutomationExecution {
    NewAutomationExecution {
        id: Uuid::now_v7(),
        rule_id,
        business_id,
        status: "SUCCESS".to_string(),
        triggered_at,
        completed_at: triggered_at + Duration::milliseconds(5),
        trigger_data: json!({"amount": 150}),
        execution_result: Some(json!({"actions": []})),
        error_message: None,
        execution_duration_ms: 5,
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_bootstrap(pool: PgPool) {
    socialhub_db::health_check(&pool).await.unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_and_find_is_tenant_scoped(pool: PgPool) {
    let rule = AutomationRuleRepo::create(&pool, &new_rule(1, "Big orders", 0))
        .await
        .unwrap();
    assert_eq!(rule.execution_count, 0);
    assert_eq!(rule.status, "ACTIVE");

    let found = AutomationRuleRepo::find_by_id(&pool, rule.id, 1).await.unwrap();
    assert!(found.is_some());

    let other_tenant = AutomationRuleRepo::find_by_id(&pool, rule.id, 2).await.unwrap();
    assert!(other_tenant.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_orders_by_priority_then_age(pool: PgPool) {
    let low = AutomationRuleRepo::create(&pool, &new_rule(1, "low", 0)).await.unwrap();
    let high = AutomationRuleRepo::create(&pool, &new_rule(1, "high", 10)).await.unwrap();
    let low_later = AutomationRuleRepo::create(&pool, &new_rule(1, "low later", 0))
        .await
        .unwrap();
    AutomationRuleRepo::create(&pool, &new_rule(2, "other tenant", 99))
        .await
        .unwrap();

    let rules = AutomationRuleRepo::list(&pool, 1, None).await.unwrap();
    let ids: Vec<i64> = rules.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![high.id, low.id, low_later.id]);

    AutomationRuleRepo::update_status(&pool, low.id, 1, "PAUSED")
        .await
        .unwrap();
    let active = AutomationRuleRepo::list(&pool, 1, Some("ACTIVE")).await.unwrap();
    assert_eq!(active.len(), 2);
    assert!(active.iter().all(|r| r.status == "ACTIVE"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_content_leaves_counters(pool: PgPool) {
    let rule = AutomationRuleRepo::create(&pool, &new_rule(1, "before", 0))
        .await
        .unwrap();
    AutomationRuleRepo::record_success(&pool, rule.id).await.unwrap();

    let content = AutomationRuleContent {
        name: "after".to_string(),
        description: Some("renamed".to_string()),
        trigger_type: rule.trigger_type.clone(),
        trigger_config: rule.trigger_config.clone(),
        conditions: rule.conditions.clone(),
        actions: rule.actions.clone(),
        priority: 3,
    };
    let updated = AutomationRuleRepo::update_content(&pool, rule.id, 1, &content)
        .await
        .unwrap()
        .expect("rule should exist");
    assert_eq!(updated.name, "after");
    assert_eq!(updated.priority, 3);
    assert_eq!(updated.success_count, 1);

    let missing = AutomationRuleRepo::update_content(&pool, rule.id, 2, &content)
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_counters_increment_atomically(pool: PgPool) {
    let rule = AutomationRuleRepo::create(&pool, &new_rule(1, "counted", 0))
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for i in 0..20 {
        let pool = pool.clone();
        let id = rule.id;
        tasks.push(tokio::spawn(async move {
            if i % 4 == 0 {
                AutomationRuleRepo::record_failure(&pool, id).await
            } else {
                AutomationRuleRepo::record_success(&pool, id).await
            }
        }));
    }
    for task in tasks {
        assert!(task.await.unwrap().unwrap());
    }

    let row = AutomationRuleRepo::find_by_id(&pool, rule.id, 1)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.execution_count, 20);
    assert_eq!(row.success_count, 15);
    assert_eq!(row.failure_count, 5);
    assert!(row.last_executed_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_cascades_history(pool: PgPool) {
    let rule = AutomationRuleRepo::create(&pool, &new_rule(1, "doomed", 0))
        .await
        .unwrap();
    AutomationExecutionRepo::create(&pool, &new_execution(rule.id, 1, Utc::now()))
        .await
        .unwrap();

    assert!(!AutomationRuleRepo::delete(&pool, rule.id, 2).await.unwrap());
    assert!(AutomationRuleRepo::delete(&pool, rule.id, 1).await.unwrap());

    let history = AutomationExecutionRepo::history(&pool, 1, 100).await.unwrap();
    assert!(history.is_empty());
}

// ---------------------------------------------------------------------------
// Executions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_history_newest_first_with_limit(pool: PgPool) {
    let rule = AutomationRuleRepo::create(&pool, &new_rule(1, "Big orders", 0))
        .await
        .unwrap();
    let t1 = Utc::now() - Duration::minutes(3);
    let t2 = t1 + Duration::minutes(1);
    let t3 = t2 + Duration::minutes(1);
    for t in [t2, t1, t3] {
        AutomationExecutionRepo::create(&pool, &new_execution(rule.id, 1, t))
            .await
            .unwrap();
    }

    let history = AutomationExecutionRepo::history(&pool, 1, 2).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].execution.triggered_at.timestamp_micros(), t3.timestamp_micros());
    assert_eq!(history[1].execution.triggered_at.timestamp_micros(), t2.timestamp_micros());
    assert_eq!(history[0].rule_name, "Big orders");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_history_keeps_unresolved_rules(pool: PgPool) {
    let mut record = new_execution(4242, 1, Utc::now());
    record.status = "FAILED".to_string();
    record.execution_result = None;
    record.error_message = Some("rule not found".to_string());
    AutomationExecutionRepo::create(&pool, &record).await.unwrap();

    let history = AutomationExecutionRepo::history(&pool, 1, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].rule_name, "");
    assert_eq!(history[0].execution.error_message.as_deref(), Some("rule not found"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_history_for_rule_filters(pool: PgPool) {
    let a = AutomationRuleRepo::create(&pool, &new_rule(1, "a", 0)).await.unwrap();
    let b = AutomationRuleRepo::create(&pool, &new_rule(1, "b", 0)).await.unwrap();
    AutomationExecutionRepo::create(&pool, &new_execution(a.id, 1, Utc::now()))
        .await
        .unwrap();
    AutomationExecutionRepo::create(&pool, &new_execution(b.id, 1, Utc::now()))
        .await
        .unwrap();

    let history = AutomationExecutionRepo::history_for_rule(&pool, 1, a.id, 10)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].execution.rule_id, a.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_executions_are_immutable(pool: PgPool) {
    let created = AutomationExecutionRepo::create(&pool, &new_execution(1, 1, Utc::now()))
        .await
        .unwrap();

    let result = sqlx::query("UPDATE automation_executions SET completed_at = now() WHERE id = $1")
        .bind(created.id)
        .execute(&pool)
        .await;
    assert!(result.is_err(), "updates must be rejected");

    let reread = AutomationExecutionRepo::find_by_id(&pool, 1, created.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reread.completed_at, created.completed_at);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_error_message_only_on_failed(pool: PgPool) {
    let mut record = new_execution(1, 1, Utc::now());
    record.error_message = Some("should not be here".to_string());
    let result = AutomationExecutionRepo::create(&pool, &record).await;
    assert!(result.is_err());
}
