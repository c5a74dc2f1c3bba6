//! [`RuleStore`] and [`ExecutionStore`] on top of the `socialhub-db`
//! repositories.
//!
//! Rows carry enum columns as strings and configuration as raw JSON; they
//! are decoded into typed domain values here. A row that no longer decodes
//! surfaces as [`StoreError::Corrupt`] rather than being silently skipped.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use socialhub_core::automation::{
    ActionSpec, AutomationExecution, AutomationRule, ConditionTree, CounterOutcome,
    CreateAutomationRule, ExecutionResult, ExecutionStatus, ExecutionSummary, RuleStatus,
    TriggerConfig, TriggerType, UpdateAutomationRule,
};
use socialhub_core::error::CoreError;
use socialhub_core::types::DbId;
use socialhub_db::models::automation_execution::{
    AutomationExecutionRow, ExecutionSummaryRow, NewAutomationExecution,
};
use socialhub_db::models::automation_rule::{
    AutomationRuleContent, AutomationRuleRow, NewAutomationRule,
};
use socialhub_db::repositories::{AutomationExecutionRepo, AutomationRuleRepo};
use sqlx::PgPool;
use uuid::Uuid;

use super::{ExecutionStore, RuleStore};
use crate::error::StoreError;

const RULE_ENTITY: &str = "automation rule";

/// Postgres-backed automation store.
#[derive(Clone)]
pub struct PgAutomationStore {
    pool: PgPool,
}

impl PgAutomationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_rule(&self, id: DbId, business_id: DbId) -> Result<AutomationRule, StoreError> {
        self.get_rule(id, business_id)
            .await?
            .ok_or_else(|| CoreError::not_found(RULE_ENTITY, id).into())
    }
}

// ---------------------------------------------------------------------------
// RuleStore
// ---------------------------------------------------------------------------

#[async_trait]
impl RuleStore for PgAutomationStore {
    async fn create_rule(
        &self,
        business_id: DbId,
        input: &CreateAutomationRule,
    ) -> Result<AutomationRule, StoreError> {
        let trigger_config = input.validate()?;
        let new_rule = NewAutomationRule {
            business_id,
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            trigger_type: input.trigger_type.as_str().to_string(),
            trigger_config: trigger_config.to_value(),
            conditions: encode(&input.conditions)?,
            actions: encode(&input.actions)?,
            status: input.status_or_default().as_str().to_string(),
            priority: input.priority.unwrap_or(0),
            created_by: input.created_by,
        };

        let row = AutomationRuleRepo::create(&self.pool, &new_rule).await?;
        tracing::info!(rule_id = row.id, business_id, "Automation rule created");
        rule_from_row(row)
    }

    async fn list_rules(
        &self,
        business_id: DbId,
        status: Option<RuleStatus>,
    ) -> Result<Vec<AutomationRule>, StoreError> {
        let rows =
            AutomationRuleRepo::list(&self.pool, business_id, status.map(|s| s.as_str())).await?;
        rows.into_iter().map(rule_from_row).collect()
    }

    async fn get_rule(
        &self,
        id: DbId,
        business_id: DbId,
    ) -> Result<Option<AutomationRule>, StoreError> {
        AutomationRuleRepo::find_by_id(&self.pool, id, business_id)
            .await?
            .map(rule_from_row)
            .transpose()
    }

    async fn update_rule(
        &self,
        id: DbId,
        business_id: DbId,
        patch: &UpdateAutomationRule,
    ) -> Result<AutomationRule, StoreError> {
        let current = self.load_rule(id, business_id).await?;
        let next = patch.apply_to(&current)?;
        let content = AutomationRuleContent {
            name: next.name.trim().to_string(),
            description: next.description.clone(),
            trigger_type: next.trigger_type.as_str().to_string(),
            trigger_config: next.trigger_config.to_value(),
            conditions: encode(&next.conditions)?,
            actions: encode(&next.actions)?,
            priority: next.priority,
        };

        let row = AutomationRuleRepo::update_content(&self.pool, id, business_id, &content)
            .await?
            .ok_or_else(|| CoreError::not_found(RULE_ENTITY, id))?;
        rule_from_row(row)
    }

    async fn delete_rule(&self, id: DbId, business_id: DbId) -> Result<(), StoreError> {
        if !AutomationRuleRepo::delete(&self.pool, id, business_id).await? {
            return Err(CoreError::not_found(RULE_ENTITY, id).into());
        }
        tracing::info!(rule_id = id, business_id, "Automation rule deleted");
        Ok(())
    }

    async fn update_rule_status(
        &self,
        id: DbId,
        business_id: DbId,
        status: RuleStatus,
    ) -> Result<AutomationRule, StoreError> {
        let current = self.load_rule(id, business_id).await?;
        let next = current.status.transition_to(status)?;
        if next == current.status {
            return Ok(current);
        }

        let row = AutomationRuleRepo::update_status(&self.pool, id, business_id, next.as_str())
            .await?
            .ok_or_else(|| CoreError::not_found(RULE_ENTITY, id))?;
        tracing::info!(
            rule_id = id,
            business_id,
            from = %current.status,
            to = %next,
            "Automation rule status changed"
        );
        rule_from_row(row)
    }

    async fn increment_counters(
        &self,
        id: DbId,
        outcome: CounterOutcome,
    ) -> Result<(), StoreError> {
        let updated = match outcome {
            CounterOutcome::Success => AutomationRuleRepo::record_success(&self.pool, id).await?,
            CounterOutcome::Failure => AutomationRuleRepo::record_failure(&self.pool, id).await?,
        };
        if !updated {
            return Err(CoreError::not_found(RULE_ENTITY, id).into());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ExecutionStore
// ---------------------------------------------------------------------------

#[async_trait]
impl ExecutionStore for PgAutomationStore {
    async fn create_execution(
        &self,
        record: &AutomationExecution,
    ) -> Result<AutomationExecution, StoreError> {
        let input = NewAutomationExecution {
            id: record.id,
            rule_id: record.rule_id,
            business_id: record.business_id,
            status: record.status.as_str().to_string(),
            triggered_at: record.triggered_at,
            completed_at: record.completed_at,
            trigger_data: record.trigger_data.clone(),
            execution_result: record.execution_result.as_ref().map(encode).transpose()?,
            error_message: record.error_message.clone(),
            execution_duration_ms: record.execution_duration_ms,
        };
        let row = AutomationExecutionRepo::create(&self.pool, &input).await?;
        execution_from_row(row)
    }

    async fn execution_history(
        &self,
        business_id: DbId,
        limit: i64,
    ) -> Result<Vec<ExecutionSummary>, StoreError> {
        AutomationExecutionRepo::history(&self.pool, business_id, limit)
            .await?
            .into_iter()
            .map(summary_from_row)
            .collect()
    }

    async fn rule_execution_history(
        &self,
        business_id: DbId,
        rule_id: DbId,
        limit: i64,
    ) -> Result<Vec<ExecutionSummary>, StoreError> {
        AutomationExecutionRepo::history_for_rule(&self.pool, business_id, rule_id, limit)
            .await?
            .into_iter()
            .map(summary_from_row)
            .collect()
    }

    async fn find_execution(
        &self,
        business_id: DbId,
        id: Uuid,
    ) -> Result<Option<AutomationExecution>, StoreError> {
        AutomationExecutionRepo::find_by_id(&self.pool, business_id, id)
            .await?
            .map(execution_from_row)
            .transpose()
    }
}

// ---------------------------------------------------------------------------
// Row conversion
// ---------------------------------------------------------------------------

fn encode<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn decode<T: DeserializeOwned>(
    what: &str,
    id: impl std::fmt::Display,
    value: serde_json::Value,
) -> Result<T, StoreError> {
    serde_json::from_value(value)
        .map_err(|e| StoreError::Corrupt(format!("{what} of {id}: {e}")))
}

fn corrupt(what: &str, id: impl std::fmt::Display) -> impl FnOnce(CoreError) -> StoreError {
    let context = format!("{what} of {id}");
    move |e| StoreError::Corrupt(format!("{context}: {e}"))
}

fn rule_from_row(row: AutomationRuleRow) -> Result<AutomationRule, StoreError> {
    let id = row.id;
    let trigger_type = TriggerType::from_str(&row.trigger_type)
        .map_err(corrupt("trigger_type", format!("rule {id}")))?;
    let trigger_config = TriggerConfig::parse(trigger_type, &row.trigger_config)
        .map_err(corrupt("trigger_config", format!("rule {id}")))?;
    let conditions: ConditionTree = decode("conditions", format!("rule {id}"), row.conditions)?;
    let actions: Vec<ActionSpec> = decode("actions", format!("rule {id}"), row.actions)?;
    let status =
        RuleStatus::from_str(&row.status).map_err(corrupt("status", format!("rule {id}")))?;

    Ok(AutomationRule {
        id,
        business_id: row.business_id,
        name: row.name,
        description: row.description,
        trigger_type,
        trigger_config,
        conditions,
        actions,
        status,
        priority: row.priority,
        execution_count: row.execution_count,
        success_count: row.success_count,
        failure_count: row.failure_count,
        last_executed_at: row.last_executed_at,
        created_by: row.created_by,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn execution_from_row(row: AutomationExecutionRow) -> Result<AutomationExecution, StoreError> {
    let id = row.id;
    let status = ExecutionStatus::from_str(&row.status)
        .map_err(corrupt("status", format!("execution {id}")))?;
    let execution_result: Option<ExecutionResult> = row
        .execution_result
        .map(|v| decode("execution_result", format!("execution {id}"), v))
        .transpose()?;

    Ok(AutomationExecution {
        id,
        rule_id: row.rule_id,
        business_id: row.business_id,
        status,
        triggered_at: row.triggered_at,
        completed_at: row.completed_at,
        trigger_data: row.trigger_data,
        execution_result,
        error_message: row.error_message,
        execution_duration_ms: row.execution_duration_ms,
    })
}

fn summary_from_row(row: ExecutionSummaryRow) -> Result<ExecutionSummary, StoreError> {
    Ok(ExecutionSummary {
        execution: execution_from_row(row.execution)?,
        rule_name: row.rule_name,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn row() -> AutomationRuleRow {
        AutomationRuleRow {
            id: 9,
            business_id: 1,
            name: "Big orders".to_string(),
            description: None,
            trigger_type: "EVENT_BASED".to_string(),
            trigger_config: json!({"event_type": "order.created"}),
            conditions: json!({"combinator": "AND", "predicates": [
                {"field": "amount", "operator": "greater_than", "value": 100}
            ]}),
            actions: json!([{"action_type": "NOTIFY", "config": {"title": "t", "message": "m"}}]),
            status: "ACTIVE".to_string(),
            priority: 2,
            execution_count: 0,
            success_count: 0,
            failure_count: 0,
            last_executed_at: None,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn rule_row_decodes_into_typed_rule() {
        let rule = rule_from_row(row()).unwrap();
        assert_eq!(rule.trigger_type, TriggerType::EventBased);
        assert_eq!(rule.status, RuleStatus::Active);
        assert_eq!(rule.conditions.predicates.len(), 1);
        assert_eq!(rule.actions.len(), 1);
    }

    #[test]
    fn rule_row_with_unknown_status_is_corrupt() {
        let mut bad = row();
        bad.status = "ARCHIVED".to_string();
        let err = rule_from_row(bad).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(ref msg) if msg.contains("rule 9")));
    }

    #[test]
    fn rule_row_with_malformed_actions_is_corrupt() {
        let mut bad = row();
        bad.actions = json!({"not": "a list"});
        assert!(matches!(rule_from_row(bad), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn execution_row_decodes_skip_reason() {
        let now = Utc::now();
        let row = AutomationExecutionRow {
            id: Uuid::now_v7(),
            rule_id: 9,
            business_id: 1,
            status: "SKIPPED".to_string(),
            triggered_at: now,
            completed_at: now,
            trigger_data: json!({"amount": 50}),
            execution_result: Some(json!({"reason": "Conditions not met"})),
            error_message: None,
            execution_duration_ms: 0,
        };
        let execution = execution_from_row(row).unwrap();
        assert_eq!(execution.status, ExecutionStatus::Skipped);
        assert_eq!(execution.skip_reason(), Some("Conditions not met"));
    }
}
