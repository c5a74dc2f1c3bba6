//! Execution ledger: appends immutable execution records and keeps the
//! owning rule's rolling counters in step with them.

use std::sync::Arc;

use serde_json::Value;
use socialhub_core::automation::{
    AutomationExecution, CounterOutcome, ExecutionStatus, ExecutionSummary,
};
use socialhub_core::error::CoreError;
use socialhub_core::paging::clamp_limit;
use socialhub_core::types::DbId;
use uuid::Uuid;

use crate::config::HISTORY_MAX_LIMIT;
use crate::error::StoreError;
use crate::store::{ExecutionStore, RuleStore};

#[derive(Clone)]
pub struct ExecutionLedger {
    rules: Arc<dyn RuleStore>,
    executions: Arc<dyn ExecutionStore>,
    history_default_limit: i64,
}

impl ExecutionLedger {
    pub fn new(
        rules: Arc<dyn RuleStore>,
        executions: Arc<dyn ExecutionStore>,
        history_default_limit: i64,
    ) -> Self {
        Self {
            rules,
            executions,
            history_default_limit,
        }
    }

    /// Persist `execution` and update the rule's counters.
    ///
    /// Never fails: when the record cannot be appended it is re-recorded as
    /// FAILED carrying the persistence error, with NUL characters removed
    /// from its JSON and text so the store can accept it. If that also fails
    /// the unpersisted FAILED record is returned. `rule_resolved` is false
    /// when the rule id did not resolve, in which case no counters are
    /// touched.
    pub async fn record(
        &self,
        execution: AutomationExecution,
        rule_resolved: bool,
    ) -> AutomationExecution {
        let recorded = match self.executions.create_execution(&execution).await {
            Ok(saved) => saved,
            Err(e) => {
                tracing::error!(
                    execution_id = %execution.id,
                    rule_id = execution.rule_id,
                    status = %execution.status,
                    error = %e,
                    "Failed to persist execution, recording as FAILED"
                );
                let failed = as_failed(execution, format!("failed to record execution: {e}"));
                self.append_or_keep(failed).await
            }
        };

        if rule_resolved {
            self.bump_counters(&recorded).await;
        }
        recorded
    }

    async fn append_or_keep(&self, failed: AutomationExecution) -> AutomationExecution {
        match self.executions.create_execution(&failed).await {
            Ok(saved) => saved,
            Err(e) => {
                tracing::error!(
                    execution_id = %failed.id,
                    rule_id = failed.rule_id,
                    error = %e,
                    "Failed to persist FAILED execution"
                );
                failed
            }
        }
    }

    async fn bump_counters(&self, execution: &AutomationExecution) {
        let outcome = match execution.status {
            ExecutionStatus::Success => CounterOutcome::Success,
            ExecutionStatus::Failed => CounterOutcome::Failure,
            ExecutionStatus::Skipped => return,
        };
        if let Err(e) = self.rules.increment_counters(execution.rule_id, outcome).await {
            tracing::error!(
                execution_id = %execution.id,
                rule_id = execution.rule_id,
                error = %e,
                "Failed to update rule counters"
            );
        }
    }

    /// A business's most recent executions, newest first. `limit` defaults
    /// to the configured page size and is clamped to `0..=500`; zero yields an
    /// empty page.
    pub async fn history(
        &self,
        business_id: DbId,
        limit: Option<i64>,
    ) -> Result<Vec<ExecutionSummary>, StoreError> {
        let limit = clamp_limit(limit, self.history_default_limit, HISTORY_MAX_LIMIT);
        self.executions.execution_history(business_id, limit).await
    }

    /// Same as [`history`](Self::history), restricted to one rule.
    pub async fn rule_history(
        &self,
        business_id: DbId,
        rule_id: DbId,
        limit: Option<i64>,
    ) -> Result<Vec<ExecutionSummary>, StoreError> {
        let limit = clamp_limit(limit, self.history_default_limit, HISTORY_MAX_LIMIT);
        self.executions
            .rule_execution_history(business_id, rule_id, limit)
            .await
    }

    /// Load one execution, failing with `NotFound` when absent.
    pub async fn find_execution(
        &self,
        business_id: DbId,
        id: Uuid,
    ) -> Result<AutomationExecution, StoreError> {
        self.executions
            .find_execution(business_id, id)
            .await?
            .ok_or_else(|| CoreError::not_found("automation execution", id).into())
    }
}

/// Turn an outcome that could not be stored into a FAILED record. The
/// execution result is kept so the per-action outcomes are not lost. An
/// outcome that was already FAILED keeps its own message first.
fn as_failed(execution: AutomationExecution, message: String) -> AutomationExecution {
    let error_message = match execution.error_message {
        Some(original) if execution.status == ExecutionStatus::Failed => {
            format!("{original}; {message}")
        }
        _ => message,
    };
    let execution_result = execution.execution_result.and_then(|result| {
        serde_json::to_value(&result)
            .map(strip_nul)
            .and_then(serde_json::from_value)
            .ok()
    });

    AutomationExecution {
        status: ExecutionStatus::Failed,
        trigger_data: strip_nul(execution.trigger_data),
        execution_result,
        error_message: Some(error_message.replace('\0', "")),
        ..execution
    }
}

/// Remove NUL characters from every string and key. Postgres text and
/// JSONB cannot hold them.
fn strip_nul(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.replace('\0', "")),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nul).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key.replace('\0', ""), strip_nul(value)))
                .collect(),
        ),
        other => other,
    }
}
