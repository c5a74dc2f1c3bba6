//! The rule engine: guard → conditions → actions, one execution record per
//! invocation.
//!
//! ```text
//! PENDING ──(rule missing / store error)──────────▶ FAILED
//!    │ ──(status != ACTIVE)───────────────────────▶ SKIPPED
//!    ▼
//! EVALUATING_CONDITIONS ──(false)─────────────────▶ SKIPPED
//!    ▼
//! EXECUTING_ACTIONS ──(completed)─────────────────▶ SUCCESS
//!                   ──(overall timeout / panic)───▶ FAILED
//! ```
//!
//! A completed action phase is SUCCESS even when individual actions failed;
//! those failures live in the per-action records.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::FutureExt;
use serde_json::{json, Value};
use socialhub_core::automation::execution::{
    SKIP_REASON_CONDITIONS_NOT_MET, SKIP_REASON_INACTIVE,
};
use socialhub_core::automation::{
    evaluate, ActionRecord, AutomationExecution, ExecutionResult, ExecutionStatus,
    ExecutionSummary,
};
use socialhub_core::types::DbId;
use socialhub_events::{EventBus, PlatformEvent};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{panic_message, EngineError, StoreError};
use crate::executor::ActionExecutor;
use crate::ledger::ExecutionLedger;
use crate::registry::{ActionContext, ActionHandlerRegistry};
use crate::store::{ExecutionStore, RuleStore};

/// Event type published after every recorded execution.
pub const EXECUTION_COMPLETED_EVENT: &str = "automation.execution.completed";

/// How an invocation ended, before it becomes a record.
enum Outcome {
    Skipped(&'static str),
    Completed(Vec<ActionRecord>),
    Failed(EngineError),
}

pub struct AutomationEngine {
    rules: Arc<dyn RuleStore>,
    ledger: ExecutionLedger,
    executor: ActionExecutor,
    config: EngineConfig,
    event_bus: Option<Arc<EventBus>>,
}

impl AutomationEngine {
    /// Build an engine with [`EngineConfig::default`].
    pub fn new(
        rule_store: Arc<dyn RuleStore>,
        execution_store: Arc<dyn ExecutionStore>,
        registry: Arc<ActionHandlerRegistry>,
    ) -> Self {
        Self::with_config(rule_store, execution_store, registry, EngineConfig::default())
    }

    pub fn with_config(
        rule_store: Arc<dyn RuleStore>,
        execution_store: Arc<dyn ExecutionStore>,
        registry: Arc<ActionHandlerRegistry>,
        config: EngineConfig,
    ) -> Self {
        let ledger = ExecutionLedger::new(
            rule_store.clone(),
            execution_store,
            config.history_default_limit,
        );
        let executor = ActionExecutor::new(registry, config.action_timeout);
        Self {
            rules: rule_store,
            ledger,
            executor,
            config,
            event_bus: None,
        }
    }

    /// Publish an [`EXECUTION_COMPLETED_EVENT`] after each recorded run.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &ExecutionLedger {
        &self.ledger
    }

    /// Run one rule against `trigger_data` and record the outcome.
    ///
    /// Every outcome, including engine faults, comes back as an execution
    /// record; nothing is retried.
    pub async fn execute_rule(
        &self,
        business_id: DbId,
        rule_id: DbId,
        trigger_data: Value,
    ) -> AutomationExecution {
        let span = tracing::info_span!("execute_rule", business_id, rule_id);
        self.run(business_id, rule_id, trigger_data)
            .instrument(span)
            .await
    }

    /// Re-run the rule behind a recorded execution with its stored trigger
    /// data. Produces a new, independent execution record.
    pub async fn replay_execution(
        &self,
        business_id: DbId,
        execution_id: Uuid,
    ) -> Result<AutomationExecution, StoreError> {
        let original = self.ledger.find_execution(business_id, execution_id).await?;
        tracing::info!(
            %execution_id,
            rule_id = original.rule_id,
            "Replaying automation execution"
        );
        Ok(self
            .execute_rule(business_id, original.rule_id, original.trigger_data)
            .await)
    }

    pub async fn history(
        &self,
        business_id: DbId,
        limit: Option<i64>,
    ) -> Result<Vec<ExecutionSummary>, StoreError> {
        self.ledger.history(business_id, limit).await
    }

    pub async fn rule_history(
        &self,
        business_id: DbId,
        rule_id: DbId,
        limit: Option<i64>,
    ) -> Result<Vec<ExecutionSummary>, StoreError> {
        self.ledger.rule_history(business_id, rule_id, limit).await
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn run(
        &self,
        business_id: DbId,
        rule_id: DbId,
        trigger_data: Value,
    ) -> AutomationExecution {
        let triggered_at = Utc::now();
        let started = Instant::now();

        let outcome = self.resolve_outcome(business_id, rule_id, &trigger_data).await;
        let rule_resolved = match &outcome {
            Outcome::Failed(e) => e.counts_against_rule(),
            _ => true,
        };

        let (status, execution_result, error_message) = match outcome {
            Outcome::Skipped(reason) => {
                tracing::debug!(reason, "Automation rule skipped");
                (
                    ExecutionStatus::Skipped,
                    Some(ExecutionResult::Skipped {
                        reason: reason.to_string(),
                    }),
                    None,
                )
            }
            Outcome::Completed(actions) => (
                ExecutionStatus::Success,
                Some(ExecutionResult::Actions { actions }),
                None,
            ),
            Outcome::Failed(e) => {
                tracing::warn!(error = %e, "Automation rule failed");
                (ExecutionStatus::Failed, None, Some(e.to_string()))
            }
        };

        let execution = AutomationExecution {
            id: Uuid::now_v7(),
            rule_id,
            business_id,
            status,
            triggered_at,
            completed_at: Utc::now(),
            trigger_data,
            execution_result,
            error_message,
            execution_duration_ms: i64::try_from(started.elapsed().as_millis())
                .unwrap_or(i64::MAX),
        };

        let recorded = self.ledger.record(execution, rule_resolved).await;
        tracing::info!(
            execution_id = %recorded.id,
            status = %recorded.status,
            duration_ms = recorded.execution_duration_ms,
            had_action_failures = recorded.had_action_failures(),
            "Automation execution recorded"
        );
        self.publish_completed(&recorded);
        recorded
    }

    /// Walk the state machine up to a terminal outcome.
    async fn resolve_outcome(
        &self,
        business_id: DbId,
        rule_id: DbId,
        trigger_data: &Value,
    ) -> Outcome {
        let rule = match self.rules.get_rule(rule_id, business_id).await {
            Ok(Some(rule)) => rule,
            Ok(None) => return Outcome::Failed(EngineError::RuleNotFound),
            Err(e) => return Outcome::Failed(EngineError::Store(e)),
        };

        if !rule.is_active() {
            return Outcome::Skipped(SKIP_REASON_INACTIVE);
        }

        let matched =
            std::panic::catch_unwind(AssertUnwindSafe(|| evaluate(&rule.conditions, trigger_data)));
        match matched {
            Ok(true) => {}
            Ok(false) => return Outcome::Skipped(SKIP_REASON_CONDITIONS_NOT_MET),
            Err(payload) => {
                return Outcome::Failed(EngineError::Panicked(panic_message(payload.as_ref())))
            }
        }

        let ctx = ActionContext::for_rule(&rule, trigger_data.clone());
        let budget = self.config.action_budget(rule.actions.len());
        let phase =
            AssertUnwindSafe(self.executor.execute_actions(&rule.actions, &ctx)).catch_unwind();

        match tokio::time::timeout(budget, phase).await {
            Ok(Ok(records)) => Outcome::Completed(records),
            Ok(Err(payload)) => {
                Outcome::Failed(EngineError::Panicked(panic_message(payload.as_ref())))
            }
            Err(_elapsed) => Outcome::Failed(EngineError::Timeout),
        }
    }

    fn publish_completed(&self, execution: &AutomationExecution) {
        let Some(bus) = &self.event_bus else {
            return;
        };
        let event = PlatformEvent::new(EXECUTION_COMPLETED_EVENT)
            .with_business(execution.business_id)
            .with_source("automation_rule", execution.rule_id)
            .with_payload(json!({
                "execution_id": execution.id,
                "rule_id": execution.rule_id,
                "status": execution.status,
                "had_action_failures": execution.had_action_failures(),
                "error_message": execution.error_message,
            }));
        bus.publish(event);
    }
}
