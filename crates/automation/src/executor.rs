//! Runs a rule's actions in order with per-action isolation.
//!
//! A handler error, a panic inside a handler, or a handler exceeding the
//! per-action timeout is captured into that action's record; later actions
//! always run.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde_json::Value;
use socialhub_core::automation::{ActionRecord, ActionSpec};

use crate::error::{panic_message, ActionError};
use crate::registry::{ActionContext, ActionHandlerRegistry};

/// Dispatches actions through the registry.
#[derive(Clone)]
pub struct ActionExecutor {
    registry: Arc<ActionHandlerRegistry>,
    action_timeout: Duration,
}

impl ActionExecutor {
    pub fn new(registry: Arc<ActionHandlerRegistry>, action_timeout: Duration) -> Self {
        Self {
            registry,
            action_timeout,
        }
    }

    /// Execute `actions` sequentially, returning one record per action in
    /// configured order. Duplicate action types each get their own record.
    pub async fn execute_actions(
        &self,
        actions: &[ActionSpec],
        ctx: &ActionContext,
    ) -> Vec<ActionRecord> {
        let mut records = Vec::with_capacity(actions.len());

        for (index, action) in actions.iter().enumerate() {
            let record = match self.run_one(action, &ctx.at(index)).await {
                Ok(detail) => ActionRecord::succeeded(index, action.action_type.clone(), detail),
                Err(e) => {
                    tracing::warn!(
                        rule_id = ctx.rule_id,
                        action_index = index,
                        action_type = %action.action_type,
                        error = %e,
                        "Automation action failed"
                    );
                    ActionRecord::failed(index, action.action_type.clone(), e.to_string())
                }
            };
            records.push(record);
        }

        records
    }

    async fn run_one(&self, action: &ActionSpec, ctx: &ActionContext) -> Result<Value, ActionError> {
        let handler = self
            .registry
            .get(&action.action_type)
            .ok_or(ActionError::UnknownActionType)?;

        let call = AssertUnwindSafe(handler.handle(&action.config, ctx)).catch_unwind();
        match tokio::time::timeout(self.action_timeout, call).await {
            Ok(Ok(result)) => result,
            Ok(Err(payload)) => Err(ActionError::Panicked(panic_message(payload.as_ref()))),
            Err(_elapsed) => Err(ActionError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::registry::handler_fn;

    fn ctx() -> ActionContext {
        ActionContext {
            business_id: 1,
            rule_id: 7,
            rule_name: "r".to_string(),
            action_index: 0,
            trigger_data: json!({}),
        }
    }

    fn executor(registry: ActionHandlerRegistry) -> ActionExecutor {
        ActionExecutor::new(Arc::new(registry), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn records_follow_configured_order() {
        let mut registry = ActionHandlerRegistry::new();
        registry.register(
            "NOTIFY",
            handler_fn(|_, ctx| async move { Ok(json!({"index": ctx.action_index})) }),
        );

        let actions = vec![
            ActionSpec::new("NOTIFY", json!({})),
            ActionSpec::new("NOTIFY", json!({})),
        ];
        let records = executor(registry).execute_actions(&actions, &ctx()).await;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].detail, Some(json!({"index": 0})));
        assert_eq!(records[1].detail, Some(json!({"index": 1})));
        assert!(records.iter().all(|r| r.success));
    }

    #[tokio::test]
    async fn missing_handler_is_unknown_action_type() {
        let actions = vec![ActionSpec::new("SCHEDULE_POST", json!({}))];
        let records = executor(ActionHandlerRegistry::new())
            .execute_actions(&actions, &ctx())
            .await;
        assert!(!records[0].success);
        assert_eq!(records[0].error.as_deref(), Some("unknown action type"));
    }

    #[tokio::test]
    async fn timeout_and_panic_do_not_stop_later_actions() {
        let mut registry = ActionHandlerRegistry::new();
        registry
            .register(
                "SLOW",
                handler_fn(|_, _| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(Value::Null)
                }),
            )
            .register(
                "BROKEN",
                handler_fn(|_, _| async {
                    if true {
                        panic!("handler exploded");
                    }
                    Ok(Value::Null)
                }),
            )
            .register("OK", handler_fn(|_, _| async { Ok(json!("done")) }));

        let actions = vec![
            ActionSpec::new("SLOW", json!({})),
            ActionSpec::new("BROKEN", json!({})),
            ActionSpec::new("OK", json!({})),
        ];
        let records = executor(registry).execute_actions(&actions, &ctx()).await;

        assert_eq!(records[0].error.as_deref(), Some("timeout"));
        assert_matches!(records[1].error.as_deref(), Some(msg) if msg.contains("handler exploded"));
        assert!(records[2].success);
        assert_eq!(records[2].detail, Some(json!("done")));
    }

    #[tokio::test]
    async fn handler_errors_are_captured() {
        let mut registry = ActionHandlerRegistry::new();
        registry.register(
            "WEBHOOK",
            handler_fn(|_, _| async { Err(ActionError::Failed("Webhook returned HTTP 500".into())) }),
        );

        let actions = vec![ActionSpec::new("WEBHOOK", json!({}))];
        let records = executor(registry).execute_actions(&actions, &ctx()).await;
        assert!(!records[0].success);
        assert_eq!(records[0].error.as_deref(), Some("Webhook returned HTTP 500"));
    }
}
