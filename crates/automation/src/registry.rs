//! Action handler seam.
//!
//! Handlers are looked up by their action-type tag. Built-ins live in
//! [`crate::handlers`]; hosts register CREATE_CONTENT, SCHEDULE_POST,
//! UPDATE_STATUS and custom handlers themselves, either by implementing
//! [`ActionHandler`] or by wrapping an async closure with [`handler_fn`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use socialhub_core::automation::{ActionType, AutomationRule};
use socialhub_core::types::DbId;

use crate::error::ActionError;

// ---------------------------------------------------------------------------
// ActionContext
// ---------------------------------------------------------------------------

/// What a handler knows about the invocation it is serving.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub business_id: DbId,
    pub rule_id: DbId,
    pub rule_name: String,
    /// Position of the action within the rule's action list.
    pub action_index: usize,
    pub trigger_data: Value,
}

impl ActionContext {
    pub fn for_rule(rule: &AutomationRule, trigger_data: Value) -> Self {
        Self {
            business_id: rule.business_id,
            rule_id: rule.id,
            rule_name: rule.name.clone(),
            action_index: 0,
            trigger_data,
        }
    }

    /// The same context pointed at another action.
    pub fn at(&self, action_index: usize) -> Self {
        Self {
            action_index,
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// ActionHandler
// ---------------------------------------------------------------------------

/// Performs one concrete side effect for an action.
///
/// `config` is the raw action config as stored on the rule; handlers parse it
/// into the typed form they expect. The returned value is stored as the
/// action's `detail` in the execution record.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, config: &Value, ctx: &ActionContext) -> Result<Value, ActionError>;
}

/// Adapter produced by [`handler_fn`].
pub struct FnHandler<F>(F);

/// Build a handler from an async closure taking owned config and context.
///
/// ```rust
/// use serde_json::json;
/// use socialhub_automation::{handler_fn, ActionHandlerRegistry};
///
/// let mut registry = ActionHandlerRegistry::new();
/// registry.register(
///     "CREATE_CONTENT",
///     handler_fn(|config, _ctx| async move { Ok(json!({ "queued": config })) }),
/// );
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Value, ActionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ActionError>> + Send + 'static,
{
    FnHandler(f)
}

#[async_trait]
impl<F, Fut> ActionHandler for FnHandler<F>
where
    F: Fn(Value, ActionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ActionError>> + Send + 'static,
{
    async fn handle(&self, config: &Value, ctx: &ActionContext) -> Result<Value, ActionError> {
        (self.0)(config.clone(), ctx.clone()).await
    }
}

// ---------------------------------------------------------------------------
// ActionHandlerRegistry
// ---------------------------------------------------------------------------

/// Maps action-type tags to handlers. Built once at startup and shared
/// read-only via `Arc`.
#[derive(Default, Clone)]
pub struct ActionHandlerRegistry {
    handlers: HashMap<ActionType, Arc<dyn ActionHandler>>,
}

impl ActionHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `action_type`, replacing any previous one.
    pub fn register<H>(&mut self, action_type: impl Into<ActionType>, handler: H) -> &mut Self
    where
        H: ActionHandler + 'static,
    {
        let action_type = action_type.into();
        if self
            .handlers
            .insert(action_type.clone(), Arc::new(handler))
            .is_some()
        {
            tracing::debug!(action_type = %action_type, "Replaced action handler");
        }
        self
    }

    pub fn get(&self, action_type: &ActionType) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(action_type).cloned()
    }

    pub fn contains(&self, action_type: &ActionType) -> bool {
        self.handlers.contains_key(action_type)
    }

    /// Registered tags, sorted.
    pub fn action_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(ActionType::as_str).collect();
        types.sort_unstable();
        types
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ctx() -> ActionContext {
        ActionContext {
            business_id: 1,
            rule_id: 2,
            rule_name: "r".to_string(),
            action_index: 0,
            trigger_data: json!({"amount": 150}),
        }
    }

    #[tokio::test]
    async fn closure_handler_receives_config_and_context() {
        let mut registry = ActionHandlerRegistry::new();
        registry.register(
            "CUSTOM_ECHO",
            handler_fn(|config, ctx| async move {
                Ok(json!({"config": config, "amount": ctx.trigger_data["amount"]}))
            }),
        );

        let handler = registry.get(&ActionType::from("CUSTOM_ECHO")).unwrap();
        let out = handler.handle(&json!({"k": 1}), &ctx()).await.unwrap();
        assert_eq!(out, json!({"config": {"k": 1}, "amount": 150}));
    }

    #[test]
    fn lookup_is_by_tag() {
        let mut registry = ActionHandlerRegistry::new();
        registry
            .register("NOTIFY", handler_fn(|_, _| async { Ok(Value::Null) }))
            .register("WEBHOOK", handler_fn(|_, _| async { Ok(Value::Null) }));

        assert!(registry.contains(&ActionType::Notify));
        assert!(!registry.contains(&ActionType::SchedulePost));
        assert_eq!(registry.action_types(), vec!["NOTIFY", "WEBHOOK"]);
    }

    #[test]
    fn context_at_changes_only_index() {
        let moved = ctx().at(3);
        assert_eq!(moved.action_index, 3);
        assert_eq!(moved.rule_id, 2);
    }
}
