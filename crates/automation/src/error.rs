use socialhub_core::automation::execution::ERROR_RULE_NOT_FOUND;
use socialhub_core::error::CoreError;

/// Errors surfaced by [`RuleStore`](crate::store::RuleStore) and
/// [`ExecutionStore`](crate::store::ExecutionStore) implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be decoded into its domain type.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Core(CoreError::NotFound { .. }))
    }
}

/// Failure of a single action. Captured into the execution record, never
/// propagated past the executor.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Failed(String),

    #[error("unknown action type")]
    UnknownActionType,

    #[error("timeout")]
    Timeout,

    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl From<CoreError> for ActionError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => Self::InvalidConfig(msg),
            other => Self::Failed(other.to_string()),
        }
    }
}

/// Engine-level faults. Each one becomes a FAILED execution record.
#[derive(Debug, thiserror::Error)]
pub(crate) enum EngineError {
    #[error("{}", ERROR_RULE_NOT_FOUND)]
    RuleNotFound,

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("execution timed out")]
    Timeout,

    #[error("engine panicked: {0}")]
    Panicked(String),
}

impl EngineError {
    /// Whether the rule's counters should record the failure. Only a rule id
    /// that did not resolve has no counters to update; a store read error
    /// may concern a rule that exists but no longer loads.
    pub(crate) fn counts_against_rule(&self) -> bool {
        !matches!(self, Self::RuleNotFound)
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_error_display_matches_recorded_strings() {
        assert_eq!(ActionError::UnknownActionType.to_string(), "unknown action type");
        assert_eq!(ActionError::Timeout.to_string(), "timeout");
        assert_eq!(ActionError::Failed("boom".into()).to_string(), "boom");
    }

    #[test]
    fn validation_maps_to_invalid_config() {
        let err: ActionError = CoreError::Validation("url missing".into()).into();
        assert_eq!(err, ActionError::InvalidConfig("url missing".into()));
    }

    #[test]
    fn engine_error_messages() {
        assert_eq!(EngineError::RuleNotFound.to_string(), "rule not found");
        assert_eq!(EngineError::Timeout.to_string(), "execution timed out");
        assert!(!EngineError::RuleNotFound.counts_against_rule());
        assert!(EngineError::Timeout.counts_against_rule());
        assert!(EngineError::Store(StoreError::Corrupt("bad row".into())).counts_against_rule());
    }

    #[test]
    fn panic_message_extracts_str_and_string() {
        let caught = std::panic::catch_unwind(|| panic!("static message")).unwrap_err();
        assert_eq!(panic_message(caught.as_ref()), "static message");

        let caught = std::panic::catch_unwind(|| panic!("formatted {}", 42)).unwrap_err();
        assert_eq!(panic_message(caught.as_ref()), "formatted 42");
    }

    #[test]
    fn not_found_detection() {
        let err = StoreError::Core(CoreError::not_found("automation rule", 7));
        assert!(err.is_not_found());
        assert!(!StoreError::Corrupt("bad".into()).is_not_found());
    }
}
