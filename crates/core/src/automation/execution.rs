//! Execution records: the append-only audit trail of rule invocations.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

use super::actions::ActionType;

/// `execution_result.reason` for a rule whose status is not ACTIVE.
pub const SKIP_REASON_INACTIVE: &str = "Rule is not active";

/// `execution_result.reason` when the condition tree evaluated false.
pub const SKIP_REASON_CONDITIONS_NOT_MET: &str = "Conditions not met";

/// `error_message` when the rule id does not resolve for the tenant.
pub const ERROR_RULE_NOT_FOUND: &str = "rule not found";

// ---------------------------------------------------------------------------
// ExecutionStatus
// ---------------------------------------------------------------------------

/// Terminal state of one rule invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// The action phase completed (individual actions may still have failed).
    Success,
    /// An engine-level fault: missing rule, store failure, overall timeout.
    Failed,
    /// Guarded off: inactive rule or conditions not met.
    Skipped,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            "SKIPPED" => Ok(Self::Skipped),
            _ => Err(CoreError::Validation(format!(
                "Invalid execution status: '{s}'. Must be one of: SUCCESS, FAILED, SKIPPED"
            ))),
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Per-action results
// ---------------------------------------------------------------------------

/// Outcome of one configured action, keyed by its position in the rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub index: usize,
    pub action_type: ActionType,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionRecord {
    pub fn succeeded(index: usize, action_type: ActionType, detail: Value) -> Self {
        Self {
            index,
            action_type,
            success: true,
            detail: Some(detail),
            error: None,
        }
    }

    pub fn failed(index: usize, action_type: ActionType, error: impl Into<String>) -> Self {
        Self {
            index,
            action_type,
            success: false,
            detail: None,
            error: Some(error.into()),
        }
    }
}

/// The `execution_result` column: a skip reason, or the per-action results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExecutionResult {
    Skipped { reason: String },
    Actions { actions: Vec<ActionRecord> },
}

// ---------------------------------------------------------------------------
// AutomationExecution
// ---------------------------------------------------------------------------

/// An immutable audit entry produced once per rule invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationExecution {
    pub id: Uuid,
    pub rule_id: DbId,
    pub business_id: DbId,
    pub status: ExecutionStatus,
    pub triggered_at: Timestamp,
    pub completed_at: Timestamp,
    /// Snapshot of the trigger context, kept for replay and debugging.
    pub trigger_data: Value,
    pub execution_result: Option<ExecutionResult>,
    /// Set only for [`ExecutionStatus::Failed`].
    pub error_message: Option<String>,
    pub execution_duration_ms: i64,
}

impl AutomationExecution {
    /// Per-action results, empty unless the action phase ran.
    pub fn action_records(&self) -> &[ActionRecord] {
        match &self.execution_result {
            Some(ExecutionResult::Actions { actions }) => actions,
            _ => &[],
        }
    }

    /// All results for a given action type, in configured order.
    pub fn actions_of_type<'a>(
        &'a self,
        action_type: &'a ActionType,
    ) -> impl Iterator<Item = &'a ActionRecord> + 'a {
        self.action_records()
            .iter()
            .filter(move |r| &r.action_type == action_type)
    }

    /// Whether any action reported failure. Independent of `status`: a
    /// SUCCESS execution can still carry failed actions.
    pub fn had_action_failures(&self) -> bool {
        self.action_records().iter().any(|r| !r.success)
    }

    pub fn skip_reason(&self) -> Option<&str> {
        match &self.execution_result {
            Some(ExecutionResult::Skipped { reason }) => Some(reason),
            _ => None,
        }
    }
}

/// A history row: the execution joined with its rule's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    #[serde(flatten)]
    pub execution: AutomationExecution,
    pub rule_name: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn execution(result: Option<ExecutionResult>) -> AutomationExecution {
        let now = Utc::now();
        AutomationExecution {
            id: Uuid::now_v7(),
            rule_id: 1,
            business_id: 7,
            status: ExecutionStatus::Success,
            triggered_at: now,
            completed_at: now,
            trigger_data: json!({}),
            execution_result: result,
            error_message: None,
            execution_duration_ms: 3,
        }
    }

    #[test]
    fn status_round_trips() {
        for s in [
            ExecutionStatus::Success,
            ExecutionStatus::Failed,
            ExecutionStatus::Skipped,
        ] {
            assert_eq!(ExecutionStatus::from_str(s.as_str()).unwrap(), s);
        }
        assert!(ExecutionStatus::from_str("RUNNING").is_err());
    }

    #[test]
    fn skipped_result_serializes_as_reason_object() {
        let result = ExecutionResult::Skipped {
            reason: SKIP_REASON_CONDITIONS_NOT_MET.into(),
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"reason": "Conditions not met"})
        );
    }

    #[test]
    fn action_results_deserialize_from_stored_json() {
        let stored = json!({"actions": [
            {"index": 0, "action_type": "NOTIFY", "success": true, "detail": {"sent": 1}},
            {"index": 1, "action_type": "WEBHOOK", "success": false, "error": "timeout"}
        ]});
        let result: ExecutionResult = serde_json::from_value(stored).unwrap();
        assert_matches!(&result, ExecutionResult::Actions { actions } if actions.len() == 2);
    }

    #[test]
    fn had_action_failures_reflects_any_failed_action() {
        let ok = execution(Some(ExecutionResult::Actions {
            actions: vec![ActionRecord::succeeded(0, ActionType::Notify, json!({}))],
        }));
        assert!(!ok.had_action_failures());

        let partial = execution(Some(ExecutionResult::Actions {
            actions: vec![
                ActionRecord::succeeded(0, ActionType::Notify, json!({})),
                ActionRecord::failed(1, ActionType::Webhook, "boom"),
            ],
        }));
        assert!(partial.had_action_failures());
        assert_eq!(partial.status, ExecutionStatus::Success);
    }

    #[test]
    fn duplicate_action_types_are_both_visible() {
        let exec = execution(Some(ExecutionResult::Actions {
            actions: vec![
                ActionRecord::succeeded(0, ActionType::Webhook, json!({})),
                ActionRecord::failed(1, ActionType::Webhook, "HTTP 500"),
            ],
        }));
        assert_eq!(exec.actions_of_type(&ActionType::Webhook).count(), 2);
    }

    #[test]
    fn skip_reason_only_for_skipped_results() {
        let skipped = execution(Some(ExecutionResult::Skipped {
            reason: SKIP_REASON_INACTIVE.into(),
        }));
        assert_eq!(skipped.skip_reason(), Some("Rule is not active"));
        assert!(skipped.action_records().is_empty());
        assert_eq!(execution(None).skip_reason(), None);
    }

    #[test]
    fn summary_flattens_execution_fields() {
        let summary = ExecutionSummary {
            execution: execution(None),
            rule_name: "Big orders".into(),
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["rule_name"], "Big orders");
        assert_eq!(value["status"], "SUCCESS");
    }
}
