//! Automation execution rows. Executions are insert-only.

use serde::{Deserialize, Serialize};
use socialhub_core::types::{DbId, Timestamp};
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `automation_executions` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AutomationExecutionRow {
    pub id: Uuid,
    pub rule_id: DbId,
    pub business_id: DbId,
    pub status: String,
    pub triggered_at: Timestamp,
    pub completed_at: Timestamp,
    pub trigger_data: serde_json::Value,
    pub execution_result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub execution_duration_ms: i64,
}

/// An execution row joined with its rule's name for history listings.
///
/// `rule_name` is empty when the rule id never resolved.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExecutionSummaryRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub execution: AutomationExecutionRow,
    pub rule_name: String,
}

/// Input for appending an execution record. The id is generated by the
/// caller so the record has an identity before it is persisted.
#[derive(Debug, Clone)]
pub struct NewAutomationExecution {
    pub id: Uuid,
    pub rule_id: DbId,
    pub business_id: DbId,
    pub status: String,
    pub triggered_at: Timestamp,
    pub completed_at: Timestamp,
    pub trigger_data: serde_json::Value,
    pub execution_result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub execution_duration_ms: i64,
}
