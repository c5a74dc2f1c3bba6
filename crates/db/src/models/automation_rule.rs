//! Automation rule row and DTOs.

use serde::{Deserialize, Serialize};
use socialhub_core::types::{DbId, Timestamp};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `automation_rules` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AutomationRuleRow {
    pub id: DbId,
    pub business_id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub trigger_type: String,
    pub trigger_config: serde_json::Value,
    pub conditions: serde_json::Value,
    pub actions: serde_json::Value,
    pub status: String,
    pub priority: i32,
    pub execution_count: i64,
    pub success_count: i64,
    pub failure_count: i64,
    pub last_executed_at: Option<Timestamp>,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for inserting an already-validated rule.
#[derive(Debug, Clone)]
pub struct NewAutomationRule {
    pub business_id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub trigger_type: String,
    pub trigger_config: serde_json::Value,
    pub conditions: serde_json::Value,
    pub actions: serde_json::Value,
    pub status: String,
    pub priority: i32,
    pub created_by: Option<DbId>,
}

// ---------------------------------------------------------------------------
// Update DTO
// ---------------------------------------------------------------------------

/// Full replacement of a rule's editable columns. Counters and status are
/// never written through this path.
#[derive(Debug, Clone)]
pub struct AutomationRuleContent {
    pub name: String,
    pub description: Option<String>,
    pub trigger_type: String,
    pub trigger_config: serde_json::Value,
    pub conditions: serde_json::Value,
    pub actions: serde_json::Value,
    pub priority: i32,
}
