//! Persistence seams for rules and execution records.
//!
//! The engine only talks to these traits. [`postgres::PgAutomationStore`]
//! backs them with the `socialhub-db` repositories; [`memory::MemoryAutomationStore`]
//! keeps everything in process for tests and embedding.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use socialhub_core::automation::{
    AutomationExecution, AutomationRule, CounterOutcome, CreateAutomationRule, ExecutionSummary,
    RuleStatus, UpdateAutomationRule,
};
use socialhub_core::types::DbId;
use uuid::Uuid;

use crate::error::StoreError;

/// Rule persistence. All reads and writes are scoped to a business except
/// the counter increment, which is keyed by rule id alone.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Validate and insert a new rule.
    async fn create_rule(
        &self,
        business_id: DbId,
        input: &CreateAutomationRule,
    ) -> Result<AutomationRule, StoreError>;

    /// List rules ordered `priority desc, created_at asc, id asc`.
    async fn list_rules(
        &self,
        business_id: DbId,
        status: Option<RuleStatus>,
    ) -> Result<Vec<AutomationRule>, StoreError>;

    async fn get_rule(
        &self,
        id: DbId,
        business_id: DbId,
    ) -> Result<Option<AutomationRule>, StoreError>;

    /// Apply a validated patch. Counters and status are left untouched.
    async fn update_rule(
        &self,
        id: DbId,
        business_id: DbId,
        patch: &UpdateAutomationRule,
    ) -> Result<AutomationRule, StoreError>;

    /// Delete a rule together with its execution history.
    async fn delete_rule(&self, id: DbId, business_id: DbId) -> Result<(), StoreError>;

    /// Move a rule to `status`, enforcing the lifecycle transitions.
    async fn update_rule_status(
        &self,
        id: DbId,
        business_id: DbId,
        status: RuleStatus,
    ) -> Result<AutomationRule, StoreError>;

    /// Atomically bump the rule's rolling counters.
    async fn increment_counters(&self, id: DbId, outcome: CounterOutcome)
        -> Result<(), StoreError>;
}

/// Append-only execution record persistence.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn create_execution(
        &self,
        record: &AutomationExecution,
    ) -> Result<AutomationExecution, StoreError>;

    /// Newest-first history for a business, joined with rule names.
    async fn execution_history(
        &self,
        business_id: DbId,
        limit: i64,
    ) -> Result<Vec<ExecutionSummary>, StoreError>;

    /// Newest-first history for one rule.
    async fn rule_execution_history(
        &self,
        business_id: DbId,
        rule_id: DbId,
        limit: i64,
    ) -> Result<Vec<ExecutionSummary>, StoreError>;

    async fn find_execution(
        &self,
        business_id: DbId,
        id: Uuid,
    ) -> Result<Option<AutomationExecution>, StoreError>;
}
