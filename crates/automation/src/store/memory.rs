//! In-process store for tests and embedding.
//!
//! Mirrors the Postgres store's semantics: tenant scoping, dispatch ordering,
//! lifecycle checks, append-only executions, and history ordering. All state
//! sits behind one mutex, so counter increments are atomic.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use socialhub_core::automation::{
    order_candidates, AutomationExecution, AutomationRule, CounterOutcome, CreateAutomationRule,
    ExecutionSummary, RuleStatus, UpdateAutomationRule,
};
use socialhub_core::error::CoreError;
use socialhub_core::types::DbId;
use uuid::Uuid;

use super::{ExecutionStore, RuleStore};
use crate::error::StoreError;

const RULE_ENTITY: &str = "automation rule";

#[derive(Default)]
struct State {
    next_rule_id: DbId,
    rules: BTreeMap<DbId, AutomationRule>,
    executions: Vec<AutomationExecution>,
}

/// Mutex-guarded in-memory implementation of both store traits.
#[derive(Default)]
pub struct MemoryAutomationStore {
    state: Mutex<State>,
}

impl MemoryAutomationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored execution records across all tenants.
    pub fn execution_count(&self) -> usize {
        self.lock().executions.len()
    }
}

impl State {
    fn rule_mut(&mut self, id: DbId, business_id: DbId) -> Result<&mut AutomationRule, StoreError> {
        self.rules
            .get_mut(&id)
            .filter(|r| r.business_id == business_id)
            .ok_or_else(|| CoreError::not_found(RULE_ENTITY, id).into())
    }

    fn history(
        &self,
        business_id: DbId,
        limit: i64,
        matches: impl Fn(&AutomationExecution) -> bool,
    ) -> Vec<ExecutionSummary> {
        let mut rows: Vec<&AutomationExecution> = self
            .executions
            .iter()
            .filter(|e| e.business_id == business_id && matches(*e))
            .collect();
        rows.sort_by(|a, b| {
            b.triggered_at
                .cmp(&a.triggered_at)
                .then(b.completed_at.cmp(&a.completed_at))
                .then(b.id.cmp(&a.id))
        });
        rows.into_iter()
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|e| ExecutionSummary {
                execution: e.clone(),
                rule_name: self
                    .rules
                    .get(&e.rule_id)
                    .filter(|r| r.business_id == e.business_id)
                    .map(|r| r.name.clone())
                    .unwrap_or_default(),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// RuleStore
// ---------------------------------------------------------------------------

#[async_trait]
impl RuleStore for MemoryAutomationStore {
    async fn create_rule(
        &self,
        business_id: DbId,
        input: &CreateAutomationRule,
    ) -> Result<AutomationRule, StoreError> {
        let trigger_config = input.validate()?;
        let mut state = self.lock();
        state.next_rule_id += 1;
        let now = Utc::now();
        let rule = AutomationRule {
            id: state.next_rule_id,
            business_id,
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            trigger_type: input.trigger_type,
            trigger_config,
            conditions: input.conditions.clone(),
            actions: input.actions.clone(),
            status: input.status_or_default(),
            priority: input.priority.unwrap_or(0),
            execution_count: 0,
            success_count: 0,
            failure_count: 0,
            last_executed_at: None,
            created_by: input.created_by,
            created_at: now,
            updated_at: now,
        };
        state.rules.insert(rule.id, rule.clone());
        Ok(rule)
    }

    async fn list_rules(
        &self,
        business_id: DbId,
        status: Option<RuleStatus>,
    ) -> Result<Vec<AutomationRule>, StoreError> {
        let mut rules: Vec<AutomationRule> = self
            .lock()
            .rules
            .values()
            .filter(|r| r.business_id == business_id)
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        order_candidates(&mut rules);
        Ok(rules)
    }

    async fn get_rule(
        &self,
        id: DbId,
        business_id: DbId,
    ) -> Result<Option<AutomationRule>, StoreError> {
        Ok(self
            .lock()
            .rules
            .get(&id)
            .filter(|r| r.business_id == business_id)
            .cloned())
    }

    async fn update_rule(
        &self,
        id: DbId,
        business_id: DbId,
        patch: &UpdateAutomationRule,
    ) -> Result<AutomationRule, StoreError> {
        let mut state = self.lock();
        let rule = state.rule_mut(id, business_id)?;
        let mut next = patch.apply_to(rule)?;
        next.name = next.name.trim().to_string();
        next.updated_at = Utc::now();
        *rule = next.clone();
        Ok(next)
    }

    async fn delete_rule(&self, id: DbId, business_id: DbId) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.rule_mut(id, business_id)?;
        state.rules.remove(&id);
        state
            .executions
            .retain(|e| !(e.rule_id == id && e.business_id == business_id));
        Ok(())
    }

    async fn update_rule_status(
        &self,
        id: DbId,
        business_id: DbId,
        status: RuleStatus,
    ) -> Result<AutomationRule, StoreError> {
        let mut state = self.lock();
        let rule = state.rule_mut(id, business_id)?;
        let next = rule.status.transition_to(status)?;
        if next != rule.status {
            rule.status = next;
            rule.updated_at = Utc::now();
        }
        Ok(rule.clone())
    }

    async fn increment_counters(
        &self,
        id: DbId,
        outcome: CounterOutcome,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        let rule = state
            .rules
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found(RULE_ENTITY, id))?;
        rule.execution_count += 1;
        match outcome {
            CounterOutcome::Success => {
                rule.success_count += 1;
                rule.last_executed_at = Some(Utc::now());
            }
            CounterOutcome::Failure => rule.failure_count += 1,
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ExecutionStore
// ---------------------------------------------------------------------------

#[async_trait]
impl ExecutionStore for MemoryAutomationStore {
    async fn create_execution(
        &self,
        record: &AutomationExecution,
    ) -> Result<AutomationExecution, StoreError> {
        let mut state = self.lock();
        if state.executions.iter().any(|e| e.id == record.id) {
            return Err(CoreError::Conflict(format!("execution {} already recorded", record.id)).into());
        }
        state.executions.push(record.clone());
        Ok(record.clone())
    }

    async fn execution_history(
        &self,
        business_id: DbId,
        limit: i64,
    ) -> Result<Vec<ExecutionSummary>, StoreError> {
        Ok(self.lock().history(business_id, limit, |_| true))
    }

    async fn rule_execution_history(
        &self,
        business_id: DbId,
        rule_id: DbId,
        limit: i64,
    ) -> Result<Vec<ExecutionSummary>, StoreError> {
        Ok(self
            .lock()
            .history(business_id, limit, move |e| e.rule_id == rule_id))
    }

    async fn find_execution(
        &self,
        business_id: DbId,
        id: Uuid,
    ) -> Result<Option<AutomationExecution>, StoreError> {
        Ok(self
            .lock()
            .executions
            .iter()
            .find(|e| e.id == id && e.business_id == business_id)
            .cloned())
    }
}
