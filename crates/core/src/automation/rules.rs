//! Automation rule entity, lifecycle status, inputs, and validation.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

use super::actions::{validate_actions, ActionSpec};
use super::conditions::ConditionTree;
use super::triggers::{TriggerConfig, TriggerType};

/// Maximum length of a rule name.
pub const MAX_RULE_NAME_LENGTH: usize = 200;

/// Maximum length of a rule description.
pub const MAX_RULE_DESCRIPTION_LENGTH: usize = 2000;

// ---------------------------------------------------------------------------
// RuleStatus
// ---------------------------------------------------------------------------

/// Lifecycle status. Only ACTIVE rules execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleStatus {
    Active,
    Paused,
    Draft,
}

impl RuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Paused => "PAUSED",
            Self::Draft => "DRAFT",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "PAUSED" => Ok(Self::Paused),
            "DRAFT" => Ok(Self::Draft),
            _ => Err(CoreError::Validation(format!(
                "Invalid status: '{s}'. Must be one of: ACTIVE, PAUSED, DRAFT"
            ))),
        }
    }

    /// Allowed transitions: ACTIVE <-> PAUSED, DRAFT -> ACTIVE | PAUSED.
    /// Re-applying the current status is always allowed.
    pub fn can_transition_to(&self, next: RuleStatus) -> bool {
        match (self, next) {
            (a, b) if *a == b => true,
            (Self::Active, Self::Paused) | (Self::Paused, Self::Active) => true,
            (Self::Draft, Self::Active) | (Self::Draft, Self::Paused) => true,
            _ => false,
        }
    }

    /// Validate a transition, producing a descriptive error when refused.
    pub fn transition_to(&self, next: RuleStatus) -> Result<RuleStatus, CoreError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::Validation(format!(
                "Cannot change rule status from {self} to {next}"
            )))
        }
    }
}

impl std::fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A business-defined automation rule with validated, typed configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutomationRule {
    pub id: DbId,
    pub business_id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub trigger_type: TriggerType,
    pub trigger_config: TriggerConfig,
    pub conditions: ConditionTree,
    pub actions: Vec<ActionSpec>,
    pub status: RuleStatus,
    pub priority: i32,
    /// Attempts that reached a SUCCESS or FAILED terminal state.
    pub execution_count: i64,
    pub success_count: i64,
    pub failure_count: i64,
    pub last_executed_at: Option<Timestamp>,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AutomationRule {
    pub fn is_active(&self) -> bool {
        self.status == RuleStatus::Active
    }

    pub fn stats(&self) -> RuleStats {
        RuleStats {
            execution_count: self.execution_count,
            success_count: self.success_count,
            failure_count: self.failure_count,
            last_executed_at: self.last_executed_at,
        }
    }
}

/// Rolling health counters for a rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RuleStats {
    pub execution_count: i64,
    pub success_count: i64,
    pub failure_count: i64,
    pub last_executed_at: Option<Timestamp>,
}

impl RuleStats {
    /// Fraction of attempts that succeeded, `None` before the first attempt.
    pub fn success_rate(&self) -> Option<f64> {
        (self.execution_count > 0).then(|| self.success_count as f64 / self.execution_count as f64)
    }
}

/// Which counter an execution outcome bumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterOutcome {
    /// `execution_count`, `success_count`, and `last_executed_at`.
    Success,
    /// `execution_count` and `failure_count`.
    Failure,
}

/// Sort dispatcher candidates: priority descending, then oldest first, then
/// lowest id, so the pick is deterministic.
pub fn order_candidates(rules: &mut [AutomationRule]) {
    rules.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for creating a rule. `status` defaults to DRAFT.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAutomationRule {
    pub name: String,
    pub description: Option<String>,
    pub trigger_type: TriggerType,
    #[serde(default)]
    pub trigger_config: Value,
    #[serde(default)]
    pub conditions: ConditionTree,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
    pub status: Option<RuleStatus>,
    pub priority: Option<i32>,
    pub created_by: Option<DbId>,
}

impl CreateAutomationRule {
    /// Validate every field, returning the typed trigger config.
    pub fn validate(&self) -> Result<TriggerConfig, CoreError> {
        validate_rule_name(&self.name)?;
        validate_rule_description(self.description.as_deref())?;
        if let Some(status) = self.status {
            if status == RuleStatus::Paused {
                return Err(CoreError::Validation(
                    "New rules must start as DRAFT or ACTIVE".to_string(),
                ));
            }
        }
        self.conditions.validate()?;
        validate_actions(&self.actions)?;
        TriggerConfig::parse(self.trigger_type, &self.trigger_config)
    }

    pub fn status_or_default(&self) -> RuleStatus {
        self.status.unwrap_or(RuleStatus::Draft)
    }
}

// ---------------------------------------------------------------------------
// Update DTO
// ---------------------------------------------------------------------------

/// Patch for an existing rule. All fields are optional; status and counters
/// have their own paths.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAutomationRule {
    pub name: Option<String>,
    /// `None` leaves the description alone; `Some(None)` (an explicit JSON
    /// `null`) clears it.
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    pub trigger_type: Option<TriggerType>,
    pub trigger_config: Option<Value>,
    pub conditions: Option<ConditionTree>,
    pub actions: Option<Vec<ActionSpec>>,
    pub priority: Option<i32>,
}

impl UpdateAutomationRule {
    /// Apply the patch to `rule`, validating the merged result.
    ///
    /// Changing `trigger_type` without a new `trigger_config` re-validates the
    /// existing config against the new type.
    pub fn apply_to(&self, rule: &AutomationRule) -> Result<AutomationRule, CoreError> {
        let mut next = rule.clone();

        if let Some(name) = &self.name {
            validate_rule_name(name)?;
            next.name = name.clone();
        }
        if let Some(description) = &self.description {
            validate_rule_description(description.as_deref())?;
            next.description = description.clone();
        }
        if self.trigger_type.is_some() || self.trigger_config.is_some() {
            let trigger_type = self.trigger_type.unwrap_or(rule.trigger_type);
            let raw = match &self.trigger_config {
                Some(raw) => raw.clone(),
                None => rule.trigger_config.to_value(),
            };
            next.trigger_type = trigger_type;
            next.trigger_config = TriggerConfig::parse(trigger_type, &raw)?;
        }
        if let Some(conditions) = &self.conditions {
            conditions.validate()?;
            next.conditions = conditions.clone();
        }
        if let Some(actions) = &self.actions {
            validate_actions(actions)?;
            next.actions = actions.clone();
        }
        if let Some(priority) = self.priority {
            next.priority = priority;
        }
        Ok(next)
    }
}

/// Keeps an explicit `null` distinct from a missing key.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a rule name: must be non-empty and within length limit.
pub fn validate_rule_name(name: &str) -> Result<(), CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "Rule name must not be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_RULE_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Rule name exceeds maximum length of {MAX_RULE_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate an optional rule description against the length limit.
pub fn validate_rule_description(description: Option<&str>) -> Result<(), CoreError> {
    match description {
        Some(d) if d.chars().count() > MAX_RULE_DESCRIPTION_LENGTH => {
            Err(CoreError::Validation(format!(
                "Rule description exceeds maximum length of {MAX_RULE_DESCRIPTION_LENGTH} characters"
            )))
        }
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::json;

    use super::*;

    fn create_input() -> CreateAutomationRule {
        serde_json::from_value(json!({
            "name": "Big order alert",
            "trigger_type": "EVENT_BASED",
            "trigger_config": {"event_type": "order.created"},
            "conditions": {"combinator": "AND", "predicates": [
                {"field": "amount", "operator": "greater_than", "value": 100}
            ]},
            "actions": [{"action_type": "NOTIFY", "config": {"title": "Order", "message": "{{amount}}"}}]
        }))
        .unwrap()
    }

    fn rule(id: DbId, priority: i32, age_secs: i64) -> AutomationRule {
        let input = create_input();
        let created_at = Utc::now() - Duration::seconds(age_secs);
        AutomationRule {
            id,
            business_id: 1,
            name: input.name.clone(),
            description: None,
            trigger_type: input.trigger_type,
            trigger_config: input.validate().unwrap(),
            conditions: input.conditions,
            actions: input.actions,
            status: RuleStatus::Active,
            priority,
            execution_count: 0,
            success_count: 0,
            failure_count: 0,
            last_executed_at: None,
            created_by: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn create_input_validates_and_defaults_to_draft() {
        let input = create_input();
        assert!(input.validate().is_ok());
        assert_eq!(input.status_or_default(), RuleStatus::Draft);
    }

    #[test]
    fn create_rejects_paused_and_blank_name() {
        let mut input = create_input();
        input.status = Some(RuleStatus::Paused);
        assert!(input.validate().is_err());

        let mut input = create_input();
        input.name = "   ".into();
        assert!(input.validate().is_err());
    }

    #[test]
    fn create_rejects_long_description() {
        let mut input = create_input();
        input.description = Some("x".repeat(MAX_RULE_DESCRIPTION_LENGTH + 1));
        assert!(input.validate().is_err());
    }

    #[test]
    fn status_transitions() {
        assert!(RuleStatus::Active.can_transition_to(RuleStatus::Paused));
        assert!(RuleStatus::Paused.can_transition_to(RuleStatus::Active));
        assert!(RuleStatus::Draft.can_transition_to(RuleStatus::Active));
        assert!(RuleStatus::Active.can_transition_to(RuleStatus::Active));
        assert!(!RuleStatus::Active.can_transition_to(RuleStatus::Draft));
        assert!(RuleStatus::Paused.transition_to(RuleStatus::Draft).is_err());
    }

    #[test]
    fn update_revalidates_trigger_on_type_change() {
        let existing = rule(1, 0, 0);
        let patch = UpdateAutomationRule {
            trigger_type: Some(TriggerType::TimeBased),
            ..Default::default()
        };
        assert!(patch.apply_to(&existing).is_err());

        let patch = UpdateAutomationRule {
            trigger_type: Some(TriggerType::TimeBased),
            trigger_config: Some(json!({"interval_minutes": 15})),
            priority: Some(9),
            ..Default::default()
        };
        let updated = patch.apply_to(&existing).unwrap();
        assert_eq!(updated.trigger_type, TriggerType::TimeBased);
        assert_eq!(updated.priority, 9);
        assert_eq!(updated.execution_count, existing.execution_count);
    }

    #[test]
    fn update_can_set_keep_or_clear_description() {
        let mut existing = rule(1, 0, 0);
        existing.description = Some("old".to_string());

        let keep: UpdateAutomationRule = serde_json::from_value(json!({"priority": 2})).unwrap();
        assert_eq!(keep.description, None);
        assert_eq!(keep.apply_to(&existing).unwrap().description.as_deref(), Some("old"));

        let set: UpdateAutomationRule =
            serde_json::from_value(json!({"description": "new"})).unwrap();
        assert_eq!(set.apply_to(&existing).unwrap().description.as_deref(), Some("new"));

        let clear: UpdateAutomationRule =
            serde_json::from_value(json!({"description": null})).unwrap();
        assert_eq!(clear.description, Some(None));
        assert_eq!(clear.apply_to(&existing).unwrap().description, None);
    }

    #[test]
    fn update_rejects_invalid_actions() {
        let existing = rule(1, 0, 0);
        let patch = UpdateAutomationRule {
            actions: Some(vec![ActionSpec::new("WEBHOOK", json!({}))]),
            ..Default::default()
        };
        assert!(patch.apply_to(&existing).is_err());
    }

    #[test]
    fn candidates_order_by_priority_then_age() {
        let mut rules = vec![rule(1, 0, 100), rule(2, 5, 10), rule(3, 5, 50), rule(4, 0, 200)];
        order_candidates(&mut rules);
        let ids: Vec<DbId> = rules.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 2, 4, 1]);
    }

    #[test]
    fn success_rate_is_none_before_first_attempt() {
        let mut r = rule(1, 0, 0);
        assert_eq!(r.stats().success_rate(), None);
        r.execution_count = 4;
        r.success_count = 3;
        r.failure_count = 1;
        assert_eq!(r.stats().success_rate(), Some(0.75));
    }
}
