//! Automation rule domain: trigger → condition → action rules.
//!
//! - [`rules`]: the rule entity, lifecycle status, create/update inputs,
//!   validation, and dispatcher ordering.
//! - [`triggers`]: typed trigger configuration per trigger type.
//! - [`conditions`] / [`evaluator`]: condition trees and their pure evaluator.
//! - [`actions`]: action specs and typed action configuration.
//! - [`execution`]: immutable execution records and per-action results.
//! - [`template`]: `{{ path }}` interpolation against trigger data.

pub mod actions;
pub mod conditions;
pub mod evaluator;
pub mod execution;
pub mod rules;
pub mod template;
pub mod triggers;

pub use actions::{ActionConfig, ActionSpec, ActionType};
pub use conditions::{Combinator, ConditionTree, Operator, Predicate};
pub use evaluator::evaluate;
pub use execution::{
    ActionRecord, AutomationExecution, ExecutionResult, ExecutionStatus, ExecutionSummary,
};
pub use rules::{
    order_candidates, AutomationRule, CounterOutcome, CreateAutomationRule, RuleStats,
    RuleStatus, UpdateAutomationRule,
};
pub use template::render_template;
pub use triggers::{TriggerConfig, TriggerType};
