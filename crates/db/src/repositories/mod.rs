//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod automation_execution_repo;
pub mod automation_rule_repo;

pub use automation_execution_repo::AutomationExecutionRepo;
pub use automation_rule_repo::AutomationRuleRepo;
