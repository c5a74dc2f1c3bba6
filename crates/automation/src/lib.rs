//! SocialHub automation rule engine.
//!
//! Rules are loaded through a [`RuleStore`], their conditions evaluated
//! against the trigger data, and their actions dispatched through an
//! [`ActionHandlerRegistry`]. Every invocation produces exactly one
//! immutable execution record, written by the [`ExecutionLedger`].
//!
//! - [`engine`]: the guard → condition → action orchestrator.
//! - [`executor`]: per-action isolation and timeouts.
//! - [`registry`]: the handler seam and closure adapter.
//! - [`handlers`]: built-in NOTIFY and WEBHOOK handlers.
//! - [`ledger`]: execution records and rule counters.
//! - [`store`]: store traits with Postgres and in-memory implementations.

pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod ledger;
pub mod registry;
pub mod store;

pub use config::EngineConfig;
pub use engine::{AutomationEngine, EXECUTION_COMPLETED_EVENT};
pub use error::{ActionError, StoreError};
pub use executor::ActionExecutor;
pub use handlers::{register_builtin_handlers, NotifyHandler, WebhookHandler, NOTIFICATION_EVENT};
pub use ledger::ExecutionLedger;
pub use registry::{handler_fn, ActionContext, ActionHandler, ActionHandlerRegistry};
pub use store::memory::MemoryAutomationStore;
pub use store::postgres::PgAutomationStore;
pub use store::{ExecutionStore, RuleStore};
