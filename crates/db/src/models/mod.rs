//! Row structs and insert / update DTOs.
//!
//! Enum columns are carried as their wire strings and JSON columns as
//! `serde_json::Value`; conversion into typed domain values happens in the
//! store layer.

pub mod automation_execution;
pub mod automation_rule;
