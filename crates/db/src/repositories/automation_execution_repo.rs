//! Repository for the `automation_executions` table.
//!
//! Insert and read only: the table rejects updates at the database level.

use socialhub_core::types::DbId;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::automation_execution::{
    AutomationExecutionRow, ExecutionSummaryRow, NewAutomationExecution,
};

/// Column list for automation_executions queries.
const COLUMNS: &str = "id, rule_id, business_id, status, triggered_at, completed_at, \
    trigger_data, execution_result, error_message, execution_duration_ms";

/// Column list for history queries joined with `automation_rules`.
const SUMMARY_COLUMNS: &str = "e.id, e.rule_id, e.business_id, e.status, e.triggered_at, \
    e.completed_at, e.trigger_data, e.execution_result, e.error_message, \
    e.execution_duration_ms, COALESCE(r.name, '') AS rule_name";

/// Join clause for history queries. LEFT JOIN keeps executions whose rule
/// id never resolved.
const JOIN: &str = "automation_executions e \
    LEFT JOIN automation_rules r ON r.id = e.rule_id AND r.business_id = e.business_id";

/// Provides append and history queries for execution records.
pub struct AutomationExecutionRepo;

impl AutomationExecutionRepo {
    /// Append an execution record, returning the stored row.
    pub async fn create(
        pool: &PgPool,
        input: &NewAutomationExecution,
    ) -> Result<AutomationExecutionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO automation_executions
                (id, rule_id, business_id, status, triggered_at, completed_at,
                 trigger_data, execution_result, error_message, execution_duration_ms)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AutomationExecutionRow>(&query)
            .bind(input.id)
            .bind(input.rule_id)
            .bind(input.business_id)
            .bind(&input.status)
            .bind(input.triggered_at)
            .bind(input.completed_at)
            .bind(&input.trigger_data)
            .bind(&input.execution_result)
            .bind(&input.error_message)
            .bind(input.execution_duration_ms)
            .fetch_one(pool)
            .await
    }

    /// Find an execution by id within a tenant.
    pub async fn find_by_id(
        pool: &PgPool,
        business_id: DbId,
        id: Uuid,
    ) -> Result<Option<AutomationExecutionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM automation_executions WHERE id = $1 AND business_id = $2"
        );
        sqlx::query_as::<_, AutomationExecutionRow>(&query)
            .bind(id)
            .bind(business_id)
            .fetch_optional(pool)
            .await
    }

    /// A tenant's most recent executions, newest first.
    pub async fn history(
        pool: &PgPool,
        business_id: DbId,
        limit: i64,
    ) -> Result<Vec<ExecutionSummaryRow>, sqlx::Error> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM {JOIN} \
             WHERE e.business_id = $1 \
             ORDER BY e.triggered_at DESC, e.completed_at DESC, e.id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, ExecutionSummaryRow>(&query)
            .bind(business_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// One rule's most recent executions, newest first.
    pub async fn history_for_rule(
        pool: &PgPool,
        business_id: DbId,
        rule_id: DbId,
        limit: i64,
    ) -> Result<Vec<ExecutionSummaryRow>, sqlx::Error> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM {JOIN} \
             WHERE e.business_id = $1 AND e.rule_id = $2 \
             ORDER BY e.triggered_at DESC, e.completed_at DESC, e.id DESC \
             LIMIT $3"
        );
        sqlx::query_as::<_, ExecutionSummaryRow>(&query)
            .bind(business_id)
            .bind(rule_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
