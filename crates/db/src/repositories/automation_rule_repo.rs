//! Repository for the `automation_rules` table.

use socialhub_core::types::DbId;
use sqlx::PgPool;

use crate::models::automation_rule::{AutomationRuleContent, AutomationRuleRow, NewAutomationRule};

/// Column list for automation_rules queries.
const COLUMNS: &str = "id, business_id, name, description, trigger_type, trigger_config, \
    conditions, actions, status, priority, execution_count, success_count, failure_count, \
    last_executed_at, created_by, created_at, updated_at";

/// Provides CRUD and counter operations for automation rules.
///
/// Every read and write is scoped by `business_id` except the counter
/// updates, which are only issued for a rule the caller has already loaded.
pub struct AutomationRuleRepo;

impl AutomationRuleRepo {
    /// Insert a new rule, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &NewAutomationRule,
    ) -> Result<AutomationRuleRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO automation_rules
                (business_id, name, description, trigger_type, trigger_config,
                 conditions, actions, status, priority, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AutomationRuleRow>(&query)
            .bind(input.business_id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.trigger_type)
            .bind(&input.trigger_config)
            .bind(&input.conditions)
            .bind(&input.actions)
            .bind(&input.status)
            .bind(input.priority)
            .bind(input.created_by)
            .fetch_one(pool)
            .await
    }

    /// Find a rule by id within a tenant.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
        business_id: DbId,
    ) -> Result<Option<AutomationRuleRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM automation_rules WHERE id = $1 AND business_id = $2");
        sqlx::query_as::<_, AutomationRuleRow>(&query)
            .bind(id)
            .bind(business_id)
            .fetch_optional(pool)
            .await
    }

    /// List a tenant's rules, optionally filtered by status, in dispatch
    /// order: priority descending, oldest first.
    pub async fn list(
        pool: &PgPool,
        business_id: DbId,
        status: Option<&str>,
    ) -> Result<Vec<AutomationRuleRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM automation_rules \
             WHERE business_id = $1 AND ($2::TEXT IS NULL OR status = $2) \
             ORDER BY priority DESC, created_at ASC, id ASC"
        );
        sqlx::query_as::<_, AutomationRuleRow>(&query)
            .bind(business_id)
            .bind(status)
            .fetch_all(pool)
            .await
    }

    /// Replace a rule's editable columns. Returns `None` if not found.
    pub async fn update_content(
        pool: &PgPool,
        id: DbId,
        business_id: DbId,
        input: &AutomationRuleContent,
    ) -> Result<Option<AutomationRuleRow>, sqlx::Error> {
        let query = format!(
            "UPDATE automation_rules SET
                name           = $1,
                description    = $2,
                trigger_type   = $3,
                trigger_config = $4,
                conditions     = $5,
                actions        = $6,
                priority       = $7
             WHERE id = $8 AND business_id = $9
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AutomationRuleRow>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.trigger_type)
            .bind(&input.trigger_config)
            .bind(&input.conditions)
            .bind(&input.actions)
            .bind(input.priority)
            .bind(id)
            .bind(business_id)
            .fetch_optional(pool)
            .await
    }

    /// Set a rule's status. Returns `None` if not found.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        business_id: DbId,
        status: &str,
    ) -> Result<Option<AutomationRuleRow>, sqlx::Error> {
        let query = format!(
            "UPDATE automation_rules SET status = $1 \
             WHERE id = $2 AND business_id = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AutomationRuleRow>(&query)
            .bind(status)
            .bind(id)
            .bind(business_id)
            .fetch_optional(pool)
            .await
    }

    /// Delete a rule and its execution history in one transaction.
    /// Returns `true` if the rule existed.
    pub async fn delete(pool: &PgPool, id: DbId, business_id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let result = sqlx::query("DELETE FROM automation_rules WHERE id = $1 AND business_id = $2")
            .bind(id)
            .bind(business_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        let removed =
            sqlx::query("DELETE FROM automation_executions WHERE rule_id = $1 AND business_id = $2")
                .bind(id)
                .bind(business_id)
                .execute(&mut *tx)
                .await?;

        tx.commit().await?;
        tracing::debug!(
            rule_id = id,
            executions = removed.rows_affected(),
            "Deleted automation rule and its history"
        );
        Ok(true)
    }

    /// Atomically count a successful attempt. Returns `true` if a row was updated.
    pub async fn record_success(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE automation_rules SET \
                execution_count = execution_count + 1, \
                success_count = success_count + 1, \
                last_executed_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Atomically count a failed attempt. Returns `true` if a row was updated.
    pub async fn record_failure(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE automation_rules SET \
                execution_count = execution_count + 1, \
                failure_count = failure_count + 1 \
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
