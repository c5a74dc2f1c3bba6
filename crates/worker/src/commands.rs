//! Operator subcommands.
//!
//! Every command prints JSON to stdout so output can be piped into `jq`;
//! logs go to stderr.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use socialhub_automation::{AutomationEngine, RuleStore};
use socialhub_core::automation::RuleStatus;
use socialhub_core::types::DbId;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "socialhub-automation", about = "Run and inspect SocialHub automation rules")]
pub struct Cli {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Execute a rule once against a JSON trigger context
    Run {
        #[arg(long)]
        business: DbId,
        #[arg(long)]
        rule: DbId,
        /// Trigger data as a JSON object
        #[arg(long, default_value = "{}", value_parser = parse_json)]
        data: Value,
    },

    /// Re-run the rule behind a recorded execution with its stored trigger data
    Replay {
        #[arg(long)]
        business: DbId,
        #[arg(long)]
        execution: Uuid,
    },

    /// Show recent executions, newest first
    History {
        #[arg(long)]
        business: DbId,
        /// Only executions of this rule
        #[arg(long)]
        rule: Option<DbId>,
        /// Page size (0-500)
        #[arg(short, long)]
        limit: Option<i64>,
    },

    /// List rules in dispatch order with their counters
    Rules {
        #[arg(long)]
        business: DbId,
        /// ACTIVE, PAUSED or DRAFT
        #[arg(long, value_parser = parse_status)]
        status: Option<RuleStatus>,
    },

    /// Change a rule's status
    SetStatus {
        #[arg(long)]
        business: DbId,
        #[arg(long)]
        rule: DbId,
        #[arg(value_parser = parse_status)]
        status: RuleStatus,
    },
}

/// What the commands operate on.
pub struct Services {
    pub engine: AutomationEngine,
    pub rules: Arc<dyn RuleStore>,
}

fn parse_json(raw: &str) -> Result<Value, String> {
    let value: Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    if !value.is_object() {
        return Err("trigger data must be a JSON object".to_string());
    }
    Ok(value)
}

fn parse_status(raw: &str) -> Result<RuleStatus, String> {
    RuleStatus::from_str(&raw.to_ascii_uppercase()).map_err(|e| e.to_string())
}

/// Run a command, printing its result.
pub async fn run(command: Command, services: &Services) -> anyhow::Result<()> {
    let output = match command {
        Command::Run {
            business,
            rule,
            data,
        } => {
            let execution = services.engine.execute_rule(business, rule, data).await;
            serde_json::to_value(&execution)?
        }
        Command::Replay {
            business,
            execution,
        } => {
            let execution = services
                .engine
                .replay_execution(business, execution)
                .await
                .context("Replay failed")?;
            serde_json::to_value(&execution)?
        }
        Command::History {
            business,
            rule,
            limit,
        } => {
            let history = match rule {
                Some(rule_id) => services.engine.rule_history(business, rule_id, limit).await?,
                None => services.engine.history(business, limit).await?,
            };
            serde_json::to_value(&history)?
        }
        Command::Rules { business, status } => {
            let rules = services.rules.list_rules(business, status).await?;
            Value::Array(
                rules
                    .iter()
                    .map(|rule| {
                        let stats = rule.stats();
                        json!({
                            "id": rule.id,
                            "name": rule.name,
                            "status": rule.status,
                            "trigger_type": rule.trigger_type,
                            "priority": rule.priority,
                            "stats": stats,
                            "success_rate": stats.success_rate(),
                        })
                    })
                    .collect(),
            )
        }
        Command::SetStatus {
            business,
            rule,
            status,
        } => {
            let rule = services
                .rules
                .update_rule_status(rule, business, status)
                .await
                .context("Status change failed")?;
            tracing::info!(rule_id = rule.id, status = %rule.status, "Rule status updated");
            serde_json::to_value(&rule)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        let mut full = vec!["socialhub-automation", "--database-url", "postgres://localhost/x"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full)
    }

    #[test]
    fn run_parses_trigger_data() {
        let cli = parse(&["run", "--business", "1", "--rule", "2", "--data", r#"{"amount":150}"#])
            .unwrap();
        match cli.command {
            Command::Run { business, rule, data } => {
                assert_eq!((business, rule), (1, 2));
                assert_eq!(data["amount"], 150);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn run_rejects_non_object_data() {
        assert!(parse(&["run", "--business", "1", "--rule", "2", "--data", "[1]"]).is_err());
    }

    #[test]
    fn set_status_accepts_lowercase() {
        let cli = parse(&["set-status", "--business", "1", "--rule", "2", "paused"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::SetStatus {
                status: RuleStatus::Paused,
                ..
            }
        ));
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(parse(&["rules", "--business", "1", "--status", "ARCHIVED"]).is_err());
    }

    #[test]
    fn history_defaults() {
        let cli = parse(&["history", "--business", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::History {
                business: 3,
                rule: None,
                limit: None
            }
        ));
    }
}
