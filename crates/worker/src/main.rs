mod commands;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use socialhub_automation::{
    register_builtin_handlers, ActionHandlerRegistry, AutomationEngine, EngineConfig,
    PgAutomationStore,
};
use socialhub_events::{EventBus, WebhookDelivery};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{Cli, Services};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "socialhub_automation=debug,socialhub_db=info,socialhub_events=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::from_env();

    let pool = socialhub_db::create_pool(&cli.database_url)
        .await
        .context("Failed to connect to database")?;
    socialhub_db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Database ready");

    let bus = Arc::new(EventBus::default());
    let delivery = WebhookDelivery::new(config.webhook_timeout)
        .context("Failed to build webhook HTTP client")?;
    let mut registry = ActionHandlerRegistry::new();
    register_builtin_handlers(&mut registry, bus.clone(), delivery);

    let store = Arc::new(PgAutomationStore::new(pool));
    let engine = AutomationEngine::with_config(
        store.clone(),
        store.clone(),
        Arc::new(registry),
        config,
    )
    .with_event_bus(bus);

    let services = Services { engine, rules: store };
    commands::run(cli.command, &services).await
}
