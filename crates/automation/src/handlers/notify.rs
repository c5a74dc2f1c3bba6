//! NOTIFY: render the notification against the trigger data and publish it
//! on the event bus, where the notification router picks it up.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use socialhub_core::automation::actions::NotifyConfig;
use socialhub_core::automation::{render_template, ActionConfig, ActionType};
use socialhub_events::{EventBus, PlatformEvent};

use crate::error::ActionError;
use crate::registry::{ActionContext, ActionHandler};

/// Event type published for every NOTIFY action.
pub const NOTIFICATION_EVENT: &str = "automation.notification";

pub struct NotifyHandler {
    bus: Arc<EventBus>,
}

impl NotifyHandler {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl ActionHandler for NotifyHandler {
    async fn handle(&self, config: &Value, ctx: &ActionContext) -> Result<Value, ActionError> {
        let config: NotifyConfig = match ActionConfig::parse(&ActionType::Notify, config)? {
            ActionConfig::Notify(c) => c,
            _ => return Err(ActionError::InvalidConfig("expected a NOTIFY config".into())),
        };

        let title = render_template(&config.title, &ctx.trigger_data);
        let message = render_template(&config.message, &ctx.trigger_data);

        let event = PlatformEvent::new(NOTIFICATION_EVENT)
            .with_business(ctx.business_id)
            .with_source("automation_rule", ctx.rule_id)
            .with_payload(json!({
                "rule_name": ctx.rule_name,
                "title": title,
                "message": message,
                "recipient_ids": config.recipient_ids,
                "channel": config.channel,
            }));
        let subscribers = self.bus.publish(event);

        tracing::debug!(rule_id = ctx.rule_id, subscribers, "Automation notification published");
        Ok(json!({
            "title": title,
            "message": message,
            "recipients": config.recipient_ids.len(),
            "subscribers": subscribers,
        }))
    }
}
