//! WEBHOOK: POST the rule context to an external endpoint. One attempt per
//! execution; a non-2xx answer fails the action.

use async_trait::async_trait;
use serde_json::{json, Value};
use socialhub_core::automation::actions::WebhookConfig;
use socialhub_core::automation::{ActionConfig, ActionType};
use socialhub_events::WebhookDelivery;

use crate::error::ActionError;
use crate::registry::{ActionContext, ActionHandler};

pub struct WebhookHandler {
    delivery: WebhookDelivery,
}

impl WebhookHandler {
    pub fn new(delivery: WebhookDelivery) -> Self {
        Self { delivery }
    }
}

/// Request body sent to the endpoint.
fn request_body(config: &WebhookConfig, ctx: &ActionContext) -> Value {
    let mut body = json!({
        "rule_id": ctx.rule_id,
        "rule_name": ctx.rule_name,
        "business_id": ctx.business_id,
        "action_index": ctx.action_index,
    });
    if config.include_trigger_data {
        body["trigger_data"] = ctx.trigger_data.clone();
    }
    if let Some(payload) = &config.payload {
        body["payload"] = payload.clone();
    }
    body
}

#[async_trait]
impl ActionHandler for WebhookHandler {
    async fn handle(&self, config: &Value, ctx: &ActionContext) -> Result<Value, ActionError> {
        let config: WebhookConfig = match ActionConfig::parse(&ActionType::Webhook, config)? {
            ActionConfig::Webhook(c) => c,
            _ => return Err(ActionError::InvalidConfig("expected a WEBHOOK config".into())),
        };

        let body = request_body(&config, ctx);
        let status = self
            .delivery
            .send(&config.url, &config.headers, &body)
            .await
            .map_err(|e| ActionError::Failed(e.to_string()))?;

        Ok(json!({ "url": config.url, "status": status }))
    }
}
