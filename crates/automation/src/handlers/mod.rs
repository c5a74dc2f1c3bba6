//! Built-in action handlers.

pub mod notify;
pub mod webhook;

use std::sync::Arc;

use socialhub_core::automation::ActionType;
use socialhub_events::{EventBus, WebhookDelivery};

pub use notify::{NotifyHandler, NOTIFICATION_EVENT};
pub use webhook::WebhookHandler;

use crate::registry::ActionHandlerRegistry;

/// Register the NOTIFY and WEBHOOK handlers.
pub fn register_builtin_handlers(
    registry: &mut ActionHandlerRegistry,
    bus: Arc<EventBus>,
    delivery: WebhookDelivery,
) -> &mut ActionHandlerRegistry {
    registry
        .register(ActionType::Notify, NotifyHandler::new(bus))
        .register(ActionType::Webhook, WebhookHandler::new(delivery))
}
