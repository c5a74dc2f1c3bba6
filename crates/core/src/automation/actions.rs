//! Action specs and typed action configuration.
//!
//! A rule stores its actions as an ordered list of `{action_type, config}`
//! pairs. Known action types decode into a typed [`ActionConfig`] when the
//! rule is saved; any other tag is a [`ActionType::Custom`] passthrough that
//! a host application may register a handler for.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Maximum number of actions a single rule may configure.
pub const MAX_ACTIONS_PER_RULE: usize = 20;

// ---------------------------------------------------------------------------
// ActionType
// ---------------------------------------------------------------------------

/// Tag identifying which handler runs an action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionType {
    Notify,
    CreateContent,
    SchedulePost,
    UpdateStatus,
    Webhook,
    Custom(String),
}

impl ActionType {
    /// Return the wire-format string, also used as the registry key.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Notify => "NOTIFY",
            Self::CreateContent => "CREATE_CONTENT",
            Self::SchedulePost => "SCHEDULE_POST",
            Self::UpdateStatus => "UPDATE_STATUS",
            Self::Webhook => "WEBHOOK",
            Self::Custom(name) => name,
        }
    }
}

impl From<String> for ActionType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "NOTIFY" => Self::Notify,
            "CREATE_CONTENT" => Self::CreateContent,
            "SCHEDULE_POST" => Self::SchedulePost,
            "UPDATE_STATUS" => Self::UpdateStatus,
            "WEBHOOK" => Self::Webhook,
            _ => Self::Custom(s),
        }
    }
}

impl From<&str> for ActionType {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<ActionType> for String {
    fn from(t: ActionType) -> Self {
        match t {
            ActionType::Custom(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ActionSpec
// ---------------------------------------------------------------------------

/// One configured action on a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub action_type: ActionType,
    #[serde(default = "empty_object")]
    pub config: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl ActionSpec {
    pub fn new(action_type: impl Into<ActionType>, config: Value) -> Self {
        Self {
            action_type: action_type.into(),
            config,
        }
    }

    /// Decode and validate this action's config.
    pub fn parse_config(&self) -> Result<ActionConfig, CoreError> {
        ActionConfig::parse(&self.action_type, &self.config)
    }
}

/// Validate an action list when a rule is created or updated.
pub fn validate_actions(actions: &[ActionSpec]) -> Result<(), CoreError> {
    if actions.len() > MAX_ACTIONS_PER_RULE {
        return Err(CoreError::Validation(format!(
            "A rule may configure at most {MAX_ACTIONS_PER_RULE} actions"
        )));
    }
    for (idx, action) in actions.iter().enumerate() {
        if action.action_type.as_str().trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "action {idx} must have a non-empty action_type"
            )));
        }
        action.parse_config().map_err(|e| match e {
            CoreError::Validation(msg) => CoreError::Validation(format!("action {idx}: {msg}")),
            other => other,
        })?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Typed configs
// ---------------------------------------------------------------------------

/// NOTIFY: in-app notification. `title` and `message` may contain
/// `{{ path }}` placeholders resolved against the trigger data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub recipient_ids: Vec<DbId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// CREATE_CONTENT: ask the content service to draft a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateContentConfig {
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub auto_publish: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// SCHEDULE_POST: queue a post, either after a delay or at a fixed time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulePostConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<DbId>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<Timestamp>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// UPDATE_STATUS: move a business entity (conversation, lead, post) to a
/// new status. The entity id is read from `entity_id_field` in the trigger
/// data, defaulting to `"entity_id"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatusConfig {
    pub entity_type: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id_field: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UpdateStatusConfig {
    pub fn entity_id_field(&self) -> &str {
        self.entity_id_field.as_deref().unwrap_or("entity_id")
    }
}

/// WEBHOOK: POST a JSON body to an external URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default = "default_true")]
    pub include_trigger_data: bool,
    /// Static payload merged into the request body under `payload`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_true() -> bool {
    true
}

/// Validated action configuration, one variant per known [`ActionType`].
#[derive(Debug, Clone, PartialEq)]
pub enum ActionConfig {
    Notify(NotifyConfig),
    CreateContent(CreateContentConfig),
    SchedulePost(SchedulePostConfig),
    UpdateStatus(UpdateStatusConfig),
    Webhook(WebhookConfig),
    Custom(Map<String, Value>),
}

impl ActionConfig {
    /// Decode and validate a raw config for the given action type.
    pub fn parse(action_type: &ActionType, raw: &Value) -> Result<Self, CoreError> {
        if !raw.is_object() {
            return Err(CoreError::Validation(format!(
                "{action_type} config must be a JSON object"
            )));
        }

        let config = match action_type {
            ActionType::Notify => Self::Notify(decode(action_type, raw)?),
            ActionType::CreateContent => Self::CreateContent(decode(action_type, raw)?),
            ActionType::SchedulePost => Self::SchedulePost(decode(action_type, raw)?),
            ActionType::UpdateStatus => Self::UpdateStatus(decode(action_type, raw)?),
            ActionType::Webhook => Self::Webhook(decode(action_type, raw)?),
            ActionType::Custom(_) => Self::Custom(decode(action_type, raw)?),
        };
        config.validate(action_type)?;
        Ok(config)
    }

    fn validate(&self, action_type: &ActionType) -> Result<(), CoreError> {
        let invalid = |msg: &str| Err(CoreError::Validation(format!("{action_type} {msg}")));

        match self {
            Self::Notify(c) => {
                if c.title.trim().is_empty() || c.message.trim().is_empty() {
                    return invalid("config requires a non-empty 'title' and 'message'");
                }
            }
            Self::CreateContent(c) => {
                if c.content_type.trim().is_empty() {
                    return invalid("config requires a non-empty 'content_type'");
                }
            }
            Self::SchedulePost(c) => {
                if c.delay_minutes.is_none() && c.scheduled_for.is_none() {
                    return invalid("config requires 'delay_minutes' or 'scheduled_for'");
                }
                if c.delay_minutes.is_some_and(|d| d < 0) {
                    return invalid("config 'delay_minutes' must not be negative");
                }
            }
            Self::UpdateStatus(c) => {
                if c.entity_type.trim().is_empty() || c.status.trim().is_empty() {
                    return invalid("config requires a non-empty 'entity_type' and 'status'");
                }
            }
            Self::Webhook(c) => {
                if !(c.url.starts_with("http://") || c.url.starts_with("https://")) {
                    return invalid("config 'url' must start with http:// or https://");
                }
            }
            Self::Custom(_) => {}
        }
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(action_type: &ActionType, raw: &Value) -> Result<T, CoreError> {
    serde_json::from_value(raw.clone())
        .map_err(|e| CoreError::Validation(format!("Invalid {action_type} config: {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
