//! Trigger types and their typed configuration.
//!
//! The engine never branches on the trigger; the type and config are owned
//! by the external dispatcher that decides when a rule fires. They are still
//! validated when a rule is created so that a dispatcher never reads a
//! config it cannot act on.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// TriggerType
// ---------------------------------------------------------------------------

/// What kind of signal makes a dispatcher consider a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerType {
    TimeBased,
    EventBased,
    ConditionBased,
}

impl TriggerType {
    /// Return the wire-format string for this variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimeBased => "TIME_BASED",
            Self::EventBased => "EVENT_BASED",
            Self::ConditionBased => "CONDITION_BASED",
        }
    }

    /// Parse from a wire-format string.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "TIME_BASED" => Ok(Self::TimeBased),
            "EVENT_BASED" => Ok(Self::EventBased),
            "CONDITION_BASED" => Ok(Self::ConditionBased),
            _ => Err(CoreError::Validation(format!(
                "Invalid trigger_type: '{s}'. Must be one of: TIME_BASED, EVENT_BASED, \
                 CONDITION_BASED"
            ))),
        }
    }
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Typed configs
// ---------------------------------------------------------------------------

/// Schedule for a TIME_BASED rule. At least one of `cron` or
/// `interval_minutes` must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeTrigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Keys this version does not know about, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Business event an EVENT_BASED rule listens for, e.g. `"message.received"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTrigger {
    pub event_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Polling cadence for a CONDITION_BASED rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionTrigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_interval_minutes: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Validated trigger configuration, one variant per [`TriggerType`].
///
/// Serializes as the plain config object (no tag); the trigger type is
/// stored alongside it on the rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TriggerConfig {
    TimeBased(TimeTrigger),
    EventBased(EventTrigger),
    ConditionBased(ConditionTrigger),
}

impl TriggerConfig {
    /// Parse and validate a raw config for the given trigger type.
    ///
    /// `null` is accepted as an empty object.
    pub fn parse(trigger_type: TriggerType, raw: &Value) -> Result<Self, CoreError> {
        let raw = match raw {
            Value::Null => Value::Object(Map::new()),
            Value::Object(_) => raw.clone(),
            _ => {
                return Err(CoreError::Validation(
                    "trigger_config must be a JSON object".to_string(),
                ))
            }
        };

        let config = match trigger_type {
            TriggerType::TimeBased => Self::TimeBased(decode(trigger_type, raw)?),
            TriggerType::EventBased => Self::EventBased(decode(trigger_type, raw)?),
            TriggerType::ConditionBased => Self::ConditionBased(decode(trigger_type, raw)?),
        };
        config.validate()?;
        Ok(config)
    }

    /// The trigger type this config belongs to.
    pub fn trigger_type(&self) -> TriggerType {
        match self {
            Self::TimeBased(_) => TriggerType::TimeBased,
            Self::EventBased(_) => TriggerType::EventBased,
            Self::ConditionBased(_) => TriggerType::ConditionBased,
        }
    }

    /// Serialize back to the stored JSON object.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Object(Map::new()))
    }

    fn validate(&self) -> Result<(), CoreError> {
        match self {
            Self::TimeBased(t) => {
                let has_cron = t.cron.as_deref().is_some_and(|c| !c.trim().is_empty());
                if t.interval_minutes == Some(0) {
                    return Err(CoreError::Validation(
                        "interval_minutes must be at least 1".to_string(),
                    ));
                }
                if !has_cron && t.interval_minutes.is_none() {
                    return Err(CoreError::Validation(
                        "TIME_BASED trigger_config must contain 'cron' or 'interval_minutes'"
                            .to_string(),
                    ));
                }
            }
            Self::EventBased(e) => {
                if e.event_type.trim().is_empty() {
                    return Err(CoreError::Validation(
                        "EVENT_BASED trigger_config must contain a non-empty 'event_type'"
                            .to_string(),
                    ));
                }
            }
            Self::ConditionBased(c) => {
                if c.check_interval_minutes == Some(0) {
                    return Err(CoreError::Validation(
                        "check_interval_minutes must be at least 1".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(trigger_type: TriggerType, raw: Value) -> Result<T, CoreError> {
    serde_json::from_value(raw).map_err(|e| {
        CoreError::Validation(format!("Invalid {trigger_type} trigger_config: {e}"))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
