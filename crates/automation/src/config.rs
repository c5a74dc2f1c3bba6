use std::str::FromStr;
use std::time::Duration;

/// Largest history page a caller may request.
pub const HISTORY_MAX_LIMIT: i64 = 500;

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Upper bound on a single action handler call (default: 10 s).
    pub action_timeout: Duration,
    /// Slack added on top of `actions × action_timeout` for the whole
    /// action phase (default: 5 s).
    pub overall_grace: Duration,
    /// History page size when the caller gives none (default: 100).
    pub history_default_limit: i64,
    /// Request timeout for the built-in webhook handler (default: 10 s).
    pub webhook_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            action_timeout: Duration::from_secs(10),
            overall_grace: Duration::from_secs(5),
            history_default_limit: 100,
            webhook_timeout: Duration::from_secs(10),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                            | Default |
    /// |------------------------------------|---------|
    /// | `AUTOMATION_ACTION_TIMEOUT_SECS`   | `10`    |
    /// | `AUTOMATION_OVERALL_GRACE_SECS`    | `5`     |
    /// | `AUTOMATION_HISTORY_DEFAULT_LIMIT` | `100`   |
    /// | `AUTOMATION_WEBHOOK_TIMEOUT_SECS`  | `10`    |
    ///
    /// Unparsable or out-of-range values are logged and replaced by the
    /// default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let action_timeout_secs = parse_or(
            &lookup,
            "AUTOMATION_ACTION_TIMEOUT_SECS",
            defaults.action_timeout.as_secs(),
            |v| *v >= 1,
        );
        let overall_grace_secs = parse_or(
            &lookup,
            "AUTOMATION_OVERALL_GRACE_SECS",
            defaults.overall_grace.as_secs(),
            |_| true,
        );
        let history_default_limit = parse_or(
            &lookup,
            "AUTOMATION_HISTORY_DEFAULT_LIMIT",
            defaults.history_default_limit,
            |v| (1..=HISTORY_MAX_LIMIT).contains(v),
        );
        let webhook_timeout_secs = parse_or(
            &lookup,
            "AUTOMATION_WEBHOOK_TIMEOUT_SECS",
            defaults.webhook_timeout.as_secs(),
            |v| *v >= 1,
        );

        Self {
            action_timeout: Duration::from_secs(action_timeout_secs),
            overall_grace: Duration::from_secs(overall_grace_secs),
            history_default_limit,
            webhook_timeout: Duration::from_secs(webhook_timeout_secs),
        }
    }

    /// Budget for a whole action phase of `action_count` actions.
    pub fn action_budget(&self, action_count: usize) -> Duration {
        let count = u32::try_from(action_count).unwrap_or(u32::MAX);
        self.action_timeout
            .saturating_mul(count)
            .saturating_add(self.overall_grace)
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    valid: impl Fn(&T) -> bool,
) -> T
where
    T: FromStr + std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        _ => {
            tracing::warn!(key, value = %raw, default = %default, "Invalid config value, using default");
            default
        }
    }
}
