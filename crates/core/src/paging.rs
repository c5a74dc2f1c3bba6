//! Limit helpers shared by history queries.

/// Clamp a user-provided limit into `0..=max`, falling back to `default`.
/// An explicit zero (or a negative value) asks for an empty page.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).clamp(0, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_limit_uses_default_when_none() {
        assert_eq!(clamp_limit(None, 100, 500), 100);
    }

    #[test]
    fn clamp_limit_respects_max() {
        assert_eq!(clamp_limit(Some(900), 100, 500), 500);
    }

    #[test]
    fn clamp_limit_zero_and_negative_mean_empty_page() {
        assert_eq!(clamp_limit(Some(0), 100, 500), 0);
        assert_eq!(clamp_limit(Some(-5), 100, 500), 0);
    }

    #[test]
    fn clamp_limit_passes_through_valid_value() {
        assert_eq!(clamp_limit(Some(2), 100, 500), 2);
    }
}
