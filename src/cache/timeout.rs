//! Timeout Module
//!
//! Caller-facing timeout argument and its resolution to an absolute expiry.

/// How long a written item should live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeout {
    /// Use the cache's configured default
    #[default]
    Default,
    /// Never expire
    Never,
    /// Expire after this many seconds; zero or less expires immediately
    Seconds(i64),
}

impl Timeout {
    /// Replaces `Default` with the configured default timeout.
    ///
    /// A configured default of `None` means items never expire.
    pub fn resolve(self, default: Option<i64>) -> Timeout {
        match self {
            Timeout::Default => default.map_or(Timeout::Never, Timeout::Seconds),
            other => other,
        }
    }

    /// Computes the absolute expiry (epoch seconds) for an item written at `now`.
    ///
    /// Non-positive timeouts land in the past so the item reads as absent; a
    /// zero timeout is placed one second back.
    pub fn expiry_from(self, now: f64, default: Option<i64>) -> Option<f64> {
        let Timeout::Seconds(secs) = self.resolve(default) else {
            return None;
        };

        if secs == 0 {
            Some(now - 1.0)
        } else {
            Some(now + secs as f64)
        }
    }
}

impl From<Option<i64>> for Timeout {
    fn from(secs: Option<i64>) -> Self {
        secs.map_or(Timeout::Never, Timeout::Seconds)
    }
}

impl From<i64> for Timeout {
    fn from(secs: i64) -> Self {
        Timeout::Seconds(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: f64 = 1_700_000_000.0;

    #[test]
    fn test_default_uses_configured_timeout() {
        assert_eq!(Timeout::Default.expiry_from(NOW, Some(300)), Some(NOW + 300.0));
    }

    #[test]
    fn test_default_without_configured_timeout_never_expires() {
        assert_eq!(Timeout::Default.expiry_from(NOW, None), None);
    }

    #[test]
    fn test_never_ignores_default() {
        assert_eq!(Timeout::Never.expiry_from(NOW, Some(300)), None);
    }

    #[test]
    fn test_zero_expires_in_the_past() {
        let expiry = Timeout::Seconds(0).expiry_from(NOW, None).unwrap();
        assert!(expiry < NOW);
    }

    #[test]
    fn test_negative_expires_in_the_past() {
        assert_eq!(Timeout::Seconds(-5).expiry_from(NOW, None), Some(NOW - 5.0));
    }

    #[test]
    fn test_resolve() {
        assert_eq!(Timeout::Default.resolve(Some(30)), Timeout::Seconds(30));
        assert_eq!(Timeout::Default.resolve(None), Timeout::Never);
        assert_eq!(Timeout::Seconds(5).resolve(Some(30)), Timeout::Seconds(5));
        assert_eq!(Timeout::Never.resolve(Some(30)), Timeout::Never);
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Timeout::from(None), Timeout::Never);
        assert_eq!(Timeout::from(Some(60)), Timeout::Seconds(60));
        assert_eq!(Timeout::from(60), Timeout::Seconds(60));
    }
}
