use chrono::Duration;

/// Cache settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long an entry stays valid. `None` keeps entries until evicted.
    pub ttl: Option<Duration>,
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Builds a config from a TTL in seconds; zero disables expiry.
    pub fn from_ttl_secs(secs: u64) -> Self {
        match i64::try_from(secs) {
            Ok(0) | Err(_) => Self::default(),
            Ok(secs) => Self::default().with_ttl(Duration::seconds(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_no_expiry() {
        assert_eq!(CacheConfig::new().ttl, None);
    }

    #[test]
    fn zero_seconds_disables_expiry() {
        assert_eq!(CacheConfig::from_ttl_secs(0).ttl, None);
        assert_eq!(
            CacheConfig::from_ttl_secs(30).ttl,
            Some(Duration::seconds(30))
        );
    }
}
