//! Search configuration for the path finder.

use std::time::Duration;

/// Configuration parameters for path search.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Wall-clock budget for one search (milliseconds).
    /// `None` lets a search run until the queue is exhausted.
    pub timeout_ms: Option<u64>,
}

impl SearchConfig {
    /// Create a new configuration with the given timeout.
    pub fn new(timeout_ms: Option<u64>) -> Self {
        Self { timeout_ms }
    }

    /// A configuration with no deadline.
    pub fn unbounded() -> Self {
        Self { timeout_ms: None }
    }

    /// Returns the timeout as a Duration.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: Some(2_000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = SearchConfig::default();
        assert_eq!(config.timeout_ms, Some(2_000));
        assert_eq!(config.timeout(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn unbounded_has_no_timeout() {
        assert_eq!(SearchConfig::unbounded().timeout(), None);
    }

    #[test]
    fn custom_config() {
        let config = SearchConfig::new(Some(150));
        assert_eq!(config.timeout(), Some(Duration::from_millis(150)));
    }
}
