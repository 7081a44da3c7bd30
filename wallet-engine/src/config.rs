//! Ledger engine configuration

use crate::retry::RetryPolicy;

/// Engine tuning knobs
///
/// The connection pool handle itself is injected by the caller (see
/// [`crate::store::connect`]); this struct only carries sizing, timeout and
/// policy values. All fields have defaults matching production settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Minimum pool connections kept open
    pub min_connections: u32,
    /// Maximum pool connections
    pub max_connections: u32,
    /// Pool acquire timeout in milliseconds
    pub connection_timeout_ms: u64,
    /// Idle connection reap timeout in milliseconds
    pub idle_timeout_ms: u64,
    /// Per-statement timeout enforced server-side, in milliseconds
    pub statement_timeout_ms: u64,
    /// Retry policy for transient concurrency conflicts
    pub retry: RetryPolicy,
    /// Idempotency record lifetime in hours
    pub idempotency_ttl_hours: i64,
    /// Default page size for history queries
    pub history_default_limit: i64,
    /// Hard cap on history page size
    pub history_max_limit: i64,
    /// Graceful shutdown timer in milliseconds
    pub shutdown_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_connections: 10,
            max_connections: 50,
            connection_timeout_ms: 30_000,
            idle_timeout_ms: 10_000,
            statement_timeout_ms: 30_000,
            retry: RetryPolicy::default(),
            idempotency_ttl_hours: 24,
            history_default_limit: 50,
            history_max_limit: 100,
            shutdown_timeout_ms: 30_000,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            min_connections: env_parse("MIN_CONNECTIONS", defaults.min_connections),
            max_connections: env_parse("MAX_CONNECTIONS", defaults.max_connections),
            connection_timeout_ms: env_parse(
                "CONNECTION_TIMEOUT_MS",
                defaults.connection_timeout_ms,
            ),
            idle_timeout_ms: env_parse("IDLE_TIMEOUT_MS", defaults.idle_timeout_ms),
            statement_timeout_ms: env_parse("STATEMENT_TIMEOUT_MS", defaults.statement_timeout_ms),
            retry: RetryPolicy {
                max_attempts: env_parse("RETRY_MAX_ATTEMPTS", defaults.retry.max_attempts),
                base_backoff_ms: env_parse("RETRY_BASE_BACKOFF_MS", defaults.retry.base_backoff_ms),
                jitter_ms: env_parse("RETRY_JITTER_MS", defaults.retry.jitter_ms),
            },
            idempotency_ttl_hours: env_parse("IDEMPOTENCY_TTL_HOURS", defaults.idempotency_ttl_hours),
            history_default_limit: env_parse("HISTORY_DEFAULT_LIMIT", defaults.history_default_limit),
            history_max_limit: env_parse("HISTORY_MAX_LIMIT", defaults.history_max_limit),
            shutdown_timeout_ms: env_parse("SHUTDOWN_TIMEOUT_MS", defaults.shutdown_timeout_ms),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.min_connections, 10);
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_backoff_ms, 100);
        assert_eq!(config.history_default_limit, 50);
        assert_eq!(config.history_max_limit, 100);
        assert_eq!(config.idempotency_ttl_hours, 24);
    }
}
