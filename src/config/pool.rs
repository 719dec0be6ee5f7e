//! Pool sizing configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

use super::parse::{env_or, parse_duration};
use super::ConfigError;
use crate::pool::Options;

/// Pool bounds loaded from environment.
///
/// All values are pre-computed at construction time, so converting to
/// [`Options`] can never trip the pool's fatal bounds check.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Pool name (empty means "let the pool assign a default").
    pool_name: String,
    /// Workers never retired by idleness.
    min_threads: usize,
    /// Resolved hard cap on live workers (never zero).
    max_threads: NonZeroUsize,
    /// Idle age after which workers above the minimum retire.
    max_idle_thread_age: Duration,
}

impl PoolConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let pool_name = env_or("POOL_NAME", "");
        let min_threads = Self::parse_min_threads()?;
        let max_threads = Self::parse_max_threads()?;
        if min_threads > max_threads.get() {
            return Err(ConfigError::Invalid {
                key: "POOL_MIN_THREADS".into(),
                message: format!(
                    "minimum {} exceeds maximum {}",
                    min_threads,
                    max_threads.get()
                ),
            });
        }
        let max_idle_thread_age = Self::parse_idle_age()?;

        Ok(Self {
            pool_name,
            min_threads,
            max_threads,
            max_idle_thread_age,
        })
    }

    /// Get the configured pool name ("" = pool-assigned default).
    pub fn pool_name(&self) -> &str {
        &self.pool_name
    }

    /// Get the minimum worker count.
    #[inline]
    pub fn min_threads(&self) -> usize {
        self.min_threads
    }

    /// Get the resolved maximum worker count (pre-computed, never zero).
    #[inline]
    pub fn max_threads(&self) -> usize {
        self.max_threads.get()
    }

    /// Get the idle retirement age.
    #[inline]
    pub fn max_idle_thread_age(&self) -> Duration {
        self.max_idle_thread_age
    }

    /// Build pool [`Options`] from this configuration. Callbacks keep
    /// their no-op defaults.
    pub fn to_options(&self) -> Options {
        Options {
            pool_name: self.pool_name.clone(),
            min_threads: self.min_threads,
            max_threads: self.max_threads.get(),
            max_idle_thread_age: self.max_idle_thread_age,
            ..Options::default()
        }
    }

    fn parse_min_threads() -> Result<usize, ConfigError> {
        let raw = env_or("POOL_MIN_THREADS", "1");
        raw.parse().map_err(|e| ConfigError::Parse {
            key: "POOL_MIN_THREADS".into(),
            value: raw,
            error: format!("{e}"),
        })
    }

    fn parse_max_threads() -> Result<NonZeroUsize, ConfigError> {
        let raw = env_or("POOL_MAX_THREADS", "8");
        let max: usize = raw.parse().map_err(|e| ConfigError::Parse {
            key: "POOL_MAX_THREADS".into(),
            value: raw,
            error: format!("{e}"),
        })?;

        // Resolve 0 to CPU count
        let count = if max == 0 { num_cpus::get() } else { max };

        NonZeroUsize::new(count).ok_or_else(|| ConfigError::Invalid {
            key: "POOL_MAX_THREADS".into(),
            message: "maximum worker count cannot be zero".into(),
        })
    }

    fn parse_idle_age() -> Result<Duration, ConfigError> {
        let raw = env_or("POOL_MAX_IDLE_AGE", "30s");
        match parse_duration(&raw) {
            Ok(Some(age)) => Ok(age),
            // Retirement cannot be switched off by age; pin the pool
            // size with POOL_MIN_THREADS == POOL_MAX_THREADS instead.
            Ok(None) => Err(ConfigError::Invalid {
                key: "POOL_MAX_IDLE_AGE".into(),
                message: "idle age cannot be disabled; set POOL_MIN_THREADS equal to \
                          POOL_MAX_THREADS to pin the pool size"
                    .into(),
            }),
            Err(error) => Err(ConfigError::Parse {
                key: "POOL_MAX_IDLE_AGE".into(),
                value: raw,
                error,
            }),
        }
    }
}
