//! Configuration module for workpool.
//!
//! This module provides centralized configuration loading from
//! environment variables.
//!
//! # Example
//!
//! ```rust,ignore
//! use workpool::config::Config;
//!
//! let config = Config::from_env()?;
//! let pool = workpool::ThreadPool::new(config.pool.to_options());
//! ```

mod error;
mod logging;
mod parse;
mod pool;

pub use error::ConfigError;
pub use logging::LoggingConfig;
pub use pool::PoolConfig;

/// Complete configuration for an application hosting a pool.
#[derive(Clone, Debug)]
pub struct Config {
    /// Pool sizing configuration.
    pub pool: PoolConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            pool: PoolConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    /// Print configuration summary to log.
    pub fn log_summary(&self) {
        use tracing::info;

        info!("Configuration loaded:");
        if self.pool.pool_name().is_empty() {
            info!("Pool name: (assigned at construction)");
        } else {
            info!("Pool name: {}", self.pool.pool_name());
        }
        info!("Min threads: {}", self.pool.min_threads());
        info!("Max threads: {}", self.pool.max_threads());
        info!(
            "Max idle thread age: {}s",
            self.pool.max_idle_thread_age().as_secs()
        );
        info!("Log filter: {}", self.logging.filter);
    }
}
