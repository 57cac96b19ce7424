//! Environment-driven configuration.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::generation::{DispatchConfig, ExecutorConfig};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not a valid {expected}: {value:?}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("{0} must be set when USE_PERSISTENT_STORES=true")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub lock_namespace: String,
    pub lock_ttl: Duration,
    pub sweep_interval: Duration,
    pub workers: usize,
    pub poll_interval: Duration,
    pub media_root: PathBuf,
    pub media_url: String,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub use_persistent_stores: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            lock_namespace: "docforge".to_string(),
            lock_ttl: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
            workers: 4,
            poll_interval: Duration::from_millis(250),
            media_root: PathBuf::from("./media"),
            media_url: "/media/".to_string(),
            database_url: None,
            redis_url: None,
            use_persistent_stores: false,
        }
    }
}

fn parse<T: std::str::FromStr>(
    var: &'static str,
    value: Option<String>,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            value: raw,
            expected,
        }),
    }
}

impl GeneratorConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through `lookup`, falling back to defaults for
    /// unset variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let lock_namespace = lookup("DOCFORGE_LOCK_NAMESPACE").unwrap_or_else(|| {
            warn!("DOCFORGE_LOCK_NAMESPACE not set; using default namespace");
            defaults.lock_namespace.clone()
        });
        let lock_ttl = parse(
            "DOCFORGE_LOCK_TTL_SECS",
            lookup("DOCFORGE_LOCK_TTL_SECS"),
            "number of seconds",
            defaults.lock_ttl.as_secs(),
        )?;
        let sweep_interval = parse(
            "DOCFORGE_SWEEP_INTERVAL_SECS",
            lookup("DOCFORGE_SWEEP_INTERVAL_SECS"),
            "number of seconds",
            defaults.sweep_interval.as_secs(),
        )?;
        let workers = parse(
            "DOCFORGE_WORKERS",
            lookup("DOCFORGE_WORKERS"),
            "worker count",
            defaults.workers,
        )?;
        let poll_interval = parse(
            "DOCFORGE_POLL_INTERVAL_MS",
            lookup("DOCFORGE_POLL_INTERVAL_MS"),
            "number of milliseconds",
            defaults.poll_interval.as_millis() as u64,
        )?;
        let use_persistent_stores = parse(
            "USE_PERSISTENT_STORES",
            lookup("USE_PERSISTENT_STORES"),
            "boolean",
            false,
        )?;

        let config = Self {
            lock_namespace,
            lock_ttl: Duration::from_secs(lock_ttl),
            sweep_interval: Duration::from_secs(sweep_interval),
            workers,
            poll_interval: Duration::from_millis(poll_interval),
            media_root: lookup("DOCFORGE_MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_root),
            media_url: lookup("DOCFORGE_MEDIA_URL").unwrap_or(defaults.media_url),
            database_url: lookup("DATABASE_URL"),
            redis_url: lookup("REDIS_URL"),
            use_persistent_stores,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lock_ttl.is_zero() {
            return Err(ConfigError::Zero("DOCFORGE_LOCK_TTL_SECS"));
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::Zero("DOCFORGE_SWEEP_INTERVAL_SECS"));
        }
        if self.workers == 0 {
            return Err(ConfigError::Zero("DOCFORGE_WORKERS"));
        }
        if self.use_persistent_stores && self.database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        Ok(())
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            namespace: self.lock_namespace.clone(),
            lock_ttl: self.lock_ttl,
        }
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::default()
            .with_workers(self.workers)
            .with_poll_interval(self.poll_interval)
    }
}
