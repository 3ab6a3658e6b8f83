use std::env::VarError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::executor::CallExecutor;
use crate::harvest::pipeline::DEFAULT_EXCLUDED_COMPARTMENTS;
use crate::retry::RetryPolicy;

/// Where the export stage writes its CSV objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportDestination {
    /// Pre-authenticated request URL prefix, objects are `PUT` under it
    Par(String),
    /// Local directory
    Directory(PathBuf),
}

/// Configuration for one harvest run.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Tenancy to harvest.
    pub tenancy_id: String,

    /// Region identity calls are issued against.
    pub home_region: String,

    /// Recorded inventory replayed through the management API.
    pub snapshot_path: Option<PathBuf>,

    pub destination: ExportDestination,

    /// Compartment names kept out of the work grid.
    /// Default: `ManagedCompartmentForPaaS`.
    pub excluded_compartments: Vec<String>,

    pub retry_max_attempts: u32,
    pub retry_max_elapsed_secs: u64,
    pub retry_max_wait_secs: u64,
    pub retry_base_sleep_secs: u64,

    /// Cap on remote call attempts in flight. Unbounded when `None`.
    pub max_in_flight: Option<usize>,

    /// Log filter used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl HarvestConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    ///
    /// This allows tests to supply variables without mutating process-global
    /// environment state.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let tenancy_id = required(&reader, "HARVEST_TENANCY_ID")?;
        let home_region = required(&reader, "HARVEST_HOME_REGION")?;
        let snapshot_path = reader("HARVEST_SNAPSHOT").ok().map(PathBuf::from);

        let destination = match reader("HARVEST_PAR_URL") {
            Ok(url) if !url.trim().is_empty() => ExportDestination::Par(url.trim().to_string()),
            _ => ExportDestination::Directory(PathBuf::from(
                reader("HARVEST_OUTPUT_DIR").unwrap_or_else(|_| "./export".to_string()),
            )),
        };

        let excluded_compartments = match reader("HARVEST_EXCLUDED_COMPARTMENTS") {
            Ok(list) => list
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => DEFAULT_EXCLUDED_COMPARTMENTS
                .iter()
                .map(|name| name.to_string())
                .collect(),
        };

        let retry_max_attempts = parsed(&reader, "HARVEST_RETRY_MAX_ATTEMPTS", 10)?;
        let retry_max_elapsed_secs = parsed(&reader, "HARVEST_RETRY_MAX_ELAPSED_SECS", 900)?;
        let retry_max_wait_secs = parsed(&reader, "HARVEST_RETRY_MAX_WAIT_SECS", 100)?;
        let retry_base_sleep_secs = parsed(&reader, "HARVEST_RETRY_BASE_SLEEP_SECS", 2)?;
        if retry_max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "HARVEST_RETRY_MAX_ATTEMPTS".into(),
                "must be at least 1".into(),
            ));
        }

        let max_in_flight = match reader("HARVEST_MAX_IN_FLIGHT") {
            Ok(raw) => Some(parse_value::<usize>("HARVEST_MAX_IN_FLIGHT", &raw)?),
            Err(_) => None,
        };

        let log_level = reader("LOGGING_LEVEL")
            .map(|level| level.to_lowercase())
            .unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            tenancy_id,
            home_region,
            snapshot_path,
            destination,
            excluded_compartments,
            retry_max_attempts,
            retry_max_elapsed_secs,
            retry_max_wait_secs,
            retry_base_sleep_secs,
            max_in_flight,
            log_level,
        })
    }

    /// Default retry predicate with the configured budget and timings.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_wait_between_calls: Duration::from_secs(self.retry_max_wait_secs),
            base_sleep: Duration::from_secs(self.retry_base_sleep_secs),
            ..RetryPolicy::default()
        }
        .with_max_attempts(self.retry_max_attempts)
        .with_max_elapsed(Duration::from_secs(self.retry_max_elapsed_secs))
    }

    pub fn call_executor(&self) -> CallExecutor {
        let executor = CallExecutor::new(self.retry_policy());
        match self.max_in_flight {
            Some(limit) => executor.with_concurrency_limit(limit),
            None => executor,
        }
    }
}

fn required<F>(reader: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    match reader(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::MissingVar(key.into())),
    }
}

fn parsed<F, T>(reader: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match reader(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.into(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}
