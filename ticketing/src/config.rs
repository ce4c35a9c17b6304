//! Configuration management for the ticketing engine.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::environment::{Policy, TicketingEnvironment};
use crate::mapping::{MapBounds, OfflineMap};
use crate::snapshot::FileSnapshotStore;
use crate::types::Password;
use chrono::Duration;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use ticketbook_core::environment::SystemClock;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Snapshot storage configuration
    pub snapshots: SnapshotConfig,
    /// Business rules
    pub policy: PolicyConfig,
    /// Operational map area
    pub map: MapBounds,
    /// Metrics configuration
    pub metrics: MetricsConfig,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `EnvFilter` directive (default: `ticketing=info`)
    pub filter: String,
}

/// Snapshot storage configuration
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Directory holding snapshot files
    pub dir: PathBuf,
}

/// Business rule configuration
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// Secret required to register staff
    pub staff_secret: Password,
    /// Consumer cancellation window in hours (default: 24)
    pub cancellation_window_hours: i64,
}

/// Metrics configuration
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder (default: false)
    pub enabled: bool,
}

impl Config {
    /// Load `.env` from the working directory (if any) into the process
    /// environment, then read the configuration.
    #[must_use]
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_env()
    }

    /// Load configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from a dotenv file. Variables already set in the
    /// process environment win over the file.
    ///
    /// # Errors
    ///
    /// Returns the `dotenvy` error if the file cannot be read or parsed.
    pub fn from_env_file(path: &Path) -> Result<Self, dotenvy::Error> {
        let file: HashMap<String, String> = dotenvy::from_path_iter(path)?.collect::<Result<_, _>>()?;
        Ok(Self::from_lookup(|key| env::var(key).ok().or_else(|| file.get(key).cloned())))
    }

    /// Load configuration through `lookup`, falling back to defaults for
    /// missing or unparsable values.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let bounds = MapBounds::default();
        let policy = Policy::default();

        Self {
            logging: LoggingConfig {
                filter: lookup("RUST_LOG").unwrap_or_else(|| "ticketing=info".to_string()),
            },
            snapshots: SnapshotConfig {
                dir: lookup("TICKETING_SNAPSHOT_DIR")
                    .map_or_else(|| PathBuf::from("snapshots"), PathBuf::from),
            },
            policy: PolicyConfig {
                staff_secret: lookup("TICKETING_STAFF_SECRET").map_or(policy.staff_secret, Password::new),
                cancellation_window_hours: lookup("TICKETING_CANCELLATION_WINDOW_HOURS")
                    .and_then(|s| s.parse().ok())
                    .filter(|hours: &i64| *hours >= 0)
                    .unwrap_or(24),
            },
            map: MapBounds {
                min_lat: lookup("MAP_MIN_LAT")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(bounds.min_lat),
                max_lat: lookup("MAP_MAX_LAT")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(bounds.max_lat),
                min_lng: lookup("MAP_MIN_LNG")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(bounds.min_lng),
                max_lng: lookup("MAP_MAX_LNG")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(bounds.max_lng),
            },
            metrics: MetricsConfig {
                enabled: lookup("TICKETING_METRICS_ENABLED")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(false),
            },
        }
    }

    /// Business rules for the environment
    #[must_use]
    pub fn policy(&self) -> Policy {
        Policy {
            staff_secret: self.policy.staff_secret.clone(),
            cancellation_window: Duration::hours(self.policy.cancellation_window_hours),
        }
    }

    /// Production environment: system clock, offline map over the
    /// configured bounds, snapshot files under the configured directory
    #[must_use]
    pub fn environment(&self) -> TicketingEnvironment {
        TicketingEnvironment::new(
            Arc::new(SystemClock),
            Arc::new(OfflineMap::new(self.map)),
            Arc::new(FileSnapshotStore::new(self.snapshots.dir.clone())),
        )
        .with_policy(self.policy())
    }
}
