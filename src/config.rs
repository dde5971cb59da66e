//! Application configuration.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML file (`--config FILE`, or `config.toml` in the platform config
//!    directory if it exists)
//! 3. `HASHLEDGER_*` environment variables (e.g. `HASHLEDGER_FLUSH_THRESHOLD`)
//! 4. Command-line flags
//!
//! Every path is lexically normalized before it reaches the scan engine.
//!
//! # Example
//!
//! ```toml
//! root_path = "/srv/archive"
//! ledger_path = "/var/lib/hashledger/archive.dirs"
//! results_path = "/var/lib/hashledger/archive.tsv"
//! flush_threshold = 10000
//! on_error = "abort"
//! ```

use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::{ReportArgs, ScanArgs, StatusArgs};
use crate::duplicates::DEFAULT_REPORT_LIMIT;
use crate::engine::{
    ErrorPolicy, ScanConfig, DEFAULT_FLUSH_THRESHOLD, DEFAULT_PROGRESS_INTERVAL,
};
use crate::scanner::{normalize_path, LARGE_FILE_THRESHOLD};

/// Prefix of environment variables read into the configuration.
pub const ENV_PREFIX: &str = "HASHLEDGER_";

/// Errors raised while building the configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A provider could not be read or a value has the wrong type.
    #[error("Invalid configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    /// The file named by `--config` does not exist.
    #[error("Configuration file not found: {0}")]
    MissingFile(PathBuf),

    /// A value is out of range.
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        /// Setting name
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory tree to scan.
    pub root_path: PathBuf,
    /// Ledger snapshot file.
    pub ledger_path: PathBuf,
    /// Results file.
    pub results_path: PathBuf,
    /// Checkpoint when more than this many records are pending.
    pub flush_threshold: usize,
    /// Files between progress notices.
    pub progress_interval: usize,
    /// Size at which hashing switches to chunked reads.
    pub large_file_threshold: u64,
    /// Maximum number of report rows.
    pub report_limit: usize,
    /// Failure handling during scans.
    pub on_error: ErrorPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("."),
            ledger_path: PathBuf::from("processed_dirs"),
            results_path: PathBuf::from("processed_files.csv"),
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            large_file_threshold: LARGE_FILE_THRESHOLD,
            report_limit: DEFAULT_REPORT_LIMIT,
            on_error: ErrorPolicy::Skip,
        }
    }
}

impl Config {
    /// Load defaults, the config file and the environment.
    ///
    /// `config_file` replaces the platform default file and must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is missing or malformed, or a
    /// value is invalid.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match config_file {
            Some(path) if !path.is_file() => {
                return Err(ConfigError::MissingFile(path.to_path_buf()))
            }
            Some(path) => Some(path.to_path_buf()),
            None => Self::config_path().filter(|p| p.is_file()),
        };
        if let Some(path) = &file {
            log::debug!("Reading configuration from {}", path.display());
        }

        let figment = Self::figment(file.as_deref()).merge(Env::prefixed(ENV_PREFIX));
        Self::from_figment(&figment)
    }

    /// Defaults merged with an optional TOML file (no environment).
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let figment = Figment::from(Serialized::defaults(Self::default()));
        match file {
            Some(path) => figment.merge(Toml::file(path)),
            None => figment,
        }
    }

    /// Extract, validate and normalize a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if extraction or validation fails.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let mut config: Self = figment.extract().map_err(Box::new)?;
        config.validate()?;
        config.normalize_paths();
        Ok(config)
    }

    /// Default platform-specific configuration file, if the platform has a
    /// config directory.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "hashledger", "hashledger")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.progress_interval == 0 {
            return Err(ConfigError::Invalid {
                field: "progress_interval",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.large_file_threshold == 0 {
            return Err(ConfigError::Invalid {
                field: "large_file_threshold",
                reason: "must be at least 1 byte".to_string(),
            });
        }
        for (field, path) in [
            ("root_path", &self.root_path),
            ("ledger_path", &self.ledger_path),
            ("results_path", &self.results_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "path is empty".to_string(),
                });
            }
        }
        if self.ledger_path == self.results_path {
            return Err(ConfigError::Invalid {
                field: "results_path",
                reason: "must differ from ledger_path".to_string(),
            });
        }
        Ok(())
    }

    fn normalize_paths(&mut self) {
        self.root_path = normalize_path(&self.root_path);
        self.ledger_path = normalize_path(&self.ledger_path);
        self.results_path = normalize_path(&self.results_path);
    }

    /// Apply `scan` flags on top of the loaded layers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the result is invalid.
    pub fn apply_scan_args(&mut self, args: &ScanArgs) -> Result<(), ConfigError> {
        if let Some(path) = &args.path {
            self.root_path = path.clone();
        }
        if let Some(path) = &args.ledger {
            self.ledger_path = path.clone();
        }
        if let Some(path) = &args.results {
            self.results_path = path.clone();
        }
        if let Some(threshold) = args.flush_threshold {
            self.flush_threshold = threshold;
        }
        if let Some(threshold) = args.large_file_threshold {
            self.large_file_threshold = threshold;
        }
        if let Some(policy) = args.on_error {
            self.on_error = policy;
        }
        if let Some(limit) = args.limit {
            self.report_limit = limit;
        }
        self.validate()?;
        self.normalize_paths();
        Ok(())
    }

    /// Apply `report` flags on top of the loaded layers.
    pub fn apply_report_args(&mut self, args: &ReportArgs) {
        if let Some(path) = &args.results {
            self.results_path = normalize_path(path);
        }
        if let Some(limit) = args.limit {
            self.report_limit = limit;
        }
    }

    /// Apply `status` flags on top of the loaded layers.
    pub fn apply_status_args(&mut self, args: &StatusArgs) {
        if let Some(path) = &args.ledger {
            self.ledger_path = normalize_path(path);
        }
    }

    /// Engine configuration for a scan run.
    #[must_use]
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig::new(&self.root_path, &self.ledger_path, &self.results_path)
            .with_flush_threshold(self.flush_threshold)
            .with_progress_interval(self.progress_interval)
            .with_large_file_threshold(self.large_file_threshold)
            .with_error_policy(self.on_error)
    }
}
