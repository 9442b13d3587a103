//! User settings and the resolved downloader configuration.
//!
//! Settings are read from `<config dir>/segfetch/config.toml`. Every field is
//! optional; anything left unset falls back to the built-in defaults when a
//! [`DownloadConfig`] is resolved. Command-line flags win over both.
use crate::retry::{DEFAULT_MAX_JITTER, FETCH_ATTEMPTS, PROBE_ATTEMPTS, RetryPolicy};
use crate::transport::{DEFAULT_TIMEOUT, MAX_CONNECTIONS};
use crate::utils;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// What to do with sibling chunk tasks once one of them has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort all other chunk tasks as soon as one fails.
    #[default]
    FailFast,
    /// Let every in-flight chunk finish, then report the first failure.
    Drain,
}

/// Contents of the settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub concurrency: Option<usize>,
    pub probe_attempts: Option<u32>,
    pub fetch_attempts: Option<u32>,
    pub max_jitter_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    pub failure_policy: Option<FailurePolicy>,
    pub output_dir: Option<String>,
}

impl Settings {
    /// Default location of the settings file, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("segfetch").join("config.toml"))
    }

    /// Loads settings from the default location. A missing file is not an error.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Fully resolved configuration of a [`Downloader`](crate::Downloader).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadConfig {
    /// Requested number of concurrent chunks; also the per-host connection limit.
    pub concurrency: usize,
    pub probe_retry: RetryPolicy,
    pub fetch_retry: RetryPolicy,
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub failure_policy: FailurePolicy,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            concurrency: utils::default_concurrency().min(MAX_CONNECTIONS),
            probe_retry: RetryPolicy::probe(),
            fetch_retry: RetryPolicy::fetch(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl DownloadConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let jitter = settings
            .max_jitter_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_MAX_JITTER);

        Self {
            concurrency: settings
                .concurrency
                .filter(|&n| n > 0)
                .unwrap_or_else(utils::default_concurrency)
                .min(MAX_CONNECTIONS),
            probe_retry: RetryPolicy::new(settings.probe_attempts.unwrap_or(PROBE_ATTEMPTS), jitter),
            fetch_retry: RetryPolicy::new(settings.fetch_attempts.unwrap_or(FETCH_ATTEMPTS), jitter),
            timeout: settings
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
            user_agent: settings.user_agent.clone(),
            failure_policy: settings.failure_policy.unwrap_or_default(),
        }
    }

    /// Sets the concurrency, clamped to `1..=MAX_CONNECTIONS`.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONNECTIONS);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_settings_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "concurrency = 8\nfetch_attempts = 7\nmax_jitter_ms = 5\nfailure_policy = \"drain\"\n"
        )
        .unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.concurrency, Some(8));
        assert_eq!(settings.failure_policy, Some(FailurePolicy::Drain));
        assert_eq!(settings.timeout_secs, None);

        let config = DownloadConfig::from_settings(&settings);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.fetch_retry.max_attempts, 7);
        assert_eq!(config.fetch_retry.max_jitter, Duration::from_millis(5));
        assert_eq!(config.probe_retry.max_attempts, PROBE_ATTEMPTS);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.failure_policy, FailurePolicy::Drain);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "threads = 4").unwrap();

        let err = Settings::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn empty_settings_fall_back_to_defaults() {
        let config = DownloadConfig::from_settings(&Settings::default());
        assert!(config.concurrency >= 1);
        assert_eq!(config.probe_retry, RetryPolicy::probe());
        assert_eq!(config.fetch_retry, RetryPolicy::fetch());
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
    }

    #[test]
    fn zero_concurrency_is_ignored() {
        let settings = Settings {
            concurrency: Some(0),
            ..Settings::default()
        };
        assert!(DownloadConfig::from_settings(&settings).concurrency >= 1);
        assert_eq!(DownloadConfig::default().with_concurrency(0).concurrency, 1);
    }

    #[test]
    fn huge_concurrency_is_capped() {
        let config = DownloadConfig::default().with_concurrency(usize::MAX);
        assert_eq!(config.concurrency, MAX_CONNECTIONS);

        let settings = Settings {
            concurrency: Some(usize::MAX),
            ..Settings::default()
        };
        assert_eq!(DownloadConfig::from_settings(&settings).concurrency, MAX_CONNECTIONS);
    }
}
