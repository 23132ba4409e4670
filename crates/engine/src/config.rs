// Run configuration.
//
// Resolution order: explicit `--config` path, `./backfill.toml`,
// `~/.backfill/config.toml`, then built-in defaults. The GitLab settings are
// then overridden from the environment (`GITLAB_API_URL`, `GITLAB_USER_ID`,
// `GITLAB_PAT`). The token is only ever taken from the environment.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use backfill_common::histogram::DateBucket;

pub const ENV_API_URL: &str = "GITLAB_API_URL";
pub const ENV_USER_ID: &str = "GITLAB_USER_ID";
pub const ENV_TOKEN: &str = "GITLAB_PAT";

/// Name of the per-directory config file.
pub const LOCAL_CONFIG_FILE: &str = "backfill.toml";

/// Root directory for global state: `~/.backfill/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".backfill"))
}

/// Path to the global config file: `~/.backfill/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub gitlab: GitlabConfig,
    pub repo: RepoConfig,
    pub reconcile: ReconcileConfig,
}

/// Remote activity feed settings.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GitlabConfig {
    /// Base URL of the REST API, e.g. `https://gitlab.com/api/v4`.
    pub api_url: String,
    pub user_id: String,
    /// Private token. Environment only, never persisted.
    #[serde(skip)]
    pub token: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Retries for transient failures (5xx, connect errors, timeouts).
    pub max_retries: u32,
    /// First retry delay; doubles on each attempt.
    pub retry_backoff_ms: u64,
}

impl Default for GitlabConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            user_id: String::new(),
            token: String::new(),
            timeout_secs: 30,
            max_retries: 3,
            retry_backoff_ms: 500,
        }
    }
}

impl GitlabConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl fmt::Debug for GitlabConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitlabConfig")
            .field("api_url", &self.api_url)
            .field("user_id", &self.user_id)
            .field("token", &if self.token.is_empty() { "<unset>" } else { "<redacted>" })
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .finish()
    }
}

/// Local repository settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RepoConfig {
    /// Repository working directory (defaults to `"repo"`).
    pub path: PathBuf,
    /// Git remote name (defaults to `"origin"`).
    pub remote: String,
    /// Branch to publish (defaults to `"main"`).
    pub branch: String,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("repo"), remote: "origin".into(), branch: "main".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Days subtracted from the latest local commit date when bounding the feed query.
    pub lookback_days: u32,
    pub date_bucket: DateBucket,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self { lookback_days: 7, date_bucket: DateBucket::Local }
    }
}

impl Config {
    /// Resolve and load the config file, apply environment overrides, and validate.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::load_from(path)?,
            None => Self::discover()?,
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// First config file that exists on the search path, or defaults.
    fn discover() -> Result<Self, ConfigError> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Self::load_from(&local);
        }
        match global_config_path() {
            Some(global) if global.is_file() => Self::load_from(&global),
            _ => Ok(Self::default()),
        }
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Override GitLab settings from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Override GitLab settings from `lookup`. Empty values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(api_url) = non_empty(ENV_API_URL) {
            self.gitlab.api_url = api_url;
        }
        if let Some(user_id) = non_empty(ENV_USER_ID) {
            self.gitlab.user_id = user_id;
        }
        if let Some(token) = non_empty(ENV_TOKEN) {
            self.gitlab.token = token;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gitlab.api_url.trim().is_empty() {
            return Err(ConfigError::Missing(ENV_API_URL));
        }
        let url = url::Url::parse(&self.gitlab.api_url)
            .map_err(|e| ConfigError::Invalid(format!("{ENV_API_URL}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "{ENV_API_URL}: unsupported scheme `{}`",
                url.scheme()
            )));
        }
        if self.gitlab.user_id.trim().is_empty() {
            return Err(ConfigError::Missing(ENV_USER_ID));
        }
        if self.gitlab.token.trim().is_empty() {
            return Err(ConfigError::Missing(ENV_TOKEN));
        }
        if self.repo.remote.trim().is_empty() || self.repo.branch.trim().is_empty() {
            return Err(ConfigError::Invalid("repo.remote and repo.branch must be set".into()));
        }
        Ok(())
    }
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error at `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid config: {0}")]
    Invalid(String),
}
