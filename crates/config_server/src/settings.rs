//! Server settings
//!
//! Settings are layered: built-in defaults, then an optional TOML file named
//! by `CONFIG_SERVER_CONFIG_FILE`, then individual `CONFIG_SERVER_*`
//! environment variables.
//!
//! # Example TOML Settings
//!
//! ```toml
//! host = "127.0.0.1"
//! port = 8888
//! default_label = "main"
//!
//! [backend]
//! type = "git"
//! uri = "https://example.com/org/config-repo.git"
//! basedir = "/var/cache/config-server/repo"
//! refresh_interval_secs = 60
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use config_core::{
    FilesystemBackend, GitBackend, GitBackendConfig, ServiceOptions, SourceBackend,
    DEFAULT_LABEL, DEFAULT_PROFILE,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{DEFAULT_HOST, DEFAULT_PORT};

/// Environment variable naming the TOML settings file.
pub const CONFIG_FILE_VAR: &str = "CONFIG_SERVER_CONFIG_FILE";

const HOST_VAR: &str = "CONFIG_SERVER_HOST";
const PORT_VAR: &str = "CONFIG_SERVER_PORT";
const BACKEND_VAR: &str = "CONFIG_SERVER_BACKEND";
const ROOT_VAR: &str = "CONFIG_SERVER_ROOT";
const GIT_URI_VAR: &str = "CONFIG_SERVER_GIT_URI";
const GIT_BASEDIR_VAR: &str = "CONFIG_SERVER_GIT_BASEDIR";
const REFRESH_INTERVAL_VAR: &str = "CONFIG_SERVER_REFRESH_INTERVAL_SECS";
const DEFAULT_PROFILE_VAR: &str = "CONFIG_SERVER_DEFAULT_PROFILE";
const DEFAULT_LABEL_VAR: &str = "CONFIG_SERVER_DEFAULT_LABEL";
const FETCH_TIMEOUT_VAR: &str = "CONFIG_SERVER_FETCH_TIMEOUT_MS";
const REQUEST_TIMEOUT_VAR: &str = "CONFIG_SERVER_REQUEST_TIMEOUT_SECS";
const CACHE_MAX_ENTRIES_VAR: &str = "CONFIG_SERVER_CACHE_MAX_ENTRIES";
const LOG_FORMAT_VAR: &str = "CONFIG_SERVER_LOG_FORMAT";

const DEFAULT_ROOT: &str = "./config";
const DEFAULT_GIT_BASEDIR: &str = "./.config-server/repo";
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;

/// Errors raised while loading server settings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Settings file not found: {path:?}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to read settings file {path:?}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to parse settings file {path:?}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Invalid value '{value}' for {variable}: {reason}")]
    InvalidValue {
        variable: String,
        value: String,
        reason: String,
    },

    #[error("Missing required setting {variable}")]
    Missing { variable: String },
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err("expected 'text' or 'json'".to_string()),
        }
    }
}

/// Which backing store serves the documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendSettings {
    /// Local directory tree.
    Filesystem {
        #[serde(default = "default_root")]
        root: PathBuf,
    },

    /// Remote git repository.
    Git {
        #[serde(default)]
        uri: String,

        #[serde(default = "default_git_basedir")]
        basedir: PathBuf,

        #[serde(default = "default_refresh_interval_secs")]
        refresh_interval_secs: u64,
    },
}

impl BackendSettings {
    fn filesystem() -> Self {
        Self::Filesystem {
            root: default_root(),
        }
    }

    fn git() -> Self {
        Self::Git {
            uri: String::new(),
            basedir: default_git_basedir(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Filesystem { .. } => "filesystem",
            Self::Git { .. } => "git",
        }
    }

    /// Creates the backend described by these settings.
    pub fn build(&self) -> Arc<dyn SourceBackend> {
        match self {
            Self::Filesystem { root } => Arc::new(FilesystemBackend::new(root)),
            Self::Git {
                uri,
                basedir,
                refresh_interval_secs,
            } => Arc::new(GitBackend::new(
                GitBackendConfig::new(uri, basedir)
                    .with_refresh_interval(Duration::from_secs(*refresh_interval_secs)),
            )),
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self::filesystem()
    }
}

impl fmt::Display for BackendSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filesystem { root } => write!(f, "filesystem ({})", root.display()),
            Self::Git { uri, .. } => write!(f, "git ({})", uri),
        }
    }
}

/// Complete settings of the server binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Profile used when a request names none
    pub default_profile: String,

    /// Label used when a request names none
    pub default_label: String,

    /// Upper bound for one backend call, in milliseconds
    pub fetch_timeout_ms: u64,

    /// Upper bound for one HTTP request, in seconds
    pub request_timeout_secs: u64,

    /// Maximum number of cached bundles; unbounded when absent
    pub cache_max_entries: Option<usize>,

    pub log_format: LogFormat,

    pub backend: BackendSettings,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            default_profile: DEFAULT_PROFILE.to_string(),
            default_label: DEFAULT_LABEL.to_string(),
            fetch_timeout_ms: 10_000,
            request_timeout_secs: 30,
            cache_max_entries: None,
            log_format: LogFormat::Text,
            backend: BackendSettings::default(),
        }
    }
}

impl ServerSettings {
    /// Loads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a `SettingsError` if the settings file cannot be read or parsed,
    /// or if a variable holds an invalid value.
    pub fn load() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads settings using `lookup` to read environment variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let mut settings = match lookup(CONFIG_FILE_VAR).filter(|path| !path.trim().is_empty()) {
            Some(path) => Self::from_file(Path::new(path.trim()))?,
            None => Self::default(),
        };
        settings.apply_env_overrides(lookup)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads settings from a TOML file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        debug!("Loading settings from {:?}", path);

        if !path.exists() {
            return Err(SettingsError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Overrides individual settings from `CONFIG_SERVER_*` variables.
    ///
    /// `CONFIG_SERVER_BACKEND` is applied first so that backend specific
    /// variables land on the selected backend.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), SettingsError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(value) = var(BACKEND_VAR) {
            match value.trim().to_ascii_lowercase().as_str() {
                "filesystem" if self.backend.kind() != "filesystem" => {
                    self.backend = BackendSettings::filesystem()
                }
                "git" if self.backend.kind() != "git" => self.backend = BackendSettings::git(),
                "filesystem" | "git" => {}
                _ => {
                    return Err(invalid(
                        BACKEND_VAR,
                        &value,
                        "expected 'filesystem' or 'git'",
                    ))
                }
            }
        }

        if let Some(value) = var(HOST_VAR) {
            self.host = value.trim().to_string();
        }
        if let Some(value) = var(PORT_VAR) {
            self.port = parse_var(PORT_VAR, &value)?;
        }
        if let Some(value) = var(DEFAULT_PROFILE_VAR) {
            self.default_profile = value.trim().to_string();
        }
        if let Some(value) = var(DEFAULT_LABEL_VAR) {
            self.default_label = value.trim().to_string();
        }
        if let Some(value) = var(FETCH_TIMEOUT_VAR) {
            self.fetch_timeout_ms = parse_var(FETCH_TIMEOUT_VAR, &value)?;
        }
        if let Some(value) = var(REQUEST_TIMEOUT_VAR) {
            self.request_timeout_secs = parse_var(REQUEST_TIMEOUT_VAR, &value)?;
        }
        if let Some(value) = var(CACHE_MAX_ENTRIES_VAR) {
            self.cache_max_entries = Some(parse_var(CACHE_MAX_ENTRIES_VAR, &value)?);
        }
        if let Some(value) = var(LOG_FORMAT_VAR) {
            self.log_format = value
                .parse()
                .map_err(|reason: String| invalid(LOG_FORMAT_VAR, &value, &reason))?;
        }

        match &mut self.backend {
            BackendSettings::Filesystem { root } => {
                if let Some(value) = var(ROOT_VAR) {
                    *root = PathBuf::from(value.trim());
                }
            }
            BackendSettings::Git {
                uri,
                basedir,
                refresh_interval_secs,
            } => {
                if let Some(value) = var(GIT_URI_VAR) {
                    *uri = value.trim().to_string();
                }
                if let Some(value) = var(GIT_BASEDIR_VAR) {
                    *basedir = PathBuf::from(value.trim());
                }
                if let Some(value) = var(REFRESH_INTERVAL_VAR) {
                    *refresh_interval_secs = parse_var(REFRESH_INTERVAL_VAR, &value)?;
                }
            }
        }

        Ok(())
    }

    /// Checks values that parse but cannot be used.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.fetch_timeout_ms == 0 {
            return Err(invalid(FETCH_TIMEOUT_VAR, "0", "must be greater than zero"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid(REQUEST_TIMEOUT_VAR, "0", "must be greater than zero"));
        }
        if self.cache_max_entries == Some(0) {
            return Err(invalid(CACHE_MAX_ENTRIES_VAR, "0", "must be greater than zero"));
        }
        if let BackendSettings::Git { uri, .. } = &self.backend {
            if uri.trim().is_empty() {
                return Err(SettingsError::Missing {
                    variable: GIT_URI_VAR.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Options for the configuration service.
    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            fetch_timeout: self.fetch_timeout(),
            default_profile: self.default_profile.clone(),
            default_label: self.default_label.clone(),
        }
    }
}

fn parse_var<T>(variable: &str, value: &str) -> Result<T, SettingsError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(variable, value, &e.to_string()))
}

fn invalid(variable: &str, value: &str, reason: &str) -> SettingsError {
    SettingsError::InvalidValue {
        variable: variable.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(DEFAULT_ROOT)
}

fn default_git_basedir() -> PathBuf {
    PathBuf::from(DEFAULT_GIT_BASEDIR)
}

fn default_refresh_interval_secs() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
