//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Ferry has two configuration scopes:
//! - **Global**: User-level settings
//! - **Repo**: Repository-level settings, including the workflow policy
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$FERRY_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/ferry/config.toml`
//! 3. `~/.ferry/config.toml`
//!
//! # Repo Config Locations
//!
//! Searched in order:
//! 1. `.git/ferry/config.toml` (local, not shared)
//! 2. `.ferry.toml` in the work tree root (checked in with the project)
//!
//! # Example
//!
//! ```no_run
//! use gitferry::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Some(Path::new("/path/to/repo"))).unwrap();
//! let config = result.config;
//!
//! println!("Sync from: {}", config.sync_source_remote());
//! println!("Timeout: {:?}", config.git_timeout());
//! let policy = config.workflow_policy();
//! ```

pub mod schema;

pub use schema::{GlobalConfig, RepoConfig};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::core::policy::WorkflowPolicy;
use crate::core::types::{Realignment, SyncStrategy};

/// Default wall-clock limit for a single child process.
pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(3600);

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence rules automatically: repo config overrides
/// global config, which overrides built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Repository configuration (if in a repo)
    pub repo: Option<RepoConfig>,
    global_path: Option<PathBuf>,
    repo_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `work_dir` is provided, also loads repo-specific config.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or hold
    /// invalid values. Missing config files are not an error.
    pub fn load(work_dir: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let (global, global_path) = Self::load_global()?;
        let (repo, repo_path) = match work_dir {
            Some(path) => Self::load_repo(path, &mut warnings)?,
            None => (None, None),
        };

        global.validate()?;
        if let Some(ref r) = repo {
            r.validate()?;
        }

        tracing::debug!(?global_path, ?repo_path, "configuration loaded");

        Ok(ConfigLoadResult {
            config: Config {
                global,
                repo,
                global_path,
                repo_path,
            },
            warnings,
        })
    }

    fn load_global() -> Result<(GlobalConfig, Option<PathBuf>), ConfigError> {
        let mut candidates = Vec::new();
        if let Ok(path) = std::env::var("FERRY_CONFIG") {
            candidates.push(PathBuf::from(path));
        }
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            candidates.push(PathBuf::from(xdg_home).join("ferry/config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".ferry/config.toml"));
        }

        for path in candidates {
            if path.exists() {
                let config = read_toml(&path)?;
                return Ok((config, Some(path)));
            }
        }

        Ok((GlobalConfig::default(), None))
    }

    fn load_repo(
        work_dir: &Path,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<(Option<RepoConfig>, Option<PathBuf>), ConfigError> {
        let local = work_dir.join(".git/ferry/config.toml");
        let shared = work_dir.join(".ferry.toml");

        if local.exists() {
            if shared.exists() {
                warnings.push(ConfigWarning {
                    message: format!(
                        "Both '{}' and '{}' exist; ignoring the shared file",
                        local.display(),
                        shared.display()
                    ),
                    path: shared,
                });
            }
            let config = read_toml(&local)?;
            return Ok((Some(config), Some(local)));
        }

        if shared.exists() {
            let config = read_toml(&shared)?;
            return Ok((Some(config), Some(shared)));
        }

        Ok((None, None))
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Wall-clock limit for a single git or patch invocation.
    pub fn git_timeout(&self) -> Duration {
        self.global
            .git
            .as_ref()
            .and_then(|g| g.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_GIT_TIMEOUT)
    }

    /// The workflow policy. Repo scope only; permissive when unset.
    pub fn workflow_policy(&self) -> WorkflowPolicy {
        self.repo
            .as_ref()
            .and_then(|r| r.workflow.as_ref())
            .map(|w| w.to_policy())
            .unwrap_or_default()
    }

    /// Default sync strategy. Defaults to `smart`.
    pub fn sync_strategy(&self) -> SyncStrategy {
        self.sync_value(|s| s.strategy).unwrap_or_default()
    }

    /// Remote to sync from. Defaults to "upstream".
    pub fn sync_source_remote(&self) -> String {
        self.sync_value(|s| s.source_remote.clone())
            .unwrap_or_else(|| "upstream".to_string())
    }

    /// Remote to publish synced branches to. Defaults to "origin".
    pub fn sync_dest_remote(&self) -> String {
        self.sync_value(|s| s.dest_remote.clone())
            .unwrap_or_else(|| "origin".to_string())
    }

    /// Remote holding merge source and target. Defaults to "upstream".
    pub fn merge_remote(&self) -> String {
        self.merge_value(|m| m.remote.clone())
            .unwrap_or_else(|| "upstream".to_string())
    }

    /// Realignment mode for merges. Defaults to none.
    pub fn merge_realign(&self) -> Realignment {
        self.merge_value(|m| m.realign).unwrap_or_default()
    }

    /// Whether merge commits carry a commit summary. Defaults to `true`.
    pub fn merge_append_log(&self) -> bool {
        self.merge_value(|m| m.append_log).unwrap_or(true)
    }

    /// Whether staging branches survive the operation. Defaults to `false`.
    pub fn keep_temp_branches(&self) -> bool {
        self.merge_value(|m| m.keep_temp_branches).unwrap_or(false)
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded repo config file.
    pub fn repo_config_loaded_from(&self) -> Option<&Path> {
        self.repo_path.as_deref()
    }

    fn sync_value<T>(&self, get: impl Fn(&schema::SyncDefaults) -> Option<T>) -> Option<T> {
        let repo = self.repo.as_ref().and_then(|r| r.sync.as_ref()).and_then(&get);
        repo.or_else(|| self.global.sync.as_ref().and_then(&get))
    }

    fn merge_value<T>(&self, get: impl Fn(&schema::MergeDefaults) -> Option<T>) -> Option<T> {
        let repo = self.repo.as_ref().and_then(|r| r.merge.as_ref()).and_then(&get);
        repo.or_else(|| self.global.merge.as_ref().and_then(&get))
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::schema::{MergeDefaults, SyncDefaults};
    use super::*;
    use crate::core::policy::PolicyPreset;
    use tempfile::TempDir;

    fn repo_dir_with(path: &str, contents: &str) -> TempDir {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join(path);
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(file, contents).unwrap();
        temp
    }

    #[test]
    fn defaults_without_files() {
        let config = Config::default();

        assert_eq!(config.git_timeout(), DEFAULT_GIT_TIMEOUT);
        assert_eq!(config.sync_strategy(), SyncStrategy::Smart);
        assert_eq!(config.sync_source_remote(), "upstream");
        assert_eq!(config.sync_dest_remote(), "origin");
        assert_eq!(config.merge_remote(), "upstream");
        assert_eq!(config.merge_realign(), Realignment::None);
        assert!(config.merge_append_log());
        assert!(!config.keep_temp_branches());
        assert_eq!(config.workflow_policy(), WorkflowPolicy::default());
    }

    #[test]
    fn load_local_repo_config() {
        let temp = repo_dir_with(
            ".git/ferry/config.toml",
            r#"
            [workflow]
            preset = "semver"

            [sync]
            source_remote = "fork"
            "#,
        );

        let result = Config::load(Some(temp.path())).unwrap();
        let config = result.config;

        assert_eq!(config.workflow_policy().preset, PolicyPreset::Semver);
        assert_eq!(config.sync_source_remote(), "fork");
        assert!(result.warnings.is_empty());
        assert!(config.repo_config_loaded_from().is_some());
    }

    #[test]
    fn load_shared_repo_config() {
        let temp = repo_dir_with(".ferry.toml", "[workflow]\npreset = \"git-flow\"");

        let config = Config::load(Some(temp.path())).unwrap().config;
        assert_eq!(config.workflow_policy().preset, PolicyPreset::GitFlow);
    }

    #[test]
    fn local_config_shadows_shared_with_warning() {
        let temp = repo_dir_with(".ferry.toml", "[workflow]\npreset = \"git-flow\"");
        let local = temp.path().join(".git/ferry/config.toml");
        fs::create_dir_all(local.parent().unwrap()).unwrap();
        fs::write(&local, "[workflow]\npreset = \"semver\"").unwrap();

        let result = Config::load(Some(temp.path())).unwrap();
        assert_eq!(result.config.workflow_policy().preset, PolicyPreset::Semver);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn unknown_fields_rejected() {
        let temp = repo_dir_with(".ferry.toml", "trunk = \"main\"");
        assert!(matches!(
            Config::load(Some(temp.path())),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn invalid_values_rejected() {
        let temp = repo_dir_with(".ferry.toml", "[merge]\nremote = \"  \"");
        assert!(matches!(
            Config::load(Some(temp.path())),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn repo_overrides_global() {
        let config = Config {
            global: GlobalConfig {
                sync: Some(SyncDefaults {
                    strategy: Some(SyncStrategy::Force),
                    dest_remote: Some("mirror".to_string()),
                    ..Default::default()
                }),
                merge: Some(MergeDefaults {
                    keep_temp_branches: Some(true),
                    ..Default::default()
                }),
                ..Default::default()
            },
            repo: Some(RepoConfig {
                sync: Some(SyncDefaults {
                    strategy: Some(SyncStrategy::SmartMerge),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            global_path: None,
            repo_path: None,
        };

        assert_eq!(config.sync_strategy(), SyncStrategy::SmartMerge);
        // Falls through to global where the repo leaves it unset
        assert_eq!(config.sync_dest_remote(), "mirror");
        assert!(config.keep_temp_branches());
    }
}
