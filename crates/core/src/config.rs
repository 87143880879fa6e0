use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::filter::DEFAULT_PAGE_SIZE;
use crate::status::CompletionTracking;

static SEED_FILE_NAME: &str = "tasks.json";
static ENV_DATA_DIR: &str = "TASKMARK_DATA_DIR";
static ENV_PAGE_SIZE: &str = "TASKMARK_PAGE_SIZE";
static ENV_COMPLETION_TRACKING: &str = "TASKMARK_COMPLETION_TRACKING";

pub const MAX_PAGE_SIZE: u32 = 200;

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("dev", "taskmark", "taskmark"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("TASKMARK_PAGE_SIZE must be a number, got '{0}'")]
    InvalidPageSize(String),
    #[error("TASKMARK_PAGE_SIZE must be between 1 and 200, got {0}")]
    PageSizeOutOfRange(u32),
    #[error("TASKMARK_COMPLETION_TRACKING must be 'recorded' or 'unavailable', got '{0}'")]
    InvalidCompletionTracking(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    data_dir: PathBuf,
    seed_path: PathBuf,
    page_size: u32,
    completion_tracking: CompletionTracking,
}

impl AppConfig {
    /// Construct [`AppConfig`] by resolving the data directory using the provided override,
    /// environment variables, and platform defaults.
    pub fn discover(data_dir_override: Option<PathBuf>) -> Result<Self> {
        let data_dir = resolve_data_dir(data_dir_override)?;
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).with_context(|| {
                format!("Failed to create data directory at {}", data_dir.display())
            })?;
        }
        Self::from_data_dir(data_dir)
    }

    /// Construct [`AppConfig`] directly from a resolved data directory, reading the
    /// remaining settings from the process environment.
    pub fn from_data_dir(data_dir: PathBuf) -> Result<Self> {
        let config = Self::from_lookup(data_dir, |key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_lookup<F>(data_dir: PathBuf, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let page_size = match lookup(ENV_PAGE_SIZE) {
            Some(raw) => parse_page_size(&raw)?,
            None => DEFAULT_PAGE_SIZE,
        };
        let completion_tracking = match lookup(ENV_COMPLETION_TRACKING) {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidCompletionTracking(raw.trim().to_string()))?,
            None => CompletionTracking::default(),
        };

        Ok(Self {
            seed_path: data_dir.join(SEED_FILE_NAME),
            data_dir,
            page_size,
            completion_tracking,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn completion_tracking(&self) -> CompletionTracking {
        self.completion_tracking
    }

    /// Seed file for the in-memory backend, if one exists in the data directory.
    pub fn seed_path(&self) -> Option<&Path> {
        self.seed_path.is_file().then_some(self.seed_path.as_path())
    }
}

fn parse_page_size(raw: &str) -> Result<u32, ConfigError> {
    let value: u32 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidPageSize(raw.trim().to_string()))?;
    if value == 0 || value > MAX_PAGE_SIZE {
        return Err(ConfigError::PageSizeOutOfRange(value));
    }
    Ok(value)
}

fn resolve_data_dir(data_dir_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = data_dir_override {
        return Ok(dir);
    }

    if let Ok(env_dir) = env::var(ENV_DATA_DIR) {
        return Ok(PathBuf::from(env_dir));
    }

    if cfg!(debug_assertions) {
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let dev_dir = manifest_dir.join("..").join("tmp").join("dev-taskmark");
        return Ok(dev_dir);
    }

    if let Some(project) = &*PROJECT_DIRS {
        return Ok(project.data_dir().to_path_buf());
    }

    if let Some(base) = BaseDirs::new() {
        return Ok(base.home_dir().join(".taskmark"));
    }

    Ok(env::current_dir()?.join(".taskmark"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn discover_creates_override_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("data");

        let config = AppConfig::discover(Some(dir.clone())).unwrap();
        assert!(dir.is_dir());
        assert_eq!(config.data_dir(), dir.as_path());
        assert!(config.seed_path().is_none());
    }

    #[test]
    fn defaults_apply_without_environment() {
        let temp = TempDir::new().unwrap();
        let config = AppConfig::from_lookup(temp.path().to_path_buf(), lookup(&[])).unwrap();
        assert_eq!(config.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(config.completion_tracking(), CompletionTracking::Recorded);
    }

    #[test]
    fn reads_page_size_and_tracking() {
        let temp = TempDir::new().unwrap();
        let config = AppConfig::from_lookup(
            temp.path().to_path_buf(),
            lookup(&[
                ("TASKMARK_PAGE_SIZE", " 50 "),
                ("TASKMARK_COMPLETION_TRACKING", "unavailable"),
            ]),
        )
        .unwrap();
        assert_eq!(config.page_size(), 50);
        assert_eq!(config.completion_tracking(), CompletionTracking::Unavailable);
    }

    #[test]
    fn rejects_invalid_values() {
        let dir = PathBuf::from("/unused");
        assert_eq!(
            AppConfig::from_lookup(dir.clone(), lookup(&[("TASKMARK_PAGE_SIZE", "lots")]))
                .unwrap_err(),
            ConfigError::InvalidPageSize("lots".into())
        );
        assert_eq!(
            AppConfig::from_lookup(dir.clone(), lookup(&[("TASKMARK_PAGE_SIZE", "0")]))
                .unwrap_err(),
            ConfigError::PageSizeOutOfRange(0)
        );
        let err = AppConfig::from_lookup(
            dir,
            lookup(&[("TASKMARK_COMPLETION_TRACKING", "sometimes")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("'sometimes'"));
    }

    #[test]
    fn seed_path_points_at_existing_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("tasks.json"), "[]").unwrap();

        let config = AppConfig::from_lookup(temp.path().to_path_buf(), lookup(&[])).unwrap();
        assert_eq!(config.seed_path(), Some(temp.path().join("tasks.json").as_path()));
    }
}
