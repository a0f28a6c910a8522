use crate::error::{Result, RosterError};
use crate::store::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILENAME: &str = "config.json";
const DEFAULT_DB_FILENAME: &str = "roster.db";
const DEFAULT_BLOB_DIRNAME: &str = "blobs";
const DEFAULT_DEBOUNCE_MS: u64 = 300;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 50;

pub const KEYS: [&str; 5] = [
    "database-path",
    "blob-dir",
    "debounce-ms",
    "retry-attempts",
    "retry-backoff-ms",
];

/// Configuration for roster, stored in `<home>/config.json`.
///
/// Relative paths are resolved against the home directory. Unset paths fall
/// back to `roster.db` and `blobs/` inside it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RosterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_dir: Option<PathBuf>,

    /// Quiet period before form validation runs
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Attempts per store operation when the store is unreachable
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_retry_attempts() -> u32 {
    DEFAULT_RETRY_ATTEMPTS
}

fn default_retry_backoff_ms() -> u64 {
    DEFAULT_RETRY_BACKOFF_MS
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            blob_dir: None,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }
}

impl RosterConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let config: RosterConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();
        fs::create_dir_all(config_dir)?;

        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_dir.join(CONFIG_FILENAME), content)?;
        Ok(())
    }

    pub fn database_path(&self, home: &Path) -> PathBuf {
        resolve(home, self.database_path.as_deref(), DEFAULT_DB_FILENAME)
    }

    pub fn blob_dir(&self, home: &Path) -> PathBuf {
        resolve(home, self.blob_dir.as_deref(), DEFAULT_BLOB_DIRNAME)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "database-path" => Some(
                self.database_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| DEFAULT_DB_FILENAME.to_string()),
            ),
            "blob-dir" => Some(
                self.blob_dir
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| DEFAULT_BLOB_DIRNAME.to_string()),
            ),
            "debounce-ms" => Some(self.debounce_ms.to_string()),
            "retry-attempts" => Some(self.retry_attempts.to_string()),
            "retry-backoff-ms" => Some(self.retry_backoff_ms.to_string()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "database-path" => self.database_path = Some(PathBuf::from(value)),
            "blob-dir" => self.blob_dir = Some(PathBuf::from(value)),
            "debounce-ms" => self.debounce_ms = parse_number(key, value)?,
            "retry-attempts" => {
                let attempts: u32 = parse_number(key, value)?;
                if attempts == 0 {
                    return Err(RosterError::Config(
                        "retry-attempts must be at least 1".to_string(),
                    ));
                }
                self.retry_attempts = attempts;
            }
            "retry-backoff-ms" => self.retry_backoff_ms = parse_number(key, value)?,
            other => {
                return Err(RosterError::Config(format!(
                    "Unknown config key: {}",
                    other
                )))
            }
        }
        Ok(())
    }
}

fn resolve(home: &Path, configured: Option<&Path>, default_name: &str) -> PathBuf {
    match configured {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => home.join(path),
        None => home.join(default_name),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| RosterError::Config(format!("{} expects a number, got '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RosterConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.retry_policy().attempts, 3);
        assert_eq!(
            config.database_path(Path::new("/home/r")),
            PathBuf::from("/home/r/roster.db")
        );
        assert_eq!(
            config.blob_dir(Path::new("/home/r")),
            PathBuf::from("/home/r/blobs")
        );
    }

    #[test]
    fn test_relative_and_absolute_paths() {
        let mut config = RosterConfig::default();
        config.set("database-path", "data/students.db").unwrap();
        assert_eq!(
            config.database_path(Path::new("/home/r")),
            PathBuf::from("/home/r/data/students.db")
        );
        config.set("blob-dir", "/srv/blobs").unwrap();
        assert_eq!(
            config.blob_dir(Path::new("/home/r")),
            PathBuf::from("/srv/blobs")
        );
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = RosterConfig::default();
        assert!(config.set("debounce-ms", "soon").is_err());
        assert!(config.set("retry-attempts", "0").is_err());
        assert!(config.set("colour", "blue").is_err());
        assert_eq!(config, RosterConfig::default());
    }

    #[test]
    fn test_get_known_keys() {
        let config = RosterConfig::default();
        for key in KEYS {
            assert!(config.get(key).is_some(), "{}", key);
        }
        assert_eq!(config.get("nope"), None);
    }

    #[test]
    fn test_load_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = RosterConfig::load(dir.path()).unwrap();
        assert_eq!(config, RosterConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RosterConfig::default();
        config.set("debounce-ms", "150").unwrap();
        config.save(dir.path()).unwrap();

        let loaded = RosterConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.debounce_ms, 150);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let parsed: RosterConfig = serde_json::from_str(r#"{"retry_attempts": 5}"#).unwrap();
        assert_eq!(parsed.retry_attempts, 5);
        assert_eq!(parsed.debounce_ms, 300);
        assert!(parsed.database_path.is_none());
    }
}
