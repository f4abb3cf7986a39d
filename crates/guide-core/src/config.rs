//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/guide/config.toml)
//! 3. Environment variables (GUIDE_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable prefix
const ENV_PREFIX: &str = "GUIDE";

/// Which associations a new version inherits from its predecessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionCopy {
    /// Copy topics only; personas must be supplied explicitly
    #[default]
    TopicsOnly,
    /// Copy both topics and personas
    Both,
    /// Copy nothing
    Neither,
}

impl VersionCopy {
    pub fn copies_topics(self) -> bool {
        matches!(self, VersionCopy::TopicsOnly | VersionCopy::Both)
    }

    pub fn copies_personas(self) -> bool {
        matches!(self, VersionCopy::Both)
    }
}

impl fmt::Display for VersionCopy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VersionCopy::TopicsOnly => "topics-only",
            VersionCopy::Both => "both",
            VersionCopy::Neither => "neither",
        };
        f.write_str(s)
    }
}

impl FromStr for VersionCopy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "topics-only" | "topics" => Ok(VersionCopy::TopicsOnly),
            "both" => Ok(VersionCopy::Both),
            "neither" | "none" => Ok(VersionCopy::Neither),
            other => bail!(
                "Invalid version copy policy '{}'. Use topics-only, both or neither.",
                other
            ),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for data storage
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Explicit database file (defaults to `<data_dir>/guide.db`)
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// Log file path (logs go to stderr when unset)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Association copy policy used when creating a new version of a link
    #[serde(default)]
    pub version_copy: VersionCopy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database: None,
            log_file: None,
            version_copy: VersionCopy::default(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (GUIDE_DATA_DIR, GUIDE_DATABASE, ...)
    /// 2. Config file (~/.config/guide/config.toml or GUIDE_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_path(p),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Configuration rooted at a directory, ignoring file and environment
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        // GUIDE_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // GUIDE_DATABASE
        if let Ok(val) = std::env::var(format!("{}_DATABASE", ENV_PREFIX)) {
            self.database = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        // GUIDE_LOG_FILE
        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        // GUIDE_VERSION_COPY
        if let Ok(val) = std::env::var(format!("{}_VERSION_COPY", ENV_PREFIX)) {
            self.version_copy = val
                .parse()
                .with_context(|| format!("Invalid {}_VERSION_COPY", ENV_PREFIX))?;
        }

        Ok(())
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with GUIDE_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("guide")
            .join("config.toml")
    }

    /// Get the path to the SQLite database
    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.data_dir.join("guide.db"))
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("guide")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "GUIDE_DATA_DIR",
        "GUIDE_DATABASE",
        "GUIDE_LOG_FILE",
        "GUIDE_VERSION_COPY",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.database.is_none());
        assert!(config.log_file.is_none());
        assert_eq!(config.version_copy, VersionCopy::TopicsOnly);
        assert!(config.data_dir.ends_with("guide"));
    }

    #[test]
    fn test_database_path() {
        let config = Config::in_dir("/data/guide");
        assert_eq!(config.database_path(), PathBuf::from("/data/guide/guide.db"));

        let config = Config {
            database: Some(PathBuf::from("/elsewhere/links.db")),
            ..Config::in_dir("/data/guide")
        };
        assert_eq!(config.database_path(), PathBuf::from("/elsewhere/links.db"));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("GUIDE_DATA_DIR", "/tmp/guide-test");
        config.apply_env_overrides().unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/guide-test"));
    }

    #[test]
    fn test_env_override_version_copy() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("GUIDE_VERSION_COPY", "both");
        config.apply_env_overrides().unwrap();
        assert_eq!(config.version_copy, VersionCopy::Both);

        env::set_var("GUIDE_VERSION_COPY", "sideways");
        assert!(config.apply_env_overrides().is_err());
    }

    #[test]
    fn test_env_override_database_empty_clears() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config {
            database: Some(PathBuf::from("/x.db")),
            ..Config::default()
        };

        env::set_var("GUIDE_DATABASE", "");
        config.apply_env_overrides().unwrap();
        assert!(config.database.is_none());
    }

    #[test]
    fn test_version_copy_parse() {
        assert_eq!("topics-only".parse::<VersionCopy>().unwrap(), VersionCopy::TopicsOnly);
        assert_eq!("NEITHER".parse::<VersionCopy>().unwrap(), VersionCopy::Neither);
        assert!(VersionCopy::Both.copies_personas());
        assert!(!VersionCopy::TopicsOnly.copies_personas());
        assert!(!VersionCopy::Neither.copies_topics());
        assert_eq!(VersionCopy::TopicsOnly.to_string(), "topics-only");
    }

    #[test]
    fn test_serialization() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config {
            data_dir: PathBuf::from("/data/guide"),
            database: None,
            log_file: Some(PathBuf::from("/var/log/guide.log")),
            version_copy: VersionCopy::Neither,
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("version_copy = \"neither\""));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.data_dir, config.data_dir);
        assert_eq!(parsed.log_file, config.log_file);
        assert_eq!(parsed.version_copy, config.version_copy);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            version_copy = "both"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.version_copy, VersionCopy::Both);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.version_copy, VersionCopy::TopicsOnly);
        assert!(config.database.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config {
            version_copy: VersionCopy::Both,
            ..Config::in_dir(dir.path())
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.version_copy, VersionCopy::Both);
        assert_eq!(loaded.data_dir, dir.path());
    }
}
