use crate::types::{AggregatorError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = ".gatorconfig.json";

/// Contents of `~/.gatorconfig.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub db_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_user_name: Option<String>,
    #[serde(skip)]
    path: PathBuf,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        let home = env::var_os("HOME")
            .ok_or_else(|| AggregatorError::Config("HOME is not set".to_string()))?;
        Ok(PathBuf::from(home).join(CONFIG_FILE_NAME))
    }

    pub fn read() -> Result<Self> {
        Self::read_from(Self::default_path()?)
    }

    pub fn read_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AggregatorError::Config(format!("couldn't read {}: {}", path.display(), e))
        })?;

        let mut config: Config = serde_json::from_str(&content)?;
        config.path = path.to_path_buf();
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn new(db_url: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            db_url: db_url.into(),
            current_user_name: None,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `DATABASE_URL` wins over the file's `db_url`.
    pub fn database_url(&self) -> String {
        env::var("DATABASE_URL").unwrap_or_else(|_| self.db_url.clone())
    }

    /// Records `name` as the current user and writes the file back.
    pub fn set_user(&mut self, name: &str) -> Result<()> {
        self.current_user_name = Some(name.to_string());
        self.write()
    }

    pub fn write(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_config_path() -> PathBuf {
        env::temp_dir().join(format!("gatorconfig-{}.json", Uuid::new_v4()))
    }

    #[test]
    fn reads_config_without_current_user() {
        let path = temp_config_path();
        fs::write(&path, r#"{"db_url": "postgres://localhost/gator"}"#).unwrap();

        let config = Config::read_from(&path).unwrap();
        assert_eq!(config.db_url, "postgres://localhost/gator");
        assert_eq!(config.current_user_name, None);
        assert_eq!(config.path(), path.as_path());

        fs::remove_file(path).ok();
    }

    #[test]
    fn set_user_persists_name() {
        let path = temp_config_path();
        let mut config = Config::new("postgres://localhost/gator", &path);
        config.set_user("kahya").unwrap();

        let reloaded = Config::read_from(&path).unwrap();
        assert_eq!(reloaded.current_user_name.as_deref(), Some("kahya"));
        assert_eq!(reloaded, config);

        fs::remove_file(path).ok();
    }

    #[test]
    fn missing_or_malformed_file_is_an_error() {
        let path = temp_config_path();
        assert!(matches!(Config::read_from(&path), Err(AggregatorError::Config(_))));

        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            Config::read_from(&path),
            Err(AggregatorError::Serialization(_))
        ));

        fs::remove_file(path).ok();
    }
}
