use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow, bail};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_DASHBOARD_URL: &str =
    "http://192.168.3.244:3000/public/dashboard/79a0e848-3983-4c16-a7af-1d127a97d723";
pub const DEFAULT_USER_ID: &str = "11111111-1111-1111-1111-111111111111";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub dashboard_url: String,
    pub user_id: String,
    pub log_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            dashboard_url: DEFAULT_DASHBOARD_URL.to_string(),
            user_id: DEFAULT_USER_ID.to_string(),
            log_path: None,
        }
    }

    /// Loads from `path` when given, otherwise from the user config
    /// directory. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::get_config_path()?,
        };
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config {}: {}", path.display(), e))?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Failed to parse config {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            bail!("api_base_url must not be empty");
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            bail!("api_base_url must be an http(s) URL");
        }
        if self.dashboard_url.trim().is_empty() {
            bail!("dashboard_url must not be empty");
        }
        if self.user_id.trim().is_empty() {
            bail!("user_id must not be empty");
        }
        Ok(())
    }

    /// Log file location, defaulting to the user data directory.
    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log_path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;
        Ok(data_dir.join("smartscan").join("smartscan.log"))
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("smartscan").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_explicit_path_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");

        fs::write(&path, r#"{"api_base_url":"http://obd.local:9000/"}"#).unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.api_base_url, "http://obd.local:9000/");
        assert_eq!(config.user_id, DEFAULT_USER_ID);

        fs::write(&path, r#"{"api_base_url":"ftp://obd.local"}"#).unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_path(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"api_base_url":"https://scan.example.com/"}"#).unwrap();

        let config = Config::from_path(&path).unwrap();
        assert_eq!(config.api_base_url, "https://scan.example.com/");
        assert_eq!(config.user_id, DEFAULT_USER_ID);
        assert_eq!(config.dashboard_url, DEFAULT_DASHBOARD_URL);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = Config::new();
        config.user_id = "driver-42".to_string();
        config.log_path = Some(dir.path().join("out.log"));
        config.save_to(&path).unwrap();

        let loaded = Config::from_path(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.log_file().unwrap(), dir.path().join("out.log"));
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        let err = Config::from_path(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        let mut config = Config::new();
        config.user_id = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.api_base_url = "localhost:8000".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.dashboard_url = String::new();
        assert!(config.validate().is_err());
    }
}
