//! Service configuration.
//!
//! Settings come from a TOML file. The API validation key is a secret and is
//! normally supplied through the `SHIFTADMIN_VALIDATION_KEY` environment
//! variable (a `.env` file is loaded first if present), which overrides any
//! key in the file.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable holding the ShiftAdmin validation key.
pub const VALIDATION_KEY_ENV: &str = "SHIFTADMIN_VALIDATION_KEY";

const DEFAULT_API_URL: &str = "https://www.shiftadmin.com/api_getscheduledshifts_json.php";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("No ShiftAdmin validation key: set SHIFTADMIN_VALIDATION_KEY or api.validation_key")]
    MissingValidationKey,
}

/// Connection settings for the scheduling provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub url: String,
    /// Fixed program group identifier sent as `gid`.
    pub group_id: u32,
    pub validation_key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_string(),
            group_id: 1,
            validation_key: String::new(),
        }
    }
}

/// Locations of the two static reference tables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    pub block_dates: PathBuf,
    pub residents: PathBuf,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            block_dates: PathBuf::from("data/block_dates.csv"),
            residents: PathBuf::from("data/residents.csv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Drop shifts worked by people missing from the roster.
    pub exclude_off_service: bool,
    /// Month and day the academic year starts; anchors year-to-date windows.
    pub academic_year_start_month: u32,
    pub academic_year_start_day: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            exclude_off_service: true,
            academic_year_start_month: 7,
            academic_year_start_day: 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub reference: ReferenceConfig,
    pub dashboard: DashboardConfig,
}

impl Config {
    /// Load the config file and apply the environment key override.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::read(path)?.with_validation_key(std::env::var(VALIDATION_KEY_ENV).ok())
    }

    /// Read the config file without requiring a validation key. Used when
    /// replaying a saved feed, where the key is never sent.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Apply a key override (blank values are ignored) and require that a
    /// key is present afterwards.
    pub fn with_validation_key(mut self, key: Option<String>) -> Result<Self, ConfigError> {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.api.validation_key = key.trim().to_string();
        }
        if self.api.validation_key.trim().is_empty() {
            return Err(ConfigError::MissingValidationKey);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [reference]
            block_dates = "ref/blocks.csv"
            residents = "ref/residents.csv"
            "#,
        )
        .expect("minimal config should parse");

        assert_eq!(config.api.url, DEFAULT_API_URL);
        assert_eq!(config.api.group_id, 1);
        assert_eq!(config.reference.block_dates, PathBuf::from("ref/blocks.csv"));
        assert!(config.dashboard.exclude_off_service);
        assert_eq!(config.dashboard.academic_year_start_month, 7);
    }

    #[test]
    fn test_env_key_overrides_file_key() {
        let config = Config::from_toml("[api]\nvalidation_key = \"FROM_FILE\"\n").unwrap();
        let config = config.with_validation_key(Some("FROM_ENV".to_string())).unwrap();
        assert_eq!(config.api.validation_key, "FROM_ENV");
    }

    #[test]
    fn test_blank_env_key_keeps_file_key() {
        let config = Config::from_toml("[api]\nvalidation_key = \"FROM_FILE\"\n").unwrap();
        let config = config.with_validation_key(Some("  ".to_string())).unwrap();
        assert_eq!(config.api.validation_key, "FROM_FILE");
    }

    #[test]
    fn test_missing_key_is_an_error() {
        let config = Config::from_toml("").unwrap();
        assert!(matches!(
            config.with_validation_key(None),
            Err(ConfigError::MissingValidationKey)
        ));
    }

    #[test]
    fn test_bad_toml_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api\nurl = ").unwrap();
        match Config::load(file.path()) {
            Err(ConfigError::Parse { path, .. }) => assert_eq!(path, file.path()),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_read_does_not_require_key() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[dashboard]\nexclude_off_service = false").unwrap();
        let config = Config::read(file.path()).unwrap();
        assert!(!config.dashboard.exclude_off_service);
        assert_eq!(config.api.validation_key, "");
    }

    #[test]
    fn test_unreadable_file_is_io_error() {
        assert!(matches!(
            Config::load("/nonexistent/shiftstats.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
