//! Well-known file locations.

use std::path::PathBuf;

/// Overrides the configuration file path.
pub const CONFIG_ENV: &str = "HAILO_APPS_CONFIG";
/// Overrides the environment snapshot path.
pub const ENV_FILE_ENV: &str = "HAILO_APPS_ENV_FILE";

/// `$XDG_CONFIG_HOME/hailo-apps`, falling back to the temp dir when no home
/// can be determined.
pub fn config_home() -> PathBuf {
	dirs::config_dir().unwrap_or_else(std::env::temp_dir).join("hailo-apps")
}

/// Default configuration file: `$HAILO_APPS_CONFIG` or `<config_home>/config.yaml`.
pub fn default_config_path() -> PathBuf {
	if let Ok(p) = std::env::var(CONFIG_ENV) {
		return PathBuf::from(p);
	}
	config_home().join("config.yaml")
}

/// Default environment snapshot: `$HAILO_APPS_ENV_FILE` or `<config_home>/.env`.
pub fn default_env_file() -> PathBuf {
	if let Ok(p) = std::env::var(ENV_FILE_ENV) {
		return PathBuf::from(p);
	}
	config_home().join(".env")
}
