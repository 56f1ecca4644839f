use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "keyprint";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("", "", APP_NAME)
            .map(|pd| pd.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("keyprint_config.json"))
    }

    /// Log file location; the terminal itself is owned by the UI.
    pub fn log_path() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join(APP_NAME)
                .join("keyprint.log")
        } else {
            ProjectDirs::from("", "", APP_NAME)
                .map(|pd| pd.data_local_dir().join("keyprint.log"))
                .unwrap_or_else(|| PathBuf::from("keyprint.log"))
        }
    }
}
