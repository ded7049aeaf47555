use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::logging::log_warning;
use crate::paths::{DEFAULT_CONFIG_PATH, DEFAULT_INSTALL_PATH};

// ============================================================================
// Updater Config
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct UpdaterConfig {
    /// Display name used in dialog captions
    pub app_name: String,
    /// Process name of the running application, without extension
    pub process_name: String,
    /// Installed executable; its version resource is the current version
    pub install_path: PathBuf,
    pub releases_url: String,
    pub user_agent: String,
    /// Installer asset to look for in the latest release (case-insensitive)
    pub asset_name: String,
    pub installer_args: Vec<String>,
    pub download_path: PathBuf,
    pub request_timeout_secs: u64,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
    pub installer_timeout_secs: u64,
    pub terminate_timeout_secs: u64,
    /// Keep the console quiet and give spawned children no console window
    pub run_silently: bool,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            app_name: "Classic Volume Mixer".to_string(),
            process_name: "ClassicVolumeMixer".to_string(),
            install_path: DEFAULT_INSTALL_PATH.clone(),
            releases_url: "https://api.github.com/repos/popeen/classic-volume-mixer/releases"
                .to_string(),
            user_agent: "cvm-updater".to_string(),
            asset_name: "setup.exe".to_string(),
            installer_args: vec!["/SILENT".to_string()],
            download_path: crate::data_path!("setup.exe"),
            request_timeout_secs: 30,
            retry_attempts: 3,
            retry_backoff_ms: 500,
            installer_timeout_secs: 600,
            terminate_timeout_secs: 10,
            run_silently: true,
        }
    }
}

impl UpdaterConfig {
    pub fn default_path() -> PathBuf {
        DEFAULT_CONFIG_PATH.join("updater.json")
    }

    /// Load from the default location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&Self::default_path())
    }

    /// Load from `path`. A missing file gives the defaults; a broken one is logged and ignored.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    log_warning(&format!(
                        "Ignoring malformed config {}: {}",
                        path.display(),
                        e
                    ));
                    Self::default()
                }
            },
            Err(e) => {
                log_warning(&format!("Could not read config {}: {}", path.display(), e));
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }

    /// Caption shared by every dialog.
    pub fn dialog_caption(&self) -> String {
        format!("{} | Update checker", self.app_name)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn installer_timeout(&self) -> Duration {
        Duration::from_secs(self.installer_timeout_secs)
    }

    pub fn terminate_timeout(&self) -> Duration {
        Duration::from_secs(self.terminate_timeout_secs)
    }
}
