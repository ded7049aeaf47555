//! Error type shared by every stage of the update check

use std::path::{Path, PathBuf};

/// Failure of one stage of the check/update sequence.
///
/// Every variant renders a message that can be shown to the user as-is.
#[derive(Debug)]
pub enum UpdateError {
    /// The installed executable is missing or carries no version resource
    VersionRead { path: PathBuf, reason: String },
    /// A version string could not be parsed
    InvalidVersion { value: String, reason: String },
    /// The release API could not be reached or answered with an error status
    Network { url: String, reason: String },
    /// The release API answered, but not with what we expected
    InvalidResponse { url: String, reason: String },
    /// The latest release has no installer asset
    AssetNotFound { asset: String, release: String },
    /// Fetching or writing the installer failed
    Download { url: String, reason: String },
    /// Terminating or launching a process failed
    Process { context: String, reason: String },
    /// The installer ran but did not finish successfully
    Installer { reason: String },
}

impl UpdateError {
    pub fn version_read(path: &Path, reason: impl ToString) -> Self {
        UpdateError::VersionRead {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn download(url: &str, reason: impl ToString) -> Self {
        UpdateError::Download {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn process(context: impl Into<String>, reason: impl ToString) -> Self {
        UpdateError::Process {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    /// Short title naming the step that failed, for dialog captions.
    pub fn title(&self) -> &'static str {
        match self {
            UpdateError::VersionRead { .. } | UpdateError::InvalidVersion { .. } => {
                "Could not determine the installed version"
            }
            UpdateError::Network { .. } | UpdateError::InvalidResponse { .. } => {
                "Could not check for updates"
            }
            UpdateError::AssetNotFound { .. } => "No installer in the latest release",
            UpdateError::Download { .. } => "Download failed",
            UpdateError::Process { .. } | UpdateError::Installer { .. } => "Update failed",
        }
    }
}

impl std::fmt::Display for UpdateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateError::VersionRead { path, reason } => {
                write!(f, "Failed to read version of '{}': {}", path.display(), reason)
            }
            UpdateError::InvalidVersion { value, reason } => {
                write!(f, "Invalid version '{}': {}", value, reason)
            }
            UpdateError::Network { url, reason } => {
                write!(f, "Request to {} failed: {}", url, reason)
            }
            UpdateError::InvalidResponse { url, reason } => {
                write!(f, "Unexpected response from {}: {}", url, reason)
            }
            UpdateError::AssetNotFound { asset, release } => {
                write!(f, "{} not found in the assets of release {}", asset, release)
            }
            UpdateError::Download { url, reason } => {
                write!(f, "Failed to download {}: {}", url, reason)
            }
            UpdateError::Process { context, reason } => write!(f, "{}: {}", context, reason),
            UpdateError::Installer { reason } => write!(f, "Installer failed: {}", reason),
        }
    }
}

impl std::error::Error for UpdateError {}

pub type Result<T> = std::result::Result<T, UpdateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_readable() {
        let err = UpdateError::AssetNotFound {
            asset: "setup.exe".to_string(),
            release: "v1.2.0".to_string(),
        };
        assert_eq!(err.to_string(), "setup.exe not found in the assets of release v1.2.0");
        assert_eq!(err.title(), "No installer in the latest release");

        let err = UpdateError::version_read(Path::new("/missing.exe"), "file not found");
        assert!(err.to_string().contains("/missing.exe"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_titles_distinguish_stages() {
        let network = UpdateError::Network {
            url: "u".into(),
            reason: "r".into(),
        };
        let download = UpdateError::download("u", "r");
        let installer = UpdateError::Installer { reason: "exit code 2".into() };
        assert_ne!(network.title(), download.title());
        assert_ne!(download.title(), installer.title());
    }
}
