use std::{path::PathBuf, sync::LazyLock};

/// Folder name shared with the main application under the per-user data directories.
pub const APP_DIR_NAME: &str = "ClassicVolumeMixer";

/// Roaming per-user directory (`%APPDATA%\ClassicVolumeMixer` on Windows).
pub static DEFAULT_DATA_PATH: LazyLock<PathBuf> = LazyLock::new(|| {
    let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
    path.push(APP_DIR_NAME);
    path
});

/// Machine-local per-user directory, used for logs.
pub static DEFAULT_LOCAL_PATH: LazyLock<PathBuf> = LazyLock::new(|| {
    let mut path = dirs::data_local_dir().unwrap_or_else(std::env::temp_dir);
    path.push(APP_DIR_NAME);
    path
});

/// Per-user config directory, holding `updater.json`.
pub static DEFAULT_CONFIG_PATH: LazyLock<PathBuf> = LazyLock::new(|| {
    let mut path = dirs::config_dir().unwrap_or_else(std::env::temp_dir);
    path.push(APP_DIR_NAME);
    path
});

/// Default location of the installed executable.
pub static DEFAULT_INSTALL_PATH: LazyLock<PathBuf> = LazyLock::new(|| {
    let program_files = std::env::var_os("ProgramFiles(x86)")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\Program Files (x86)"));
    program_files
        .join("Classic Volume Mixer")
        .join("ClassicVolumeMixer.exe")
});

/// Computes a path under the roaming per-user data directory.
///
/// Returns a `&Path` referencing the directory itself if no arguments are passed in, or a
/// `PathBuf` created by joining all of the arguments to it if at least one argument is passed in.
///
/// # Examples
///
/// ```
/// use cvm_updater::data_path;
///
/// let installer = data_path!("setup.exe");
/// assert!(installer.starts_with(data_path!()));
/// assert!(installer.ends_with("setup.exe"));
/// ```
#[macro_export]
macro_rules! data_path {
    () => {
        $crate::paths::DEFAULT_DATA_PATH.as_path()
    };

    ( $( $path:expr ),+ $(,)? ) => {
        [
            $crate::paths::DEFAULT_DATA_PATH.as_path(),
            $( std::path::Path::new(&$path) ),+
        ].into_iter().collect::<std::path::PathBuf>()
    };
}

/// Same as [`data_path!`] but rooted at the machine-local directory.
#[macro_export]
macro_rules! local_path {
    () => {
        $crate::paths::DEFAULT_LOCAL_PATH.as_path()
    };

    ( $( $path:expr ),+ $(,)? ) => {
        [
            $crate::paths::DEFAULT_LOCAL_PATH.as_path(),
            $( std::path::Path::new(&$path) ),+
        ].into_iter().collect::<std::path::PathBuf>()
    };
}
