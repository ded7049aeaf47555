//! Updater Logging System
//!
//! Writes timestamped, level-tagged lines to a per-run log file, preceded by a
//! short system information header. Lines are echoed to the console unless the
//! updater runs silently.

use chrono::Local;
use parking_lot::Mutex;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use sysinfo::System;

static LOGGER: OnceLock<Mutex<UpdaterLogger>> = OnceLock::new();
static CONSOLE_ECHO: AtomicBool = AtomicBool::new(true);

// ============================================================================
// System Information Detection
// ============================================================================

#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub app_version: String,
    pub os: String,
    pub kernel: String,
    pub arch: String,
    pub host: String,
    pub executable: String,
}

impl SystemInfo {
    pub fn detect() -> Self {
        let unknown = || "Unknown".to_string();
        Self {
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            os: System::long_os_version().unwrap_or_else(unknown),
            kernel: System::kernel_version().unwrap_or_else(unknown),
            arch: std::env::consts::ARCH.to_string(),
            host: System::host_name().unwrap_or_else(unknown),
            executable: std::env::current_exe()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| unknown()),
        }
    }

    pub fn to_log_header(&self) -> String {
        format!(
r#"================================================================================
Classic Volume Mixer Updater Log - {}
================================================================================
Application:   cvm-updater v{}
System Info:
  OS:          {}
  Kernel:      {}
  Arch:        {}
  Host:        {}
  Executable:  {}
================================================================================
"#,
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            self.app_version,
            self.os,
            self.kernel,
            self.arch,
            self.host,
            self.executable
        )
    }
}

// ============================================================================
// Log Levels
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogLevel {
    Info,
    Action, // User choices in dialogs
    Download,
    Install,
    Warning,
    Error,
}

impl LogLevel {
    pub fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Info => "[INFO]",
            LogLevel::Action => "[ACTION]",
            LogLevel::Download => "[DOWNLOAD]",
            LogLevel::Install => "[INSTALL]",
            LogLevel::Warning => "[WARNING]",
            LogLevel::Error => "[ERROR]",
        }
    }
}

// ============================================================================
// Updater Logger
// ============================================================================

#[cfg(not(test))]
fn open_log_file() -> Option<(File, PathBuf)> {
    let log_dir = crate::local_path!("logs");
    let _ = std::fs::create_dir_all(&log_dir);

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let log_path = log_dir.join(format!("cvm_updater_{}.log", timestamp));

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok()?;
    Some((file, log_path))
}

// Unit tests log to the console only
#[cfg(test)]
fn open_log_file() -> Option<(File, PathBuf)> {
    None
}

pub struct UpdaterLogger {
    log_file: Option<File>,
    log_path: Option<PathBuf>,
}

impl UpdaterLogger {
    pub fn new() -> Self {
        let (log_file, log_path) = match open_log_file() {
            Some((file, path)) => (Some(file), Some(path)),
            None => (None, None),
        };

        let mut logger = Self { log_file, log_path };

        let header = SystemInfo::detect().to_log_header();
        logger.write_raw(&header);

        logger
    }

    fn write_raw(&mut self, msg: &str) {
        if let Some(ref mut file) = self.log_file {
            let _ = writeln!(file, "{}", msg);
            let _ = file.flush();
        }

        if CONSOLE_ECHO.load(Ordering::Relaxed) {
            println!("{}", msg);
        }
    }

    pub fn log(&mut self, level: LogLevel, message: &str) {
        self.write_raw(&format_line(level, message));
    }
}

impl Default for UpdaterLogger {
    fn default() -> Self {
        Self::new()
    }
}

fn format_line(level: LogLevel, message: &str) -> String {
    let timestamp = Local::now().format("%H:%M:%S");
    format!("[{}] {} {}", timestamp, level.prefix(), message)
}

// ============================================================================
// Global Logger Access
// ============================================================================

/// Initialize the global logger (call once at startup, after `set_console_echo`)
pub fn init_logger() {
    logger();
}

/// Enable or disable echoing log lines to stdout.
pub fn set_console_echo(enabled: bool) {
    CONSOLE_ECHO.store(enabled, Ordering::Relaxed);
}

/// Path of the current log file, if one could be opened.
pub fn log_file_path() -> Option<PathBuf> {
    logger().lock().log_path.clone()
}

fn logger() -> &'static Mutex<UpdaterLogger> {
    LOGGER.get_or_init(|| Mutex::new(UpdaterLogger::new()))
}

// ============================================================================
// Convenience Logging Functions
// ============================================================================

pub fn log_info(message: &str) {
    logger().lock().log(LogLevel::Info, message);
}

pub fn log_action(message: &str) {
    logger().lock().log(LogLevel::Action, message);
}

pub fn log_download(message: &str) {
    logger().lock().log(LogLevel::Download, message);
}

pub fn log_install(message: &str) {
    logger().lock().log(LogLevel::Install, message);
}

pub fn log_warning(message: &str) {
    logger().lock().log(LogLevel::Warning, message);
}

pub fn log_error(message: &str) {
    logger().lock().log(LogLevel::Error, message);
}
