//! cvm-updater - Classic Volume Mixer update checker
//!
//! Library crate for the update flow, shared between the binary and tests.
//! Native dialogs are only available with the "full" feature.

#[macro_use]
pub mod paths;

pub mod config;
pub mod error;
pub mod file_version;
pub mod github;
pub mod logging;
pub mod process;
pub mod prompt;
pub mod updater;
pub mod utils;
pub mod version;
