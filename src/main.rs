//! cvm-updater - checks for a newer Classic Volume Mixer and installs it
//!
//! Runs once: compare versions, ask, download, stop the app, install silently, relaunch.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use cvm_updater::config::UpdaterConfig;
use cvm_updater::github::GithubClient;
use cvm_updater::logging::{init_logger, log_error, log_file_path, log_info, set_console_echo};
use cvm_updater::prompt::{Dialogs, NativeDialogs};
use cvm_updater::updater::{LocalSystem, UpdateOutcome, Updater};
use cvm_updater::utils::build_agent;

#[derive(Parser, Debug)]
#[command(name = "cvm-updater", version, about = "Update checker for Classic Volume Mixer")]
struct Cli {
    /// Read settings from this file instead of the per-user updater.json
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Only report whether an update is available; never prompt or install
    #[arg(long)]
    check_only: bool,

    /// Echo log lines to the console even when running silently
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    set_console_echo(cli.verbose);
    let config = match &cli.config {
        Some(path) => UpdaterConfig::load_from(path),
        None => UpdaterConfig::load(),
    };
    set_console_echo(cli.verbose || !config.run_silently);

    init_logger();
    log_info("cvm-updater starting up...");
    if let Some(path) = log_file_path() {
        log_info(&format!("Logging to {}", path.display()));
    }

    let agent = build_agent(&config);
    let source = GithubClient::new(agent.clone(), &config);
    let system = LocalSystem::new(agent, &config);
    let dialogs = NativeDialogs::new(config.dialog_caption(), config.app_name.clone());

    let updater = Updater::new(&config, &source, &dialogs, &system);
    match updater.run(cli.check_only) {
        Ok(outcome) => {
            match &outcome {
                UpdateOutcome::UpToDate => log_info("Already up to date"),
                UpdateOutcome::Available(release) => {
                    log_info(&format!("Update available: {}", release.version))
                }
                UpdateOutcome::Declined => log_info("No update, closing"),
                UpdateOutcome::Updated => log_info("Update finished"),
            }
            if cli.check_only {
                match outcome {
                    UpdateOutcome::Available(release) => {
                        println!("Update available: {} ({})", release.version, release.changelog_url)
                    }
                    _ => println!("Up to date"),
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log_error(&format!("{}: {}", e.title(), e));
            if cli.check_only {
                eprintln!("{}", e);
            } else {
                dialogs.show_error(&e);
            }
            ExitCode::FAILURE
        }
    }
}
