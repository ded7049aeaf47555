//! Update check and installer run for Classic Volume Mixer
//!
//! Reads the installed version, asks GitHub for the latest release and, if the
//! user agrees, downloads the installer, stops the running application, runs the
//! installer silently and starts the application again.

use std::fmt;
use std::path::Path;

use crate::config::UpdaterConfig;
use crate::error::Result;
use crate::file_version::read_file_version;
use crate::github::{Release, ReleaseSource};
use crate::logging::{log_action, log_download, log_info, log_install};
use crate::process::{launch_detached, run_installer, terminate_processes};
use crate::prompt::Dialogs;
use crate::utils::{download_file, RetryPolicy};
use crate::version::is_newer_version;

/// How a run ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The installed version is the latest (or newer)
    UpToDate,
    /// A newer release exists; only reported in check-only mode
    Available(Release),
    /// The user answered "No"
    Declined,
    Updated,
}

/// Steps of the install sequence, in order. None is ever skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStage {
    Downloading,
    TerminatingExisting,
    Installing,
    Relaunching,
    Done,
}

impl fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpdateStage::Downloading => "downloading installer",
            UpdateStage::TerminatingExisting => "stopping running instances",
            UpdateStage::Installing => "running installer",
            UpdateStage::Relaunching => "relaunching application",
            UpdateStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Side effects on the local machine.
pub trait SystemOps {
    fn installed_version(&self, exe: &Path) -> Result<String>;
    fn download(&self, url: &str, dest: &Path) -> Result<u64>;
    /// Kill every running instance and wait for it to exit; returns how many were stopped.
    fn terminate(&self, process_name: &str) -> Result<usize>;
    fn install(&self, installer: &Path, args: &[String]) -> Result<()>;
    /// Start the application without waiting for it.
    fn relaunch(&self, exe: &Path) -> Result<()>;
}

/// [`SystemOps`] on the real machine.
pub struct LocalSystem {
    agent: ureq::Agent,
    retry: RetryPolicy,
    config: UpdaterConfig,
}

impl LocalSystem {
    pub fn new(agent: ureq::Agent, config: &UpdaterConfig) -> Self {
        Self {
            agent,
            retry: RetryPolicy::from_config(config),
            config: config.clone(),
        }
    }
}

impl SystemOps for LocalSystem {
    fn installed_version(&self, exe: &Path) -> Result<String> {
        Ok(read_file_version(exe)?.to_string())
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        download_file(&self.agent, url, dest, &self.retry)
    }

    fn terminate(&self, process_name: &str) -> Result<usize> {
        terminate_processes(process_name, self.config.terminate_timeout())
    }

    fn install(&self, installer: &Path, args: &[String]) -> Result<()> {
        run_installer(installer, args, self.config.installer_timeout())
    }

    fn relaunch(&self, exe: &Path) -> Result<()> {
        launch_detached(exe, self.config.run_silently)
    }
}

/// One check/update run.
pub struct Updater<'a> {
    config: &'a UpdaterConfig,
    source: &'a dyn ReleaseSource,
    dialogs: &'a dyn Dialogs,
    system: &'a dyn SystemOps,
}

impl<'a> Updater<'a> {
    pub fn new(
        config: &'a UpdaterConfig,
        source: &'a dyn ReleaseSource,
        dialogs: &'a dyn Dialogs,
        system: &'a dyn SystemOps,
    ) -> Self {
        Self {
            config,
            source,
            dialogs,
            system,
        }
    }

    /// Check for a newer release and, unless `check_only`, offer and install it.
    ///
    /// In check-only mode no dialog is shown and nothing is downloaded.
    pub fn run(&self, check_only: bool) -> Result<UpdateOutcome> {
        let current = self.system.installed_version(&self.config.install_path)?;
        log_info(&format!(
            "Installed version: {} ({})",
            current,
            self.config.install_path.display()
        ));

        let release = self.source.latest_release()?;

        if !is_newer_version(&release.version, &current)? {
            log_info(&format!("Up to date (latest is {})", release.version));
            if !check_only {
                self.dialogs.show_up_to_date(&current);
            }
            return Ok(UpdateOutcome::UpToDate);
        }

        log_info(&format!("Update available: {} -> {}", current, release.version));
        if check_only {
            return Ok(UpdateOutcome::Available(release));
        }

        if !self.dialogs.confirm_update(&current, &release) {
            log_action("Update declined, exiting");
            return Ok(UpdateOutcome::Declined);
        }

        self.install(&release)?;
        Ok(UpdateOutcome::Updated)
    }

    /// Walk the install stages in order; the first failure aborts the rest.
    pub fn install(&self, release: &Release) -> Result<()> {
        let stages = [
            UpdateStage::Downloading,
            UpdateStage::TerminatingExisting,
            UpdateStage::Installing,
            UpdateStage::Relaunching,
            UpdateStage::Done,
        ];
        for stage in stages {
            log_info(&format!("Stage: {}", stage));
            self.run_stage(stage, release)?;
        }
        Ok(())
    }

    fn run_stage(&self, stage: UpdateStage, release: &Release) -> Result<()> {
        let config = self.config;
        match stage {
            UpdateStage::Downloading => {
                log_download(&format!(
                    "Downloading {} to {}",
                    release.download_url,
                    config.download_path.display()
                ));
                self.system.download(&release.download_url, &config.download_path)?;
            }
            UpdateStage::TerminatingExisting => {
                let stopped = self.system.terminate(&config.process_name)?;
                log_install(&format!("Stopped {} running instance(s)", stopped));
            }
            UpdateStage::Installing => {
                self.system
                    .install(&config.download_path, &config.installer_args)?;
            }
            UpdateStage::Relaunching => {
                self.system.relaunch(&config.install_path)?;
            }
            UpdateStage::Done => {
                log_install(&format!("Updated to {}", release.version));
                self.dialogs.show_complete();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpdateError;
    use std::cell::{Cell, RefCell};
    use std::path::PathBuf;

    struct FakeSource {
        result: Result<Release>,
    }

    impl FakeSource {
        fn release(version: &str) -> Self {
            Self {
                result: Ok(Release {
                    version: version.to_string(),
                    changelog_url: format!("https://example.invalid/releases/tag/{}", version),
                    download_url: "https://example.invalid/setup.exe".to_string(),
                }),
            }
        }

        fn missing_asset() -> Self {
            Self {
                result: Err(UpdateError::AssetNotFound {
                    asset: "setup.exe".to_string(),
                    release: "v1.2.0".to_string(),
                }),
            }
        }
    }

    impl ReleaseSource for FakeSource {
        fn latest_release(&self) -> Result<Release> {
            match &self.result {
                Ok(release) => Ok(release.clone()),
                Err(UpdateError::AssetNotFound { asset, release }) => {
                    Err(UpdateError::AssetNotFound {
                        asset: asset.clone(),
                        release: release.clone(),
                    })
                }
                Err(other) => panic!("unsupported fake error: {other}"),
            }
        }
    }

    /// Records every dialog and side effect, in order.
    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<String>>,
    }

    impl Recorder {
        fn push(&self, event: impl Into<String>) {
            self.events.borrow_mut().push(event.into());
        }

        fn events(&self) -> Vec<String> {
            self.events.borrow().clone()
        }
    }

    struct FakeDialogs<'r> {
        answer_yes: bool,
        recorder: &'r Recorder,
    }

    impl Dialogs for FakeDialogs<'_> {
        fn show_up_to_date(&self, current: &str) {
            self.recorder.push(format!("dialog:up_to_date:{}", current));
        }

        fn confirm_update(&self, current: &str, release: &Release) -> bool {
            self.recorder
                .push(format!("dialog:confirm:{}->{}", current, release.version));
            self.answer_yes
        }

        fn show_complete(&self) {
            self.recorder.push("dialog:complete");
        }

        fn show_error(&self, error: &UpdateError) {
            self.recorder.push(format!("dialog:error:{}", error));
        }
    }

    struct FakeSystem<'r> {
        current: &'static str,
        installer_fails: bool,
        running_instances: Cell<usize>,
        recorder: &'r Recorder,
    }

    impl SystemOps for FakeSystem<'_> {
        fn installed_version(&self, _exe: &Path) -> Result<String> {
            Ok(self.current.to_string())
        }

        fn download(&self, url: &str, dest: &Path) -> Result<u64> {
            self.recorder
                .push(format!("download:{}:{}", url, dest.display()));
            Ok(1024)
        }

        fn terminate(&self, process_name: &str) -> Result<usize> {
            self.recorder.push(format!("terminate:{}", process_name));
            Ok(self.running_instances.replace(0))
        }

        fn install(&self, installer: &Path, args: &[String]) -> Result<()> {
            // The application must be gone before the installer starts
            assert_eq!(self.running_instances.get(), 0);
            self.recorder
                .push(format!("install:{}:{}", installer.display(), args.join(" ")));
            if self.installer_fails {
                return Err(UpdateError::Installer {
                    reason: "exit code 1".to_string(),
                });
            }
            Ok(())
        }

        fn relaunch(&self, exe: &Path) -> Result<()> {
            self.recorder.push(format!("relaunch:{}", exe.display()));
            Ok(())
        }
    }

    fn test_config() -> UpdaterConfig {
        UpdaterConfig {
            install_path: PathBuf::from("/opt/cvm/ClassicVolumeMixer.exe"),
            download_path: PathBuf::from("/tmp/cvm/setup.exe"),
            ..UpdaterConfig::default()
        }
    }

    fn fake_system<'r>(current: &'static str, recorder: &'r Recorder) -> FakeSystem<'r> {
        FakeSystem {
            current,
            installer_fails: false,
            running_instances: Cell::new(1),
            recorder,
        }
    }

    #[test]
    fn test_same_version_shows_info_only() {
        let recorder = Recorder::default();
        let config = test_config();
        let source = FakeSource::release("1.0.0");
        let dialogs = FakeDialogs { answer_yes: true, recorder: &recorder };
        let system = fake_system("1.0.0.0", &recorder);

        let outcome = Updater::new(&config, &source, &dialogs, &system).run(false).unwrap();

        assert_eq!(outcome, UpdateOutcome::UpToDate);
        assert_eq!(recorder.events(), vec!["dialog:up_to_date:1.0.0.0"]);
    }

    #[test]
    fn test_older_release_is_never_offered() {
        let recorder = Recorder::default();
        let config = test_config();
        let source = FakeSource::release("v0.9.0");
        let dialogs = FakeDialogs { answer_yes: true, recorder: &recorder };
        let system = fake_system("1.0.0.0", &recorder);

        let outcome = Updater::new(&config, &source, &dialogs, &system).run(false).unwrap();

        assert_eq!(outcome, UpdateOutcome::UpToDate);
        assert_eq!(recorder.events(), vec!["dialog:up_to_date:1.0.0.0"]);
    }

    #[test]
    fn test_accepted_update_runs_every_stage_in_order() {
        let recorder = Recorder::default();
        let config = test_config();
        let source = FakeSource::release("v1.2.0");
        let dialogs = FakeDialogs { answer_yes: true, recorder: &recorder };
        let system = fake_system("1.0.0.0", &recorder);

        let outcome = Updater::new(&config, &source, &dialogs, &system).run(false).unwrap();

        assert_eq!(outcome, UpdateOutcome::Updated);
        assert_eq!(
            recorder.events(),
            vec![
                "dialog:confirm:1.0.0.0->v1.2.0".to_string(),
                format!(
                    "download:https://example.invalid/setup.exe:{}",
                    config.download_path.display()
                ),
                "terminate:ClassicVolumeMixer".to_string(),
                format!("install:{}:/SILENT", config.download_path.display()),
                format!("relaunch:{}", config.install_path.display()),
                "dialog:complete".to_string(),
            ]
        );
    }

    #[test]
    fn test_declined_update_has_no_side_effects() {
        let recorder = Recorder::default();
        let config = test_config();
        let source = FakeSource::release("v1.2.0");
        let dialogs = FakeDialogs { answer_yes: false, recorder: &recorder };
        let system = fake_system("1.0.0.0", &recorder);

        let outcome = Updater::new(&config, &source, &dialogs, &system).run(false).unwrap();

        assert_eq!(outcome, UpdateOutcome::Declined);
        assert_eq!(recorder.events(), vec!["dialog:confirm:1.0.0.0->v1.2.0"]);
    }

    #[test]
    fn test_missing_asset_fails_before_prompt() {
        let recorder = Recorder::default();
        let config = test_config();
        let source = FakeSource::missing_asset();
        let dialogs = FakeDialogs { answer_yes: true, recorder: &recorder };
        let system = fake_system("1.0.0.0", &recorder);

        let err = Updater::new(&config, &source, &dialogs, &system)
            .run(false)
            .unwrap_err();

        assert!(matches!(err, UpdateError::AssetNotFound { .. }));
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_installer_failure_aborts_before_relaunch() {
        let recorder = Recorder::default();
        let config = test_config();
        let source = FakeSource::release("v1.2.0");
        let dialogs = FakeDialogs { answer_yes: true, recorder: &recorder };
        let system = FakeSystem {
            installer_fails: true,
            ..fake_system("1.0.0.0", &recorder)
        };

        let err = Updater::new(&config, &source, &dialogs, &system)
            .run(false)
            .unwrap_err();

        assert!(matches!(err, UpdateError::Installer { .. }));
        let events = recorder.events();
        assert!(events.last().unwrap().starts_with("install:"));
        assert!(!events.iter().any(|e| e.starts_with("relaunch:")));
        assert!(!events.iter().any(|e| e == "dialog:complete"));
    }

    #[test]
    fn test_check_only_never_prompts() {
        let recorder = Recorder::default();
        let config = test_config();
        let source = FakeSource::release("v1.2.0");
        let dialogs = FakeDialogs { answer_yes: true, recorder: &recorder };
        let system = fake_system("1.0.0.0", &recorder);

        let outcome = Updater::new(&config, &source, &dialogs, &system).run(true).unwrap();

        match outcome {
            UpdateOutcome::Available(release) => assert_eq!(release.version, "v1.2.0"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_unparseable_tag_is_an_error() {
        let recorder = Recorder::default();
        let config = test_config();
        let source = FakeSource::release("nightly");
        let dialogs = FakeDialogs { answer_yes: true, recorder: &recorder };
        let system = fake_system("1.0.0.0", &recorder);

        let err = Updater::new(&config, &source, &dialogs, &system)
            .run(false)
            .unwrap_err();
        assert!(matches!(err, UpdateError::InvalidVersion { .. }));
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(UpdateStage::Downloading.to_string(), "downloading installer");
        assert_eq!(UpdateStage::TerminatingExisting.to_string(), "stopping running instances");
    }
}
