//! Process control: stopping running instances, running the installer, relaunching

use std::ffi::OsStr;
use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};
use wait_timeout::ChildExt;

use crate::error::{Result, UpdateError};
use crate::logging::{log_info, log_install, log_warning};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// How long to keep reading installer output after it exits. Children it left
/// behind may hold the pipes open forever.
const OUTPUT_GRACE: Duration = Duration::from_secs(1);

/// True when `name` is `target`, with or without an extension, ignoring case.
pub fn matches_process_name(name: impl AsRef<OsStr>, target: &str) -> bool {
    let name = name.as_ref();
    let stem = Path::new(name).file_stem().unwrap_or(name);
    stem.eq_ignore_ascii_case(target) || name.eq_ignore_ascii_case(target)
}

fn find_processes(system: &System, target: &str) -> Vec<Pid> {
    system
        .processes()
        .iter()
        .filter(|(_, p)| p.status() != ProcessStatus::Zombie)
        .filter(|(_, p)| matches_process_name(p.name(), target))
        .map(|(pid, _)| *pid)
        .collect()
}

/// Force-kill every process called `target` and wait for each to exit.
///
/// Returns how many processes were stopped; none running is not an error.
pub fn terminate_processes(target: &str, timeout: Duration) -> Result<usize> {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);

    let pids = find_processes(&system, target);
    if pids.is_empty() {
        log_info(&format!("No running {} process", target));
        return Ok(0);
    }

    for pid in &pids {
        if let Some(process) = system.process(*pid) {
            log_info(&format!("Killing {} (pid {})", target, pid));
            if !process.kill() {
                log_warning(&format!("Kill signal to pid {} was not delivered", pid));
            }
        }
    }

    let deadline = Instant::now() + timeout;
    loop {
        system.refresh_processes(ProcessesToUpdate::Some(&pids), true);
        let alive: Vec<&Pid> = pids
            .iter()
            .filter(|pid| {
                system
                    .process(**pid)
                    .is_some_and(|p| p.status() != ProcessStatus::Zombie)
            })
            .collect();

        if alive.is_empty() {
            return Ok(pids.len());
        }
        if Instant::now() >= deadline {
            return Err(UpdateError::process(
                format!("Stopping {}", target),
                format!("pid(s) {:?} still running after {:?}", alive, timeout),
            ));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn hide_window(command: &mut Command, silent: bool) {
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        if silent {
            command.creation_flags(CREATE_NO_WINDOW);
        }
    }
    #[cfg(not(windows))]
    {
        let _ = (command, silent);
    }
}

fn drain(pipe: Option<impl Read + Send + 'static>) -> Option<Receiver<String>> {
    pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
        });
        rx
    })
}

/// Output gathered by `deadline`; a reader still blocked then is left detached.
fn collect(output: Option<Receiver<String>>, deadline: Instant) -> String {
    output
        .and_then(|rx| {
            rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
                .ok()
        })
        .unwrap_or_default()
}

/// Run the installer without a window, capture its output, and wait for it.
///
/// A non-zero exit code or running past `timeout` is an error.
pub fn run_installer(installer: &Path, args: &[String], timeout: Duration) -> Result<()> {
    log_install(&format!("Running {} {:?}", installer.display(), args));

    let mut command = Command::new(installer);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    hide_window(&mut command, true);

    let mut child = command
        .spawn()
        .map_err(|e| UpdateError::process(format!("Launching {}", installer.display()), e))?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status: ExitStatus = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(UpdateError::Installer {
                reason: format!("timed out after {:?}", timeout),
            });
        }
        Err(e) => {
            return Err(UpdateError::process(
                format!("Waiting for {}", installer.display()),
                e,
            ))
        }
    };

    let deadline = Instant::now() + OUTPUT_GRACE;
    let stdout = collect(stdout, deadline);
    let stderr = collect(stderr, deadline);
    if !stdout.trim().is_empty() {
        log_install(&format!("Installer output: {}", stdout.trim()));
    }

    if !status.success() {
        let mut reason = match status.code() {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        if !stderr.trim().is_empty() {
            reason.push_str(&format!(" ({})", stderr.trim()));
        }
        return Err(UpdateError::Installer { reason });
    }

    log_install("Installer finished");
    Ok(())
}

/// Start `exe` with no arguments and do not wait for it.
pub fn launch_detached(exe: &Path, silent: bool) -> Result<()> {
    let mut command = Command::new(exe);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    hide_window(&mut command, silent);

    command
        .spawn()
        .map_err(|e| UpdateError::process(format!("Starting {}", exe.display()), e))?;
    log_info(&format!("Started {}", exe.display()));
    Ok(())
}
