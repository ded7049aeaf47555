//! Shared HTTP helpers: agent construction, retry with backoff, streamed downloads

use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

use crate::config::UpdaterConfig;
use crate::error::{Result, UpdateError};
use crate::logging::{log_download, log_warning};

/// How many times to try a request and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &UpdaterConfig) -> Self {
        Self {
            attempts: config.retry_attempts.max(1),
            backoff: config.retry_backoff(),
        }
    }

    /// Delay before retry number `retry` (1-based); doubles every time.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(16);
        self.backoff.saturating_mul(factor)
    }
}

/// Build the HTTP agent used for every request of a run.
pub fn build_agent(config: &UpdaterConfig) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .user_agent(&config.user_agent)
        .timeout_connect(config.request_timeout())
        .timeout_read(config.request_timeout())
        .build()
}

/// Transport failures, rate limiting and server errors are worth another try.
pub fn is_retryable(err: &ureq::Error) -> bool {
    match err {
        ureq::Error::Status(code, _) => *code == 429 || *code >= 500,
        ureq::Error::Transport(_) => true,
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the budget is spent.
pub fn with_retry<T, E: std::fmt::Display>(
    policy: &RetryPolicy,
    what: &str,
    retryable: impl Fn(&E) -> bool,
    mut op: impl FnMut() -> std::result::Result<T, E>,
) -> std::result::Result<T, E> {
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.attempts && retryable(&e) => {
                let delay = policy.delay_for(attempt);
                log_warning(&format!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    what, attempt, policy.attempts, e, delay
                ));
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// GET `url`, retrying transient failures.
pub fn get_with_retry(
    agent: &ureq::Agent,
    url: &str,
    policy: &RetryPolicy,
) -> std::result::Result<ureq::Response, ureq::Error> {
    with_retry(policy, &format!("GET {}", url), is_retryable, || {
        agent.get(url).call()
    })
}

/// Describe a ureq failure without dumping the whole response.
pub fn describe_http_error(err: &ureq::Error) -> String {
    match err {
        ureq::Error::Status(code, response) => {
            format!("HTTP {} {}", code, response.status_text())
        }
        ureq::Error::Transport(transport) => transport.to_string(),
    }
}

/// Download a file from URL to the specified path, streaming the body.
///
/// Parent directories are created and an existing file is overwritten.
pub fn download_file(
    agent: &ureq::Agent,
    url: &str,
    path: &Path,
    policy: &RetryPolicy,
) -> Result<u64> {
    let response = get_with_retry(agent, url, policy)
        .map_err(|e| UpdateError::download(url, describe_http_error(&e)))?;

    if let Some(len) = response.header("Content-Length") {
        log_download(&format!("Content length: {} bytes", len));
    }

    let written = write_stream(response.into_reader(), path)
        .map_err(|e| UpdateError::download(url, e))?;
    log_download(&format!("Wrote {} bytes to {}", written, path.display()));
    Ok(written)
}

/// Copy `reader` into a fresh file at `path`.
pub fn write_stream(mut reader: impl Read, path: &Path) -> io::Result<u64> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    let written = io::copy(&mut reader, &mut writer)?;
    writer.flush()?;
    Ok(written)
}
