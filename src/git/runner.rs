//! git::runner
//!
//! Child process execution for `git` and `patch`.
//!
//! Every invocation runs in the repository's work tree (never the process's
//! current directory), with stdin closed and a wall-clock timeout. Output
//! pipes are drained on background threads while waiting, so a chatty child
//! cannot block on a full pipe.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use wait_timeout::ChildExt;

use super::GitError;
use crate::core::config::DEFAULT_GIT_TIMEOUT;

/// Runs external commands inside one work tree.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    work_dir: PathBuf,
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            timeout: DEFAULT_GIT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `program args...` and return stdout.
    ///
    /// # Errors
    ///
    /// - [`GitError::Spawn`] if the program cannot be started
    /// - [`GitError::Timeout`] if it runs past the timeout (it is killed)
    /// - [`GitError::Process`] if it exits non-zero
    pub fn run(&self, program: &str, args: &[&str]) -> Result<String, GitError> {
        let command = display_command(program, args);
        tracing::debug!(%command, dir = %self.work_dir.display(), "exec");
        let start = Instant::now();

        let mut child = Command::new(program)
            .args(args)
            .current_dir(&self.work_dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| GitError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = child
            .wait_timeout(self.timeout)
            .map_err(|source| GitError::Spawn {
                command: command.clone(),
                source,
            })?;

        let Some(status) = status else {
            let _ = child.kill();
            let _ = child.wait();
            tracing::warn!(%command, timeout = ?self.timeout, "command timed out");
            return Err(GitError::Timeout {
                command,
                timeout: self.timeout,
            });
        };

        let stdout = stdout.map(join_output).unwrap_or_default();
        let stderr = stderr.map(join_output).unwrap_or_default();
        tracing::debug!(%command, elapsed = ?start.elapsed(), code = ?status.code(), "exited");

        if status.success() {
            Ok(stdout)
        } else {
            Err(GitError::Process {
                command,
                stderr: stderr.trim().to_string(),
                exit_code: status.code(),
            })
        }
    }
}

fn drain<R: Read + Send + 'static>(mut stream: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stream.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_output(handle: thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

fn display_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}
