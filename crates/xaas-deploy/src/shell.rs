//! Command execution.
//!
//! Tasks never spawn processes themselves. They go through [`Shell`], so a
//! [`RecordingShell`] can stand in for the system and tests can assert on
//! exactly which commands a task would have run.

use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::target::Remote;
use crate::{DeployError, Result};

/// Local and remote command execution.
pub trait Shell {
    /// Run a shell command line locally. Fails on a non-zero exit.
    fn local(&mut self, command: &str) -> Result<()>;

    /// Run a shell command line locally and return its trimmed stdout.
    fn local_capture(&mut self, command: &str) -> Result<String>;

    /// Run a shell command line locally and report whether it succeeded.
    /// Only a failure to start is an error.
    fn local_unchecked(&mut self, command: &str) -> Result<bool>;

    /// Run a command line on a remote host.
    fn run(&mut self, remote: &Remote, command: &str) -> Result<()>;

    /// Run a command line on a remote host as root.
    fn sudo(&mut self, remote: &Remote, command: &str) -> Result<()>;

    /// Copy a local file to a remote path.
    fn put(&mut self, remote: &Remote, source: &Path, destination: &str) -> Result<()>;

    /// Ask the operator a question and return the answer.
    fn prompt(&mut self, message: &str) -> Result<String>;
}

fn command_to_string(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|s| s.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

fn execute(command: &mut Command) -> Result<()> {
    let status = command
        .status()
        .map_err(|source| DeployError::ExecutionStart {
            command: command_to_string(command),
            source,
        })?;
    if !status.success() {
        return Err(DeployError::CommandFailed {
            command: command_to_string(command),
            status: status.to_string(),
        });
    }
    Ok(())
}

fn sh(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

/// Runs commands with `sh`, `ssh` and `scp`.
#[derive(Debug, Default)]
pub struct SystemShell;

impl SystemShell {
    fn ssh(remote: &Remote) -> Command {
        let mut cmd = Command::new("ssh");
        if remote.forward_agent {
            cmd.arg("-A");
        }
        cmd.arg(&remote.host);
        cmd
    }
}

impl Shell for SystemShell {
    fn local(&mut self, command: &str) -> Result<()> {
        tracing::info!(command, "[local]");
        execute(&mut sh(command))
    }

    fn local_capture(&mut self, command: &str) -> Result<String> {
        tracing::info!(command, "[local]");
        let mut cmd = sh(command);
        let output = cmd.output().map_err(|source| DeployError::ExecutionStart {
            command: command.to_string(),
            source,
        })?;
        if !output.status.success() {
            return Err(DeployError::CommandFailed {
                command: command.to_string(),
                status: output.status.to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn local_unchecked(&mut self, command: &str) -> Result<bool> {
        tracing::info!(command, "[local]");
        let status = sh(command)
            .status()
            .map_err(|source| DeployError::ExecutionStart {
                command: command.to_string(),
                source,
            })?;
        if !status.success() {
            tracing::warn!(command, %status, "Command failed");
        }
        Ok(status.success())
    }

    fn run(&mut self, remote: &Remote, command: &str) -> Result<()> {
        tracing::info!(host = %remote.host, command, "[run]");
        execute(Self::ssh(remote).arg(command))
    }

    fn sudo(&mut self, remote: &Remote, command: &str) -> Result<()> {
        tracing::info!(host = %remote.host, command, "[sudo]");
        execute(Self::ssh(remote).arg("-t").arg(format!("sudo {command}")))
    }

    fn put(&mut self, remote: &Remote, source: &Path, destination: &str) -> Result<()> {
        tracing::info!(host = %remote.host, source = %source.display(), destination, "[put]");
        execute(
            Command::new("scp")
                .arg(source)
                .arg(format!("{}:{destination}", remote.host)),
        )
    }

    fn prompt(&mut self, message: &str) -> Result<String> {
        let mut stdout = std::io::stdout();
        let stdin_error = |source: std::io::Error| DeployError::Io {
            path: PathBuf::from("<stdin>"),
            source,
        };
        write!(stdout, "{message} ")
            .and_then(|()| stdout.flush())
            .map_err(stdin_error)?;
        let mut answer = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut answer)
            .map_err(stdin_error)?;
        Ok(answer.trim().to_string())
    }
}

/// A command a [`RecordingShell`] was asked to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// [`Shell::local`]
    Local(String),
    /// [`Shell::local_capture`]
    Capture(String),
    /// [`Shell::local_unchecked`]
    LocalUnchecked(String),
    /// [`Shell::run`]
    Run {
        /// Remote host.
        host: String,
        /// Command line.
        command: String,
    },
    /// [`Shell::sudo`]
    Sudo {
        /// Remote host.
        host: String,
        /// Command line.
        command: String,
    },
    /// [`Shell::put`]
    Put {
        /// Remote host.
        host: String,
        /// Local file, relative to the checkout it was copied from.
        source: PathBuf,
        /// Remote path.
        destination: String,
    },
    /// [`Shell::prompt`]
    Prompt(String),
}

impl Call {
    /// Whether the call touched a remote host.
    pub fn is_remote(&self) -> bool {
        matches!(self, Call::Run { .. } | Call::Sudo { .. } | Call::Put { .. })
    }

    /// Command line of the call, if it has one.
    pub fn command(&self) -> Option<&str> {
        match self {
            Call::Local(c) | Call::Capture(c) | Call::LocalUnchecked(c) => Some(c),
            Call::Run { command, .. } | Call::Sudo { command, .. } => Some(command),
            Call::Put { .. } | Call::Prompt(_) => None,
        }
    }
}

/// Records calls instead of running them.
///
/// Captures and prompt answers are served in the order they were queued;
/// commands starting with a prefix given to [`RecordingShell::failing`] fail.
#[derive(Debug, Default)]
pub struct RecordingShell {
    calls: Vec<Call>,
    captures: VecDeque<String>,
    answers: VecDeque<String>,
    failing: Vec<String>,
    put_root: Option<PathBuf>,
}

impl RecordingShell {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the output of the next [`Shell::local_capture`].
    pub fn with_capture(mut self, output: &str) -> Self {
        self.captures.push_back(output.to_string());
        self
    }

    /// Queue the answer to the next [`Shell::prompt`].
    pub fn answering(mut self, answer: &str) -> Self {
        self.answers.push_back(answer.to_string());
        self
    }

    /// Make local commands starting with `prefix` fail.
    pub fn failing(mut self, prefix: &str) -> Self {
        self.failing.push(prefix.to_string());
        self
    }

    /// Calls recorded so far.
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    fn fails(&self, command: &str) -> bool {
        self.failing.iter().any(|p| command.starts_with(p.as_str()))
    }

    fn record_local(&mut self, command: &str) -> Result<()> {
        // A local clone into a temp dir marks the root puts are relative to.
        if let Some(dest) = command.strip_prefix("git clone . ") {
            self.put_root = Some(PathBuf::from(dest.trim_matches('"')));
        }
        self.calls.push(Call::Local(command.to_string()));
        if self.fails(command) {
            return Err(DeployError::CommandFailed {
                command: command.to_string(),
                status: "exit status: 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Shell for RecordingShell {
    fn local(&mut self, command: &str) -> Result<()> {
        self.record_local(command)
    }

    fn local_capture(&mut self, command: &str) -> Result<String> {
        self.calls.push(Call::Capture(command.to_string()));
        Ok(self.captures.pop_front().unwrap_or_default())
    }

    fn local_unchecked(&mut self, command: &str) -> Result<bool> {
        self.calls.push(Call::LocalUnchecked(command.to_string()));
        Ok(!self.fails(command))
    }

    fn run(&mut self, remote: &Remote, command: &str) -> Result<()> {
        self.calls.push(Call::Run {
            host: remote.host.clone(),
            command: command.to_string(),
        });
        Ok(())
    }

    fn sudo(&mut self, remote: &Remote, command: &str) -> Result<()> {
        self.calls.push(Call::Sudo {
            host: remote.host.clone(),
            command: command.to_string(),
        });
        Ok(())
    }

    fn put(&mut self, remote: &Remote, source: &Path, destination: &str) -> Result<()> {
        let source = match &self.put_root {
            Some(root) => source.strip_prefix(root).unwrap_or(source),
            None => source,
        };
        self.calls.push(Call::Put {
            host: remote.host.clone(),
            source: source.to_path_buf(),
            destination: destination.to_string(),
        });
        Ok(())
    }

    fn prompt(&mut self, message: &str) -> Result<String> {
        self.calls.push(Call::Prompt(message.to_string()));
        Ok(self.answers.pop_front().unwrap_or_default())
    }
}
