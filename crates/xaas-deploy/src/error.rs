//! Error types for xaas-deploy

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for deploy tasks
pub type Result<T> = std::result::Result<T, DeployError>;

/// Errors that stop a deploy task
#[derive(Error, Debug)]
pub enum DeployError {
    /// The task refused to go on; the message is shown to the operator
    #[error("{0}")]
    Aborted(String),

    /// A command could not be started
    #[error("Failed to start execution of [{command}]: {source}")]
    ExecutionStart {
        /// Command line
        command: String,
        /// Spawn failure
        #[source]
        source: std::io::Error,
    },

    /// A command ran and exited unsuccessfully
    #[error("Command [{command}] executed and failed with status: {status}")]
    CommandFailed {
        /// Command line
        command: String,
        /// Exit status as reported by the OS
        status: String,
    },

    /// Missing or inconsistent deploy configuration
    #[error("Invalid deploy configuration: {0}")]
    Config(String),

    /// Reading a file failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl DeployError {
    /// Abort with a message for the operator.
    pub fn aborted<S: Into<String>>(message: S) -> Self {
        DeployError::Aborted(message.into())
    }

    /// Whether this is a deliberate abort rather than a failure.
    pub fn is_abort(&self) -> bool {
        matches!(self, DeployError::Aborted(_))
    }
}
