//! Deployment tasks for xaas-admin servers.
//!
//! `xaas-deploy prod deploy` ships the `master` branch of the origin
//! repository to production; `xaas-deploy test deploy` ships the committed
//! state of the local repository to the test server; `clone` copies the
//! production database and uploads to the local machine or to the test
//! server.

pub mod config;
pub mod error;
pub mod rsync;
pub mod shell;
pub mod target;
pub mod tasks;

pub use config::{DeployConfig, FileCopy};
pub use error::{DeployError, Result};
pub use shell::{Call, RecordingShell, Shell, SystemShell};
pub use target::{Remote, Role, Target};
pub use tasks::{Deployer, Task};
