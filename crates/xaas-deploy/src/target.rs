//! Deployment targets selected by the `test` and `prod` tasks.

use std::fmt;

use crate::config::DeployConfig;

/// Server role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Test server.
    Test,
    /// Production server.
    Production,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Test => write!(f, "test"),
            Role::Production => write!(f, "production"),
        }
    }
}

/// A remote host commands are run on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    /// SSH destination (`user@host`).
    pub host: String,
    /// Forward the local SSH agent.
    pub forward_agent: bool,
}

/// Everything a deploy needs to know about the server it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Server role.
    pub role: Role,
    /// Ask the operator before deploying.
    pub must_confirm: bool,
    /// Deploy the committed state of the local repository rather than
    /// the origin repository.
    pub deploy_local_repository: bool,
    /// Refuse to deploy any branch but `master`.
    pub master_branch_only: bool,
    /// SSH destination, if one is configured.
    pub host: Option<String>,
    /// Forward the local SSH agent.
    pub forward_agent: bool,
    /// Settings file linked as the active configuration.
    pub settings_file: &'static str,
}

impl Target {
    /// The test server: no confirmation, any branch, local sources.
    pub fn test(config: &DeployConfig) -> Self {
        Self {
            role: Role::Test,
            must_confirm: false,
            deploy_local_repository: true,
            master_branch_only: false,
            host: config.test_host.clone(),
            forward_agent: false,
            settings_file: "test.toml",
        }
    }

    /// The production server: confirmation, `master` only, origin sources.
    pub fn prod(config: &DeployConfig) -> Self {
        Self {
            role: Role::Production,
            must_confirm: true,
            deploy_local_repository: false,
            master_branch_only: true,
            host: Some(config.prod_host.clone()),
            forward_agent: true,
            settings_file: "prod.toml",
        }
    }

    /// The remote to run commands on, if a host is configured.
    pub fn remote(&self) -> Option<Remote> {
        self.host.as_ref().map(|host| Remote {
            host: host.clone(),
            forward_agent: self.forward_agent,
        })
    }
}
