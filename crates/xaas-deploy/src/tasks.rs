//! The deploy tasks and the runner that chains them.

use clap::ValueEnum;

use crate::config::DeployConfig;
use crate::rsync::{self, CLONE_FLAGS};
use crate::shell::Shell;
use crate::target::{Remote, Role, Target};
use crate::{DeployError, Result};

/// Usage shown by the `help` task.
pub const HELP: &str = "\
xaas-deploy prod deploy
  Deploy the 'master' branch of the 'origin' repository on the production server.
  The local repository is pushed to the 'origin' before being deployed.

xaas-deploy test deploy
  Deploy the current branch of the local repository on the test server.
  Only the committed files are deployed.

xaas-deploy clone
  Clone the production environment on the local machine.

xaas-deploy test clone
  Clone the production environment on the test server.";

/// A task named on the command line. Tasks run left to right, so target
/// selectors come first: `xaas-deploy prod deploy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Task {
    /// Print usage.
    Help,
    /// Select the test server.
    Test,
    /// Select the production server.
    Prod,
    /// Deploy on the selected server.
    Deploy,
    /// Clone the production database and uploads.
    Clone,
}

/// Runs tasks against the selected target through a [`Shell`].
#[derive(Debug)]
pub struct Deployer<S> {
    config: DeployConfig,
    target: Option<Target>,
    shell: S,
}

impl<S: Shell> Deployer<S> {
    /// A runner with no target selected.
    pub fn new(config: DeployConfig, shell: S) -> Self {
        Self {
            config,
            target: None,
            shell,
        }
    }

    /// The shell commands go through.
    pub fn shell(&self) -> &S {
        &self.shell
    }

    /// The selected target, if any.
    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    /// Run tasks in order, stopping at the first failure.
    pub fn run_tasks(&mut self, tasks: &[Task]) -> Result<()> {
        tasks.iter().try_for_each(|task| self.run_task(*task))
    }

    /// Run a single task.
    pub fn run_task(&mut self, task: Task) -> Result<()> {
        tracing::debug!(?task, "Running task");
        match task {
            Task::Help => {
                println!("{HELP}");
                Ok(())
            }
            Task::Test => {
                self.target = Some(Target::test(&self.config));
                Ok(())
            }
            Task::Prod => {
                self.target = Some(Target::prod(&self.config));
                Ok(())
            }
            Task::Deploy => self.deploy(),
            Task::Clone => self.clone_production(),
        }
    }

    /// Check readiness, update the sources, build, collect static files
    /// and restart the service.
    pub fn deploy(&mut self) -> Result<()> {
        let target = self.target.clone().ok_or_else(|| {
            DeployError::Config("no server selected, run `test` or `prod` before `deploy`".into())
        })?;
        let remote = target.remote().ok_or_else(|| {
            DeployError::Config(format!(
                "no host configured for the '{}' server",
                target.role
            ))
        })?;

        self.is_ready_or_abort(&target, &remote)?;
        if target.deploy_local_repository {
            self.update_sources_from_local(&target, &remote)?;
        } else {
            self.update_sources_from_origin(&target, &remote)?;
        }
        self.build(&remote)?;
        self.collect_static(&remote)?;
        self.restart_service(&remote)?;

        tracing::info!(role = %target.role, host = %remote.host, "Deploy complete");
        Ok(())
    }

    /// Enforce the branch restriction and the operator confirmation.
    pub fn is_ready_or_abort(&mut self, target: &Target, remote: &Remote) -> Result<()> {
        let branch = self
            .shell
            .local_capture("git rev-parse --abbrev-ref HEAD")?;

        if target.master_branch_only && branch != "master" {
            return Err(DeployError::aborted(format!(
                "Only the 'master' branch is allowed. You are on the '{branch}' branch."
            )));
        }

        if target.must_confirm {
            let answer = self.shell.prompt(&format!(
                "Deploy on the '{}' server {} ? [type 'yes' to confirm]",
                target.role, remote.host
            ))?;
            if answer != "yes" {
                return Err(DeployError::aborted("bye bye"));
            }
        }
        Ok(())
    }

    /// Push the committed state of the local repository to the server.
    ///
    /// The repository is cloned into a temporary directory first so
    /// uncommitted changes are left out.
    pub fn update_sources_from_local(&mut self, target: &Target, remote: &Remote) -> Result<()> {
        let checkout = tempfile::tempdir().map_err(|source| DeployError::Io {
            path: std::env::temp_dir(),
            source,
        })?;
        let local_path = checkout.path().display().to_string();
        self.shell.local(&format!("git clone . \"{local_path}\""))?;

        let source_path = self.config.source_path();
        for path in &self.config.sync_paths {
            self.shell.local(&rsync::sync(
                &format!("{local_path}/{path}"),
                &format!("{}:{source_path}/{path}", remote.host),
            ))?;
        }

        self.link_settings(target, remote)?;

        for file in &self.config.files_to_copy {
            self.shell.put(
                remote,
                &checkout.path().join(&file.source),
                &self.config.destination(file),
            )?;
        }
        Ok(())
    }

    /// Push local commits to origin and update the server from its own
    /// checkout.
    pub fn update_sources_from_origin(&mut self, target: &Target, remote: &Remote) -> Result<()> {
        self.shell.local("git push")?;

        let repo = self.config.repo_path.clone();
        self.shell.run(remote, &format!("cd {repo} && git pull"))?;

        let source_path = self.config.source_path();
        for path in &self.config.sync_paths {
            self.shell.run(
                remote,
                &rsync::sync(&format!("{repo}/{path}"), &format!("{source_path}/{path}")),
            )?;
        }

        self.link_settings(target, remote)?;

        for file in &self.config.files_to_copy {
            self.shell.run(
                remote,
                &format!(
                    "cd {repo} && cp \"{}\" \"{}\"",
                    file.source,
                    self.config.destination(file)
                ),
            )?;
        }
        Ok(())
    }

    fn link_settings(&mut self, target: &Target, remote: &Remote) -> Result<()> {
        let settings = self.config.settings_path();
        self.shell.run(
            remote,
            &format!(
                "ln -sf {settings}/{} {settings}/config.toml",
                target.settings_file
            ),
        )
    }

    fn build(&mut self, remote: &Remote) -> Result<()> {
        let command = format!(
            "cd {} && {}",
            self.config.source_path(),
            self.config.build_command
        );
        self.shell.run(remote, &command)
    }

    fn collect_static(&mut self, remote: &Remote) -> Result<()> {
        let command = rsync::sync(
            &format!("{}/static/", self.config.source_path()),
            &format!("{}/static/", self.config.public_path()),
        );
        self.shell.run(remote, &command)
    }

    fn restart_service(&mut self, remote: &Remote) -> Result<()> {
        let command = format!("systemctl restart {}", self.config.restart_unit);
        self.shell.sudo(remote, &command)
    }

    /// Copy the production database and uploaded files to the local
    /// machine, or to the selected server when it has a host.
    ///
    /// Uploads cannot go from production to another server directly, so
    /// they are always mirrored locally first.
    pub fn clone_production(&mut self) -> Result<()> {
        let destination = self
            .target
            .as_ref()
            .and_then(|target| target.remote().map(|remote| (target.role, remote)));
        let dump = self.config.prod_db_dump_command();

        let remote = match destination {
            None => {
                self.shell
                    .local(&format!("{dump} | {}", self.config.local_db_load_command()))?;
                None
            }
            Some((Role::Production, _)) => {
                return Err(DeployError::aborted(
                    "Cannot clone the database on the production server !",
                ));
            }
            Some((_, remote)) => {
                self.shell.local(&format!(
                    "{dump} | ssh {} \"{}\"",
                    remote.host,
                    self.config.remote_db_load_command()
                ))?;
                Some(remote)
            }
        };

        let upload_path = self.config.upload_path();
        let local_upload = &self.config.local_upload_path;
        let mut flags: Vec<String> = CLONE_FLAGS.iter().map(|f| f.to_string()).collect();

        let copied = self.shell.local_unchecked(&rsync::rsync(
            &format!("{}:{upload_path}/*", self.config.prod_host),
            local_upload,
            &flags,
            &[],
        ))?;
        if !copied {
            tracing::warn!("Some files could not be copied");
        }

        if let Some(remote) = remote {
            flags.push("--chmod=ug+rw".to_string());
            self.shell.local(&rsync::rsync(
                &format!("{local_upload}/*"),
                &format!("{}:{upload_path}", remote.host),
                &flags,
                &[],
            ))?;
        }

        tracing::info!("Clone complete");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::shell::RecordingShell;

    #[test]
    fn test_selectors_set_target() {
        let mut deployer = Deployer::new(DeployConfig::default(), RecordingShell::new());
        assert!(deployer.target().is_none());
        deployer.run_tasks(&[Task::Test, Task::Prod]).unwrap();
        assert_eq!(deployer.target().unwrap().role, Role::Production);
        assert!(deployer.shell().calls().is_empty());
    }

    #[test]
    fn test_deploy_needs_a_target() {
        let mut deployer = Deployer::new(DeployConfig::default(), RecordingShell::new());
        let err = deployer.run_task(Task::Deploy).unwrap_err();
        assert!(matches!(err, DeployError::Config(_)));
    }

    #[test]
    fn test_task_names() {
        assert_eq!(Task::from_str("prod", false).unwrap(), Task::Prod);
        assert!(Task::from_str("restart", false).is_err());
    }
}
