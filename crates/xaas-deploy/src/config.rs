//! Deploy configuration.
//!
//! Every server path derives from `vhost_path`:
//!
//! ```text
//! <vhost>/htdocs                       public files
//! <vhost>/htdocs/upload                uploaded files
//! <vhost>/private/src                  sources and build
//! <vhost>/private/src/config/settings  per-environment settings files
//! <vhost>/private/xaas-admin.sqlite    database
//! <vhost>/conf                         web-server configuration
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{DeployError, Result};

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "deploy.toml";

/// A repository file copied to the server on deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCopy {
    /// Path relative to the repository root.
    pub source: String,
    /// Destination, relative to `vhost_path` unless absolute.
    pub destination: String,
}

/// Hosts, paths and commands used by the deploy tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// SSH destination of the production server.
    pub prod_host: String,
    /// SSH destination of the test server.
    pub test_host: Option<String>,
    /// Git checkout on the production server.
    pub repo_path: String,
    /// Root of the virtual host on every server.
    pub vhost_path: String,
    /// Repository paths synchronised into the source directory.
    pub sync_paths: Vec<String>,
    /// Configuration files copied on deploy.
    pub files_to_copy: Vec<FileCopy>,
    /// Database file name, under the private directory.
    pub database_file: String,
    /// Database file of a local clone.
    pub local_database: String,
    /// Local directory receiving the production uploads.
    pub local_upload_path: String,
    /// Build command, run in the source directory.
    pub build_command: String,
    /// systemd unit restarted at the end of a deploy.
    pub restart_unit: String,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            prod_host: "kis@exopgesrv34.epfl.ch".to_string(),
            test_host: None,
            repo_path: "/home/kis/xaas-admin".to_string(),
            vhost_path: "/var/www/vhosts/xaas-admin.epfl.ch".to_string(),
            sync_paths: vec![
                "crates/".to_string(),
                "config/".to_string(),
                "static/".to_string(),
                "Cargo.toml".to_string(),
                "Cargo.lock".to_string(),
            ],
            files_to_copy: vec![FileCopy {
                source: "xaas-admin.conf".to_string(),
                destination: "conf".to_string(),
            }],
            database_file: "xaas-admin.sqlite".to_string(),
            local_database: "xaas-admin.sqlite".to_string(),
            local_upload_path: "public/upload".to_string(),
            build_command: "cargo build --release --locked".to_string(),
            restart_unit: "xaas-admin".to_string(),
        }
    }
}

impl DeployConfig {
    /// Load `path`, or `deploy.toml` if present, or the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => PathBuf::from(DEFAULT_CONFIG_FILE),
            None => return Ok(Self::default()),
        };
        let content = std::fs::read_to_string(&path).map_err(|source| DeployError::Io {
            path: path.clone(),
            source,
        })?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| DeployError::Config(format!("{}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "Loaded deploy configuration");
        Ok(config)
    }

    /// `<vhost>/htdocs`
    pub fn public_path(&self) -> String {
        format!("{}/htdocs", self.vhost_path)
    }

    /// `<vhost>/htdocs/upload`
    pub fn upload_path(&self) -> String {
        format!("{}/upload", self.public_path())
    }

    /// `<vhost>/private`
    pub fn private_path(&self) -> String {
        format!("{}/private", self.vhost_path)
    }

    /// `<vhost>/private/src`
    pub fn source_path(&self) -> String {
        format!("{}/src", self.private_path())
    }

    /// `<vhost>/private/src/config/settings`
    pub fn settings_path(&self) -> String {
        format!("{}/config/settings", self.source_path())
    }

    /// `<vhost>/private/<database_file>`
    pub fn database_path(&self) -> String {
        format!("{}/{}", self.private_path(), self.database_file)
    }

    /// Absolute destination of a copied file.
    pub fn destination(&self, file: &FileCopy) -> String {
        if file.destination.starts_with('/') {
            file.destination.clone()
        } else {
            format!("{}/{}", self.vhost_path, file.destination)
        }
    }

    /// Command printing the production database on stdout, run locally.
    pub fn prod_db_dump_command(&self) -> String {
        format!(
            "ssh {} \"sqlite3 {} .dump\"",
            self.prod_host,
            self.database_path()
        )
    }

    /// Command replacing the local database with a dump read on stdin.
    pub fn local_db_load_command(&self) -> String {
        format!(
            "sh -c 'rm -f {db} && sqlite3 {db}'",
            db = self.local_database
        )
    }

    /// Remote command replacing the server database with a dump read on
    /// stdin.
    pub fn remote_db_load_command(&self) -> String {
        format!("rm -f {db} && sqlite3 {db}", db = self.database_path())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_paths() {
        let config = DeployConfig::default();
        assert_eq!(
            config.upload_path(),
            "/var/www/vhosts/xaas-admin.epfl.ch/htdocs/upload"
        );
        assert_eq!(
            config.settings_path(),
            "/var/www/vhosts/xaas-admin.epfl.ch/private/src/config/settings"
        );
        assert_eq!(
            config.destination(&config.files_to_copy[0]),
            "/var/www/vhosts/xaas-admin.epfl.ch/conf"
        );
        let absolute = FileCopy {
            source: "a".to_string(),
            destination: "/etc/a".to_string(),
        };
        assert_eq!(config.destination(&absolute), "/etc/a");
    }

    #[test]
    fn test_dump_command_targets_production() {
        let config = DeployConfig::default();
        assert_eq!(
            config.prod_db_dump_command(),
            "ssh kis@exopgesrv34.epfl.ch \"sqlite3 /var/www/vhosts/xaas-admin.epfl.ch/private/xaas-admin.sqlite .dump\""
        );
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploy.toml");
        std::fs::write(
            &path,
            "test_host = \"kis@exopgesrv55.epfl.ch\"\nvhost_path = \"/srv/xaas\"\n",
        )
        .unwrap();

        let config = DeployConfig::load(Some(&path)).unwrap();
        assert_eq!(config.test_host.as_deref(), Some("kis@exopgesrv55.epfl.ch"));
        assert_eq!(config.public_path(), "/srv/xaas/htdocs");
        assert_eq!(config.prod_host, "kis@exopgesrv34.epfl.ch");
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let err = DeployConfig::load(Some(Path::new("/nonexistent/deploy.toml"))).unwrap_err();
        assert!(matches!(err, DeployError::Io { .. }));
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploy.toml");
        std::fs::write(&path, "prod_host = [").unwrap();
        let err = DeployConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, DeployError::Config(_)));
    }
}
