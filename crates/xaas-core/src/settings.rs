//! Per-environment settings.
//!
//! Each deployment target (`local`, `ci`, `test`, `prod`) has its own
//! baseline: debug mode, allowed host names, where the database URL comes
//! from and where static files live. The target is picked with `XAAS_ENV`.
//! An optional TOML file is merged over the baseline.
//!
//! Database URLs come from one of two places depending on the target:
//! a mandatory environment variable (`local`), or the secrets file
//! (`test`, `prod`). Both fail loudly when the value is absent.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::traits::ConfigManager;
use crate::{Error, Result};

/// Variable selecting the deployment target.
pub const ENV_VAR: &str = "XAAS_ENV";
/// Variable holding the database URL for the `local` target.
pub const DATABASE_URL_VAR: &str = "XAAS_DATABASE_URL";
/// Variable pointing to the secrets file.
pub const SECRETS_FILE_VAR: &str = "XAAS_SECRETS_FILE";
/// Secrets file used when [`SECRETS_FILE_VAR`] is unset.
pub const DEFAULT_SECRETS_FILE: &str = "/etc/xaas-admin/secrets.toml";
/// Secret holding the database URL for the `test` and `prod` targets.
pub const DATABASE_URL_SECRET: &str = "DB_URL";

const VHOST_STATIC_ROOT: &str = "/var/www/vhosts/xaas-admin.epfl.ch/htdocs/";

// ============================================================================
// Environment
// ============================================================================

/// Deployment target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Developer workstation.
    Local,
    /// Continuous integration.
    Ci,
    /// Test server.
    Test,
    /// Production server.
    Prod,
}

impl Environment {
    /// Name used in `XAAS_ENV` and as the server name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Ci => "ci",
            Environment::Test => "test",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Environment::Local),
            "ci" => Ok(Environment::Ci),
            "test" => Ok(Environment::Test),
            "prod" | "production" => Ok(Environment::Prod),
            other => Err(Error::config(format!(
                "Unknown environment '{other}' in {ENV_VAR} (expected local, ci, test or prod)"
            ))),
        }
    }
}

// ============================================================================
// Secrets
// ============================================================================

/// Key/value secrets read from a TOML file.
///
/// A missing file yields an empty set; the error surfaces when a target
/// actually asks for a secret.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    path: Option<PathBuf>,
    values: BTreeMap<String, String>,
}

impl Secrets {
    /// Build secrets from in-memory values.
    pub fn from_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            path: None,
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Read secrets from `path`, or return an empty set if it does not exist.
    pub fn load_optional(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self {
                path: Some(path.to_path_buf()),
                values: BTreeMap::new(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        let table: BTreeMap<String, toml::Value> = toml::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))?;
        let values = table
            .into_iter()
            .map(|(k, v)| {
                let v = match v {
                    toml::Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, v)
            })
            .collect();
        Ok(Self {
            path: Some(path.to_path_buf()),
            values,
        })
    }

    /// Look a secret up, failing if it is absent.
    pub fn get(&self, key: &str) -> Result<String> {
        self.values.get(key).cloned().ok_or_else(|| {
            let origin = self
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<memory>".to_string());
            Error::config(format!("Secret '{key}' not found in {origin}"))
        })
    }
}

// ============================================================================
// SettingsSources
// ============================================================================

/// Environment variables and secrets the settings are resolved from.
#[derive(Debug, Clone, Default)]
pub struct SettingsSources {
    vars: HashMap<String, String>,
    secrets: Secrets,
}

impl SettingsSources {
    /// Build sources from explicit values.
    pub fn new(vars: HashMap<String, String>, secrets: Secrets) -> Self {
        Self { vars, secrets }
    }

    /// Capture the process environment and the secrets file it points to.
    pub fn from_process() -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        let secrets_path = vars
            .get(SECRETS_FILE_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SECRETS_FILE));
        let secrets = Secrets::load_optional(&secrets_path)?;
        Ok(Self { vars, secrets })
    }

    /// Optional environment variable.
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Environment variable that must be set and non-empty.
    pub fn mandatory_env(&self, key: &str) -> Result<String> {
        match self.var(key) {
            Some(v) if !v.is_empty() => Ok(v.to_string()),
            _ => Err(Error::config(format!(
                "The environment variable '{key}' is mandatory"
            ))),
        }
    }

    /// Secret that must be present.
    pub fn secret(&self, key: &str) -> Result<String> {
        self.secrets.get(key)
    }

    /// Target selected by `XAAS_ENV`, `local` when unset.
    pub fn environment(&self) -> Result<Environment> {
        self.var(ENV_VAR)
            .map(str::parse)
            .unwrap_or(Ok(Environment::Local))
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Listening address of the admin server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Database connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// sqlx connection URL, e.g. `sqlite:///var/lib/xaas-admin/db.sqlite`.
    pub url: String,
    /// Pool size.
    pub max_connections: u32,
}

/// A bearer token accepted by the admin server and the identity behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    /// The token itself.
    pub token: String,
    /// User name.
    pub username: String,
    /// Directory groups of the user.
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Access control for the admin surface.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthSettings {
    /// When false, every request is let through.
    pub enabled: bool,
    /// Group a user must belong to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_group: Option<String>,
    /// Accepted tokens.
    #[serde(default)]
    pub tokens: Vec<TokenGrant>,
}

/// Resolved application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Name of the deployment target serving requests.
    pub server_name: String,
    /// Verbose errors and debug logging.
    pub debug: bool,
    /// Host names the server answers to. `*` allows any host.
    pub allowed_hosts: Vec<String>,
    /// Directory static files are served from.
    pub static_root: PathBuf,
    /// URL prefix of static files.
    pub static_url: String,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Listening address.
    pub server: ServerSettings,
    /// Database connection.
    pub database: DatabaseSettings,
    /// Access control.
    #[serde(default)]
    pub auth: AuthSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_name: Environment::Local.to_string(),
            debug: true,
            allowed_hosts: vec!["127.0.0.1".to_string(), "localhost".to_string()],
            static_root: PathBuf::from("static/"),
            static_url: "/static/".to_string(),
            log_level: "info".to_string(),
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            database: DatabaseSettings {
                url: "sqlite://xaas-admin.sqlite?mode=rwc".to_string(),
                max_connections: 5,
            },
            auth: AuthSettings::default(),
        }
    }
}

impl Settings {
    /// Baseline settings of a deployment target.
    pub fn for_environment(env: Environment, sources: &SettingsSources) -> Result<Self> {
        let base = Self {
            server_name: env.to_string(),
            ..Self::default()
        };
        let settings = match env {
            Environment::Local => Self {
                static_root: PathBuf::from("/usr/src/xaas-admin/static/"),
                log_level: "debug".to_string(),
                database: DatabaseSettings {
                    url: sources.mandatory_env(DATABASE_URL_VAR)?,
                    ..base.database.clone()
                },
                ..base
            },
            Environment::Ci => Self {
                allowed_hosts: vec!["*".to_string()],
                database: DatabaseSettings {
                    url: "sqlite::memory:".to_string(),
                    max_connections: 1,
                },
                ..base
            },
            Environment::Test => Self {
                debug: false,
                allowed_hosts: vec!["xaas-admin-test.epfl.ch".to_string()],
                static_root: PathBuf::from(VHOST_STATIC_ROOT),
                server: ServerSettings {
                    host: "0.0.0.0".to_string(),
                    ..base.server.clone()
                },
                database: DatabaseSettings {
                    url: sources.secret(DATABASE_URL_SECRET)?,
                    ..base.database.clone()
                },
                auth: AuthSettings {
                    enabled: true,
                    ..AuthSettings::default()
                },
                ..base
            },
            Environment::Prod => Self {
                debug: false,
                allowed_hosts: vec![
                    "xaas-admin-test.epfl.ch".to_string(),
                    "exopgesrv34.epfl.ch".to_string(),
                ],
                static_root: PathBuf::from(VHOST_STATIC_ROOT),
                log_level: "warn".to_string(),
                server: ServerSettings {
                    host: "0.0.0.0".to_string(),
                    ..base.server.clone()
                },
                database: DatabaseSettings {
                    url: sources.secret(DATABASE_URL_SECRET)?,
                    ..base.database.clone()
                },
                auth: AuthSettings {
                    enabled: true,
                    ..AuthSettings::default()
                },
                ..base
            },
        };
        Ok(settings)
    }

    /// Baseline of `env` with the TOML file at `overlay` merged over it.
    pub fn load_with(
        env: Environment,
        sources: &SettingsSources,
        overlay: Option<&Path>,
    ) -> Result<Self> {
        let base = Self::for_environment(env, sources)?;
        let Some(path) = overlay else {
            return Ok(base);
        };

        let content = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        let overlay: toml::Value = toml::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))?;

        let mut merged = toml::Value::try_from(&base).map_err(|e| Error::config(e.to_string()))?;
        merge_toml(&mut merged, overlay);
        merged
            .try_into()
            .map_err(|e| Error::config(format!("Invalid settings in {}: {e}", path.display())))
    }

    /// `host:port` to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl ConfigManager for Settings {
    fn project_name() -> &'static str {
        "xaas-admin"
    }

    fn config_env_var() -> &'static str {
        "XAAS_CONFIG"
    }

    fn env_prefix() -> &'static str {
        "XAAS"
    }

    fn load(config_path: Option<&str>) -> Result<Self> {
        let sources = SettingsSources::from_process()?;
        let env = sources.environment()?;
        let overlay = Self::resolve_config_path(config_path).filter(|p| p.exists());
        let settings = Self::load_with(env, &sources, overlay.as_deref())?;
        tracing::debug!(
            environment = %env,
            overlay = ?overlay,
            "Settings loaded"
        );
        Ok(settings)
    }
}

/// Recursively merge `overlay` into `base`. Tables merge key by key; any
/// other value in the overlay replaces the base value.
pub fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
