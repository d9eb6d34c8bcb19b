//! Configuration management trait.

use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{Error, Result};

/// A configuration type that can be located, loaded, rendered as TOML and
/// exported as environment variables.
///
/// The CLI `config` subcommands are generic over this trait.
pub trait ConfigManager: Default + Serialize + DeserializeOwned {
    /// Project name, used for the config directory and messages.
    fn project_name() -> &'static str;

    /// Variable that can point to the config file.
    fn config_env_var() -> &'static str;

    /// Prefix of exported environment variables.
    fn env_prefix() -> &'static str;

    /// Load the configuration, optionally from an explicit file.
    fn load(config_path: Option<&str>) -> Result<Self>;

    /// `<platform config dir>/<project>/config.toml`.
    fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(Self::project_name()).join("config.toml"))
    }

    /// Explicit path, then the config variable, then the default path.
    fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        explicit
            .map(PathBuf::from)
            .or_else(|| std::env::var(Self::config_env_var()).ok().map(PathBuf::from))
            .or_else(Self::default_config_path)
    }

    /// Render as pretty TOML.
    fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Flatten into `PREFIX_SECTION_KEY=value` pairs, sorted by key.
    fn to_env_vars(&self) -> Result<Vec<(String, String)>> {
        let value = toml::Value::try_from(self).map_err(|e| Error::config(e.to_string()))?;
        let mut vars = Vec::new();
        flatten_env(Self::env_prefix(), &value, &mut vars);
        vars.sort();
        Ok(vars)
    }
}

fn flatten_env(prefix: &str, value: &toml::Value, out: &mut Vec<(String, String)>) {
    match value {
        toml::Value::Table(table) => {
            for (key, value) in table {
                let name = format!("{prefix}_{}", key.to_uppercase());
                flatten_env(&name, value, out);
            }
        }
        toml::Value::Array(items) if items.iter().all(is_scalar) => {
            let joined = items.iter().map(scalar_string).collect::<Vec<_>>().join(",");
            out.push((prefix.to_string(), joined));
        }
        toml::Value::Array(_) => out.push((prefix.to_string(), value.to_string())),
        scalar => out.push((prefix.to_string(), scalar_string(scalar))),
    }
}

fn is_scalar(value: &toml::Value) -> bool {
    !matches!(value, toml::Value::Table(_) | toml::Value::Array(_))
}

fn scalar_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
