use crate::policy::Policy;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming a config file to use instead of the default.
pub const CONFIG_ENV: &str = "SNAPKEEP_CONFIG";

/// Defaults for the CLI, read from TOML.
///
/// ```toml
/// policy = "1@last 7@daily 12@monthly yearly"
/// extract = '^backup-(\d+)\.tar$'
/// local_time = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub policy: Option<Policy>,
    pub extract: Option<String>,
    pub parse: Option<String>,
    pub local_time: bool,
    pub quiet: bool,
}

/// Load a config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config = toml::from_str::<Config>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// The per-user config path, `<config_dir>/snapkeep/config.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("snapkeep/config.toml"))
}

/// Resolve and load the effective config.
///
/// An explicit path, then [`CONFIG_ENV`], must exist. The per-user file is
/// optional; without any file the defaults are used.
///
/// # Errors
///
/// Returns an error if a required file is missing or any file is invalid.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    let env_path = env::var_os(CONFIG_ENV).map(PathBuf::from);
    resolve_config_inner(explicit, env_path.as_deref(), default_config_path().as_deref())
}

fn resolve_config_inner(
    explicit: Option<&Path>,
    env_path: Option<&Path>,
    user_path: Option<&Path>,
) -> Result<Config> {
    if let Some(path) = explicit.or(env_path) {
        if !path.exists() {
            bail!("config file {} does not exist", path.display());
        }
        return load_config(path);
    }

    match user_path {
        Some(path) if path.exists() => load_config(path),
        _ => Ok(Config::default()),
    }
}
