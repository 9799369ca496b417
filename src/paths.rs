//! Path resolution for edgectl
//!
//! # Environment Variables
//!
//! - `EDGECTL_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/edgectl`)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `EDGECTL_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/edgectl` (if set)
//! 3. `~/.config/edgectl`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "EDGECTL_CONFIG_DIR";

/// Config file name inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Get the edgectl config directory path
pub fn config_dir() -> Result<PathBuf> {
    config_dir_from(|key| std::env::var(key).ok(), dirs::home_dir())
}

/// Resolve the config directory from an environment lookup and a home dir
fn config_dir_from(
    env: impl Fn(&str) -> Option<String>,
    home: Option<PathBuf>,
) -> Result<PathBuf> {
    // 1. Check environment variable override
    if let Some(dir) = env(ENV_CONFIG_DIR).filter(|d| !d.is_empty()) {
        let path = expand_path(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    // 2. Check XDG_CONFIG_HOME
    if let Some(xdg_config) = env("XDG_CONFIG_HOME").filter(|d| !d.is_empty()) {
        let path = PathBuf::from(xdg_config).join("edgectl");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    // 3. Default: ~/.config/edgectl
    let home = home.context("Could not determine home directory")?;
    let path = home.join(".config").join("edgectl");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Default config file path
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

/// Expand `~` and environment variables in a path
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            log::debug!("Could not expand {path}: {e}");
            PathBuf::from(path)
        }
    }
}

/// Shorten a path under the home directory to `~/...` for display
pub fn display(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(rest) = path.strip_prefix(&home)
    {
        return format!("~/{}", rest.display());
    }
    path.display().to_string()
}
