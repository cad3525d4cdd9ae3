//! Where rolesync keeps its user-level configuration.
//!
//! The user config always lives under `$XDG_CONFIG_HOME` (or `~/.config`),
//! on macOS too, so the same file path works on every operator workstation.

use std::ffi::OsString;
use std::path::PathBuf;

/// File name of the rolesync configuration inside a config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

const APP_DIR: &str = "rolesync";

/// Directory holding the user-level `config.toml`.
///
/// An unset or empty `XDG_CONFIG_HOME` falls back to `~/.config`; without a
/// home directory the path is relative to the working directory.
///
/// # Examples
///
/// ```
/// use rolesync_paths::config_dir;
///
/// let config = config_dir();
/// assert!(config.ends_with("rolesync"));
/// ```
pub fn config_dir() -> PathBuf {
    config_dir_from(std::env::var_os("XDG_CONFIG_HOME"), dirs::home_dir())
}

/// Path of the user-level config file.
pub fn user_config_file() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

fn config_dir_from(xdg_config_home: Option<OsString>, home: Option<PathBuf>) -> PathBuf {
    let base = match xdg_config_home {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => home.unwrap_or_default().join(".config"),
    };
    base.join(APP_DIR)
}
