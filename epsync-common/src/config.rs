//! Configuration loading and root folder resolution

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Name of the SQLite database file inside the root folder.
pub const DATABASE_FILE: &str = "epsync.db";

/// Environment variable overriding the root folder.
pub const ROOT_FOLDER_ENV: &str = "EPSYNC_ROOT_FOLDER";

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. `EPSYNC_ROOT_FOLDER` environment variable
/// 3. `root_folder` key in the TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&Path>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        return PathBuf::from(path);
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = locate_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Create the root folder directory if it does not exist yet.
pub fn ensure_root_folder(root: &Path) -> Result<()> {
    std::fs::create_dir_all(root)?;
    Ok(())
}

/// Path of the SQLite database inside the root folder.
pub fn database_path(root: &Path) -> PathBuf {
    root.join(DATABASE_FILE)
}

/// Locate the configuration file for the platform.
fn locate_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("epsync").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/epsync/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// OS-dependent default root folder path.
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("epsync"))
        .unwrap_or_else(|| PathBuf::from("./epsync_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_argument_wins() {
        let root = resolve_root_folder(Some(Path::new("/tmp/epsync-test")));
        assert_eq!(root, PathBuf::from("/tmp/epsync-test"));
    }

    #[test]
    fn database_path_is_inside_root() {
        let path = database_path(Path::new("/data/epsync"));
        assert_eq!(path, PathBuf::from("/data/epsync/epsync.db"));
    }
}
