//! Config path resolution
//!
//! Relative paths are resolved against `CMPI_HOST_HOME` when it is set and
//! against the working directory otherwise.

use std::path::{Path, PathBuf};

/// Environment variable naming the broker's home directory
pub const HOME_ENV: &str = "CMPI_HOST_HOME";

/// Default config file name inside the home directory
pub const CONFIG_FILE_NAME: &str = "cmpi.toml";

/// The broker home directory, if `CMPI_HOST_HOME` is set
pub fn cmpi_home() -> Option<PathBuf> {
    std::env::var_os(HOME_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Resolve `path` against `home`; absolute paths are returned unchanged
pub fn resolve_in(home: Option<&Path>, path: &Path) -> PathBuf {
    match home {
        Some(home) if path.is_relative() => home.join(path),
        _ => path.to_path_buf(),
    }
}

/// Resolve `path` against `CMPI_HOST_HOME`
pub fn resolve(path: &Path) -> PathBuf {
    resolve_in(cmpi_home().as_deref(), path)
}

/// Path of the broker config file
///
/// Path: `$CMPI_HOST_HOME/cmpi.toml`, or `./cmpi.toml` without a home.
pub fn default_config_path() -> PathBuf {
    resolve(Path::new(CONFIG_FILE_NAME))
}
