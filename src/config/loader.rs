// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cli::CliArgs;
use crate::config::model::{RawConfigFile, Settings};
use crate::errors::{Result, VroomifyError};

/// File name looked up in the project root when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "Vroomify.toml";

/// Load a configuration file and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** validate.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Resolve the effective [`Settings`] for a CLI invocation.
///
/// - The project root is `--path`, or the current working directory.
/// - The config file is `--config`, or `Vroomify.toml` in the root when it
///   exists. An explicit `--config` that cannot be read is an error.
/// - CLI values override the file; validation runs on the merged result.
pub fn load_settings(args: &CliArgs) -> Result<Settings> {
    let root = match &args.path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir()?,
    };
    if !root.is_dir() {
        return Err(VroomifyError::ConfigError(format!(
            "project path {} is not a directory",
            root.display()
        )));
    }
    let root = root.canonicalize()?;

    let raw = match &args.config {
        Some(path) => load_from_path(path)?,
        None => {
            let candidate = default_config_path(&root);
            if candidate.is_file() {
                debug!(path = %candidate.display(), "loading default config file");
                load_from_path(&candidate)?
            } else {
                RawConfigFile::default()
            }
        }
    };

    Settings::from_parts(root, raw, args)
}

pub fn default_config_path(root: &Path) -> PathBuf {
    root.join(DEFAULT_CONFIG_FILE)
}
