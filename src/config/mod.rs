// src/config/mod.rs

//! Configuration loading and validation for vroomify.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Merge CLI overrides and validate the result (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{DEFAULT_CONFIG_FILE, default_config_path, load_from_path, load_settings};
pub use model::{RawConfigFile, Settings};
