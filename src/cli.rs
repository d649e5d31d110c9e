// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Every option here can also be set in the TOML config file; values given
//! on the command line win.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `vroomify`.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "vroomify",
    version,
    about = "Watch a CMake project and configure, build and test it on every change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the project directory.
    ///
    /// Default: the current working directory.
    #[arg(short = 'p', long, value_name = "DIR")]
    pub path: Option<String>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Vroomify.toml` in the project directory, if it exists.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// CMake configure preset.
    #[arg(long, value_name = "NAME")]
    pub configure_preset: Option<String>,

    /// CMake build preset.
    #[arg(long, value_name = "NAME")]
    pub build_preset: Option<String>,

    /// CTest test preset.
    #[arg(long, value_name = "NAME")]
    pub test_preset: Option<String>,

    /// Regex of tests to exclude (passed to `ctest --exclude-regex`).
    #[arg(long, value_name = "REGEX")]
    pub exclude_tests: Option<String>,

    /// Parallel build jobs (`cmake --build -j`).
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Start with a fresh configure (`cmake --fresh`).
    #[arg(long)]
    pub fresh: bool,

    /// Run the pipeline once and exit, without watching.
    #[arg(long)]
    pub once: bool,

    /// Do not read control commands from stdin.
    #[arg(long)]
    pub no_interactive: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `VROOMIFY_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load and validate settings, print them, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
