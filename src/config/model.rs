// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::pipeline::{HookScripts, PipelineConfig};
use crate::types::ConfigureMode;

/// Configuration as read from a TOML file.
///
/// ```toml
/// [presets]
/// configure = "ninja-debug"
/// build = "ninja-debug"
/// test = "ninja-debug"
///
/// [watch]
/// include = ["*.cpp", "*.h", "CMakeLists.txt"]
/// exclude = ["build/"]
///
/// [build]
/// jobs = 16
///
/// [test]
/// exclude = "slow_.*"
///
/// [hooks.build]
/// pre = "./scripts/generate.sh"
/// ```
///
/// All sections are optional; CLI flags fill or override them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub presets: PresetSection,

    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub configure: ConfigureSection,

    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub test: TestSection,

    #[serde(default)]
    pub hooks: HooksSection,
}

/// `[presets]` section: CMake / CTest preset names.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PresetSection {
    pub configure: Option<String>,
    pub build: Option<String>,
    pub test: Option<String>,
}

/// `[watch]` section.
///
/// A list left out falls back to the built-in default; an explicit list
/// replaces it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    /// Changes to these paths make the next run configure again.
    pub configure_triggers: Option<Vec<String>>,
}

/// `[configure]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigureSection {
    /// Start with `cmake --fresh`.
    #[serde(default)]
    pub fresh: bool,
}

/// `[build]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    pub jobs: Option<usize>,
}

/// `[test]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestSection {
    /// Regex passed to `ctest --exclude-regex`.
    pub exclude: Option<String>,
    /// Where ctest writes its JUnit report. Defaults to a file in the
    /// system temp directory.
    pub junit_path: Option<PathBuf>,
}

/// `[hooks.configure]`, `[hooks.build]` and `[hooks.test]`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HooksSection {
    #[serde(default)]
    pub configure: HookSection,
    #[serde(default)]
    pub build: HookSection,
    #[serde(default)]
    pub test: HookSection,
}

/// Scripts around one stage. The `_encoded` variants hold base64 of the
/// UTF-8 script body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookSection {
    pub pre: Option<String>,
    pub post: Option<String>,
    pub pre_encoded: Option<String>,
    pub post_encoded: Option<String>,
}

pub const DEFAULT_JOBS: usize = 20;

pub fn default_include() -> Vec<String> {
    [
        "*.c", "*.cc", "*.cpp", "*.cxx", "*.h", "*.hh", "*.hpp", "*.hxx", "*.inl", "*.ipp",
        "CMakeLists.txt", "*.cmake", "CMakePresets.json", "CMakeUserPresets.json",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn default_exclude() -> Vec<String> {
    ["build/", "out/", ".git/"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn default_configure_triggers() -> Vec<String> {
    ["CMakeLists.txt", "*.cmake", "CMakePresets.json", "CMakeUserPresets.json"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Fully merged and validated settings.
///
/// Only built through validation (see `config::validate`), so every pattern
/// compiles and every required preset is present.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Watched project root; also the working directory for every tool.
    pub root: PathBuf,
    pub configure_preset: String,
    pub build_preset: String,
    pub test_preset: String,
    pub jobs: usize,
    pub exclude_tests: Option<String>,
    pub junit_path: PathBuf,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub configure_triggers: Vec<String>,
    pub hooks: HookScripts,
    /// Mode for the first run.
    pub initial_configure: ConfigureMode,
}

impl Settings {
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            root: self.root.clone(),
            configure_preset: self.configure_preset.clone(),
            build_preset: self.build_preset.clone(),
            test_preset: self.test_preset.clone(),
            jobs: self.jobs,
            exclude_tests: self.exclude_tests.clone(),
            junit_path: self.junit_path.clone(),
            hooks: self.hooks.clone(),
        }
    }
}
