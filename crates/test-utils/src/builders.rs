use std::path::PathBuf;

use vroomify::cli::CliArgs;
use vroomify::config::{RawConfigFile, Settings};
use vroomify::pipeline::{HookScripts, PipelineConfig};
use vroomify::types::HookPoint;

pub const TEST_ROOT: &str = "/project";

/// Builder for `PipelineConfig` to simplify test setup.
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig {
                root: PathBuf::from(TEST_ROOT),
                configure_preset: "dev".to_string(),
                build_preset: "dev".to_string(),
                test_preset: "dev".to_string(),
                jobs: 4,
                exclude_tests: None,
                junit_path: PathBuf::from(TEST_ROOT).join("build/junit.xml"),
                hooks: HookScripts::new(),
            },
        }
    }

    pub fn with_hook(mut self, point: HookPoint, script: &str) -> Self {
        self.config.hooks.set(point, script);
        self
    }

    pub fn with_exclude_tests(mut self, pattern: &str) -> Self {
        self.config.exclude_tests = Some(pattern.to_string());
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.config.jobs = jobs;
        self
    }

    pub fn junit_path(&self) -> PathBuf {
        self.config.junit_path.clone()
    }

    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for validated `Settings` from a TOML snippet plus CLI overrides.
pub struct SettingsBuilder {
    root: PathBuf,
    toml: String,
    args: CliArgs,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from(TEST_ROOT),
            toml: String::new(),
            args: CliArgs::default(),
        }
    }

    pub fn with_toml(mut self, toml: &str) -> Self {
        self.toml = toml.to_string();
        self
    }

    pub fn with_presets(mut self, name: &str) -> Self {
        self.args.configure_preset = Some(name.to_string());
        self.args.build_preset = Some(name.to_string());
        self.args.test_preset = Some(name.to_string());
        self
    }

    pub fn with_args(mut self, f: impl FnOnce(&mut CliArgs)) -> Self {
        f(&mut self.args);
        self
    }

    pub fn try_build(self) -> vroomify::errors::Result<Settings> {
        let raw: RawConfigFile = toml::from_str(&self.toml)?;
        Settings::from_parts(self.root, raw, &self.args)
    }

    pub fn build(self) -> Settings {
        self.try_build().expect("Failed to build valid settings from builder")
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
