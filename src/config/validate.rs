// src/config/validate.rs

use std::path::PathBuf;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::cli::CliArgs;
use crate::config::model::{
    DEFAULT_JOBS, HookSection, RawConfigFile, Settings, default_configure_triggers,
    default_exclude, default_include,
};
use crate::errors::{Result, VroomifyError};
use crate::pipeline::HookScripts;
use crate::types::{ConfigureMode, HookPoint, Stage};
use crate::watch::patterns::compile_pattern;

impl Settings {
    /// Merge CLI arguments over a raw config file and validate the result.
    ///
    /// `root` must already be the canonical project directory.
    pub fn from_parts(root: PathBuf, raw: RawConfigFile, args: &CliArgs) -> Result<Self> {
        let configure_preset =
            require_preset("configure", args.configure_preset.as_ref(), raw.presets.configure)?;
        let build_preset = require_preset("build", args.build_preset.as_ref(), raw.presets.build)?;
        let test_preset = require_preset("test", args.test_preset.as_ref(), raw.presets.test)?;

        let jobs = args.jobs.or(raw.build.jobs).unwrap_or(DEFAULT_JOBS);
        if jobs == 0 {
            return Err(VroomifyError::ConfigError(
                "build jobs must be >= 1 (got 0)".to_string(),
            ));
        }

        let exclude_tests = args
            .exclude_tests
            .clone()
            .or(raw.test.exclude)
            .filter(|p| !p.trim().is_empty());
        if let Some(pattern) = &exclude_tests {
            regex::Regex::new(pattern).map_err(|e| VroomifyError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
        }

        let include = raw.watch.include.unwrap_or_else(default_include);
        if include.is_empty() {
            return Err(VroomifyError::ConfigError(
                "[watch].include must contain at least one pattern".to_string(),
            ));
        }
        let exclude = raw.watch.exclude.unwrap_or_else(default_exclude);
        let configure_triggers = raw
            .watch
            .configure_triggers
            .unwrap_or_else(default_configure_triggers);

        for pattern in include.iter().chain(&exclude).chain(&configure_triggers) {
            compile_pattern(pattern)?;
        }

        let mut hooks = HookScripts::new();
        collect_hooks(&mut hooks, Stage::Configure, raw.hooks.configure)?;
        collect_hooks(&mut hooks, Stage::Build, raw.hooks.build)?;
        collect_hooks(&mut hooks, Stage::Test, raw.hooks.test)?;

        let initial_configure = if args.fresh || raw.configure.fresh {
            ConfigureMode::Fresh
        } else {
            ConfigureMode::Normal
        };

        let junit_path = raw
            .test
            .junit_path
            .map(|p| if p.is_absolute() { p } else { root.join(p) })
            .unwrap_or_else(default_junit_path);

        Ok(Settings {
            root,
            configure_preset,
            build_preset,
            test_preset,
            jobs,
            exclude_tests,
            junit_path,
            include,
            exclude,
            configure_triggers,
            hooks,
            initial_configure,
        })
    }
}

fn require_preset(stage: &str, cli: Option<&String>, file: Option<String>) -> Result<String> {
    cli.cloned()
        .or(file)
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| {
            VroomifyError::ConfigError(format!(
                "no {stage} preset given; pass --{stage}-preset or set [presets].{stage}"
            ))
        })
}

fn collect_hooks(hooks: &mut HookScripts, stage: Stage, section: HookSection) -> Result<()> {
    let pre = hook_script(stage.pre_hook(), section.pre, section.pre_encoded)?;
    let post = hook_script(stage.post_hook(), section.post, section.post_encoded)?;

    if let Some(script) = pre {
        hooks.set(stage.pre_hook(), script);
    }
    if let Some(script) = post {
        hooks.set(stage.post_hook(), script);
    }
    Ok(())
}

fn hook_script(
    point: HookPoint,
    plain: Option<String>,
    encoded: Option<String>,
) -> Result<Option<String>> {
    let invalid = |reason: String| VroomifyError::InvalidHookScript {
        hook: point.to_string(),
        reason,
    };

    let script = match (plain, encoded) {
        (Some(_), Some(_)) => {
            return Err(invalid(
                "set either the plain or the encoded script, not both".to_string(),
            ));
        }
        (Some(plain), None) => plain,
        (None, Some(encoded)) => {
            let bytes = BASE64
                .decode(encoded.trim())
                .map_err(|e| invalid(format!("not valid base64: {e}")))?;
            String::from_utf8(bytes).map_err(|e| invalid(format!("not valid UTF-8: {e}")))?
        }
        (None, None) => return Ok(None),
    };

    if script.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(script))
}

fn default_junit_path() -> PathBuf {
    std::env::temp_dir().join(format!("vroomify-{}-junit.xml", std::process::id()))
}
