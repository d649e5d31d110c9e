use std::fs;

use tempfile::tempdir;

use vroomify::cli::CliArgs;
use vroomify::config::{DEFAULT_CONFIG_FILE, load_from_path, load_settings};
use vroomify::errors::VroomifyError;
use vroomify::types::{ConfigureMode, HookPoint};
use vroomify_test_utils::builders::SettingsBuilder;

const PROJECT_CONFIG: &str = r#"
[presets]
configure = "ninja"
build = "ninja"
test = "ninja"

[watch]
include = ["*.cpp", "CMakeLists.txt"]
exclude = ["build/"]

[build]
jobs = 6

[configure]
fresh = true

[hooks.test]
post = "echo tests passed"
"#;

fn args_for(dir: &std::path::Path) -> CliArgs {
    CliArgs {
        path: Some(dir.to_string_lossy().into_owned()),
        ..CliArgs::default()
    }
}

#[test]
fn default_config_file_in_the_project_root_is_used() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(DEFAULT_CONFIG_FILE), PROJECT_CONFIG).unwrap();

    let settings = load_settings(&args_for(dir.path())).unwrap();

    assert_eq!(settings.root, dir.path().canonicalize().unwrap());
    assert_eq!(settings.configure_preset, "ninja");
    assert_eq!(settings.jobs, 6);
    assert_eq!(settings.include, vec!["*.cpp", "CMakeLists.txt"]);
    assert_eq!(settings.initial_configure, ConfigureMode::Fresh);
    assert_eq!(settings.hooks.get(HookPoint::PostTest), Some("echo tests passed"));

    let pipeline = settings.pipeline_config();
    assert_eq!(pipeline.root, settings.root);
    assert_eq!(pipeline.jobs, 6);
}

#[test]
fn explicit_config_path_wins_over_the_default_file() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(DEFAULT_CONFIG_FILE), PROJECT_CONFIG).unwrap();
    let other = dir.path().join("ci.toml");
    fs::write(
        &other,
        "[presets]\nconfigure = \"ci\"\nbuild = \"ci\"\ntest = \"ci\"\n",
    )
    .unwrap();

    let args = CliArgs {
        config: Some(other.to_string_lossy().into_owned()),
        ..args_for(dir.path())
    };
    let settings = load_settings(&args).unwrap();

    assert_eq!(settings.build_preset, "ci");
    assert_eq!(settings.initial_configure, ConfigureMode::Normal);
}

#[test]
fn missing_explicit_config_is_an_io_error() {
    let dir = tempdir().unwrap();
    let args = CliArgs {
        config: Some(dir.path().join("nope.toml").to_string_lossy().into_owned()),
        ..args_for(dir.path())
    };

    let err = load_settings(&args).unwrap_err();
    assert!(matches!(err, VroomifyError::IoError(_)));
}

#[test]
fn no_config_file_needs_presets_on_the_command_line() {
    let dir = tempdir().unwrap();

    let err = load_settings(&args_for(dir.path())).unwrap_err();
    assert!(matches!(err, VroomifyError::ConfigError(_)));

    let args = CliArgs {
        configure_preset: Some("dev".into()),
        build_preset: Some("dev".into()),
        test_preset: Some("dev".into()),
        ..args_for(dir.path())
    };
    assert!(load_settings(&args).is_ok());
}

#[test]
fn project_path_must_be_a_directory() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("file.txt");
    fs::write(&file, "x").unwrap();

    let err = load_settings(&args_for(&file)).unwrap_err();
    assert!(err.to_string().contains("not a directory"));
}

#[test]
fn unknown_keys_are_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(DEFAULT_CONFIG_FILE);
    fs::write(&path, "[presets]\nconfigure = \"a\"\nflavour = \"b\"\n").unwrap();

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, VroomifyError::TomlError(_)));
}

#[test]
fn invalid_watch_pattern_is_reported() {
    let err = SettingsBuilder::new()
        .with_presets("dev")
        .with_toml("[watch]\nexclude = [\"\"]\n")
        .try_build()
        .unwrap_err();

    assert!(matches!(err, VroomifyError::InvalidPattern { .. }));
}

#[test]
fn cli_jobs_override_the_file() {
    let settings = SettingsBuilder::new()
        .with_toml(PROJECT_CONFIG)
        .with_args(|args| args.jobs = Some(32))
        .build();

    assert_eq!(settings.jobs, 32);
    assert_eq!(settings.test_preset, "ninja");
}
