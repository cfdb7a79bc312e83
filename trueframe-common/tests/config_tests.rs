//! Configuration resolution tests
//!
//! Covers:
//! - Priority order: CLI → environment → discovered file → compiled defaults
//! - Missing discovered files fall back to defaults (never fatal)
//! - Missing or malformed explicit files are errors
//!
//! Tests that touch TRUEFRAME_CONFIG are marked #[serial] so they do not race.

use serial_test::serial;
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use trueframe_common::config::{ConfigResolver, ConfigSource, TomlConfig, CONFIG_ENV_VAR};
use trueframe_common::Error;

fn write_config(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
#[serial]
fn test_no_sources_uses_compiled_defaults() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();

    let resolver = ConfigResolver::new("test-module")
        .with_search_paths(vec![dir.path().join("missing.toml")]);

    assert_eq!(resolver.resolve(), ConfigSource::CompiledDefaults);
    assert_eq!(resolver.load().unwrap(), TomlConfig::default());
}

#[test]
#[serial]
fn test_cli_path_beats_environment() {
    let dir = TempDir::new().unwrap();
    let cli = write_config(&dir, "cli.toml", "[risk]\nhigh = 0.8\n");
    let env_file = write_config(&dir, "env.toml", "[risk]\nhigh = 0.9\n");
    env::set_var(CONFIG_ENV_VAR, &env_file);

    let resolver = ConfigResolver::new("test-module")
        .with_cli_path(Some(cli.clone()))
        .with_search_paths(vec![]);

    assert_eq!(resolver.resolve(), ConfigSource::CommandLine(cli));
    assert_eq!(resolver.load().unwrap().risk.high, 0.8);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_environment_beats_discovered_file() {
    let dir = TempDir::new().unwrap();
    let env_file = write_config(&dir, "env.toml", "[logging]\nlevel = \"debug\"\n");
    let discovered = write_config(&dir, "config.toml", "[logging]\nlevel = \"warn\"\n");
    env::set_var(CONFIG_ENV_VAR, &env_file);

    let resolver = ConfigResolver::new("test-module").with_search_paths(vec![discovered]);

    assert_eq!(resolver.resolve(), ConfigSource::Environment(env_file));
    assert_eq!(resolver.load().unwrap().logging.level, "debug");

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_first_existing_search_path_wins() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let second = write_config(&dir, "system.toml", "[video]\ndisabled = [\"audio\"]\n");

    let resolver = ConfigResolver::new("test-module")
        .with_search_paths(vec![dir.path().join("user.toml"), second.clone()]);

    assert_eq!(resolver.resolve(), ConfigSource::Discovered(second));
    let config = resolver.load().unwrap();
    assert_eq!(config.video.disabled, vec!["audio".to_string()]);
    assert!(config.image.disabled.is_empty());
}

#[test]
#[serial]
fn test_missing_explicit_file_is_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();

    let resolver = ConfigResolver::new("test-module")
        .with_cli_path(Some(dir.path().join("nope.toml")))
        .with_search_paths(vec![]);

    assert!(matches!(resolver.load(), Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_malformed_file_is_parse_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let bad = write_config(&dir, "bad.toml", "[risk\nhigh = ");

    let resolver = ConfigResolver::new("test-module").with_cli_path(Some(bad));

    assert!(matches!(resolver.load(), Err(Error::TomlParse(_))));
}

#[test]
#[serial]
fn test_blank_environment_variable_is_ignored() {
    env::set_var(CONFIG_ENV_VAR, "  ");

    let resolver = ConfigResolver::new("test-module").with_search_paths(vec![]);
    assert_eq!(resolver.resolve(), ConfigSource::CompiledDefaults);

    env::remove_var(CONFIG_ENV_VAR);
}
