use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use hashledger::config::{Config, ConfigError};
use hashledger::engine::ErrorPolicy;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.flush_threshold, 5_000);
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
root_path = "/srv/archive/"
ledger_path = "state/./archive.dirs"
flush_threshold = 250
on_error = "abort"
"#,
    )
    .unwrap();

    let config = Config::from_figment(&Config::figment(Some(&config_path))).unwrap();

    assert_eq!(config.root_path, PathBuf::from("/srv/archive"));
    assert_eq!(config.ledger_path, PathBuf::from("state/archive.dirs"));
    assert_eq!(config.flush_threshold, 250);
    assert_eq!(config.on_error, ErrorPolicy::Abort);
    // Untouched keys keep their defaults.
    assert_eq!(config.results_path, PathBuf::from("processed_files.csv"));
    assert_eq!(config.progress_interval, 100);
}

#[test]
fn test_env_overrides_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "flush_threshold = 250\nreport_limit = 7\n").unwrap();

    // A private prefix keeps this test away from the real HASHLEDGER_ variables.
    std::env::set_var("HASHLEDGER_LAYERTEST_FLUSH_THRESHOLD", "42");
    std::env::set_var("HASHLEDGER_LAYERTEST_ON_ERROR", "abort");

    let figment =
        Config::figment(Some(&config_path)).merge(Env::prefixed("HASHLEDGER_LAYERTEST_"));
    let config = Config::from_figment(&figment).unwrap();

    std::env::remove_var("HASHLEDGER_LAYERTEST_FLUSH_THRESHOLD");
    std::env::remove_var("HASHLEDGER_LAYERTEST_ON_ERROR");

    assert_eq!(config.flush_threshold, 42);
    assert_eq!(config.report_limit, 7);
    assert_eq!(config.on_error, ErrorPolicy::Abort);
}

#[test]
fn test_config_load_explicit_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("custom.toml");
    fs::write(&config_path, "report_limit = 3\n").unwrap();

    let config = Config::load(Some(&config_path)).unwrap();
    assert_eq!(config.report_limit, 3);
}

#[test]
fn test_config_invalid_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "flush_threshold = \"many\"").unwrap();

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&config_path));
    let result: Result<Config, _> = figment.extract();
    assert!(result.is_err());

    let err = Config::load(Some(&config_path)).unwrap_err();
    assert!(matches!(err, ConfigError::Extract(_)));
}

#[test]
fn test_config_unknown_policy_rejected() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "on_error = \"retry\"").unwrap();

    assert!(Config::from_figment(&Config::figment(Some(&config_path))).is_err());
}
