//! Integration tests for configuration loading and root folder resolution
//!
//! Tests touching `CHS_*` environment variables are marked `#[serial]` so they
//! never race each other.

use chs_common::config::{
    default_root_folder, load_toml_config, resolve_root_folder, write_toml_config,
    IngestSettings, LoggingConfig, TomlConfig, BASE_URL_ENV, ROOT_FOLDER_ENV, WORKER_POOL_ENV,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn sample_config() -> TomlConfig {
    TomlConfig {
        root_folder: Some(PathBuf::from("/data/chess")),
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        ingest: IngestSettings {
            min_request_interval_ms: 250,
            worker_pool_size: 2,
            ..IngestSettings::default()
        },
    }
}

#[test]
fn test_missing_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = load_toml_config(&temp_dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_write_then_load_preserves_fields() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("nested").join("chs-ingest.toml");

    write_toml_config(&sample_config(), &target).unwrap();

    assert!(target.exists());
    assert!(!target.with_extension("toml.tmp").exists());
    assert_eq!(load_toml_config(&target).unwrap(), sample_config());
}

#[cfg(unix)]
#[test]
fn test_written_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("chs-ingest.toml");
    write_toml_config(&sample_config(), &target).unwrap();

    let mode = std::fs::metadata(&target).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_malformed_file_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("broken.toml");
    std::fs::write(&target, "[ingest\nmax_attempts = ").unwrap();

    let err = load_toml_config(&target).unwrap_err();
    assert!(matches!(err, chs_common::Error::Config(_)));
}

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let resolved = resolve_root_folder(Some(Path::new("/from/cli")), &sample_config());
    env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(resolved, PathBuf::from("/from/cli"));
}

#[test]
#[serial]
fn test_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let resolved = resolve_root_folder(None, &sample_config());
    env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(resolved, PathBuf::from("/from/env"));
}

#[test]
#[serial]
fn test_toml_then_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(
        resolve_root_folder(None, &sample_config()),
        PathBuf::from("/data/chess")
    );
    assert_eq!(
        resolve_root_folder(None, &TomlConfig::default()),
        default_root_folder()
    );
}

#[test]
#[serial]
fn test_env_overrides_ingest_settings() {
    env::set_var(BASE_URL_ENV, "http://127.0.0.1:9999");
    env::set_var(WORKER_POOL_ENV, "not-a-number");

    let mut settings = IngestSettings::default();
    settings.apply_env_overrides();

    env::remove_var(BASE_URL_ENV);
    env::remove_var(WORKER_POOL_ENV);

    assert_eq!(settings.base_url, "http://127.0.0.1:9999");
    assert_eq!(settings.worker_pool_size, IngestSettings::default().worker_pool_size);
}
