//! Config File Tests

use std::fs;

use epm_config::{Backend, Config, ConfigError};
use epm_params::ConfirmPolicy;
use epm_store::DocumentStore;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn test_missing_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let config = Config::from_file(&dir.path().join("absent.yml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_write_default_then_read_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.yml");

    assert!(Config::write_default(&path).unwrap());
    assert!(path.exists());
    assert_eq!(Config::from_file(&path).unwrap(), Config::default());
}

#[test]
fn test_write_default_keeps_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yml");
    fs::write(&path, "backend: memory\nconfirm: \"no\"\n").unwrap();

    assert!(!Config::write_default(&path).unwrap());
    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.backend, Backend::Memory);
    assert_eq!(config.confirm, ConfirmPolicy::No);
}

#[test]
fn test_malformed_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yml");
    fs::write(&path, "backend: [file\n").unwrap();

    match Config::from_file(&path) {
        Err(ConfigError::Yaml { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected a YAML error, got {other:?}"),
    }
}

#[test]
fn test_file_backend_persists_under_root() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        backend: Backend::File,
        root: Some(dir.path().join("store")),
        ..Config::default()
    };
    let ns = epm_store::Namespace::new("Dummy", "DummyParams");

    let store = config.open_store().unwrap();
    store.insert_one(&ns, serde_json::Map::new()).unwrap();

    let reopened = config.open_store().unwrap();
    assert_eq!(reopened.count(&ns).unwrap(), 1);
    assert!(dir.path().join("store").join("Dummy").join("DummyParams.json").exists());
}
