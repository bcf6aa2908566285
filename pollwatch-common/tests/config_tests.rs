//! Unit tests for configuration and graceful degradation
//!
//! Missing config files and environment variables must never stop startup:
//! resolution falls through to the compiled platform default and the root
//! folder is created on demand.
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate POLLWATCH_ROOT_FOLDER or POLLWATCH_ROOT are marked
//! with #[serial] to ensure they run sequentially, not in parallel.

use pollwatch_common::config::{
    CompiledDefaults, LoggingConfig, RootFolderInitializer, RootFolderResolver, TomlConfig,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert_eq!(defaults.log_level, "info");
    assert!(defaults.log_file.is_none());

    let path_str = defaults.root_folder.to_string_lossy();
    assert!(
        path_str.contains("pollwatch"),
        "Default root should be a pollwatch data directory, got {}",
        path_str
    );
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var("POLLWATCH_ROOT_FOLDER");
    env::remove_var("POLLWATCH_ROOT");

    let resolver = RootFolderResolver::new("test-module");
    let root_folder = resolver.resolve();

    assert!(!root_folder.as_os_str().is_empty());

    let defaults = CompiledDefaults::for_current_platform();
    assert_eq!(root_folder, defaults.root_folder);
}

#[test]
#[serial]
fn test_resolver_env_var_pollwatch_root_folder() {
    let test_path = "/tmp/pollwatch-test-env-folder";
    env::set_var("POLLWATCH_ROOT_FOLDER", test_path);

    let resolver = RootFolderResolver::new("test-module");
    let root_folder = resolver.resolve();

    assert_eq!(root_folder, PathBuf::from(test_path));

    env::remove_var("POLLWATCH_ROOT_FOLDER");
}

#[test]
#[serial]
fn test_resolver_env_var_pollwatch_root() {
    let test_path = "/tmp/pollwatch-test-env-root";
    env::set_var("POLLWATCH_ROOT", test_path);

    let resolver = RootFolderResolver::new("test-module");
    let root_folder = resolver.resolve();

    assert_eq!(root_folder, PathBuf::from(test_path));

    env::remove_var("POLLWATCH_ROOT");
}

#[test]
#[serial]
fn test_resolver_root_folder_var_takes_precedence() {
    env::remove_var("POLLWATCH_ROOT_FOLDER");
    env::remove_var("POLLWATCH_ROOT");

    env::set_var("POLLWATCH_ROOT_FOLDER", "/tmp/pollwatch-priority-1");
    env::set_var("POLLWATCH_ROOT", "/tmp/pollwatch-priority-2");

    let resolver = RootFolderResolver::new("test-module");
    let root_folder = resolver.resolve();

    assert_eq!(root_folder, PathBuf::from("/tmp/pollwatch-priority-1"));

    env::remove_var("POLLWATCH_ROOT_FOLDER");
    env::remove_var("POLLWATCH_ROOT");
}

#[test]
fn test_initializer_database_path() {
    let root = PathBuf::from("/tmp/pollwatch-test-root");
    let initializer = RootFolderInitializer::new(root.clone());

    let db_path = initializer.database_path();
    assert_eq!(db_path, root.join("pollwatch.db"));
}

#[test]
fn test_initializer_media_dir() {
    let root = PathBuf::from("/tmp/pollwatch-test-root");
    let initializer = RootFolderInitializer::new(root.clone());

    assert_eq!(initializer.media_dir(), root.join("media"));
}

#[test]
fn test_initializer_database_exists() {
    let root = PathBuf::from("/tmp/pollwatch-test-nonexistent");
    let initializer = RootFolderInitializer::new(root);

    assert!(!initializer.database_exists());
}

#[test]
fn test_initializer_creates_directory() {
    let test_dir = format!("/tmp/pollwatch-test-create-{}", std::process::id());
    let root = PathBuf::from(&test_dir);

    let _ = std::fs::remove_dir_all(&root);

    let initializer = RootFolderInitializer::new(root.clone());
    let result = initializer.ensure_directory_exists();

    assert!(result.is_ok(), "Failed to create directory: {:?}", result.err());
    assert!(root.exists(), "Directory was not created");
    assert!(root.is_dir(), "Created path is not a directory");

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn test_initializer_idempotent_directory_creation() {
    let test_dir = format!("/tmp/pollwatch-test-idempotent-{}", std::process::id());
    let root = PathBuf::from(&test_dir);

    let _ = std::fs::remove_dir_all(&root);

    let initializer = RootFolderInitializer::new(root.clone());

    let result1 = initializer.ensure_directory_exists();
    assert!(result1.is_ok());

    let result2 = initializer.ensure_directory_exists();
    assert!(result2.is_ok());

    assert!(root.exists());

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn test_initializer_nested_directory_creation() {
    let base = format!("/tmp/pollwatch-test-nested-{}", std::process::id());
    let root = PathBuf::from(format!("{}/level1/level2", base));

    let _ = std::fs::remove_dir_all(PathBuf::from(&base));

    let initializer = RootFolderInitializer::new(root.clone());
    let result = initializer.ensure_directory_exists();

    assert!(result.is_ok(), "Failed to create nested directories: {:?}", result.err());
    assert!(root.exists(), "Nested directory was not created");
    assert!(root.is_dir(), "Created nested path is not a directory");

    let _ = std::fs::remove_dir_all(PathBuf::from(&base));
}

#[test]
#[serial]
fn test_resolver_missing_config_file_does_not_error() {
    env::remove_var("POLLWATCH_ROOT_FOLDER");
    env::remove_var("POLLWATCH_ROOT");

    // A module name that definitely won't have a config file
    let resolver = RootFolderResolver::new("nonexistent-test-module-12345");

    let root_folder = resolver.resolve();

    assert!(!root_folder.as_os_str().is_empty());

    let defaults = CompiledDefaults::for_current_platform();
    assert_eq!(root_folder, defaults.root_folder);
}

#[test]
fn test_toml_roundtrip_with_classifier_fields() {
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/data/pollwatch")),
        classifier_backend: Some("openrouter".to_string()),
        openrouter_api_key: Some("test-key-123".to_string()),
        gemini_api_key: None,
        logging: LoggingConfig::default(),
    };

    let toml_str = toml::to_string(&config).unwrap();
    let parsed: TomlConfig = toml::from_str(&toml_str).unwrap();

    assert_eq!(parsed.root_folder, Some(PathBuf::from("/data/pollwatch")));
    assert_eq!(parsed.classifier_backend, Some("openrouter".to_string()));
    assert_eq!(parsed.openrouter_api_key, Some("test-key-123".to_string()));
    assert_eq!(parsed.gemini_api_key, None);
}

#[test]
fn test_backward_compatible_missing_fields() {
    // Older config files without classifier fields keep loading
    let toml_str = r#"
        root_folder = "/data/pollwatch"
        [logging]
        level = "debug"
    "#;

    let config: TomlConfig = toml::from_str(toml_str).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/data/pollwatch")));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.classifier_backend, None);
    assert_eq!(config.openrouter_api_key, None);
}

#[test]
fn test_empty_toml_is_valid() {
    let config: TomlConfig = toml::from_str("").unwrap();
    assert_eq!(config.root_folder, None);
    assert_eq!(config.logging, LoggingConfig::default());
}
