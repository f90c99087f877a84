use super::data::{path_display, Config, CredentialBackend, DEFAULT_PREFERENCES_POLL_SECS};
use super::io::ConfigError;
use crate::api::client::DEFAULT_BASE_URL;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_load_nonexistent_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nonexistent_config.toml");

    let config = Config::load_from_path(&config_path).expect("Failed to load config");

    assert_eq!(config, Config::default());
}

#[test]
fn test_config_persistence_lifecycle() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nested").join("config.toml");

    // Phase 1: initial save creates parent directories
    let config = Config {
        base_url: Some("https://nova.example.com/api".to_string()),
        credential_store: Some(CredentialBackend::File),
        ..Default::default()
    };
    config
        .save_to_path(&config_path)
        .expect("Failed to save config");
    let loaded = Config::load_from_path(&config_path).expect("Failed to load config");
    assert_eq!(loaded, config);

    // Phase 2: modify one field, the other survives
    let mut config = loaded;
    config.memory_enabled = Some(false);
    config
        .save_to_path(&config_path)
        .expect("Failed to save modified config");
    let loaded = Config::load_from_path(&config_path).expect("Failed to load modified config");
    assert_eq!(loaded.memory_enabled, Some(false));
    assert_eq!(loaded.credential_store, Some(CredentialBackend::File));

    // Phase 3: unset and verify persistence of None
    let mut config = loaded;
    config.base_url = None;
    config
        .save_to_path(&config_path)
        .expect("Failed to save unset config");
    let loaded = Config::load_from_path(&config_path).expect("Failed to load unset config");
    assert_eq!(loaded.base_url, None);
    assert_eq!(loaded.memory_enabled, Some(false));
}

#[test]
fn test_credential_store_serializes_lowercase() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");

    Config {
        credential_store: Some(CredentialBackend::Keyring),
        ..Default::default()
    }
    .save_to_path(&config_path)
    .expect("Failed to save config");

    let raw = fs::read_to_string(&config_path).expect("read config");
    assert!(raw.contains("credential_store = \"keyring\""), "{raw}");
}

#[test]
fn test_invalid_toml_reports_parse_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "base_url = ").expect("write config");

    let err = Config::load_from_path(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().starts_with("Failed to parse config at"));
}

#[test]
fn test_mutate_only_writes_on_change() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");

    let unchanged = Config::mutate_at(&config_path, |config| config.model.clone())
        .expect("mutate succeeds");
    assert_eq!(unchanged, None);
    assert!(!config_path.exists());

    Config::mutate_at(&config_path, |config| {
        config.model = Some("x-ai/grok-3-mini-beta".to_string());
    })
    .expect("mutate succeeds");
    let loaded = Config::load_from_path(&config_path).expect("load");
    assert_eq!(loaded.model.as_deref(), Some("x-ai/grok-3-mini-beta"));
}

#[test]
fn test_base_url_precedence() {
    let config = Config {
        base_url: Some("http://config/api".to_string()),
        ..Default::default()
    };

    assert_eq!(
        config.resolve_base_url(Some("http://flag/api"), Some("http://env/api")),
        "http://flag/api"
    );
    assert_eq!(
        config.resolve_base_url(None, Some("http://env/api")),
        "http://env/api"
    );
    assert_eq!(config.resolve_base_url(None, None), "http://config/api");
    assert_eq!(
        Config::default().resolve_base_url(None, None),
        DEFAULT_BASE_URL
    );
    assert_eq!(
        Config::default().resolve_base_url(Some("  "), None),
        DEFAULT_BASE_URL
    );
    assert_eq!(config.resolve_base_url(None, Some("")), "http://config/api");
    assert_eq!(
        config.resolve_base_url(Some(" "), Some("http://env/api")),
        "http://env/api"
    );
}

#[test]
fn test_defaults_and_poll_interval_floor() {
    let config = Config::default();
    assert!(config.memory_enabled());
    assert!(config.markdown());
    assert_eq!(config.credential_backend(), CredentialBackend::Keyring);
    assert_eq!(
        config.preferences_poll_interval(),
        Duration::from_secs(DEFAULT_PREFERENCES_POLL_SECS)
    );

    let eager = Config {
        preferences_poll_secs: Some(1),
        ..Default::default()
    };
    assert_eq!(eager.preferences_poll_interval(), Duration::from_secs(5));
}

#[test]
fn test_credential_backend_parse() {
    assert_eq!(CredentialBackend::parse("File"), Some(CredentialBackend::File));
    assert_eq!(
        CredentialBackend::parse(" keyring "),
        Some(CredentialBackend::Keyring)
    );
    assert_eq!(CredentialBackend::parse("browser"), None);
}

#[test]
fn test_summary_lists_every_key() {
    let config = Config {
        model: Some("m".to_string()),
        markdown: Some(false),
        ..Default::default()
    };
    let mut out = Vec::new();
    config
        .write_summary(&mut out, DEFAULT_BASE_URL)
        .expect("write summary");
    let text = String::from_utf8(out).expect("utf8");

    assert!(text.contains(&format!("base-url: (unset, using {DEFAULT_BASE_URL})")));
    assert!(text.contains("credential-store: keyring"));
    assert!(text.contains("memory-enabled: on"));
    assert!(text.contains("model: m"));
    assert!(text.contains("markdown: off"));
}

#[cfg(unix)]
#[test]
fn test_path_display_uses_tilde_under_home() {
    if let Some(home) = std::env::var_os("HOME") {
        let path = std::path::PathBuf::from(home).join(".config/nova/config.toml");
        assert_eq!(path_display(&path), "~/.config/nova/config.toml");
    }
    assert_eq!(path_display("/etc/nova.toml"), "/etc/nova.toml");
}
