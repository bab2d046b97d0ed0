use super::*;

fn valid_settings() -> Settings {
    let mut settings = Settings::default();
    settings.api.base_url = "https://example.sentinelone.net/web/api/v2.1".to_string();
    settings.api.token = "abcdefghijklmnop".to_string();
    settings
}

#[test]
fn test_config_loads_defaults() {
    let config = SweepConfig::load_with(Some("non_existent.toml"), None::<()>)
        .expect("Should load default config");
    let settings = config.settings().unwrap();

    assert_eq!(settings.api.timeout_secs, 60);
    assert_eq!(settings.api.page_limit, 1000);
    assert_eq!(settings.runner.thread_percentage, 75);
    assert!(settings.display.progress);
    assert!(settings.sites.ids.is_empty());
}

#[test]
fn test_config_sections() {
    let config = SweepConfig::load().unwrap();

    let full = config.get_full_config().unwrap();
    assert!(full.get("api").is_some());
    assert!(full.get("runner").is_some());

    let runner = config.get_section("runner").unwrap();
    assert!(runner.get("workers").is_some());
}

#[test]
fn test_custom_config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(
        &path,
        "[api]\nbase_url = \"https://custom.example\"\npage_limit = 250\n\n[runner]\nworkers = 3\n",
    )
    .unwrap();

    let config = SweepConfig::load_with(path.to_str(), None::<()>).unwrap();
    let settings = config.settings().unwrap();

    assert_eq!(settings.api.base_url, "https://custom.example");
    assert_eq!(settings.api.page_limit, 250);
    assert_eq!(settings.runner.workers, 3);
    // untouched keys keep their defaults
    assert_eq!(settings.api.timeout_secs, 60);
}

#[test]
fn test_cli_overrides_win() {
    let overrides = serde_json::json!({ "api": { "token": "from-cli" }, "runner": { "workers": 7 } });
    let config = SweepConfig::load_with(None, Some(overrides)).unwrap();
    let settings = config.settings().unwrap();

    assert_eq!(settings.api.token, "from-cli");
    assert_eq!(settings.runner.workers, 7);
}

#[test]
fn test_validate_accepts_complete_settings() {
    assert_eq!(valid_settings().validate(), Ok(()));
}

#[test]
fn test_validate_missing_credentials() {
    let mut settings = valid_settings();
    settings.api.token = "   ".to_string();
    assert_eq!(settings.validate(), Err(ConfigError::MissingToken));

    let mut settings = valid_settings();
    settings.api.base_url.clear();
    assert_eq!(settings.validate(), Err(ConfigError::MissingBaseUrl));
}

#[test]
fn test_validate_rejects_bad_values() {
    let mut settings = valid_settings();
    settings.api.base_url = "example.sentinelone.net".to_string();
    assert!(matches!(settings.validate(), Err(ConfigError::InvalidBaseUrl(_))));

    let mut settings = valid_settings();
    settings.api.page_limit = 0;
    assert_eq!(settings.validate(), Err(ConfigError::InvalidPageLimit(0)));

    let mut settings = valid_settings();
    settings.runner.thread_percentage = 150;
    assert_eq!(settings.validate(), Err(ConfigError::InvalidThreadPercentage(150)));
}

#[test]
fn test_token_masking() {
    assert_eq!(mask_token(""), "");
    assert_eq!(mask_token("short"), "*****");
    assert_eq!(mask_token("abcdefghijklmnop"), "************mnop");

    let redacted = valid_settings().redacted();
    assert!(!redacted.api.token.contains("abcd"));
}

#[test]
fn test_embedded_defaults_match_struct_defaults() {
    let from_file: Settings = toml::from_str(DEFAULT_CONFIG).unwrap();
    let from_code = Settings::default();

    assert_eq!(from_file.api.timeout_secs, from_code.api.timeout_secs);
    assert_eq!(from_file.api.page_limit, from_code.api.page_limit);
    assert_eq!(from_file.runner.workers, from_code.runner.workers);
    assert_eq!(from_file.runner.thread_percentage, from_code.runner.thread_percentage);
    assert_eq!(from_file.display.site_rows, from_code.display.site_rows);
}
