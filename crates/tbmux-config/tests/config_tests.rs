// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for configuration loading, validation, and endpoint
//! derivation.

use tbmux_config::{load_config_from_str, validate_config, Endpoints, TbmuxConfig};

const FULL_CONFIG: &str = r#"
db = "/var/lib/tbmux/updates.db"

[upstream]
api_url = "https://api.telegram.org/bot"
auth_token = "123456:ABC-DEF"
polling_timeout = 50
max_retry_interval = 120
filter_update_types = ["message", "edited_message"]

[downstream]
listen_addr = "0.0.0.0:8081"
api_path = "/bot"
auth_token = "downstream-secret"
"#;

#[test]
fn full_config_parses_and_validates() {
    let config = load_config_from_str(FULL_CONFIG).unwrap();
    assert_eq!(config.db, "/var/lib/tbmux/updates.db");
    assert_eq!(config.upstream.polling_timeout, 50);
    assert_eq!(config.upstream.max_retry_interval, 120);
    assert_eq!(
        config.upstream.filter_update_types,
        vec!["message", "edited_message"]
    );
    assert_eq!(config.downstream.listen_addr, "0.0.0.0:8081");
    assert!(validate_config(&config).is_ok());
}

#[test]
fn defaults_fill_optional_fields() {
    let config = load_config_from_str(
        r#"
[upstream]
auth_token = "123:abc"

[downstream]
listen_addr = "127.0.0.1:8081"
auth_token = "secret"
"#,
    )
    .unwrap();
    assert_eq!(config.db, "tbmux.db");
    assert_eq!(config.upstream.api_url, "https://api.telegram.org/bot");
    assert_eq!(config.upstream.polling_timeout, 60);
    assert_eq!(config.upstream.max_retry_interval, 600);
    assert!(config.upstream.filter_update_types.is_empty());
    assert_eq!(config.downstream.api_path, "/bot");
    assert!(validate_config(&config).is_ok());
}

#[test]
fn unknown_keys_are_rejected() {
    let result = load_config_from_str(
        r#"
[upstream]
auth_tokne = "typo"
"#,
    );
    assert!(result.is_err());
}

#[test]
fn empty_config_fails_validation_not_parsing() {
    let config = load_config_from_str("").unwrap();
    let errors = validate_config(&config).unwrap_err();
    assert!(errors.len() >= 3, "expected several missing fields: {errors:?}");
}

#[test]
fn endpoints_resolve_from_full_config() {
    let config = load_config_from_str(FULL_CONFIG).unwrap();
    let endpoints = Endpoints::resolve(&config).unwrap();
    assert_eq!(
        endpoints.api_prefix,
        "https://api.telegram.org/bot123456:ABC-DEF"
    );
    assert_eq!(
        endpoints.file_prefix,
        "https://api.telegram.org/file/bot123456:ABC-DEF"
    );
    assert_eq!(endpoints.api_segments, vec!["", "bot"]);
    assert_eq!(endpoints.file_segments, vec!["", "file", "bot"]);
    assert_eq!(
        endpoints.allowed_updates,
        "%5B%22message%22%2C%22edited_message%22%5D"
    );
}

#[test]
fn default_config_struct_matches_documented_defaults() {
    let config = TbmuxConfig::default();
    assert_eq!(config.db, "tbmux.db");
    assert_eq!(config.upstream.api_url, "https://api.telegram.org/bot");
    assert!(config.upstream.file_url.is_none());
    assert_eq!(config.upstream.polling_timeout, 60);
    assert_eq!(config.upstream.max_retry_interval, 600);
    assert_eq!(config.downstream.api_path, "/bot");
}
