#![allow(clippy::unwrap_used)]
// Round-trip and translation tests for config files on disk.

use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;

use imatrix_config::{
    Config, ConfigError, Profile, load_config_from, profile_to_hub_config, save_config_to,
};
use imatrix_core::TlsVerification;

fn profile(email: &str) -> Profile {
    Profile {
        email: email.into(),
        password: Some("plain-s3cret".into()),
        ..Profile::default()
    }
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(cfg.default_profile.as_deref(), Some("default"));
    assert_eq!(cfg.defaults.output, "table");
    assert_eq!(cfg.defaults.timeout, 30);
    assert_eq!(cfg.defaults.poll_interval, 30);
    assert!(cfg.profiles.is_empty());
}

#[test]
fn test_save_then_load_round_trips_profiles() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut cfg = Config::default();
    let mut fleet = profile("fleet@example.com");
    fleet.base_url = Some("https://staging.imatrixsys.com/api/v1".into());
    fleet.poll_interval = Some(60);
    cfg.profiles.insert("fleet".into(), fleet);
    cfg.default_profile = Some("fleet".into());

    save_config_to(&cfg, &path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("[profiles.fleet]"), "unexpected TOML:\n{text}");
    assert!(!text.contains("ca_cert"), "unset options must not be written");

    let loaded = load_config_from(&path).unwrap();
    assert_eq!(loaded.default_profile.as_deref(), Some("fleet"));
    let fleet = &loaded.profiles["fleet"];
    assert_eq!(fleet.email, "fleet@example.com");
    assert_eq!(fleet.base_url(), "https://staging.imatrixsys.com/api/v1");
    assert_eq!(fleet.poll_interval, Some(60));
}

#[test]
fn test_partial_file_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[profiles.home]\nemail = \"me@example.com\"\ninsecure = false\n",
    )
    .unwrap();

    let cfg = load_config_from(&path).unwrap();
    assert_eq!(cfg.defaults.timeout, 30);
    assert_eq!(cfg.profiles["home"].tls(), TlsVerification::SystemDefaults);
}

#[test]
fn test_profile_translates_to_hub_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[defaults]\ntimeout = 12\n\n[profiles.home]\nemail = \"me@example.com\"\n\
         password = \"plain-s3cret\"\npoll_interval = 5\n",
    )
    .unwrap();
    let cfg = load_config_from(&path).unwrap();

    let hub = profile_to_hub_config(&cfg.profiles["home"], "home", &cfg.defaults).unwrap();

    assert_eq!(hub.base_url.as_str(), "https://api.imatrixsys.com/api/v1");
    assert_eq!(hub.email, "me@example.com");
    assert!(!hub.password.expose_secret().is_empty());
    assert_eq!(hub.timeout, Duration::from_secs(12));
    assert_eq!(hub.poll_interval, Duration::from_secs(5));
    assert_eq!(hub.tls, TlsVerification::DangerAcceptInvalid);
}

#[test]
fn test_invalid_base_url_is_validation_error() {
    let mut bad = profile("me@example.com");
    bad.base_url = Some("not a url".into());

    let err = profile_to_hub_config(&bad, "bad", &Config::default().defaults).unwrap_err();
    assert!(
        matches!(err, ConfigError::Validation { ref field, .. } if field == "base_url"),
        "got: {err:?}"
    );
}

#[test]
fn test_missing_email_is_validation_error() {
    let err = profile_to_hub_config(&profile("  "), "blank", &Config::default().defaults)
        .unwrap_err();
    assert!(
        matches!(err, ConfigError::Validation { ref field, .. } if field == "email"),
        "got: {err:?}"
    );
}
