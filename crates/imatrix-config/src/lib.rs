//! Shared configuration for iMatrix tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `imatrix_core::HubConfig`. The CLI layers its
//! global-flag overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use imatrix_core::{HubConfig, TlsVerification};

/// Prefix for every environment override.
pub const ENV_PREFIX: &str = "IMATRIX_";
/// Environment variable holding the account password.
pub const PASSWORD_ENV: &str = "IMATRIX_PASSWORD";
/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "IMATRIX_CONFIG";
/// Keyring service name; entries are keyed `<profile>/password`.
pub const KEYRING_SERVICE: &str = "imatrix";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Seconds between polls of each entity.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_poll_interval() -> u64 {
    imatrix_core::DEFAULT_POLL_INTERVAL.as_secs()
}

/// One iMatrix account.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Account email.
    pub email: String,

    /// Password (plaintext; prefer keyring or `IMATRIX_PASSWORD`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// API root, defaults to the hosted service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Accept invalid TLS certificates. Unset means yes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Path to a custom CA certificate; enables verification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<u64>,
}

impl Profile {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(imatrix_api::DEFAULT_BASE_URL)
    }

    /// TLS mode: a CA file wins, then an explicit `insecure = false`,
    /// otherwise invalid certificates are accepted.
    pub fn tls(&self) -> TlsVerification {
        if let Some(ref ca) = self.ca_cert {
            TlsVerification::CustomCa(ca.clone())
        } else if self.insecure == Some(false) {
            TlsVerification::SystemDefaults
        } else {
            TlsVerification::DangerAcceptInvalid
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `IMATRIX_CONFIG`, then platform
/// conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "imatrix", "imatrix").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("imatrix");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from a specific file (missing file = defaults) + environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file is missing or invalid.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Profile resolution ──────────────────────────────────────────────

/// Explicit name, then the config's default, then `default`.
pub fn active_profile_name(explicit: Option<&str>, config: &Config) -> String {
    explicit
        .map(ToOwned::to_owned)
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
}

/// Resolve the password: `IMATRIX_PASSWORD`, then the system keyring,
/// then plaintext in the profile.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    let from_env = std::env::var(PASSWORD_ENV).ok();
    let from_keyring = || {
        keyring_entry(profile_name)
            .and_then(|entry| entry.get_password())
            .ok()
    };
    pick_password(from_env, from_keyring, profile.password.as_deref()).ok_or_else(|| {
        ConfigError::NoCredentials {
            profile: profile_name.into(),
        }
    })
}

/// First non-empty source wins. The keyring is only consulted when the
/// environment has nothing.
fn pick_password(
    from_env: Option<String>,
    from_keyring: impl FnOnce() -> Option<String>,
    plaintext: Option<&str>,
) -> Option<SecretString> {
    from_env
        .filter(|s| !s.is_empty())
        .or_else(|| from_keyring().filter(|s| !s.is_empty()))
        .or_else(|| plaintext.filter(|s| !s.is_empty()).map(ToOwned::to_owned))
        .map(SecretString::from)
}

/// Store a password in the system keyring for a profile.
pub fn store_password(profile_name: &str, password: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password.expose_secret())?;
    Ok(())
}

// ── HubConfig translation ───────────────────────────────────────────

/// Build a `HubConfig` from a profile, with no CLI overrides.
pub fn profile_to_hub_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<HubConfig, ConfigError> {
    let raw_url = profile.base_url();
    let url: url::Url = raw_url.parse().map_err(|_| ConfigError::Validation {
        field: "base_url".into(),
        reason: format!("invalid URL: {raw_url}"),
    })?;

    if profile.email.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "email".into(),
            reason: format!("profile '{profile_name}' has no email"),
        });
    }

    let password = resolve_password(profile, profile_name)?;

    let mut hub = HubConfig::new(url, profile.email.clone(), password);
    hub.tls = profile.tls();
    hub.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    hub.poll_interval =
        Duration::from_secs(profile.poll_interval.unwrap_or(defaults.poll_interval));
    Ok(hub)
}
