//! Translation from profiles + global flags to `imatrix_core::HubConfig`.
//!
//! File handling and credential lookup live in `imatrix_config`; this
//! module only layers the command-line overrides on top.

use std::time::Duration;

use secrecy::SecretString;

use imatrix_config::{Config, Profile};
use imatrix_core::{HubConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Comma-separated profile names, or `(none)`.
pub fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Build a `HubConfig` from the config file, the active profile and the
/// global flags (flag > env > profile > defaults).
pub fn build_hub_config(global: &GlobalOpts) -> Result<HubConfig, CliError> {
    let cfg = imatrix_config::load_config_or_default();
    let profile_name = imatrix_config::active_profile_name(global.profile.as_deref(), &cfg);

    let profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }
        // No profile at all: flags and env vars must carry the account.
        None if global.email.is_some() => Profile::default(),
        None => {
            return Err(CliError::NoConfig {
                path: imatrix_config::config_path().display().to_string(),
            });
        }
    };

    let profile = apply_overrides(profile, global);
    let mut hub = imatrix_config::profile_to_hub_config(&profile, &profile_name, &cfg.defaults)?;
    if global.insecure {
        hub.tls = TlsVerification::DangerAcceptInvalid;
    }
    Ok(hub)
}

fn apply_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(ref email) = global.email {
        profile.email.clone_from(email);
    }
    if let Some(ref url) = global.base_url {
        profile.base_url = Some(url.clone());
    }
    if let Some(secs) = global.timeout {
        profile.timeout = Some(secs);
    }
    profile
}

/// Replace the per-entity poll interval, if one was given.
pub fn with_poll_interval(mut hub: HubConfig, secs: Option<u64>) -> Result<HubConfig, CliError> {
    if let Some(secs) = secs {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "interval".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        hub.poll_interval = Duration::from_secs(secs);
    }
    Ok(hub)
}

/// Prompted secrets are rejected when blank.
pub fn non_empty_secret(field: &str, value: String) -> Result<SecretString, CliError> {
    if value.is_empty() {
        return Err(CliError::Validation {
            field: field.into(),
            reason: "value cannot be empty".into(),
        });
    }
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["imatrix"];
        argv.extend_from_slice(args);
        argv.push("things");
        Cli::parse_from(argv).global
    }

    #[test]
    fn flags_override_profile_fields() {
        let base = Profile {
            email: "file@example.com".into(),
            base_url: Some("https://file.example.com/api/v1".into()),
            timeout: Some(5),
            ..Profile::default()
        };
        let g = global(&[
            "--email",
            "flag@example.com",
            "--base-url",
            "https://flag.example.com/api/v1",
            "--timeout",
            "9",
        ]);

        let merged = apply_overrides(base, &g);
        assert_eq!(merged.email, "flag@example.com");
        assert_eq!(merged.base_url(), "https://flag.example.com/api/v1");
        assert_eq!(merged.timeout, Some(9));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let hub = HubConfig::new(
            "https://api.imatrixsys.com/api/v1".parse().unwrap(),
            "me@example.com",
            SecretString::from("pw"),
        );
        assert!(matches!(
            with_poll_interval(hub, Some(0)),
            Err(CliError::Validation { .. })
        ));
    }
}
