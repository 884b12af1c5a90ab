//! Config subcommand handlers.

use dialoguer::{Confirm, Input, Password, Select};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use imatrix_api::{Credentials, TransportConfig, VerifyOutcome};
use imatrix_config::{Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// `Config` as shown by `config show`: plaintext passwords masked.
#[derive(Serialize)]
struct RedactedConfig {
    default_profile: Option<String>,
    defaults: RedactedDefaults,
    profiles: Vec<RedactedProfile>,
}

#[derive(Serialize)]
struct RedactedDefaults {
    output: String,
    timeout: u64,
    poll_interval: u64,
}

#[derive(Serialize)]
struct RedactedProfile {
    name: String,
    email: String,
    password: Option<&'static str>,
    base_url: String,
    tls: String,
    timeout: Option<u64>,
    poll_interval: Option<u64>,
}

impl RedactedConfig {
    fn new(cfg: &Config) -> Self {
        Self {
            default_profile: cfg.default_profile.clone(),
            defaults: RedactedDefaults {
                output: cfg.defaults.output.clone(),
                timeout: cfg.defaults.timeout,
                poll_interval: cfg.defaults.poll_interval,
            },
            profiles: cfg
                .profiles
                .iter()
                .map(|(name, p)| RedactedProfile {
                    name: name.clone(),
                    email: p.email.clone(),
                    password: p.password.as_ref().map(|_| "********"),
                    base_url: p.base_url().to_owned(),
                    tls: format!("{:?}", p.tls()),
                    timeout: p.timeout,
                    poll_interval: p.poll_interval,
                })
                .collect(),
        }
    }

    fn detail(&self, path: &str) -> String {
        let mut lines = vec![
            format!("Config file:     {path}"),
            format!(
                "Default profile: {}",
                self.default_profile.as_deref().unwrap_or("default")
            ),
            format!(
                "Defaults:        output={} timeout={}s poll_interval={}s",
                self.defaults.output, self.defaults.timeout, self.defaults.poll_interval
            ),
        ];
        for p in &self.profiles {
            lines.push(String::new());
            lines.push(format!("[{}]", p.name));
            lines.push(format!("  email:    {}", p.email));
            lines.push(format!(
                "  password: {}",
                p.password.unwrap_or("(keyring or IMATRIX_PASSWORD)")
            ));
            lines.push(format!("  base_url: {}", p.base_url));
            lines.push(format!("  tls:      {}", p.tls));
            if let Some(t) = p.timeout {
                lines.push(format!("  timeout:  {t}s"));
            }
            if let Some(i) = p.poll_interval {
                lines.push(format!("  poll:     {i}s"));
            }
        }
        lines.join("\n")
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global).await,

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = imatrix_config::load_config_or_default();
            let path = imatrix_config::config_path().display().to_string();
            let redacted = RedactedConfig::new(&cfg);
            let out = output::render_single(
                &global.output,
                &redacted,
                |c| c.detail(&path),
                |_| path.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = imatrix_config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: imatrix config init");
            } else {
                for name in cfg.profiles.keys() {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── SetPassword ─────────────────────────────────────────────
        ConfigCommand::SetPassword { profile } => {
            let cfg = imatrix_config::load_config_or_default();
            let profile_name = profile.unwrap_or_else(|| {
                imatrix_config::active_profile_name(global.profile.as_deref(), &cfg)
            });

            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name: profile_name,
                });
            }

            let secret = Password::new()
                .with_prompt("Password")
                .interact()
                .map_err(prompt_err)?;
            let secret = config::non_empty_secret("password", secret)?;

            imatrix_config::store_password(&profile_name, &secret)?;
            eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

// ── Init: interactive wizard ────────────────────────────────────────

async fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = imatrix_config::load_config_or_default();
    let config_path = imatrix_config::config_path();
    eprintln!("iMatrix configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    // 1. Profile name
    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    // 2. Account
    let email: String = Input::new()
        .with_prompt("Account email")
        .interact_text()
        .map_err(prompt_err)?;
    let email = email.trim().to_owned();
    if email.is_empty() {
        return Err(CliError::Validation {
            field: "email".into(),
            reason: "email cannot be empty".into(),
        });
    }

    // One profile per account.
    if let Some((existing, _)) = cfg
        .profiles
        .iter()
        .find(|(name, p)| **name != profile_name && p.email.eq_ignore_ascii_case(&email))
    {
        return Err(CliError::Validation {
            field: "email".into(),
            reason: format!("account already configured in profile '{existing}'"),
        });
    }

    let password = Password::new()
        .with_prompt("Password")
        .interact()
        .map_err(prompt_err)?;
    let password = config::non_empty_secret("password", password)?;

    let base_url: String = Input::new()
        .with_prompt("API base URL")
        .default(imatrix_api::DEFAULT_BASE_URL.into())
        .interact_text()
        .map_err(prompt_err)?;

    // 3. Verify before anything is written
    verify(&base_url, &email, &password, &profile_name, global).await?;
    eprintln!("   ✓ Credentials accepted");

    // 4. Where the password lives
    let store_choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let store_selection = Select::new()
        .with_prompt("Where to store the password?")
        .items(store_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let password_field = if store_selection == 0 {
        imatrix_config::store_password(&profile_name, &password)?;
        eprintln!("   ✓ Password stored in system keyring");
        None
    } else {
        Some(password.expose_secret().to_owned())
    };

    let make_default = cfg.profiles.is_empty()
        || Confirm::new()
            .with_prompt(format!("Make '{profile_name}' the default profile?"))
            .default(true)
            .interact()
            .map_err(prompt_err)?;

    // 5. Build profile and write
    let profile = Profile {
        email,
        password: password_field,
        base_url: (base_url != imatrix_api::DEFAULT_BASE_URL).then_some(base_url),
        ..Profile::default()
    };
    cfg.profiles.insert(profile_name.clone(), profile);
    if make_default {
        cfg.default_profile = Some(profile_name.clone());
    }

    let path = imatrix_config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: imatrix things");
    Ok(())
}

async fn verify(
    base_url: &str,
    email: &str,
    password: &SecretString,
    profile_name: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut transport = TransportConfig::default();
    if let Some(secs) = global.timeout {
        transport.timeout = std::time::Duration::from_secs(secs);
    }
    let credentials = Credentials::new(email, password.clone());

    match imatrix_api::verify_credentials(base_url, &credentials, &transport).await {
        VerifyOutcome::Valid => Ok(()),
        VerifyOutcome::InvalidAuth => Err(CliError::AuthFailed {
            profile: profile_name.into(),
            message: "invalid email or password".into(),
        }),
        VerifyOutcome::CannotConnect(reason) => Err(CliError::ConnectionFailed {
            url: base_url.into(),
            source: reason.into(),
        }),
    }
}
