//! Credential check, the same login a setup flow runs before saving.

use imatrix_api::VerifyOutcome;
use imatrix_core::HubConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub async fn handle(hub_config: &HubConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let url = hub_config.base_url.to_string();
    let outcome = imatrix_api::verify_credentials(
        &url,
        &hub_config.credentials(),
        &hub_config.transport(),
    )
    .await;

    match outcome {
        VerifyOutcome::Valid => {
            if !global.quiet {
                eprintln!("✓ Logged in as {}", hub_config.email);
            }
            Ok(())
        }
        VerifyOutcome::InvalidAuth => Err(CliError::AuthFailed {
            profile: global.profile.clone().unwrap_or_else(|| "default".into()),
            message: "invalid email or password".into(),
        }),
        VerifyOutcome::CannotConnect(reason) => Err(CliError::ConnectionFailed {
            url,
            source: reason.into(),
        }),
    }
}
