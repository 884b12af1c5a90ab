//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use imatrix_config::ConfigError;
use imatrix_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to the iMatrix API at {url}")]
    #[diagnostic(
        code(imatrix::connection_failed),
        help(
            "Check network access to the API.\n\
             URL: {url}\n\
             Override it with --base-url or base_url in your profile."
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Request timed out")]
    #[diagnostic(
        code(imatrix::timeout),
        help("Increase the timeout with --timeout or check API responsiveness.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(imatrix::auth_failed),
        help(
            "Verify the account email and password.\n\
             Run: imatrix config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(imatrix::no_credentials),
        help(
            "Configure credentials with: imatrix config init\n\
             Or set the IMATRIX_EMAIL and IMATRIX_PASSWORD environment variables."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(imatrix::not_found),
        help("Run: imatrix {list_command} to see what is available")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error (HTTP {status}): {message}")]
    #[diagnostic(code(imatrix::api_error))]
    ApiError { status: u16, message: String },

    #[error("Unexpected response from the iMatrix API: {message}")]
    #[diagnostic(
        code(imatrix::malformed_response),
        help("The API may be under maintenance. Try again later.")
    )]
    MalformedResponse { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(imatrix::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(imatrix::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: imatrix config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(imatrix::no_config),
        help(
            "Create one with: imatrix config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(imatrix::config))]
    Config(Box<ConfigError>),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "current".into(),
                message,
            },
            CoreError::TokenExpired => CliError::AuthFailed {
                profile: "current".into(),
                message: "session token was rejected and could not be refreshed".into(),
            },
            CoreError::Timeout => CliError::Timeout,
            CoreError::MalformedResponse { message } => CliError::MalformedResponse { message },
            CoreError::Api { status, message } => CliError::ApiError { status, message },
            CoreError::EntityNotFound { unique_id } => CliError::NotFound {
                resource_type: "entity".into(),
                identifier: unique_id,
                list_command: "entities".into(),
            },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        let auth = CliError::from(CoreError::AuthenticationFailed {
            message: "invalid email or password".into(),
        });
        assert_eq!(auth.exit_code(), exit_code::AUTH);

        let conn = CliError::from(CoreError::ConnectionFailed {
            url: "https://api.imatrixsys.com/api/v1".into(),
            reason: "refused".into(),
        });
        assert_eq!(conn.exit_code(), exit_code::CONNECTION);

        assert_eq!(CliError::from(CoreError::Timeout).exit_code(), exit_code::TIMEOUT);
        assert_eq!(
            CliError::from(ConfigError::NoCredentials {
                profile: "default".into()
            })
            .exit_code(),
            exit_code::AUTH
        );
    }
}
