// ── Core error types ──
//
// User-facing errors from imatrix-core. These are NOT API-specific --
// consumers never see raw reqwest errors or JSON parse failures directly.
// The `From<imatrix_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to iMatrix API at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Token expired and could not be refreshed")]
    TokenExpired,

    #[error("Request to iMatrix API timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Malformed response from iMatrix API: {message}")]
    MalformedResponse { message: String },

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Entity not found: {unique_id}")]
    EntityNotFound { unique_id: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Setup failed for a reason that may clear on its own; the caller
    /// should try again later instead of asking for new credentials.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. }
            | Self::Timeout
            | Self::TokenExpired
            | Self::MalformedResponse { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The account credentials were rejected.
    pub fn requires_reconfiguration(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<imatrix_api::Error> for CoreError {
    fn from(err: imatrix_api::Error) -> Self {
        match err {
            imatrix_api::Error::InvalidCredentials => CoreError::AuthenticationFailed {
                message: "invalid email or password".into(),
            },
            imatrix_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            imatrix_api::Error::TokenExpired => CoreError::TokenExpired,
            imatrix_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                }
            }
            imatrix_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            imatrix_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            imatrix_api::Error::Api { status, message } => CoreError::Api { status, message },
            imatrix_api::Error::Deserialization { message, body: _ } => {
                CoreError::MalformedResponse { message }
            }
        }
    }
}
