use thiserror::Error;

/// Top-level error type for the `imatrix-api` crate.
///
/// Covers every failure mode of the vendor API: login, token expiry,
/// transport, unexpected statuses, and body decoding.
/// `imatrix-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected with HTTP 401 (wrong email or password).
    #[error("Invalid credentials (HTTP 401)")]
    InvalidCredentials,

    /// Login failed for any other reason (unexpected status, no token in body).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// An authenticated call was still rejected after one token refresh.
    #[error("Token expired -- refresh did not yield a usable token")]
    TokenExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Non-success status on an authenticated endpoint.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the account credentials themselves were rejected.
    /// Retrying cannot help; the user has to reconfigure.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::InvalidCredentials | Self::Authentication { .. })
    }

    /// Returns `true` if this error indicates the token has expired
    /// and the refresh attempt did not recover it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::TokenExpired)
    }

    /// Returns `true` if this is a transient error worth retrying on the
    /// next cycle. Malformed bodies count: the vendor occasionally serves
    /// partial responses.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Deserialization { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
