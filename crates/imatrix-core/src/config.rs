// ── Runtime hub configuration ──
//
// These types describe *how* to reach one iMatrix account.
// They carry credential data and polling cadence, but never touch disk.
// The CLI constructs a `HubConfig` and hands it in.

use std::time::Duration;

use imatrix_api::{Credentials, TlsMode, TransportConfig};
use secrecy::SecretString;
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification. Default, matching how the vendor API is consumed.
    #[default]
    DangerAcceptInvalid,
}

/// Configuration for one account.
///
/// Built by the CLI, passed to `Hub`. Core never reads config files.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// API root (e.g., `https://api.imatrixsys.com/api/v1`).
    pub base_url: Url,
    /// Account email.
    pub email: String,
    /// Account password, kept for token refresh.
    pub password: SecretString,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
    /// How often each entity polls its latest value. Zero = never.
    pub poll_interval: Duration,
    /// Delay before retrying a setup that failed for a transient reason.
    pub setup_retry_delay: Duration,
}

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_SETUP_RETRY_DELAY: Duration = Duration::from_secs(30);

impl HubConfig {
    /// Config with default TLS, timeout and cadence.
    pub fn new(base_url: Url, email: impl Into<String>, password: SecretString) -> Self {
        Self {
            base_url,
            email: email.into(),
            password,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            poll_interval: DEFAULT_POLL_INTERVAL,
            setup_retry_delay: DEFAULT_SETUP_RETRY_DELAY,
        }
    }

    /// Account credentials for the API client.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.email.clone(), self.password.clone())
    }

    /// HTTP transport settings for the API client.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        }
    }
}
