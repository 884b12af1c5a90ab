// Token-based authentication
//
// `POST /login` exchanges email + password for an opaque token that every
// other endpoint expects in the `x-auth-token` header. The token lives in a
// `TokenStore` shared by all callers of one client; a refresh is just
// another login whose result overwrites the previous token.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use url::Url;

use crate::client::{ImatrixClient, preview};
use crate::error::Error;
use crate::transport::TransportConfig;

/// Account credentials, kept for the client's lifetime so the token can be
/// refreshed without asking the user again.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: SecretString) -> Self {
        Self {
            email: email.into(),
            password,
        }
    }
}

/// Holder for the current bearer token.
///
/// Writers replace the whole token in one pointer swap, so readers see
/// either the old token or the new one. Concurrent refreshes are
/// last-writer-wins: tokens minted for the same credentials are
/// interchangeable.
#[derive(Debug, Default)]
pub struct TokenStore {
    current: ArcSwapOption<SecretString>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current token, if a login has succeeded.
    pub fn get(&self) -> Option<Arc<SecretString>> {
        self.current.load_full()
    }

    /// Install a freshly issued token, returning the stored handle.
    pub fn replace(&self, token: SecretString) -> Arc<SecretString> {
        let token = Arc::new(token);
        self.current.store(Some(Arc::clone(&token)));
        token
    }

    pub fn clear(&self) {
        self.current.store(None);
    }
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
}

/// Perform the credential exchange and return the issued token.
///
/// A 401 maps to [`Error::InvalidCredentials`]; any other non-success
/// status, an unparseable body, or a body without `token` maps to
/// [`Error::Authentication`]. Transport failures stay transport failures.
async fn exchange(
    http: &reqwest::Client,
    url: Url,
    credentials: &Credentials,
) -> Result<SecretString, Error> {
    debug!("logging in at {}", url);

    let body = json!({
        "email": credentials.email,
        "password": credentials.password.expose_secret(),
    });

    let resp = http.post(url).json(&body).send().await?;

    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Error::InvalidCredentials);
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Authentication {
            message: format!("login failed (HTTP {status}): {}", preview(&body)),
        });
    }

    let body = resp.text().await?;
    let token = serde_json::from_str::<LoginResponse>(&body)
        .ok()
        .and_then(|r| r.token)
        .filter(|t| !t.is_empty());

    token.map(SecretString::from).ok_or_else(|| Error::Authentication {
        message: "login response did not contain a token".into(),
    })
}

impl ImatrixClient {
    /// Authenticate with the account credentials and store the token.
    ///
    /// `POST /login` with `{"email", "password"}`. The returned handle is
    /// the same token every subsequent request will send.
    pub async fn login(&self) -> Result<Arc<SecretString>, Error> {
        let url = self.url(&["login"])?;
        let token = exchange(self.http(), url, self.credentials()).await?;
        info!(email = %self.credentials().email, "login successful");
        Ok(self.token_store().replace(token))
    }

    /// Re-run the credential exchange after the API rejected the token.
    ///
    /// Never propagates: a `None` tells the caller to abandon the current
    /// operation, not the whole session.
    pub async fn refresh(&self) -> Option<Arc<SecretString>> {
        match self.login().await {
            Ok(token) => {
                debug!("token refreshed");
                Some(token)
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed");
                None
            }
        }
    }

    /// Drop the stored token. The next authenticated call will be rejected
    /// and trigger a refresh.
    pub fn logout(&self) {
        self.token_store().clear();
        debug!("token cleared");
    }
}

// ── Credential verification ──────────────────────────────────────────

/// Outcome of a one-off credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Valid,
    /// Credentials rejected, or the API answered without a token.
    InvalidAuth,
    /// The API could not be reached at all.
    CannotConnect(String),
}

/// Check a set of credentials without keeping a session.
///
/// Builds a throwaway client, attempts one login, and classifies the
/// result the way a setup form would report it.
pub async fn verify_credentials(
    base_url: &str,
    credentials: &Credentials,
    transport: &TransportConfig,
) -> VerifyOutcome {
    let client = match ImatrixClient::new(base_url, credentials.clone(), transport) {
        Ok(c) => c,
        Err(e) => return VerifyOutcome::CannotConnect(e.to_string()),
    };

    match client.login().await {
        Ok(_) => VerifyOutcome::Valid,
        Err(e) if e.is_auth_failure() => {
            warn!(error = %e, "credential check rejected");
            VerifyOutcome::InvalidAuth
        }
        Err(e) => VerifyOutcome::CannotConnect(e.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn token_store_last_writer_wins() {
        let store = TokenStore::new();
        assert!(store.get().is_none());

        store.replace(SecretString::from("first".to_string()));
        let held = store.get().unwrap();
        store.replace(SecretString::from("second".to_string()));

        // Earlier readers keep their snapshot; new readers see the replacement.
        assert_eq!(held.expose_secret(), "first");
        assert_eq!(store.get().unwrap().expose_secret(), "second");

        store.clear();
        assert!(store.get().is_none());
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let creds = Credentials::new("a@b.c", SecretString::from("hunter2".to_string()));
        let dbg = format!("{creds:?}");
        assert!(dbg.contains("a@b.c"));
        assert!(!dbg.contains("hunter2"));
    }
}
