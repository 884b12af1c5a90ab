// iMatrix API HTTP client
//
// Wraps `reqwest::Client` with base-URL joining, `x-auth-token` injection,
// and the refresh-once-on-401 policy shared by every authenticated endpoint.
// Endpoint methods live in `things.rs`; login lives in `auth.rs`.

use reqwest::StatusCode;
use reqwest::header::HeaderValue;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::auth::{Credentials, TokenStore};
use crate::error::Error;
use crate::transport::TransportConfig;

/// Header carrying the bearer token on authenticated requests.
pub const AUTH_HEADER: &str = "x-auth-token";

/// First 200 characters of a response body, for error messages.
pub(crate) fn preview(body: &str) -> &str {
    body.char_indices()
        .nth(200)
        .map_or(body, |(idx, _)| &body[..idx])
}

/// Async client for one iMatrix account.
///
/// Owns the credentials and the current token. One instance is shared
/// (behind an `Arc`) by every consumer of the account, so a refresh
/// performed by one caller is visible to all later requests.
pub struct ImatrixClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
    token: TokenStore,
}

impl ImatrixClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client from a base URL, credentials and transport settings.
    ///
    /// Does not log in; call [`login()`](Self::login) first, or let the first
    /// rejected request trigger it.
    pub fn new(
        base_url: &str,
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self::with_client(http, base_url, credentials))
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, credentials: Credentials) -> Self {
        Self {
            http,
            base_url,
            credentials,
            token: TokenStore::new(),
        }
    }

    /// Ensure the base path ends with `/` so relative joins append
    /// (`.../api/v1/` + `things` → `.../api/v1/things`).
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The API base URL (always ends with `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn email(&self) -> &str {
        &self.credentials.email
    }

    pub(crate) fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The shared token holder.
    pub fn token_store(&self) -> &TokenStore {
        &self.token
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Append path segments to the base URL. Each segment is
    /// percent-encoded on its own, so a serial containing `/` or `?`
    /// stays one segment.
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ── Authenticated requests ───────────────────────────────────────

    /// GET an authenticated endpoint and decode the JSON body.
    ///
    /// A 401 triggers exactly one token refresh and one retry. If the
    /// refresh fails, or the retry is rejected again, the call fails with
    /// [`Error::TokenExpired`].
    pub(crate) async fn get_authed<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(segments)?;

        let resp = self.send_get(&url, query).await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return handle_response(resp).await;
        }

        warn!(%url, "token rejected, refreshing");
        if self.refresh().await.is_none() {
            return Err(Error::TokenExpired);
        }

        let resp = self.send_get(&url, query).await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            warn!(%url, "refreshed token rejected");
            return Err(Error::TokenExpired);
        }
        handle_response(resp).await
    }

    async fn send_get(
        &self,
        url: &Url,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, Error> {
        debug!("GET {url}");

        let mut builder = self.http.get(url.clone());
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(token) = self.token.get() {
            let mut value =
                HeaderValue::from_str(token.expose_secret()).map_err(|e| Error::Authentication {
                    message: format!("token is not a valid header value: {e}"),
                })?;
            value.set_sensitive(true);
            builder = builder.header(AUTH_HEADER, value);
        }

        Ok(builder.send().await?)
    }
}

// ── Response handling ────────────────────────────────────────────────

async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(Error::Api {
            status: status.as_u16(),
            message: if body.is_empty() {
                status.to_string()
            } else {
                preview(&body).to_owned()
            },
        });
    }

    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn client(base: &str) -> ImatrixClient {
        let creds = Credentials::new("user@example.com", SecretString::from("pw".to_string()));
        ImatrixClient::new(base, creds, &TransportConfig::default()).unwrap()
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let c = client("https://api.imatrixsys.com/api/v1");
        assert_eq!(c.base_url().as_str(), "https://api.imatrixsys.com/api/v1/");
        assert_eq!(
            c.url(&["things", "42", "sensors", "last"]).unwrap().as_str(),
            "https://api.imatrixsys.com/api/v1/things/42/sensors/last"
        );
    }

    #[test]
    fn bare_host_joins_at_root() {
        let c = client("http://127.0.0.1:8080");
        assert_eq!(c.url(&["login"]).unwrap().as_str(), "http://127.0.0.1:8080/login");
    }

    #[test]
    fn serial_is_escaped_as_one_segment() {
        let c = client("https://api.imatrixsys.com/api/v1");
        assert_eq!(
            c.url(&["things", "a/b?c#d", "sensors", "last"]).unwrap().as_str(),
            "https://api.imatrixsys.com/api/v1/things/a%2Fb%3Fc%23d/sensors/last"
        );
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "é".repeat(300);
        assert_eq!(preview(&long).chars().count(), 200);
        assert_eq!(preview("short"), "short");
    }
}
