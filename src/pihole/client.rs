/* src/pihole/client.rs */

use crate::pihole::error::{HttpError, PiHoleError};
use fancy_log::{LogLevel, log};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Header carrying the session token on every authenticated call.
pub(crate) const SESSION_HEADER: &str = "X-FTL-SID";

/// Authenticated Pi-hole API client. The session token is obtained once in
/// [`PiHoleClient::open`] and never refreshed.
pub struct PiHoleClient {
    base_url: String,
    http: reqwest::Client,
    session_id: String,
}

impl PiHoleClient {
    pub async fn open(
        base_url: &str,
        password: &str,
        timeout: Duration,
        tls_insecure: bool,
    ) -> Result<Self, PiHoleError> {
        let base_url = base_url.trim();
        if base_url.is_empty() {
            return Err(PiHoleError::EmptyBaseUrl);
        }
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(tls_insecure)
            .build()
            .map_err(PiHoleError::Client)?;

        let mut client = Self {
            base_url,
            http,
            session_id: String::new(),
        };
        client.session_id = client.obtain_session_id(password).await?;
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn with_session(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.session_id.is_empty() {
            request
        } else {
            request.header(SESSION_HEADER, &self.session_id)
        }
    }

    /// GET `endpoint` with the given query pairs and decode the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, PiHoleError> {
        let url = self.url(endpoint);
        log(LogLevel::Debug, &format!("GET {} {:?}", url, query));
        let response = self
            .with_session(self.http.get(&url).query(query))
            .send()
            .await
            .map_err(|source| PiHoleError::Transport {
                method: "GET",
                url,
                source,
            })?;
        decode("GET", response).await
    }

    /// POST `payload` as JSON to `endpoint` and decode the JSON body.
    pub(crate) async fn post_json<B, T>(&self, endpoint: &str, payload: &B) -> Result<T, PiHoleError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(endpoint);
        log(LogLevel::Debug, &format!("POST {}", url));
        let response = self
            .with_session(self.http.post(&url).json(payload))
            .send()
            .await
            .map_err(|source| PiHoleError::Transport {
                method: "POST",
                url,
                source,
            })?;
        decode("POST", response).await
    }
}

async fn decode<T: DeserializeOwned>(
    method: &'static str,
    response: reqwest::Response,
) -> Result<T, PiHoleError> {
    let status = response.status();
    let url = response.url().to_string();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(HttpError {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
            method,
            url,
        }
        .into());
    }

    response
        .json::<T>()
        .await
        .map_err(|source| PiHoleError::Decode { url, source })
}
