/* src/pihole/auth.rs */

use crate::pihole::client::PiHoleClient;
use crate::pihole::error::PiHoleError;
use fancy_log::{LogLevel, log};
use serde::{Deserialize, Serialize};

const LOGIN_ENDPOINT: &str = "auth";

#[derive(Serialize)]
struct AuthRequest<'a> {
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    session: SessionInfo,
}

#[derive(Debug, Deserialize)]
struct SessionInfo {
    valid: bool,
    #[serde(default)]
    sid: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl PiHoleClient {
    /// Exchanges the password for a session token. A Pi-hole without a
    /// password answers `valid` with no `sid`; the token is then empty and
    /// no session header is sent.
    pub(crate) async fn obtain_session_id(&self, password: &str) -> Result<String, PiHoleError> {
        let response: AuthResponse = self
            .post_json(LOGIN_ENDPOINT, &AuthRequest { password })
            .await?;

        if !response.session.valid {
            return Err(PiHoleError::Authentication(
                response
                    .session
                    .message
                    .unwrap_or_else(|| "invalid credentials".to_string()),
            ));
        }

        log(
            LogLevel::Info,
            "Obtained a new Pi-hole session token successfully.",
        );
        Ok(response.session.sid.unwrap_or_default())
    }
}
