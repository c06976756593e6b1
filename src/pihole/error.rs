/* src/pihole/error.rs */

use std::fmt;
use thiserror::Error;

/// A non-2xx answer from the Pi-hole API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    pub status: u16,
    pub status_text: String,
    pub body: String,
    pub method: &'static str,
    pub url: String,
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {} {}", self.status, self.status_text)?;
        if !self.body.is_empty() {
            write!(f, ": {}", self.body)?;
        }
        Ok(())
    }
}

impl std::error::Error for HttpError {}

#[derive(Debug, Error)]
pub enum PiHoleError {
    #[error("base URL is empty")]
    EmptyBaseUrl,
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("failed to execute {method} request to {url}: {source}")]
    Transport {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl PiHoleError {
    /// HTTP status of the upstream answer, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            PiHoleError::Http(e) => Some(e.status),
            _ => None,
        }
    }
}
