/* src/lookup/whois.rs */

use crate::lookup::LookupError;
use async_trait::async_trait;
use fancy_log::{LogLevel, log};
use serde::Serialize;
use std::time::Duration;
use whois_service::{ParsedWhoisData, WhoisClient, WhoisResponse};

const NOT_FOUND_MARKERS: &[&str] = &[
    "no match for",
    "not found",
    "no data found",
    "no entries found",
    "no matching record",
    "status: free",
    "status: available",
];

/// Registration details of a domain. Empty fields are left out of the
/// serialized form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WhoisRecord {
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois_server: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub status: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub name_servers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrant_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrant_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_days_ago: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_days_ago: Option<i64>,
    /// Negative once the registration has lapsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_days: Option<i64>,
}

impl WhoisRecord {
    fn has_registration_data(&self) -> bool {
        !self.status.is_empty()
            || !self.name_servers.is_empty()
            || self.created_date.is_some()
            || self.expiration_date.is_some()
            || self.registrar_name.is_some()
    }
}

#[async_trait]
pub trait WhoisLookup: Send + Sync {
    /// Registration details of `domain`, queried as given.
    async fn lookup(&self, domain: &str) -> Result<WhoisRecord, LookupError>;
}

/// Registry WHOIS backed by `whois-service`, which discovers the
/// authoritative server per TLD and parses its answer.
pub struct RegistryWhoisClient {
    client: WhoisClient,
    timeout: Duration,
}

impl RegistryWhoisClient {
    pub async fn connect(timeout: Duration) -> Result<Self, LookupError> {
        let client = WhoisClient::new_without_cache().await?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl WhoisLookup for RegistryWhoisClient {
    async fn lookup(&self, domain: &str) -> Result<WhoisRecord, LookupError> {
        let response = tokio::time::timeout(self.timeout, self.client.lookup(domain))
            .await
            .map_err(|_| LookupError::Timeout(self.timeout))??;
        log(
            LogLevel::Debug,
            &format!(
                "WHOIS {} answered by {} in {}ms",
                domain, response.whois_server, response.query_time_ms
            ),
        );
        into_record(domain, response)
    }
}

/// Keeps what the registry reported, or explains why nothing usable came back.
fn into_record(domain: &str, response: WhoisResponse) -> Result<WhoisRecord, LookupError> {
    let record = response
        .parsed_data
        .map(|parsed| from_parsed(domain, &response.whois_server, parsed))
        .filter(WhoisRecord::has_registration_data);

    match record {
        Some(record) => Ok(record),
        None if response.raw_data.trim().is_empty() => {
            Err(LookupError::EmptyResponse(domain.to_string()))
        }
        None => {
            let lower = response.raw_data.to_lowercase();
            if NOT_FOUND_MARKERS.iter().any(|m| lower.contains(m)) {
                Err(LookupError::NotFound(domain.to_string()))
            } else {
                Err(LookupError::EmptyResponse(domain.to_string()))
            }
        }
    }
}

fn from_parsed(domain: &str, server: &str, parsed: ParsedWhoisData) -> WhoisRecord {
    WhoisRecord {
        domain: domain.to_string(),
        whois_server: non_empty(Some(server.to_string())),
        status: parsed.status,
        name_servers: parsed
            .name_servers
            .into_iter()
            .map(|ns| ns.trim_end_matches('.').to_lowercase())
            .collect(),
        created_date: non_empty(parsed.creation_date),
        updated_date: non_empty(parsed.updated_date),
        expiration_date: non_empty(parsed.expiration_date),
        registrar_name: non_empty(parsed.registrar),
        registrant_name: non_empty(parsed.registrant_name),
        registrant_email: non_empty(parsed.registrant_email),
        admin_email: non_empty(parsed.admin_email),
        technical_email: non_empty(parsed.tech_email),
        created_days_ago: parsed.created_ago,
        updated_days_ago: parsed.updated_ago,
        expires_in_days: parsed.expires_in,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
