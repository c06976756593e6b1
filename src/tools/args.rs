/* src/tools/args.rs */

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

pub const TOP_ACTIVE_CLIENTS: &str = "get_top_active_clients";
pub const TOP_DOMAINS_FOR_CLIENT: &str = "get_top_domains_for_client";
pub const TOP_DOMAINS: &str = "get_top_domains";
pub const DOMAIN_DNS_RECORDS: &str = "get_domain_dns_records";
pub const DOMAIN_WHOIS: &str = "get_domain_whois";

/// Inclusive numeric range with the value used when the field is absent.
#[derive(Debug, Clone, Copy)]
pub struct Bounded {
    pub min: u32,
    pub max: u32,
    pub default: u32,
}

impl Bounded {
    /// Clamps into `[min, max]`; fractions are truncated.
    pub fn apply(&self, value: Option<f64>) -> u32 {
        match value {
            None => self.default,
            Some(v) if v.is_nan() => self.min,
            Some(v) => v.clamp(self.min as f64, self.max as f64) as u32,
        }
    }
}

pub const COUNT: Bounded = Bounded {
    min: 1,
    max: 100,
    default: 10,
};

/// One week at most.
pub const HOURS: Bounded = Bounded {
    min: 1,
    max: 168,
    default: 24,
};

#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error("Failed to parse arguments: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TopClientsArgs {
    #[serde(default)]
    count: Option<f64>,
}

impl TopClientsArgs {
    pub fn count(&self) -> u32 {
        COUNT.apply(self.count)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ClientDomainsArgs {
    #[serde(default)]
    client_ip: Option<String>,
    #[serde(default)]
    hours: Option<f64>,
    #[serde(default)]
    count: Option<f64>,
}

impl ClientDomainsArgs {
    pub fn client_ip(&self) -> Result<&str, ArgumentError> {
        required(&self.client_ip, "client_ip")
    }

    pub fn hours(&self) -> u32 {
        HOURS.apply(self.hours)
    }

    pub fn count(&self) -> u32 {
        COUNT.apply(self.count)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TopDomainsArgs {}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DomainArgs {
    #[serde(default)]
    domain: Option<String>,
}

impl DomainArgs {
    pub fn domain(&self) -> Result<&str, ArgumentError> {
        required(&self.domain, "domain")
    }
}

/// A tool invocation with its arguments decoded into the tool's own type.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    TopActiveClients(TopClientsArgs),
    TopDomainsForClient(ClientDomainsArgs),
    TopDomains(TopDomainsArgs),
    DnsRecords(DomainArgs),
    Whois(DomainArgs),
}

impl ToolCall {
    /// Decodes `arguments` for tool `name`. Absent or `null` arguments
    /// decode like an empty object.
    pub fn decode(name: &str, arguments: Option<Value>) -> Result<Self, ArgumentError> {
        let arguments = match arguments {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(value) => value,
        };

        match name {
            TOP_ACTIVE_CLIENTS => Ok(Self::TopActiveClients(parse(arguments)?)),
            TOP_DOMAINS_FOR_CLIENT => Ok(Self::TopDomainsForClient(parse(arguments)?)),
            TOP_DOMAINS => Ok(Self::TopDomains(parse(arguments)?)),
            DOMAIN_DNS_RECORDS => Ok(Self::DnsRecords(parse(arguments)?)),
            DOMAIN_WHOIS => Ok(Self::Whois(parse(arguments)?)),
            other => Err(ArgumentError::UnknownTool(other.to_string())),
        }
    }
}

fn parse<T: DeserializeOwned>(arguments: Value) -> Result<T, ArgumentError> {
    serde_json::from_value(arguments).map_err(ArgumentError::Malformed)
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, ArgumentError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ArgumentError::Missing(field))
}
