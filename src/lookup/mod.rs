/* src/lookup/mod.rs */

mod dns;
mod whois;

pub use dns::{DnsLookup, DnsRecords, UdpDnsClient};
pub use whois::{RegistryWhoisClient, WhoisLookup, WhoisRecord};

use hickory_proto::ProtoError;
use hickory_proto::op::ResponseCode;
use std::time::Duration;
use thiserror::Error;

/// Failures of the DNS and WHOIS collaborators.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("invalid domain {domain:?}: {reason}")]
    InvalidDomain { domain: String, reason: String },
    #[error("could not resolve server address {0}")]
    NoServerAddress(String),
    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("DNS protocol error: {0}")]
    Proto(#[from] ProtoError),
    #[error("DNS server answered {0}")]
    Rcode(ResponseCode),
    #[error("no such domain exists: {0}")]
    NoRecords(String),
    #[error("domain not found: {0}")]
    NotFound(String),
    #[error("empty WHOIS response for {0}")]
    EmptyResponse(String),
    #[error("WHOIS lookup failed: {0}")]
    Whois(#[from] whois_service::WhoisError),
}
