/* src/tools/mod.rs */

mod args;
mod clients;
mod domains;
mod lookups;

#[cfg(test)]
pub(crate) mod stubs;

pub use args::{
    ArgumentError, Bounded, COUNT, ClientDomainsArgs, DOMAIN_DNS_RECORDS, DOMAIN_WHOIS, DomainArgs,
    HOURS, TOP_ACTIVE_CLIENTS, TOP_DOMAINS, TOP_DOMAINS_FOR_CLIENT, TopClientsArgs, ToolCall,
};

use crate::lookup::{DnsLookup, LookupError, WhoisLookup};
use crate::pihole::{PiHoleApi, PiHoleError};
use fancy_log::{LogLevel, log};
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Argument(#[from] ArgumentError),
    #[error("{context}: {source}")]
    PiHole {
        context: &'static str,
        #[source]
        source: PiHoleError,
    },
    #[error("{context}: {source}")]
    Lookup {
        context: &'static str,
        #[source]
        source: LookupError,
    },
    #[error("Failed to marshal response: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ToolError {
    pub(crate) fn pihole(context: &'static str) -> impl FnOnce(PiHoleError) -> Self {
        move |source| ToolError::PiHole { context, source }
    }

    pub(crate) fn lookup(context: &'static str) -> impl FnOnce(LookupError) -> Self {
        move |source| ToolError::Lookup { context, source }
    }
}

/// Result of one tool call as the agent sees it. Failures are values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    text: String,
    pub is_error: bool,
}

impl ToolOutcome {
    pub fn success(text: String) -> Self {
        Self {
            text,
            is_error: false,
        }
    }

    pub fn error(text: String) -> Self {
        Self {
            text,
            is_error: true,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON Schema object for the arguments.
    pub input_schema: Value,
}

fn bounded_schema(bounds: Bounded, description: &str) -> Value {
    json!({
        "type": "number",
        "description": description,
        "minimum": bounds.min,
        "maximum": bounds.max,
    })
}

fn domain_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "domain": {
                "type": "string",
                "description": "The domain or subdomain to query (e.g., example.com or api.example.com)",
            },
        },
        "required": ["domain"],
    })
}

static DEFINITIONS: Lazy<Vec<ToolDefinition>> = Lazy::new(|| {
    vec![
        ToolDefinition {
            name: TOP_ACTIVE_CLIENTS,
            description: "Get the top N most active clients by DNS query usage from Pi-hole",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "count": bounded_schema(COUNT, "Number of top clients to return (default: 10)"),
                },
            }),
        },
        ToolDefinition {
            name: TOP_DOMAINS_FOR_CLIENT,
            description: "Get the top N most queried domains by a specific client IP address in the last X hours from Pi-hole",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "client_ip": {
                        "type": "string",
                        "description": "The IP address of the client",
                    },
                    "hours": bounded_schema(HOURS, "Number of hours to look back (default: 24, max: 168 for 1 week)"),
                    "count": bounded_schema(COUNT, "Number of top domains to return (default: 10)"),
                },
                "required": ["client_ip"],
            }),
        },
        ToolDefinition {
            name: TOP_DOMAINS,
            description: "Get the top queried domains (both allowed and blocked) from Pi-hole",
            input_schema: json!({
                "type": "object",
                "properties": {},
            }),
        },
        ToolDefinition {
            name: DOMAIN_DNS_RECORDS,
            description: "Get DNS records (A, AAAA, NS, MX, TXT) for a domain. Automatically extracts top-level domain if a subdomain is provided.",
            input_schema: domain_schema(),
        },
        ToolDefinition {
            name: DOMAIN_WHOIS,
            description: "Perform a WHOIS lookup on a domain to get registration information (registrar, creation date, expiration date, registrant details, etc.). Automatically extracts top-level domain if a subdomain is provided.",
            input_schema: domain_schema(),
        },
    ]
});

/// Tool catalog and dispatcher. Holds the shared upstream collaborators.
pub struct Registry {
    pihole: Arc<dyn PiHoleApi>,
    dns: Arc<dyn DnsLookup>,
    whois: Arc<dyn WhoisLookup>,
}

impl Registry {
    pub fn new(
        pihole: Arc<dyn PiHoleApi>,
        dns: Arc<dyn DnsLookup>,
        whois: Arc<dyn WhoisLookup>,
    ) -> Self {
        Self { pihole, dns, whois }
    }

    pub fn definitions(&self) -> &'static [ToolDefinition] {
        &DEFINITIONS
    }

    pub fn has_tool(&self, name: &str) -> bool {
        DEFINITIONS.iter().any(|d| d.name == name)
    }

    /// Runs tool `name`. Never fails: errors come back with `is_error` set.
    pub async fn call(&self, name: &str, arguments: Option<Value>) -> ToolOutcome {
        let raw = arguments
            .as_ref()
            .map_or_else(|| "{}".to_string(), Value::to_string);
        log(
            LogLevel::Info,
            &format!("Tool invoked tool={} arguments={}", name, raw),
        );

        let started = Instant::now();
        let outcome = match self.dispatch(name, arguments).await {
            Ok(text) => ToolOutcome::success(text),
            Err(e) => ToolOutcome::error(e.to_string()),
        };
        let elapsed_ms = started.elapsed().as_millis();

        if outcome.is_error {
            log(
                LogLevel::Error,
                &format!(
                    "Tool execution failed tool={} elapsed_ms={} error={:?}",
                    name,
                    elapsed_ms,
                    outcome.text()
                ),
            );
        } else {
            log(
                LogLevel::Info,
                &format!(
                    "Tool executed successfully tool={} elapsed_ms={}",
                    name, elapsed_ms
                ),
            );
        }
        outcome
    }

    async fn dispatch(&self, name: &str, arguments: Option<Value>) -> Result<String, ToolError> {
        match ToolCall::decode(name, arguments)? {
            ToolCall::TopActiveClients(args) => render(&self.top_active_clients(&args).await?),
            ToolCall::TopDomainsForClient(args) => {
                render(&self.top_domains_for_client(&args).await?)
            }
            ToolCall::TopDomains(_) => render(&self.top_domains().await?),
            ToolCall::DnsRecords(args) => render(&self.dns_records(&args).await?),
            ToolCall::Whois(args) => render(&self.whois_lookup(&args).await?),
        }
    }
}

fn render<T: Serialize>(response: &T) -> Result<String, ToolError> {
    Ok(serde_json::to_string_pretty(response)?)
}
