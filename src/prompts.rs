/* src/prompts.rs */

use std::collections::HashMap;
use thiserror::Error;

pub const DOMAIN_OSINT: &str = "domain-osint";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("unknown prompt: {0}")]
    UnknownPrompt(String),
    #[error("{0} argument is required")]
    MissingArgument(&'static str),
}

#[derive(Debug, Clone)]
pub struct PromptArgument {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

#[derive(Debug, Clone)]
pub struct PromptDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub arguments: Vec<PromptArgument>,
}

/// A prompt ready to be sent as a single user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub description: String,
    pub text: String,
}

pub fn definitions() -> Vec<PromptDefinition> {
    vec![PromptDefinition {
        name: DOMAIN_OSINT,
        description: "Perform comprehensive Open Source Intelligence (OSINT) gathering on a domain using DNS and WHOIS lookups",
        arguments: vec![PromptArgument {
            name: "domain",
            description: "The domain or subdomain to investigate (e.g., example.com or api.example.com)",
            required: true,
        }],
    }]
}

/// Renders prompt `name` with `arguments`.
pub fn render(
    name: &str,
    arguments: &HashMap<String, String>,
) -> Result<RenderedPrompt, PromptError> {
    match name {
        DOMAIN_OSINT => {
            let domain = arguments
                .get("domain")
                .map(|d| d.trim())
                .filter(|d| !d.is_empty())
                .ok_or(PromptError::MissingArgument("domain"))?;
            Ok(RenderedPrompt {
                description: format!("OSINT analysis prompt for domain: {}", domain),
                text: osint_text(domain),
            })
        }
        other => Err(PromptError::UnknownPrompt(other.to_string())),
    }
}

fn osint_text(domain: &str) -> String {
    format!(
        r#"Perform a thorough Open Source Intelligence (OSINT) investigation of the domain: {domain}

Work through the following steps:

1. **DNS Records**
   - Call the 'get_domain_dns_records' tool for the domain
   - Review each record set:
     * A and AAAA records: where is the domain hosted, and is IPv6 served?
     * NS records: which DNS provider answers for it?
     * MX records: who handles its mail?
     * TXT records: SPF, DKIM, DMARC, site verification tokens and anything unusual

2. **WHOIS Registration**
   - Call the 'get_domain_whois' tool for the domain
   - Review:
     * Creation, update and expiry dates (domain age and renewal state)
     * The registrar managing the domain
     * Registrant organization and country
     * Administrative, technical and billing contacts
     * Status flags such as transfer locks or holds
     * Name servers as listed by the registry

3. **Security and Infrastructure**
   - Name the hosting provider behind the addresses found
   - Note any CDN or DDoS protection in front of the domain
   - Assess the mail security posture from SPF, DKIM and DMARC
   - Note WHOIS privacy or proxy services
   - Point out related domains or shared infrastructure

4. **Risk Indicators**
   - A very recent registration date (common for phishing)
   - Privacy-protected WHOIS data
   - Registrar and hosting locations that do not line up
   - Missing mail security records
   - Suspicious TXT records or DNS setup

5. **Summary**
   Finish with a structured report covering:
   - Ownership and registration timeline
   - Technical infrastructure
   - Security posture
   - Notable findings or red flags
   - Recommendations, if any

Present the findings clearly and keep them organized by section."#
    )
}
