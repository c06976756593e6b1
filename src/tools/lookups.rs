/* src/tools/lookups.rs */

use crate::domain::normalize;
use crate::lookup::{DnsRecords, WhoisRecord};
use crate::tools::{DomainArgs, Registry, ToolError};

impl Registry {
    pub(crate) async fn dns_records(&self, args: &DomainArgs) -> Result<DnsRecords, ToolError> {
        let domain = args.domain()?;
        self.dns
            .all_records(domain)
            .await
            .map_err(ToolError::lookup("Failed to get DNS records"))
    }

    pub(crate) async fn whois_lookup(&self, args: &DomainArgs) -> Result<WhoisRecord, ToolError> {
        let domain = normalize(args.domain()?);
        self.whois
            .lookup(&domain)
            .await
            .map_err(ToolError::lookup("Failed to perform WHOIS lookup"))
    }
}
