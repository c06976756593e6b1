/* src/tools/domains.rs */

use crate::pihole::DomainStat;
use crate::tools::{Registry, ToolError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TopDomainsResponse {
    pub total_domains: usize,
    pub domains: Vec<DomainStat>,
}

impl Registry {
    pub(crate) async fn top_domains(&self) -> Result<TopDomainsResponse, ToolError> {
        let domains = self
            .pihole
            .top_domains()
            .await
            .map_err(ToolError::pihole("Failed to get top domains"))?;

        Ok(TopDomainsResponse {
            total_domains: domains.len(),
            domains,
        })
    }
}
