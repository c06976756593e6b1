/* src/tools/clients.rs */

use crate::pihole::{ClientDomainCount, index_by_address, summarize_client_queries};
use crate::tools::{ClientDomainsArgs, Registry, ToolError, TopClientsArgs};
use chrono::{Duration, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ActiveClient {
    pub ip: String,
    pub name: String,
    pub dns_requests_count: u64,
    pub mac_address: Vec<String>,
    pub mac_vendor: String,
    /// Zero when the device is unknown or never queried.
    pub last_request_ago_mins: i64,
}

#[derive(Debug, Serialize)]
pub struct ActiveClientsResponse {
    pub clients: Vec<ActiveClient>,
}

#[derive(Debug, Serialize)]
pub struct ClientDomainsResponse {
    pub client_ip: String,
    pub hours_analyzed: u32,
    pub total_queries: u64,
    pub rejected_queries: u64,
    pub domains: Vec<ClientDomainCount>,
}

impl Registry {
    pub(crate) async fn top_active_clients(
        &self,
        args: &TopClientsArgs,
    ) -> Result<ActiveClientsResponse, ToolError> {
        let stats = self
            .pihole
            .top_clients(args.count())
            .await
            .map_err(ToolError::pihole("Failed to get top active clients"))?;
        let devices = self
            .pihole
            .client_suggestions()
            .await
            .map_err(ToolError::pihole("Failed to get all clients"))?;

        let devices = index_by_address(devices);
        let now = Utc::now();
        let clients = stats
            .clients
            .into_iter()
            .map(|usage| {
                let device = devices.get(&usage.ip);
                let name = usage
                    .name
                    .filter(|n| !n.is_empty())
                    .or_else(|| device.and_then(|d| d.primary_name()))
                    .unwrap_or_default();
                ActiveClient {
                    name,
                    dns_requests_count: usage.count,
                    mac_address: device.map(|d| d.mac_addresses()).unwrap_or_default(),
                    mac_vendor: device
                        .and_then(|d| d.mac_vendor.clone())
                        .unwrap_or_default(),
                    last_request_ago_mins: device
                        .and_then(|d| d.minutes_since_last_query(now))
                        .unwrap_or(0),
                    ip: usage.ip,
                }
            })
            .collect();

        Ok(ActiveClientsResponse { clients })
    }

    pub(crate) async fn top_domains_for_client(
        &self,
        args: &ClientDomainsArgs,
    ) -> Result<ClientDomainsResponse, ToolError> {
        let client_ip = args.client_ip()?;
        let hours = args.hours();
        let cutoff = Utc::now() - Duration::hours(i64::from(hours));

        let records = self
            .pihole
            .client_queries(client_ip, cutoff)
            .await
            .map_err(ToolError::pihole("Failed to get DNS queries for client"))?;
        let summary = summarize_client_queries(&records, args.count() as usize);

        Ok(ClientDomainsResponse {
            client_ip: client_ip.to_string(),
            hours_analyzed: hours,
            total_queries: summary.total_queries,
            rejected_queries: summary.rejected_queries,
            domains: summary.domains,
        })
    }
}
