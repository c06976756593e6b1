/* src/pihole/mod.rs */

mod auth;
mod client;
mod devices;
mod error;
mod queries;
mod stats;

pub use client::PiHoleClient;
pub use devices::{DeviceInfo, index_by_address};
pub use error::PiHoleError;
pub use queries::{QueryRecord, collect_client_queries};
pub use stats::{ClientDomainCount, DomainStat, TopClientStats, summarize_client_queries};

#[cfg(test)]
pub use error::HttpError;
#[cfg(test)]
pub use stats::ClientUsage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// The Pi-hole operations the tools depend on.
#[async_trait]
pub trait PiHoleApi: Send + Sync {
    async fn top_clients(&self, count: u32) -> Result<TopClientStats, PiHoleError>;

    async fn client_suggestions(&self) -> Result<Vec<DeviceInfo>, PiHoleError>;

    /// Allowed and blocked top domains, merged and ranked.
    async fn top_domains(&self) -> Result<Vec<DomainStat>, PiHoleError>;

    /// Every query `client_ip` made since `cutoff`, newest first.
    async fn client_queries(
        &self,
        client_ip: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<QueryRecord>, PiHoleError>;
}

#[async_trait]
impl PiHoleApi for PiHoleClient {
    async fn top_clients(&self, count: u32) -> Result<TopClientStats, PiHoleError> {
        self.fetch_top_clients(count).await
    }

    async fn client_suggestions(&self) -> Result<Vec<DeviceInfo>, PiHoleError> {
        self.fetch_client_suggestions().await
    }

    async fn top_domains(&self) -> Result<Vec<DomainStat>, PiHoleError> {
        self.fetch_top_domains().await
    }

    async fn client_queries(
        &self,
        client_ip: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<QueryRecord>, PiHoleError> {
        collect_client_queries(self, client_ip, cutoff).await
    }
}
