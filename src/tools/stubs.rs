/* src/tools/stubs.rs */

use crate::lookup::{DnsLookup, DnsRecords, LookupError, WhoisLookup, WhoisRecord};
use crate::pihole::{
    ClientUsage, DeviceInfo, DomainStat, HttpError, PiHoleApi, PiHoleError, QueryRecord,
    TopClientStats,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Canned Pi-hole answers with a call counter per operation.
#[derive(Default)]
pub struct StubPiHole {
    pub clients: Vec<ClientUsage>,
    pub devices: Vec<DeviceInfo>,
    pub domains: Vec<DomainStat>,
    pub queries: Vec<QueryRecord>,
    /// When set, every operation fails with this HTTP status.
    pub fail_with: Option<u16>,
    pub calls: AtomicUsize,
    pub last_cutoff: Mutex<Option<(String, DateTime<Utc>)>>,
}

impl StubPiHole {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), PiHoleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_with {
            Some(status) => Err(PiHoleError::Http(HttpError {
                status,
                status_text: "Service Unavailable".to_string(),
                body: String::new(),
                method: "GET",
                url: "http://pihole.test/api/stub".to_string(),
            })),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PiHoleApi for StubPiHole {
    async fn top_clients(&self, count: u32) -> Result<TopClientStats, PiHoleError> {
        self.enter()?;
        Ok(TopClientStats {
            clients: self.clients.iter().take(count as usize).cloned().collect(),
        })
    }

    async fn client_suggestions(&self) -> Result<Vec<DeviceInfo>, PiHoleError> {
        self.enter()?;
        Ok(self.devices.clone())
    }

    async fn top_domains(&self) -> Result<Vec<DomainStat>, PiHoleError> {
        self.enter()?;
        Ok(self.domains.clone())
    }

    async fn client_queries(
        &self,
        client_ip: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<QueryRecord>, PiHoleError> {
        self.enter()?;
        *self.last_cutoff.lock() = Some((client_ip.to_string(), cutoff));
        Ok(self.queries.clone())
    }
}

#[derive(Default)]
pub struct StubDns {
    pub records: Option<DnsRecords>,
    pub calls: AtomicUsize,
    pub last_domain: Mutex<Option<String>>,
}

#[async_trait]
impl DnsLookup for StubDns {
    async fn all_records(&self, domain: &str) -> Result<DnsRecords, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_domain.lock() = Some(domain.to_string());
        self.records
            .clone()
            .ok_or_else(|| LookupError::NoRecords(domain.to_string()))
    }
}

#[derive(Default)]
pub struct StubWhois {
    pub record: Option<WhoisRecord>,
    pub calls: AtomicUsize,
    pub last_domain: Mutex<Option<String>>,
}

#[async_trait]
impl WhoisLookup for StubWhois {
    async fn lookup(&self, domain: &str) -> Result<WhoisRecord, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_domain.lock() = Some(domain.to_string());
        self.record
            .clone()
            .ok_or_else(|| LookupError::NotFound(domain.to_string()))
    }
}
