/* src/pihole/stats.rs */

use crate::pihole::client::PiHoleClient;
use crate::pihole::error::PiHoleError;
use crate::pihole::queries::QueryRecord;
use fancy_log::{LogLevel, log};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Query status the Pi-hole assigns to blocklist hits.
pub const BLOCKED_STATUS: &str = "GRAVITY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainStat {
    #[serde(rename = "domain")]
    pub name: String,
    pub count: u64,
    #[serde(default)]
    pub blocked: bool,
}

#[derive(Debug, Default, Deserialize)]
struct TopDomainsResponse {
    #[serde(default)]
    domains: Vec<DomainStat>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientUsage {
    pub ip: String,
    #[serde(default)]
    pub name: Option<String>,
    pub count: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopClientStats {
    #[serde(default)]
    pub clients: Vec<ClientUsage>,
}

/// Per-domain counters over one client's query window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientDomainCount {
    pub domain: String,
    pub query_count: u64,
    pub rejected_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientDomainSummary {
    pub total_queries: u64,
    pub rejected_queries: u64,
    pub domains: Vec<ClientDomainCount>,
}

impl PiHoleClient {
    pub async fn fetch_top_domains(&self) -> Result<Vec<DomainStat>, PiHoleError> {
        let allowed: TopDomainsResponse = self.get_json("stats/top_domains", &[]).await?;
        log(
            LogLevel::Debug,
            &format!("top allowed domains: {}", allowed.domains.len()),
        );
        let blocked: TopDomainsResponse = self
            .get_json("stats/top_domains", &[("blocked", "true".to_string())])
            .await?;
        Ok(merge_top_domains(allowed.domains, blocked.domains))
    }

    pub async fn fetch_top_clients(&self, count: u32) -> Result<TopClientStats, PiHoleError> {
        self.get_json("stats/top_clients", &[("count", count.to_string())])
            .await
    }
}

/// Concatenates both lists, marking the second as blocked, and sorts by
/// descending count. Names present in both lists appear twice. The sort is
/// stable, so equal counts keep allowed-before-blocked order.
pub fn merge_top_domains(allowed: Vec<DomainStat>, blocked: Vec<DomainStat>) -> Vec<DomainStat> {
    let mut all = Vec::with_capacity(allowed.len() + blocked.len());
    all.extend(allowed);
    all.extend(blocked.into_iter().map(|d| DomainStat { blocked: true, ..d }));
    all.sort_by(|a, b| b.count.cmp(&a.count));
    all
}

/// Groups a client's queries by domain, counting blocklist hits, and keeps
/// the `top_n` busiest domains. Ties are ordered by domain name.
pub fn summarize_client_queries(records: &[QueryRecord], top_n: usize) -> ClientDomainSummary {
    let mut by_domain: HashMap<&str, (u64, u64)> = HashMap::new();
    let mut rejected_queries = 0;

    for record in records {
        let counts = by_domain.entry(record.domain.as_str()).or_default();
        counts.0 += 1;
        if record.status == BLOCKED_STATUS {
            counts.1 += 1;
            rejected_queries += 1;
        }
    }

    let mut domains: Vec<ClientDomainCount> = by_domain
        .into_iter()
        .map(|(domain, (query_count, rejected_count))| ClientDomainCount {
            domain: domain.to_string(),
            query_count,
            rejected_count,
        })
        .collect();
    domains.sort_by(|a, b| {
        b.query_count
            .cmp(&a.query_count)
            .then_with(|| a.domain.cmp(&b.domain))
    });
    domains.truncate(top_n);

    ClientDomainSummary {
        total_queries: records.len() as u64,
        rejected_queries,
        domains,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn stat(name: &str, count: u64) -> DomainStat {
        DomainStat {
            name: name.to_string(),
            count,
            blocked: false,
        }
    }

    fn query(domain: &str, status: &str) -> QueryRecord {
        QueryRecord {
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            query_type: "A".to_string(),
            status: status.to_string(),
            domain: domain.to_string(),
        }
    }

    #[test]
    fn merge_keeps_duplicates_and_sorts_descending() {
        let merged = merge_top_domains(vec![stat("a", 10), stat("b", 5)], vec![stat("b", 3)]);
        assert_eq!(
            merged,
            vec![
                DomainStat { name: "a".into(), count: 10, blocked: false },
                DomainStat { name: "b".into(), count: 5, blocked: false },
                DomainStat { name: "b".into(), count: 3, blocked: true },
            ]
        );
    }

    #[test]
    fn merge_interleaves_blocked_entries_by_count() {
        let merged = merge_top_domains(
            vec![stat("cdn.example", 4), stat("mail.example", 2)],
            vec![stat("tracker.example", 9), stat("ads.example", 2)],
        );
        let order: Vec<(&str, bool)> = merged.iter().map(|d| (d.name.as_str(), d.blocked)).collect();
        assert_eq!(
            order,
            vec![
                ("tracker.example", true),
                ("cdn.example", false),
                ("mail.example", false),
                ("ads.example", true),
            ]
        );
    }

    #[test]
    fn summary_counts_gravity_hits_per_domain() {
        let records = vec![
            query("ads.example.net", "GRAVITY"),
            query("news.example.org", "FORWARDED"),
            query("news.example.org", "CACHE"),
            query("ads.example.net", "GRAVITY"),
            query("news.example.org", "FORWARDED"),
            query("cdn.example.com", "CACHE"),
        ];
        let summary = summarize_client_queries(&records, 10);

        assert_eq!(summary.total_queries, 6);
        assert_eq!(summary.rejected_queries, 2);
        assert_eq!(
            summary.domains,
            vec![
                ClientDomainCount { domain: "news.example.org".into(), query_count: 3, rejected_count: 0 },
                ClientDomainCount { domain: "ads.example.net".into(), query_count: 2, rejected_count: 2 },
                ClientDomainCount { domain: "cdn.example.com".into(), query_count: 1, rejected_count: 0 },
            ]
        );
    }

    #[test]
    fn summary_truncates_but_totals_cover_whole_window() {
        let records = vec![
            query("a.example", "OK"),
            query("b.example", "GRAVITY"),
            query("c.example", "OK"),
        ];
        let summary = summarize_client_queries(&records, 1);

        assert_eq!(summary.domains.len(), 1);
        assert_eq!(summary.domains[0].domain, "a.example");
        assert_eq!(summary.total_queries, 3);
        assert_eq!(summary.rejected_queries, 1);
    }

    #[test]
    fn top_clients_decode_with_null_names() {
        let stats: TopClientStats = serde_json::from_str(
            r#"{"clients":[{"ip":"10.0.0.5","name":null,"count":120},{"ip":"10.0.0.9","name":"nas.lan","count":40}],
                "total_queries":1000,"blocked_queries":80,"took":0.002}"#,
        )
        .unwrap();

        assert_eq!(stats.clients.len(), 2);
        assert_eq!(stats.clients[0].name, None);
        assert_eq!(stats.clients[1].name.as_deref(), Some("nas.lan"));
    }
}
