/* src/pihole/queries.rs */

use crate::pihole::client::PiHoleClient;
use crate::pihole::error::PiHoleError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fancy_log::{LogLevel, log};
use serde::Deserialize;

/// Records requested per query-log page.
pub const PAGE_SIZE: usize = 100;

/// One entry of a client's query log.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRecord {
    pub timestamp: DateTime<Utc>,
    pub query_type: String,
    pub status: String,
    pub domain: String,
}

/// One page of `GET queries`, reduced to the fields the aggregation reads.
#[derive(Debug, Default, Deserialize)]
pub struct QueryPage {
    #[serde(default)]
    pub queries: Vec<RawQuery>,
    #[serde(rename = "recordsFiltered", default)]
    pub records_filtered: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawQuery {
    /// Unix seconds, fractional.
    pub time: f64,
    #[serde(rename = "type")]
    pub query_type: Option<String>,
    pub status: Option<String>,
    pub domain: Option<String>,
}

impl RawQuery {
    fn into_record(self) -> QueryRecord {
        let secs = self.time.trunc() as i64;
        let nanos = (self.time.fract() * 1e9) as u32;
        QueryRecord {
            timestamp: DateTime::from_timestamp(secs, nanos).unwrap_or_default(),
            query_type: self.query_type.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            domain: self.domain.unwrap_or_default(),
        }
    }
}

/// Anything that can serve the newest-first query log one page at a time.
#[async_trait]
pub trait QueryPageSource: Send + Sync {
    async fn query_page(
        &self,
        client_ip: &str,
        start: usize,
        length: usize,
    ) -> Result<QueryPage, PiHoleError>;
}

#[async_trait]
impl QueryPageSource for PiHoleClient {
    async fn query_page(
        &self,
        client_ip: &str,
        start: usize,
        length: usize,
    ) -> Result<QueryPage, PiHoleError> {
        self.get_json(
            "queries",
            &[
                ("client_ip", client_ip.to_string()),
                ("start", start.to_string()),
                ("length", length.to_string()),
            ],
        )
        .await
    }
}

/// Walks the query log of `client_ip` backward until `cutoff`.
///
/// Stops on an empty page, on the first record older than `cutoff` (which
/// is not included), or once the offset reaches the server's filtered total.
/// The log is assumed to be newest-first; this is not checked. Any page
/// error aborts the walk.
pub async fn collect_client_queries<S>(
    source: &S,
    client_ip: &str,
    cutoff: DateTime<Utc>,
) -> Result<Vec<QueryRecord>, PiHoleError>
where
    S: QueryPageSource + ?Sized,
{
    let cutoff_secs = cutoff.timestamp() as f64;
    let mut records = Vec::new();
    let mut start = 0;

    loop {
        let page = source.query_page(client_ip, start, PAGE_SIZE).await?;
        log(
            LogLevel::Debug,
            &format!(
                "query log page client={} start={} records={} filtered={}",
                client_ip,
                start,
                page.queries.len(),
                page.records_filtered
            ),
        );

        if page.queries.is_empty() {
            break;
        }

        for raw in page.queries {
            if raw.time < cutoff_secs {
                return Ok(records);
            }
            records.push(raw.into_record());
        }

        start += PAGE_SIZE;
        if start >= page.records_filtered {
            break;
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pihole::error::HttpError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory log, newest first, served in slices like the real endpoint.
    struct FakeLog {
        entries: Vec<RawQuery>,
        requests: AtomicUsize,
        fail_at: Option<usize>,
        /// Overrides `recordsFiltered` in every page.
        reported_total: Option<usize>,
    }

    impl FakeLog {
        fn descending(count: usize, newest: f64) -> Self {
            let entries = (0..count)
                .map(|i| RawQuery {
                    time: newest - i as f64,
                    query_type: Some("A".to_string()),
                    status: Some("FORWARDED".to_string()),
                    domain: Some(format!("host{}.example.com", i)),
                })
                .collect();
            Self {
                entries,
                requests: AtomicUsize::new(0),
                fail_at: None,
                reported_total: None,
            }
        }

        fn requests(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QueryPageSource for FakeLog {
        async fn query_page(
            &self,
            _client_ip: &str,
            start: usize,
            length: usize,
        ) -> Result<QueryPage, PiHoleError> {
            let n = self.requests.fetch_add(1, Ordering::SeqCst);
            if self.fail_at == Some(n) {
                return Err(HttpError {
                    status: 500,
                    status_text: "Internal Server Error".to_string(),
                    body: String::new(),
                    method: "GET",
                    url: "http://pi.hole/api/queries".to_string(),
                }
                .into());
            }
            let end = (start + length).min(self.entries.len());
            let queries = self.entries.get(start..end).unwrap_or_default().to_vec();
            Ok(QueryPage {
                queries,
                records_filtered: self.reported_total.unwrap_or(self.entries.len()),
            })
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn whole_log_inside_window_stops_on_reported_total() {
        let log = FakeLog::descending(250, 10_000.0);
        let records = collect_client_queries(&log, "10.0.0.5", at(0)).await.unwrap();

        assert_eq!(records.len(), 250);
        assert_eq!(log.requests(), 3);
        assert_eq!(records[0].domain, "host0.example.com");
        assert_eq!(records[249].timestamp, at(10_000 - 249));
    }

    #[tokio::test]
    async fn exact_multiple_of_page_size_needs_no_trailing_request() {
        let log = FakeLog::descending(200, 10_000.0);
        let records = collect_client_queries(&log, "10.0.0.5", at(0)).await.unwrap();

        assert_eq!(records.len(), 200);
        assert_eq!(log.requests(), 2);
    }

    #[tokio::test]
    async fn under_reported_total_still_ends_the_walk() {
        let mut log = FakeLog::descending(300, 10_000.0);
        log.reported_total = Some(150);
        let records = collect_client_queries(&log, "10.0.0.5", at(0)).await.unwrap();

        assert_eq!(log.requests(), 2);
        assert_eq!(records.len(), 200);
        assert_eq!(records[199].domain, "host199.example.com");
    }

    #[tokio::test]
    async fn stops_at_first_record_older_than_cutoff() {
        let log = FakeLog::descending(500, 10_000.0);
        let cutoff = at(10_000 - 149);
        let records = collect_client_queries(&log, "10.0.0.5", cutoff).await.unwrap();

        assert_eq!(records.len(), 150);
        assert!(records.iter().all(|r| r.timestamp >= cutoff));
        assert_eq!(log.requests(), 2);
    }

    #[tokio::test]
    async fn record_exactly_at_cutoff_is_kept() {
        let log = FakeLog::descending(10, 100.0);
        let records = collect_client_queries(&log, "10.0.0.5", at(95)).await.unwrap();

        assert_eq!(records.len(), 6);
        assert_eq!(records.last().unwrap().timestamp, at(95));
    }

    #[tokio::test]
    async fn empty_first_page_issues_one_request() {
        let log = FakeLog::descending(0, 0.0);
        let records = collect_client_queries(&log, "10.0.0.5", at(0)).await.unwrap();

        assert!(records.is_empty());
        assert_eq!(log.requests(), 1);
    }

    #[tokio::test]
    async fn page_error_aborts_the_walk() {
        let mut log = FakeLog::descending(300, 10_000.0);
        log.fail_at = Some(1);
        let err = collect_client_queries(&log, "10.0.0.5", at(0)).await.unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert_eq!(log.requests(), 2);
    }

    #[test]
    fn page_decodes_from_api_shape() {
        let page: QueryPage = serde_json::from_str(
            r#"{
                "queries": [{
                    "id": 7, "time": 1700000000.25, "type": "AAAA",
                    "status": "GRAVITY", "dnssec": "UNKNOWN", "domain": "ads.example.net",
                    "upstream": null, "reply": {"type": "BLOB", "time": 0.1},
                    "client": {"ip": "10.0.0.5", "name": null}, "list_id": 3,
                    "ede": {"code": -1, "text": null}, "cname": null
                }],
                "cursor": 7, "recordsTotal": 900, "recordsFiltered": 42, "draw": 0, "took": 0.01
            }"#,
        )
        .unwrap();

        assert_eq!(page.records_filtered, 42);
        let record = page.queries[0].clone().into_record();
        assert_eq!(record.query_type, "AAAA");
        assert_eq!(record.status, "GRAVITY");
        assert_eq!(record.timestamp.timestamp(), 1_700_000_000);
    }
}
