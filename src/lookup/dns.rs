/* src/lookup/dns.rs */

use crate::domain::normalize;
use crate::lookup::LookupError;
use async_trait::async_trait;
use fancy_log::{LogLevel, log};
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinEncodable};
use serde::Serialize;
use std::time::Duration;
use tokio::net::{UdpSocket, lookup_host};

/// Record sets of one registrable domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DnsRecords {
    pub domain: String,
    #[serde(rename = "a_records")]
    pub a: Vec<String>,
    #[serde(rename = "aaaa_records")]
    pub aaaa: Vec<String>,
    #[serde(rename = "ns_records")]
    pub ns: Vec<String>,
    #[serde(rename = "mx_records")]
    pub mx: Vec<String>,
    #[serde(rename = "txt_records")]
    pub txt: Vec<String>,
}

impl DnsRecords {
    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
            && self.aaaa.is_empty()
            && self.ns.is_empty()
            && self.mx.is_empty()
            && self.txt.is_empty()
    }
}

#[async_trait]
pub trait DnsLookup: Send + Sync {
    /// A, AAAA, NS, MX and TXT records of the registrable form of `domain`.
    async fn all_records(&self, domain: &str) -> Result<DnsRecords, LookupError>;
}

/// Asks one recursive resolver over UDP, one exchange per record type.
pub struct UdpDnsClient {
    server: String,
    timeout: Duration,
}

impl UdpDnsClient {
    pub fn new(server: impl Into<String>, timeout: Duration) -> Self {
        Self {
            server: server.into(),
            timeout,
        }
    }

    async fn query(&self, name: &Name, record_type: RecordType) -> Result<Vec<Record>, LookupError> {
        let id: u16 = rand::random();
        let mut request = Message::new();
        request
            .set_id(id)
            .set_message_type(MessageType::Query)
            .set_op_code(OpCode::Query)
            .set_recursion_desired(true);
        request.add_query(Query::query(name.clone(), record_type));
        let request_bytes = request.to_bytes()?;

        let exchange = async {
            let server = lookup_host(self.server.as_str())
                .await?
                .next()
                .ok_or_else(|| LookupError::NoServerAddress(self.server.clone()))?;
            let local = if server.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
            let socket = UdpSocket::bind(local).await?;
            socket.connect(server).await?;
            socket.send(&request_bytes).await?;

            let mut buf = vec![0u8; 4096];
            loop {
                let len = socket.recv(&mut buf).await?;
                let response = Message::from_bytes(&buf[..len])?;
                // Ignore stray datagrams that do not answer this request.
                if response.id() == id {
                    return Ok::<_, LookupError>(response);
                }
            }
        };

        let response: Message = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| LookupError::Timeout(self.timeout))??;

        if response.response_code() != ResponseCode::NoError {
            return Err(LookupError::Rcode(response.response_code()));
        }
        if response.truncated() {
            log(
                LogLevel::Debug,
                &format!("Truncated {} answer for {}", record_type, name),
            );
        }
        Ok(response.answers().to_vec())
    }

    /// One record type; a failed exchange is logged and yields nothing.
    async fn fetch(&self, name: &Name, record_type: RecordType) -> Vec<String> {
        match self.query(name, record_type).await {
            Ok(records) => render_records(&records, record_type),
            Err(e) => {
                log(
                    LogLevel::Debug,
                    &format!("{} lookup for {} failed: {}", record_type, name, e),
                );
                vec![]
            }
        }
    }
}

#[async_trait]
impl DnsLookup for UdpDnsClient {
    async fn all_records(&self, domain: &str) -> Result<DnsRecords, LookupError> {
        let domain = normalize(domain);
        let name = Name::from_ascii(format!("{}.", domain)).map_err(|e| LookupError::InvalidDomain {
            domain: domain.clone(),
            reason: e.to_string(),
        })?;

        let (a, aaaa, ns, mx, txt) = tokio::join!(
            self.fetch(&name, RecordType::A),
            self.fetch(&name, RecordType::AAAA),
            self.fetch(&name, RecordType::NS),
            self.fetch(&name, RecordType::MX),
            self.fetch(&name, RecordType::TXT),
        );

        let records = DnsRecords {
            domain,
            a,
            aaaa,
            ns,
            mx,
            txt,
        };
        if records.is_empty() {
            return Err(LookupError::NoRecords(records.domain));
        }
        Ok(records)
    }
}

/// Formats the answers of `record_type`, skipping CNAMEs and other
/// record types that come along in the answer section.
fn render_records(records: &[Record], record_type: RecordType) -> Vec<String> {
    records
        .iter()
        .filter(|record| record.record_type() == record_type)
        .filter_map(|record| match record.data() {
            RData::A(addr) => Some(addr.to_string()),
            RData::AAAA(addr) => Some(addr.to_string()),
            RData::NS(name) => Some(name.to_string()),
            RData::MX(mx) => Some(format!("{} (pref {})", mx.exchange(), mx.preference())),
            RData::TXT(txt) => Some(
                txt.txt_data()
                    .iter()
                    .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            _ => None,
        })
        .collect()
}
