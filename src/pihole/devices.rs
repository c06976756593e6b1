/* src/pihole/devices.rs */

use crate::pihole::client::PiHoleClient;
use crate::pihole::error::PiHoleError;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

/// Device metadata from `clients/_suggestions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub hwaddr: Option<String>,
    #[serde(rename = "macVendor", default)]
    pub mac_vendor: Option<String>,
    #[serde(rename = "lastQuery", default, with = "chrono::serde::ts_seconds")]
    pub last_query: DateTime<Utc>,
    #[serde(default)]
    pub addresses: Option<String>,
    #[serde(default)]
    pub names: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SuggestionsResponse {
    #[serde(default)]
    clients: Vec<DeviceInfo>,
}

impl DeviceInfo {
    pub fn mac_addresses(&self) -> Vec<String> {
        split_list(self.hwaddr.as_deref().unwrap_or_default())
    }

    pub fn ip_addresses(&self) -> Vec<String> {
        split_list(self.addresses.as_deref().unwrap_or_default())
    }

    /// First non-empty hostname the Pi-hole knows for this device.
    pub fn primary_name(&self) -> Option<String> {
        split_list(self.names.as_deref().unwrap_or_default())
            .into_iter()
            .next()
    }

    /// Whole minutes since the last query, if the device ever queried.
    pub fn minutes_since_last_query(&self, now: DateTime<Utc>) -> Option<i64> {
        (self.last_query.timestamp() > 0).then(|| (now - self.last_query).num_minutes())
    }
}

impl PiHoleClient {
    pub async fn fetch_client_suggestions(&self) -> Result<Vec<DeviceInfo>, PiHoleError> {
        let response: SuggestionsResponse = self.get_json("clients/_suggestions", &[]).await?;
        Ok(response.clients)
    }
}

/// Keys every device by each of its addresses.
pub fn index_by_address(devices: Vec<DeviceInfo>) -> HashMap<String, DeviceInfo> {
    let mut index = HashMap::with_capacity(devices.len());
    for device in devices {
        for address in device.ip_addresses() {
            index.insert(address, device.clone());
        }
    }
    index
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
