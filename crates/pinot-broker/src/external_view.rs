//! Broker resource external view stored in ZooKeeper

use std::collections::{BTreeMap, HashMap};

use pinot_core::{PinotError, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::selector::{extract_table_name, BrokerMap};

/// Path of the broker resource node under the cluster root
pub const BROKER_EXTERNAL_VIEW_PATH: &str = "EXTERNALVIEW/brokerResource";

const ONLINE: &str = "ONLINE";

/// Helix external view of the broker resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExternalView {
    pub id: String,
    pub simple_fields: HashMap<String, String>,
    /// Physical table name to `Broker_<host>_<port>` to state
    pub map_fields: BTreeMap<String, HashMap<String, String>>,
    pub list_fields: HashMap<String, Vec<String>>,
}

impl ExternalView {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| PinotError::Selection(format!("Failed to parse external view: {}", e)))
    }

    /// Online brokers per logical table, plus their union.
    ///
    /// When both `_OFFLINE` and `_REALTIME` entries exist for a table, the
    /// one sorting last replaces the other.
    pub fn broker_map(&self) -> BrokerMap {
        let mut table_brokers = HashMap::new();
        let mut all_brokers = Vec::new();
        for (table, states) in &self.map_fields {
            let brokers = online_brokers(states);
            all_brokers.extend(brokers.iter().cloned());
            table_brokers.insert(extract_table_name(table), brokers);
        }
        BrokerMap::new(table_brokers, all_brokers)
    }
}

fn online_brokers(states: &HashMap<String, String>) -> Vec<String> {
    let mut brokers: Vec<String> = states
        .iter()
        .filter(|(_, state)| state.as_str() == ONLINE)
        .filter_map(|(key, _)| match broker_host_port(key) {
            Ok((host, port)) => Some(format!("{}:{}", host, port)),
            Err(err) => {
                warn!("{}", err);
                None
            }
        })
        .collect();
    brokers.sort();
    brokers
}

/// Split `Broker_<host>_<port>` into host and port
pub fn broker_host_port(key: &str) -> Result<(&str, &str)> {
    let parts: Vec<&str> = key.split('_').collect();
    if parts.len() < 2 {
        return Err(PinotError::Selection(format!(
            "Invalid Broker Key: {}, should be in the format of Broker_[hostname]_[port]",
            key
        )));
    }
    let port = parts[parts.len() - 1];
    if port.parse::<i32>().is_err() {
        return Err(PinotError::Selection(format!(
            "Failed to parse broker port: {} to integer",
            port
        )));
    }
    Ok((parts[parts.len() - 2], port))
}
