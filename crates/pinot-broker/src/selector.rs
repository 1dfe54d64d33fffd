//! Broker selection contract and the shared table-to-broker map

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use pinot_core::{PinotError, Result};
use rand::seq::SliceRandom;

const OFFLINE_SUFFIX: &str = "_OFFLINE";
const REALTIME_SUFFIX: &str = "_REALTIME";

/// Resolves a table name to the address of a broker able to serve it
#[async_trait]
pub trait BrokerSelector: Send + Sync {
    /// Load the initial broker set and start any background refresh
    async fn init(&self) -> Result<()>;

    /// Pick a broker for `table`; an empty table name means any broker
    fn select_broker(&self, table: &str) -> Result<String>;

    /// Stop background refresh. Selecting keeps working on the last map.
    async fn close(&self) {}
}

/// Strip the physical table type suffix from a table name
pub fn extract_table_name(table: &str) -> String {
    table
        .replacen(OFFLINE_SUFFIX, "", 1)
        .replacen(REALTIME_SUFFIX, "", 1)
}

/// Snapshot of the brokers serving each table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrokerMap {
    pub table_brokers: HashMap<String, Vec<String>>,
    pub all_brokers: Vec<String>,
}

impl BrokerMap {
    pub fn new(table_brokers: HashMap<String, Vec<String>>, all_brokers: Vec<String>) -> Self {
        Self {
            table_brokers,
            all_brokers,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.all_brokers.is_empty()
    }

    /// Uniformly random broker for `table`
    pub fn select(&self, table: &str) -> Result<String> {
        let table_name = extract_table_name(table);
        if table_name.is_empty() {
            return self
                .all_brokers
                .choose(&mut rand::thread_rng())
                .cloned()
                .ok_or_else(|| PinotError::Selection("No available broker found".to_string()));
        }

        let brokers = self.table_brokers.get(&table_name).ok_or_else(|| {
            PinotError::Selection(format!("Unable to find the table: {}", table))
        })?;

        brokers.choose(&mut rand::thread_rng()).cloned().ok_or_else(|| {
            PinotError::Selection(format!("No available broker found for table: {}", table))
        })
    }
}

/// Broker map shared between a selector and its refresh task.
///
/// Writers replace the whole map, so readers never see a table list that
/// disagrees with the broker union.
#[derive(Debug, Default)]
pub struct SharedBrokerMap {
    inner: RwLock<BrokerMap>,
}

impl SharedBrokerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, map: BrokerMap) {
        *self.inner.write() = map;
    }

    pub fn select(&self, table: &str) -> Result<String> {
        self.inner.read().select(table)
    }

    pub fn snapshot(&self) -> BrokerMap {
        self.inner.read().clone()
    }
}
