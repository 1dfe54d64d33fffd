//! ZooKeeper driven broker selection
//!
//! The selector reads the broker resource external view once during `init`,
//! arming a one-shot data watch, then keeps a background task that re-reads
//! the node (and re-arms the watch) each time the watch fires.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use pinot_core::{PinotError, Result, ZookeeperConfig};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use zookeeper_client::EventType;

use crate::external_view::{ExternalView, BROKER_EXTERNAL_VIEW_PATH};
use crate::refresh::RefreshHandle;
use crate::selector::{BrokerMap, BrokerSelector, SharedBrokerMap};

/// Back-off before re-arming a watch after an error or an unrelated event
const WATCH_RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// What woke up an armed watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    DataChanged,
    Other(String),
}

/// Resolves once, when the node changes or the watch is otherwise triggered
pub type ViewWatch = BoxFuture<'static, WatchEvent>;

/// Source of the external view document
#[async_trait]
pub trait ExternalViewSource: Send + Sync {
    /// Read the document and arm a watch on it
    async fn read_and_watch(&self) -> Result<(Vec<u8>, ViewWatch)>;
}

/// External view read straight from ZooKeeper
pub struct ZookeeperSource {
    client: zookeeper_client::Client,
    path: String,
}

impl ZookeeperSource {
    /// Connect to the ensemble, bounded by the session timeout
    pub async fn connect(config: &ZookeeperConfig) -> Result<Self> {
        let servers = config.connect_string();
        let mut connector = zookeeper_client::Client::connector();
        connector.session_timeout(config.session_timeout());
        let client = tokio::time::timeout(config.session_timeout(), connector.connect(&servers))
        .await
        .map_err(|_| {
            PinotError::Selection(format!(
                "Timed out connecting to zookeeper: {}",
                servers
            ))
        })?
        .map_err(|e| {
            error!("Failed to connect to zookeeper {}: {}", servers, e);
            PinotError::Selection(format!("Failed to connect to zookeeper: {}", e))
        })?;

        Ok(Self {
            client,
            path: external_view_path(&config.path_prefix),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl ExternalViewSource for ZookeeperSource {
    async fn read_and_watch(&self) -> Result<(Vec<u8>, ViewWatch)> {
        let (data, _stat, watcher) = self
            .client
            .get_and_watch_data(&self.path)
            .await
            .map_err(|e| {
                PinotError::Selection(format!(
                    "Failed to read external view {}: {}",
                    self.path, e
                ))
            })?;

        let watch = async move {
            let event = watcher.changed().await;
            match event.event_type {
                EventType::NodeDataChanged => WatchEvent::DataChanged,
                other => WatchEvent::Other(format!("{:?}", other)),
            }
        }
        .boxed();

        Ok((data, watch))
    }
}

/// `<prefix>/EXTERNALVIEW/brokerResource`
pub fn external_view_path(path_prefix: &str) -> String {
    format!(
        "{}/{}",
        path_prefix.trim_end_matches('/'),
        BROKER_EXTERNAL_VIEW_PATH
    )
}

enum SourceState {
    Config(ZookeeperConfig),
    Ready(Arc<dyn ExternalViewSource>),
}

/// Broker selector backed by the ZooKeeper external view
pub struct DynamicBrokerSelector {
    source: tokio::sync::Mutex<SourceState>,
    brokers: Arc<SharedBrokerMap>,
    refresher: Mutex<Option<RefreshHandle>>,
}

impl DynamicBrokerSelector {
    /// Selector that connects to ZooKeeper during `init`
    pub fn new(config: ZookeeperConfig) -> Self {
        Self {
            source: tokio::sync::Mutex::new(SourceState::Config(config)),
            brokers: Arc::new(SharedBrokerMap::new()),
            refresher: Mutex::new(None),
        }
    }

    /// Selector reading from an already connected source
    pub fn with_source(source: Arc<dyn ExternalViewSource>) -> Self {
        Self {
            source: tokio::sync::Mutex::new(SourceState::Ready(source)),
            brokers: Arc::new(SharedBrokerMap::new()),
            refresher: Mutex::new(None),
        }
    }

    /// Current broker map
    pub fn broker_map(&self) -> BrokerMap {
        self.brokers.snapshot()
    }

    async fn connected_source(&self) -> Result<Arc<dyn ExternalViewSource>> {
        let mut state = self.source.lock().await;
        let source: Arc<dyn ExternalViewSource> = match &*state {
            SourceState::Ready(source) => return Ok(source.clone()),
            SourceState::Config(config) => Arc::new(ZookeeperSource::connect(config).await?),
        };
        *state = SourceState::Ready(source.clone());
        Ok(source)
    }
}

#[async_trait]
impl BrokerSelector for DynamicBrokerSelector {
    async fn init(&self) -> Result<()> {
        let source = self.connected_source().await?;
        let watch = refresh_external_view(source.as_ref(), &self.brokers).await?;
        info!(
            "Loaded {} brokers from external view",
            self.brokers.snapshot().all_brokers.len()
        );

        let brokers = self.brokers.clone();
        let handle = RefreshHandle::spawn(move |shutdown_rx| {
            watch_external_view(source, brokers, watch, shutdown_rx)
        });
        *self.refresher.lock() = Some(handle);
        Ok(())
    }

    fn select_broker(&self, table: &str) -> Result<String> {
        self.brokers.select(table)
    }

    async fn close(&self) {
        let handle = self.refresher.lock().take();
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
    }
}

/// Read, parse and install the view; returns the newly armed watch
async fn refresh_external_view(
    source: &dyn ExternalViewSource,
    brokers: &SharedBrokerMap,
) -> Result<ViewWatch> {
    let (data, watch) = source.read_and_watch().await?;
    let view = ExternalView::from_slice(&data)?;
    brokers.replace(view.broker_map());
    Ok(watch)
}

async fn watch_external_view(
    source: Arc<dyn ExternalViewSource>,
    brokers: Arc<SharedBrokerMap>,
    mut watch: ViewWatch,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    loop {
        let event = tokio::select! {
            _ = &mut shutdown_rx => break,
            event = &mut watch => event,
        };

        match event {
            WatchEvent::DataChanged => debug!("External view changed, refreshing brokers"),
            WatchEvent::Other(kind) => {
                debug!("External view watch fired with {}", kind);
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = tokio::time::sleep(WATCH_RETRY_BACKOFF) => {}
                }
            }
        }

        // The fired watch is spent; keep trying until a new one is armed.
        loop {
            match refresh_external_view(source.as_ref(), &brokers).await {
                Ok(next) => {
                    watch = next;
                    break;
                }
                Err(err) => {
                    warn!("Failed to refresh external view: {}", err);
                    tokio::select! {
                        _ = &mut shutdown_rx => return,
                        _ = tokio::time::sleep(WATCH_RETRY_BACKOFF) => {}
                    }
                }
            }
        }
    }
    debug!("External view watch stopped");
}
