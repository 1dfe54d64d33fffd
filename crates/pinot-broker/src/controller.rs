//! Controller API driven broker selection
//!
//! Polls `GET /v2/brokers/tables?state=ONLINE` on a fixed interval and swaps
//! the broker map on every successful fetch.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pinot_core::{ControllerConfig, PinotError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::refresh::RefreshHandle;
use crate::selector::{BrokerMap, BrokerSelector, SharedBrokerMap};

pub const CONTROLLER_API_ENDPOINT: &str = "/v2/brokers/tables?state=ONLINE";

/// One broker instance as listed by the controller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrokerDto {
    pub host: String,
    pub instance_name: String,
    pub port: i32,
}

impl BrokerDto {
    /// `host:port`
    pub fn broker_name(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Controller response: table name to the brokers serving it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControllerResponse(pub HashMap<String, Vec<BrokerDto>>);

impl ControllerResponse {
    /// Every broker once, in name order
    pub fn broker_list(&self) -> Vec<String> {
        self.0
            .values()
            .flatten()
            .map(BrokerDto::broker_name)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn table_to_broker_map(&self) -> HashMap<String, Vec<String>> {
        self.0
            .iter()
            .map(|(table, brokers)| {
                (
                    table.clone(),
                    brokers.iter().map(BrokerDto::broker_name).collect(),
                )
            })
            .collect()
    }

    pub fn broker_map(&self) -> BrokerMap {
        BrokerMap::new(self.table_to_broker_map(), self.broker_list())
    }
}

/// Full broker listing URL for a controller address.
///
/// A bare `host:port` gets `http://`; only `http` and `https` schemes are accepted.
pub fn controller_request_url(controller_address: &str) -> Result<String> {
    let address = match controller_address.split_once("://") {
        Some((scheme, _)) if scheme != "http" && scheme != "https" => {
            return Err(PinotError::Configuration(format!(
                "Unsupported controller URL scheme: {}, only http (default) and https are allowed",
                scheme
            )));
        }
        Some(_) => controller_address.to_string(),
        None => format!("http://{}", controller_address),
    };
    Ok(format!(
        "{}{}",
        address.strip_suffix('/').unwrap_or(&address),
        CONTROLLER_API_ENDPOINT
    ))
}

/// Fetches broker listings from the controller
#[derive(Debug, Clone)]
struct ControllerFetcher {
    client: reqwest::Client,
    url: String,
    headers: HashMap<String, String>,
}

impl ControllerFetcher {
    async fn fetch(&self) -> Result<ControllerResponse> {
        let mut request = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json");
        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| {
            PinotError::Transport(format!(
                "Got exceptions while sending controller API request: {}",
                e
            ))
        })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(PinotError::Transport(format!(
                "Controller API returned HTTP status code {}",
                status.as_u16()
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            PinotError::Transport(format!(
                "An error occurred when reading controller API response: {}",
                e
            ))
        })?;
        serde_json::from_slice(&body).map_err(|e| {
            PinotError::Protocol(format!(
                "An error occurred when decoding controller API response: {}",
                e
            ))
        })
    }
}

/// Broker selector backed by the controller's broker listing
pub struct ControllerBasedSelector {
    config: ControllerConfig,
    client: reqwest::Client,
    brokers: Arc<SharedBrokerMap>,
    refresher: Mutex<Option<RefreshHandle>>,
}

impl ControllerBasedSelector {
    pub fn new(config: ControllerConfig, client: reqwest::Client) -> Self {
        Self {
            config,
            client,
            brokers: Arc::new(SharedBrokerMap::new()),
            refresher: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn broker_map(&self) -> BrokerMap {
        self.brokers.snapshot()
    }
}

#[async_trait]
impl BrokerSelector for ControllerBasedSelector {
    async fn init(&self) -> Result<()> {
        let url = controller_request_url(&self.config.controller_address).map_err(|e| {
            PinotError::Configuration(format!(
                "an error occurred when parsing controller address: {}",
                e
            ))
        })?;
        let fetcher = ControllerFetcher {
            client: self.client.clone(),
            url,
            headers: self.config.extra_controller_api_headers.clone(),
        };

        let response = fetcher.fetch().await.map_err(|e| {
            PinotError::Selection(format!(
                "an error occurred when fetching broker data from controller API: {}",
                e
            ))
        })?;
        self.brokers.replace(response.broker_map());
        info!(
            "Loaded {} brokers from controller {}",
            self.brokers.snapshot().all_brokers.len(),
            fetcher.url
        );

        let brokers = self.brokers.clone();
        let freq = self.config.update_freq();
        let handle = RefreshHandle::spawn(move |shutdown_rx| {
            poll_controller(fetcher, brokers, freq, shutdown_rx)
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

async fn poll_controller(
    fetcher: ControllerFetcher,
    brokers: Arc<SharedBrokerMap>,
    freq: std::time::Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut ticker = interval_at(Instant::now() + freq, freq);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            _ = ticker.tick() => {
                match fetcher.fetch().await {
                    Ok(response) => brokers.replace(response.broker_map()),
                    Err(e) => error!("Caught exception when updating broker data, Error: {}", e),
                }
            }
        }
    }
    debug!("Controller poller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const BODY: &str = r#"{
        "baseballStats": [
            {"port": 8000, "host": "h1", "instanceName": "Broker_h1_8000"},
            {"port": 8000, "host": "h2", "instanceName": "Broker_h2_8000"}
        ],
        "dimBaseballTeams": [
            {"port": 8000, "host": "h1", "instanceName": "Broker_h1_8000"}
        ]
    }"#;

    /// Answers each connection with the next canned response, repeating the last
    async fn serve(responses: Vec<(u16, String)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let (status, body) = responses[n.min(responses.len() - 1)].clone();
                let mut buf = vec![0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let reply = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        (addr.to_string(), hits)
    }

    #[test]
    fn test_controller_request_url() {
        assert_eq!(
            controller_request_url("localhost:9000").unwrap(),
            "http://localhost:9000/v2/brokers/tables?state=ONLINE"
        );
        assert_eq!(
            controller_request_url("https://host:9000/").unwrap(),
            "https://host:9000/v2/brokers/tables?state=ONLINE"
        );
        assert_eq!(
            controller_request_url("http://host:9000").unwrap(),
            "http://host:9000/v2/brokers/tables?state=ONLINE"
        );
        let err = controller_request_url("smb://host:9000").unwrap_err();
        assert!(err.to_string().contains("Unsupported controller URL scheme: smb"));
    }

    #[test]
    fn test_controller_response_helpers() {
        let response: ControllerResponse = serde_json::from_str(BODY).unwrap();
        assert_eq!(response.broker_list(), vec!["h1:8000", "h2:8000"]);
        let tables = response.table_to_broker_map();
        assert_eq!(tables["baseballStats"], vec!["h1:8000", "h2:8000"]);
        assert_eq!(tables["dimBaseballTeams"], vec!["h1:8000"]);
    }

    #[tokio::test]
    async fn test_init_fetches_brokers() {
        let (addr, _) = serve(vec![(200, BODY.to_string())]).await;
        let selector = ControllerBasedSelector::new(
            ControllerConfig::new(addr).with_header("Authorization", "Basic abc"),
            reqwest::Client::new(),
        );
        selector.init().await.unwrap();
        assert_eq!(selector.select_broker("dimBaseballTeams").unwrap(), "h1:8000");
        assert_eq!(selector.broker_map().all_brokers.len(), 2);
        selector.close().await;
    }

    #[tokio::test]
    async fn test_init_fails_on_http_error() {
        let (addr, _) = serve(vec![(500, "{}".to_string())]).await;
        let selector =
            ControllerBasedSelector::new(ControllerConfig::new(addr), reqwest::Client::new());
        let err = selector.init().await.unwrap_err();
        assert!(err.to_string().contains("HTTP status code 500"));
    }

    #[tokio::test]
    async fn test_init_fails_on_bad_scheme() {
        let selector = ControllerBasedSelector::new(
            ControllerConfig::new("ftp://host:9000"),
            reqwest::Client::new(),
        );
        assert!(matches!(
            selector.init().await,
            Err(PinotError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_poller_refreshes_and_skips_failures() {
        let updated = r#"{"airlineStats":[{"port":8099,"host":"h3","instanceName":"Broker_h3_8099"}]}"#;
        let (addr, hits) = serve(vec![
            (200, BODY.to_string()),
            (503, String::new()),
            (200, updated.to_string()),
        ])
        .await;
        let selector = ControllerBasedSelector::new(
            ControllerConfig::new(addr).with_update_freq(Duration::from_millis(20)),
            reqwest::Client::new(),
        );
        selector.init().await.unwrap();

        for _ in 0..200 {
            if selector.select_broker("airlineStats").is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(selector.select_broker("airlineStats").unwrap(), "h3:8099");
        assert!(hits.load(Ordering::SeqCst) >= 3);

        selector.close().await;
        let after_close = hits.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(hits.load(Ordering::SeqCst), after_close);
    }
}
