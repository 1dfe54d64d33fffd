//! Client configuration
//!
//! Every field has a serde default so partial JSON files load cleanly.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DEFAULT_ZK_SESSION_TIMEOUT_SEC: u64 = 60;
pub const DEFAULT_CONTROLLER_UPDATE_FREQ_MS: u64 = 1000;
pub const DEFAULT_GRPC_BLOCK_ROW_SIZE: i32 = 10000;
pub const DEFAULT_GRPC_ENCODING: &str = "JSON";
pub const DEFAULT_GRPC_COMPRESSION: &str = "ZSTD";

/// Configuration used to create a connection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Extra headers sent with every query request
    pub extra_http_header: HashMap<String, String>,
    /// Discover brokers through ZooKeeper
    pub zk_config: Option<ZookeeperConfig>,
    /// Discover brokers through the controller API
    pub controller_config: Option<ControllerConfig>,
    /// Fixed broker addresses
    pub broker_list: Vec<String>,
    /// HTTP query timeout in milliseconds (0 disables it)
    pub http_timeout_ms: u64,
    /// Query over gRPC instead of HTTP when set
    pub grpc_config: Option<GrpcConfig>,
    /// Run queries on the multi-stage engine
    pub use_multistage_engine: bool,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn with_broker_list(mut self, brokers: Vec<String>) -> Self {
        self.broker_list = brokers;
        self
    }

    pub fn with_zookeeper(mut self, zk_config: ZookeeperConfig) -> Self {
        self.zk_config = Some(zk_config);
        self
    }

    pub fn with_controller(mut self, controller_config: ControllerConfig) -> Self {
        self.controller_config = Some(controller_config);
        self
    }

    pub fn with_grpc(mut self, grpc_config: GrpcConfig) -> Self {
        self.grpc_config = Some(grpc_config);
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_http_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_http_header.insert(key.into(), value.into());
        self
    }

    pub fn with_multistage_engine(mut self, enabled: bool) -> Self {
        self.use_multistage_engine = enabled;
        self
    }

    /// HTTP timeout, if one is configured
    pub fn http_timeout(&self) -> Option<Duration> {
        (self.http_timeout_ms > 0).then(|| Duration::from_millis(self.http_timeout_ms))
    }
}

/// ZooKeeper connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZookeeperConfig {
    /// ZooKeeper servers, `host:port` each
    pub zookeeper_path: Vec<String>,
    /// Cluster root, e.g. `/pinot/QuickStartCluster`
    pub path_prefix: String,
    pub session_timeout_sec: u64,
}

impl Default for ZookeeperConfig {
    fn default() -> Self {
        Self {
            zookeeper_path: Vec::new(),
            path_prefix: String::new(),
            session_timeout_sec: DEFAULT_ZK_SESSION_TIMEOUT_SEC,
        }
    }
}

impl ZookeeperConfig {
    pub fn new(zookeeper_path: Vec<String>, path_prefix: impl Into<String>) -> Self {
        Self {
            zookeeper_path,
            path_prefix: path_prefix.into(),
            ..Default::default()
        }
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_sec)
    }

    /// Connect string understood by ZooKeeper clients
    pub fn connect_string(&self) -> String {
        self.zookeeper_path.join(",")
    }
}

/// Controller based broker discovery settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Headers added to every controller API request
    pub extra_controller_api_headers: HashMap<String, String>,
    /// `host:port`, `http://host:port` or `https://host:port`
    pub controller_address: String,
    /// Broker list refresh interval in milliseconds
    pub update_freq_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            extra_controller_api_headers: HashMap::new(),
            controller_address: String::new(),
            update_freq_ms: DEFAULT_CONTROLLER_UPDATE_FREQ_MS,
        }
    }
}

impl ControllerConfig {
    pub fn new(controller_address: impl Into<String>) -> Self {
        Self {
            controller_address: controller_address.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_controller_api_headers
            .insert(key.into(), value.into());
        self
    }

    pub fn with_update_freq(mut self, freq: Duration) -> Self {
        self.update_freq_ms = freq.as_millis() as u64;
        self
    }

    /// Refresh interval; zero falls back to the default
    pub fn update_freq(&self) -> Duration {
        if self.update_freq_ms == 0 {
            Duration::from_millis(DEFAULT_CONTROLLER_UPDATE_FREQ_MS)
        } else {
            Duration::from_millis(self.update_freq_ms)
        }
    }
}

/// gRPC transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrpcConfig {
    /// Row encoding requested from the broker: `JSON` or `ARROW`
    pub encoding: String,
    /// Block compression requested from the broker
    pub compression: String,
    /// Rows per streamed block
    pub block_row_size: i32,
    /// Call deadline in milliseconds (0 disables it)
    pub timeout_ms: u64,
    /// Extra request metadata
    pub extra_metadata: HashMap<String, String>,
    pub tls: Option<GrpcTlsConfig>,
}

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            encoding: DEFAULT_GRPC_ENCODING.to_string(),
            compression: DEFAULT_GRPC_COMPRESSION.to_string(),
            block_row_size: DEFAULT_GRPC_BLOCK_ROW_SIZE,
            timeout_ms: 0,
            extra_metadata: HashMap::new(),
            tls: None,
        }
    }
}

impl GrpcConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    pub fn with_compression(mut self, compression: impl Into<String>) -> Self {
        self.compression = compression.into();
        self
    }

    pub fn with_block_row_size(mut self, block_row_size: i32) -> Self {
        self.block_row_size = block_row_size;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_tls(mut self, tls: GrpcTlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Block size sent to the broker; non-positive values use the default
    pub fn effective_block_row_size(&self) -> i32 {
        if self.block_row_size <= 0 {
            DEFAULT_GRPC_BLOCK_ROW_SIZE
        } else {
            self.block_row_size
        }
    }
}

/// TLS settings for the gRPC channel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrpcTlsConfig {
    pub enabled: bool,
    /// PEM file with the CA certificate(s) to trust
    pub ca_cert_path: Option<String>,
    /// Name to verify the server certificate against
    pub server_name: Option<String>,
    pub insecure_skip_verify: bool,
}

impl GrpcTlsConfig {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }

    pub fn with_ca_cert(mut self, path: impl Into<String>) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }

    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }
}
