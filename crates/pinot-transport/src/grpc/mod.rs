//! Server-streaming gRPC query transport
//!
//! Opens one channel per call, submits the query with its options as request
//! metadata and folds the streamed blocks into a [`BrokerResponse`].

pub mod codec;
pub mod ipc;
pub mod proto;

use std::collections::HashMap;

use async_trait::async_trait;
use pinot_core::config::{DEFAULT_GRPC_COMPRESSION, DEFAULT_GRPC_ENCODING};
use pinot_core::{BrokerResponse, GrpcConfig, PinotError, Request, Result};
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, info};

use crate::tls::client_tls_config;
use crate::transport::ClientTransport;
use codec::BlockDecoder;
use proto::PinotQueryBrokerClient;

pub use codec::{decode_data_schema, decode_json_rows, decode_map};

/// Queries brokers through `PinotQueryBroker/Submit`
#[derive(Debug, Clone)]
pub struct GrpcTransport {
    config: GrpcConfig,
}

impl GrpcTransport {
    pub fn new(config: GrpcConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GrpcConfig {
        &self.config
    }

    async fn connect(&self, address: &str) -> Result<Channel> {
        let tls = client_tls_config(self.config.tls.as_ref())?;
        let scheme = if tls.is_some() { "https" } else { "http" };

        let mut endpoint = Endpoint::from_shared(format!("{}://{}", scheme, address))
            .map_err(|e| {
                PinotError::Configuration(format!("invalid grpc broker address {}: {}", address, e))
            })?;
        if let Some(timeout) = self.config.timeout() {
            endpoint = endpoint.connect_timeout(timeout).timeout(timeout);
        }
        if let Some(tls) = tls {
            endpoint = endpoint
                .tls_config(tls)
                .map_err(|e| PinotError::Configuration(format!("invalid grpc tls config: {}", e)))?;
        }

        endpoint.connect().await.map_err(|e| {
            PinotError::Transport(format!("failed to dial grpc broker {}: {}", address, e))
        })
    }

    async fn submit(&self, broker_address: &str, request: &Request) -> Result<BrokerResponse> {
        let address = normalize_address(broker_address);
        let channel = self.connect(address).await?;
        let mut client = PinotQueryBrokerClient::new(channel);

        let broker_request = proto::BrokerRequest {
            metadata: build_metadata(&self.config, request),
            sql: request.query().to_string(),
        };
        let mut stream = client
            .submit(broker_request)
            .await
            .map_err(|s| PinotError::Transport(format!("grpc submit failed: {}", s)))?
            .into_inner();

        let mut decoder = BlockDecoder::new(&self.config.encoding, &self.config.compression);
        while let Some(block) = stream
            .message()
            .await
            .map_err(|s| PinotError::Transport(format!("grpc response error: {}", s)))?
        {
            decoder.push(block)?;
        }
        debug!("Received {} grpc blocks from {}", decoder.blocks(), address);
        decoder.finish()
    }
}

#[async_trait]
impl ClientTransport for GrpcTransport {
    async fn execute(&self, broker_address: &str, request: &Request) -> Result<BrokerResponse> {
        info!("Executing query over grpc on {}", broker_address);
        match self.config.timeout() {
            Some(timeout) => tokio::time::timeout(timeout, self.submit(broker_address, request))
                .await
                .map_err(|_| {
                    PinotError::Transport(format!(
                        "grpc call to {} timed out after {}ms",
                        broker_address,
                        timeout.as_millis()
                    ))
                })?,
            None => self.submit(broker_address, request).await,
        }
    }
}

/// Strip a `grpc://` or `grpcs://` scheme
pub fn normalize_address(address: &str) -> &str {
    let address = address.strip_prefix("grpc://").unwrap_or(address);
    address.strip_prefix("grpcs://").unwrap_or(address)
}

/// Request metadata; computed keys override extra entries of the same name
pub fn build_metadata(config: &GrpcConfig, request: &Request) -> HashMap<String, String> {
    let mut metadata = config.extra_metadata.clone();
    metadata.insert(
        "blockRowSize".to_string(),
        config.effective_block_row_size().to_string(),
    );
    metadata.insert(
        "encoding".to_string(),
        non_empty_or(&config.encoding, DEFAULT_GRPC_ENCODING).to_ascii_uppercase(),
    );
    metadata.insert(
        "compression".to_string(),
        non_empty_or(&config.compression, DEFAULT_GRPC_COMPRESSION).to_ascii_uppercase(),
    );
    if let Some(options) = request.query_options(config.timeout()) {
        metadata.insert("queryOptions".to_string(), options);
    }
    if request.trace() {
        metadata.insert("trace".to_string(), "true".to_string());
    }
    metadata
}

fn non_empty_or<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() {
        default
    } else {
        value
    }
}
