//! Connection constructors
//!
//! Each constructor picks a broker selector and a transport from a
//! [`ClientConfig`] and initializes the selector before returning.

use std::sync::Arc;

use pinot_broker::{
    BrokerSelector, ControllerBasedSelector, DynamicBrokerSelector, SimpleBrokerSelector,
};
use pinot_core::{ClientConfig, ControllerConfig, PinotError, Result, ZookeeperConfig};
use pinot_transport::{ClientTransport, GrpcTransport, JsonHttpTransport};
use tracing::info;

use crate::connection::Connection;

impl Connection {
    /// Connect through a fixed list of `host:port` brokers
    pub async fn from_broker_list(broker_list: Vec<String>) -> Result<Self> {
        Self::with_config(ClientConfig::new().with_broker_list(broker_list)).await
    }

    /// Connect through the broker external view of `cluster` under
    /// `path_prefix` in ZooKeeper
    pub async fn from_zookeeper(
        zookeeper_path: Vec<String>,
        path_prefix: &str,
        cluster: &str,
    ) -> Result<Self> {
        let zk_config = ZookeeperConfig::new(zookeeper_path, format!("{}/{}", path_prefix, cluster));
        Self::with_config(ClientConfig::new().with_zookeeper(zk_config)).await
    }

    /// Connect through the controller's broker listing API
    pub async fn from_controller(controller_address: &str) -> Result<Self> {
        Self::with_config(
            ClientConfig::new().with_controller(ControllerConfig::new(controller_address)),
        )
        .await
    }

    pub async fn with_config(config: ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.http_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| PinotError::Configuration(format!("failed to build http client: {}", e)))?;
        Self::with_config_and_client(config, client).await
    }

    /// Like [`Connection::with_config`], reusing `client` for controller
    /// polling and HTTP queries
    pub async fn with_config_and_client(
        config: ClientConfig,
        client: reqwest::Client,
    ) -> Result<Self> {
        let transport: Arc<dyn ClientTransport> = match &config.grpc_config {
            Some(grpc_config) => Arc::new(GrpcTransport::new(grpc_config.clone())),
            None => Arc::new(
                JsonHttpTransport::new(client.clone(), config.extra_http_header.clone())
                    .with_timeout(config.http_timeout()),
            ),
        };

        // Later sources take precedence: controller, then brokers, then ZooKeeper
        let selector: Arc<dyn BrokerSelector> = if let Some(controller) = &config.controller_config {
            info!("Using controller {} for broker discovery", controller.controller_address);
            Arc::new(ControllerBasedSelector::new(controller.clone(), client))
        } else if !config.broker_list.is_empty() {
            info!("Using {} configured brokers", config.broker_list.len());
            Arc::new(SimpleBrokerSelector::new(config.broker_list.clone()))
        } else if let Some(zk_config) = &config.zk_config {
            info!("Using ZooKeeper {} for broker discovery", zk_config.connect_string());
            Arc::new(DynamicBrokerSelector::new(zk_config.clone()))
        } else {
            return Err(PinotError::Configuration(
                "please specify at least one of Pinot Zookeeper, Pinot Broker or Pinot Controller to connect"
                    .into(),
            ));
        };

        selector.init().await?;

        let connection = Connection::new(selector, transport);
        connection.use_multistage_engine(config.use_multistage_engine);
        Ok(connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_source_is_rejected() {
        let err = Connection::with_config(ClientConfig::new()).await.err().unwrap();
        assert!(matches!(err, PinotError::Configuration(_)));
        assert!(err.to_string().contains("please specify at least one of"));
    }

    #[tokio::test]
    async fn test_broker_list_connection() {
        let connection = Connection::from_broker_list(vec!["localhost:8000".into()])
            .await
            .unwrap();
        assert!(!connection.is_multistage_engine_enabled());
        connection.close().await;
    }

    #[tokio::test]
    async fn test_config_seeds_multistage_flag() {
        let config = ClientConfig::new()
            .with_broker_list(vec!["localhost:8000".into()])
            .with_multistage_engine(true);
        let connection = Connection::with_config(config).await.unwrap();
        assert!(connection.is_multistage_engine_enabled());
    }

    #[tokio::test]
    async fn test_unreachable_controller_fails_init() {
        let config = ClientConfig::new()
            .with_broker_list(vec!["localhost:8000".into()])
            .with_controller(ControllerConfig::new("http://127.0.0.1:1"));
        assert!(Connection::with_config(config).await.is_err());
    }
}
