use async_trait::async_trait;
use pinot_core::{BrokerResponse, Request, Result};

/// Sends one query to one broker and returns its decoded response
#[async_trait]
pub trait ClientTransport: Send + Sync {
    async fn execute(&self, broker_address: &str, request: &Request) -> Result<BrokerResponse>;
}
