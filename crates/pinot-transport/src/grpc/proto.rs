//! `PinotQueryBroker` service messages and client
//!
//! ```text
//! service PinotQueryBroker {
//!   rpc Submit(BrokerRequest) returns (stream BrokerResponse);
//! }
//! ```

use std::collections::HashMap;

use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;

pub const SUBMIT_PATH: &str = "/org.apache.pinot.common.proto.PinotQueryBroker/Submit";

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BrokerRequest {
    #[prost(map = "string, string", tag = "1")]
    pub metadata: HashMap<String, String>,
    #[prost(string, tag = "2")]
    pub sql: String,
}

/// One streamed response block
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BrokerResponse {
    #[prost(map = "string, string", tag = "1")]
    pub metadata: HashMap<String, String>,
    #[prost(bytes = "vec", tag = "2")]
    pub payload: Vec<u8>,
}

impl BrokerResponse {
    pub fn new(metadata: HashMap<String, String>, payload: Vec<u8>) -> Self {
        Self { metadata, payload }
    }
}

#[derive(Debug, Clone)]
pub struct PinotQueryBrokerClient {
    inner: tonic::client::Grpc<Channel>,
}

impl PinotQueryBrokerClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    pub async fn submit(
        &mut self,
        request: BrokerRequest,
    ) -> Result<tonic::Response<tonic::Streaming<BrokerResponse>>, tonic::Status> {
        self.inner.ready().await.map_err(|e| {
            tonic::Status::unavailable(format!("Service was not ready: {}", e))
        })?;
        let codec = ProstCodec::<BrokerRequest, BrokerResponse>::default();
        let path = PathAndQuery::from_static(SUBMIT_PATH);
        self.inner
            .server_streaming(tonic::Request::new(request), path, codec)
            .await
    }
}
