//! JSON over HTTP query transport

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use pinot_core::{decode_json, BrokerResponse, PinotError, QueryFormat, Request, Result};
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::transport::ClientTransport;

const CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Posts queries to the broker's `/query/sql` (or `/query`) endpoint
#[derive(Debug, Clone)]
pub struct JsonHttpTransport {
    client: reqwest::Client,
    headers: HashMap<String, String>,
    timeout: Option<Duration>,
}

impl JsonHttpTransport {
    pub fn new(client: reqwest::Client, headers: HashMap<String, String>) -> Self {
        Self {
            client,
            headers,
            timeout: None,
        }
    }

    /// Bound each request and ask the broker for the same `timeoutMs`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Query endpoint URL for a broker address
pub fn query_url(format: QueryFormat, broker_address: &str) -> String {
    let path = match format {
        QueryFormat::Sql => "/query/sql",
        QueryFormat::Pql => "/query",
    };
    if broker_address.starts_with("http://") || broker_address.starts_with("https://") {
        format!("{}{}", broker_address, path)
    } else {
        format!("http://{}{}", broker_address, path)
    }
}

/// JSON request body: the query under its format key, plus options
pub fn request_body(request: &Request, timeout: Option<Duration>) -> JsonValue {
    let mut body = Map::new();
    body.insert(
        request.query_format().as_str().to_string(),
        JsonValue::String(request.query().to_string()),
    );
    if let Some(options) = request.query_options(timeout) {
        body.insert("queryOptions".to_string(), JsonValue::String(options));
    }
    if request.trace() {
        body.insert("trace".to_string(), JsonValue::String("true".to_string()));
    }
    JsonValue::Object(body)
}

#[async_trait]
impl ClientTransport for JsonHttpTransport {
    async fn execute(&self, broker_address: &str, request: &Request) -> Result<BrokerResponse> {
        let url = query_url(request.query_format(), broker_address);
        let body = serde_json::to_vec(&request_body(request, self.timeout))?;
        debug!("Posting query to {}", url);

        let mut builder = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .body(body);
        for (key, value) in &self.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            PinotError::Transport(format!("got exceptions during sending request. {}", e))
        })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(PinotError::Transport(format!(
                "caught http exception when querying Pinot: {}",
                status
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            PinotError::Transport(format!("unable to read Pinot response. {}", e))
        })?;
        decode_json(&bytes).map_err(|e| {
            PinotError::Protocol(format!(
                "unable to unmarshal json response to a brokerResponse structure. {}",
                e
            ))
        })
    }
}
