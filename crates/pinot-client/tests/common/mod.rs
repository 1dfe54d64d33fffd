#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pinot_client::{BrokerResponse, BrokerSelector, ClientTransport, Connection, PinotError, Result};
use pinot_core::Request;

/// Always picks the same broker, or fails when `broker` is empty
pub struct FixedSelector {
    pub broker: String,
    pub closed: AtomicBool,
}

impl FixedSelector {
    pub fn new(broker: &str) -> Arc<Self> {
        Arc::new(Self {
            broker: broker.to_string(),
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl BrokerSelector for FixedSelector {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    fn select_broker(&self, table: &str) -> Result<String> {
        if self.broker.is_empty() {
            return Err(PinotError::Selection(format!(
                "No available broker found for table: {}",
                table
            )));
        }
        Ok(self.broker.clone())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Records every request and answers with an empty response or a fixed error
#[derive(Default)]
pub struct RecordingTransport {
    pub calls: Mutex<Vec<(String, Request)>>,
    pub fail_with: Option<String>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_with: Some(message.to_string()),
        })
    }

    pub fn queries(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(|(_, request)| request.query().to_string())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl ClientTransport for RecordingTransport {
    async fn execute(&self, broker_address: &str, request: &Request) -> Result<BrokerResponse> {
        self.calls
            .lock()
            .push((broker_address.to_string(), request.clone()));
        match &self.fail_with {
            Some(message) => Err(PinotError::Transport(message.clone())),
            None => Ok(BrokerResponse::default()),
        }
    }
}

pub fn connection(selector: Arc<FixedSelector>, transport: Arc<RecordingTransport>) -> Connection {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Connection::new(selector, transport)
}
