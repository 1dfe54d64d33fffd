//! Connection to a Pinot cluster

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pinot_broker::BrokerSelector;
use pinot_core::{BrokerResponse, PinotError, QueryFormat, Request, Result};
use pinot_transport::ClientTransport;
use tracing::{debug, info};

use crate::format::{format_query, Param};
use crate::prepared::PreparedStatement;

/// Routes queries to brokers chosen by a [`BrokerSelector`].
///
/// Cloning is cheap; clones share the selector, the transport and the
/// trace and multi-stage flags.
#[derive(Clone)]
pub struct Connection {
    selector: Arc<dyn BrokerSelector>,
    transport: Arc<dyn ClientTransport>,
    trace: Arc<AtomicBool>,
    use_multistage_engine: Arc<AtomicBool>,
}

impl Connection {
    /// Wrap an initialized selector and a transport
    pub fn new(selector: Arc<dyn BrokerSelector>, transport: Arc<dyn ClientTransport>) -> Self {
        Self {
            selector,
            transport,
            trace: Arc::new(AtomicBool::new(false)),
            use_multistage_engine: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn open_trace(&self) {
        self.trace.store(true, Ordering::SeqCst);
    }

    pub fn close_trace(&self) {
        self.trace.store(false, Ordering::SeqCst);
    }

    pub fn is_trace_enabled(&self) -> bool {
        self.trace.load(Ordering::SeqCst)
    }

    pub fn use_multistage_engine(&self, enabled: bool) {
        self.use_multistage_engine.store(enabled, Ordering::SeqCst);
    }

    pub fn is_multistage_engine_enabled(&self) -> bool {
        self.use_multistage_engine.load(Ordering::SeqCst)
    }

    /// Run `query` on a broker serving `table`
    pub async fn execute_sql(&self, table: &str, query: &str) -> Result<BrokerResponse> {
        let broker = self
            .selector
            .select_broker(table)
            .map_err(|e| PinotError::broker_unavailable(table, e))?;
        debug!("Selected broker {} for table {}", broker, table);

        let request = Request::new(
            QueryFormat::Sql,
            query,
            self.is_trace_enabled(),
            self.is_multistage_engine_enabled(),
        );
        self.transport
            .execute(&broker, &request)
            .await
            .map_err(|e| PinotError::query_failed(query, e))
    }

    /// Substitute `params` into the `?` placeholders of `template`, then run it
    pub async fn execute_sql_with_params(
        &self,
        table: &str,
        template: &str,
        params: &[Param],
    ) -> Result<BrokerResponse> {
        let query = format_query(template, params)?;
        self.execute_sql(table, &query).await
    }

    /// Prepare a `?` template for repeated execution against `table`
    pub fn prepare(&self, table: &str, template: &str) -> Result<PreparedStatement> {
        PreparedStatement::new(self.clone(), table, template)
    }

    /// Stop background broker refresh. Queries keep using the last broker map.
    pub async fn close(&self) {
        self.selector.close().await;
        info!("Pinot connection closed");
    }
}
