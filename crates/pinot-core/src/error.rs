use thiserror::Error;

#[derive(Error, Debug)]
pub enum PinotError {
    /// The client was configured in a way that cannot work, e.g. no broker source.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No broker could be resolved for a table.
    #[error("Broker selection error: {0}")]
    Selection(String),

    /// Dialing, HTTP status, RPC and deadline failures.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed or unsupported data on the wire.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Misuse of a prepared statement or query template.
    #[error("Parameter error: {0}")]
    Parameter(String),

    #[error("unable to find an available broker for table {table}: {source}")]
    BrokerUnavailable {
        table: String,
        #[source]
        source: Box<PinotError>,
    },

    #[error("caught exception to execute SQL query {query}: {source}")]
    QueryFailed {
        query: String,
        #[source]
        source: Box<PinotError>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PinotError {
    /// Wrap a selector failure with the table it was resolving.
    pub fn broker_unavailable(table: impl Into<String>, source: PinotError) -> Self {
        PinotError::BrokerUnavailable {
            table: table.into(),
            source: Box::new(source),
        }
    }

    /// Wrap a transport failure with the query it was executing.
    pub fn query_failed(query: impl Into<String>, source: PinotError) -> Self {
        PinotError::QueryFailed {
            query: query.into(),
            source: Box::new(source),
        }
    }

    /// The innermost error, looking through call-site context wrappers.
    pub fn root_cause(&self) -> &PinotError {
        match self {
            PinotError::BrokerUnavailable { source, .. } | PinotError::QueryFailed { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, PinotError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_context_wrappers_keep_cause() {
        let err = PinotError::query_failed(
            "select 1",
            PinotError::broker_unavailable("t", PinotError::Selection("no broker".into())),
        );
        assert!(matches!(err.root_cause(), PinotError::Selection(msg) if msg == "no broker"));
        assert!(err.source().is_some());
        assert!(err.to_string().contains("select 1"));
    }
}
