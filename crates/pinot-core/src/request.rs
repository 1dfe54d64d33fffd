use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Query language of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryFormat {
    Sql,
    Pql,
}

impl QueryFormat {
    /// Key used for the query text in the JSON request body
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryFormat::Sql => "sql",
            QueryFormat::Pql => "pql",
        }
    }
}

impl fmt::Display for QueryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One query to send to a broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    query_format: QueryFormat,
    query: String,
    trace: bool,
    use_multistage_engine: bool,
}

impl Request {
    pub fn new(
        query_format: QueryFormat,
        query: impl Into<String>,
        trace: bool,
        use_multistage_engine: bool,
    ) -> Self {
        Self {
            query_format,
            query: query.into(),
            trace,
            use_multistage_engine,
        }
    }

    /// A plain SQL request without tracing
    pub fn sql(query: impl Into<String>) -> Self {
        Self::new(QueryFormat::Sql, query, false, false)
    }

    pub fn query_format(&self) -> QueryFormat {
        self.query_format
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn trace(&self) -> bool {
        self.trace
    }

    pub fn use_multistage_engine(&self) -> bool {
        self.use_multistage_engine
    }

    /// `queryOptions` value sent alongside the query, if any.
    ///
    /// `timeout` is the client side timeout; a zero duration adds nothing.
    pub fn query_options(&self, timeout: Option<Duration>) -> Option<String> {
        let mut options = Vec::new();
        if self.query_format == QueryFormat::Sql {
            options.push("groupByMode=sql;responseFormat=sql".to_string());
        }
        if self.use_multistage_engine {
            options.push("useMultistageEngine=true".to_string());
        }
        if let Some(timeout) = timeout.filter(|t| !t.is_zero()) {
            options.push(format!("timeoutMs={}", timeout.as_millis()));
        }
        if options.is_empty() {
            None
        } else {
            Some(options.join(";"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_query_options() {
        let req = Request::sql("select 1");
        assert_eq!(
            req.query_options(None).as_deref(),
            Some("groupByMode=sql;responseFormat=sql")
        );
    }

    #[test]
    fn test_all_query_options() {
        let req = Request::new(QueryFormat::Sql, "select 1", true, true);
        assert_eq!(
            req.query_options(Some(Duration::from_millis(1500))).as_deref(),
            Some("groupByMode=sql;responseFormat=sql;useMultistageEngine=true;timeoutMs=1500")
        );
    }

    #[test]
    fn test_pql_query_options() {
        let req = Request::new(QueryFormat::Pql, "select 1", false, false);
        assert_eq!(req.query_options(Some(Duration::ZERO)), None);

        let req = Request::new(QueryFormat::Pql, "select 1", false, true);
        assert_eq!(
            req.query_options(Some(Duration::from_secs(2))).as_deref(),
            Some("useMultistageEngine=true;timeoutMs=2000")
        );
    }
}
