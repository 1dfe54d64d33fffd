//! Prepared statements over `?` templates
//!
//! Parameters are substituted client-side as SQL literals; the broker only
//! ever sees the final query text.

use chrono::NaiveDateTime;
use parking_lot::RwLock;
use pinot_core::{BrokerResponse, PinotError, Result, Value};
use tracing::debug;

use crate::connection::Connection;
use crate::format::{interleave, Param};

struct Slots {
    params: Vec<Option<Param>>,
    closed: bool,
}

/// A query template bound to a table, with 1-based parameter slots.
///
/// Setters and executions may be called from several tasks at once.
pub struct PreparedStatement {
    connection: Connection,
    table: String,
    query: String,
    count: usize,
    slots: RwLock<Slots>,
}

impl PreparedStatement {
    pub(crate) fn new(connection: Connection, table: &str, template: &str) -> Result<Self> {
        if table.is_empty() {
            return Err(PinotError::Parameter("table name cannot be empty".into()));
        }
        if template.is_empty() {
            return Err(PinotError::Parameter("query template cannot be empty".into()));
        }
        let count = template.matches('?').count();
        if count == 0 {
            return Err(PinotError::Parameter(
                "query template must contain at least one parameter placeholder (?)".into(),
            ));
        }
        debug!("Prepared statement on {} with {} parameters", table, count);

        Ok(Self {
            connection,
            table: table.to_string(),
            query: template.to_string(),
            count,
            slots: RwLock::new(Slots {
                params: vec![None; count],
                closed: false,
            }),
        })
    }

    /// The template as prepared
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn parameter_count(&self) -> usize {
        self.count
    }

    /// Bind `value` to the 1-based `index`
    pub fn set(&self, index: usize, value: impl Into<Param>) -> Result<()> {
        let mut slots = self.slots.write();
        if slots.closed {
            return Err(closed());
        }
        if index < 1 || index > self.count {
            return Err(PinotError::Parameter(format!(
                "parameter index {} is out of range [1, {}]",
                index, self.count
            )));
        }
        slots.params[index - 1] = Some(value.into());
        Ok(())
    }

    pub fn set_string(&self, index: usize, value: &str) -> Result<()> {
        self.set(index, value)
    }

    pub fn set_int(&self, index: usize, value: i32) -> Result<()> {
        self.set(index, value)
    }

    pub fn set_i64(&self, index: usize, value: i64) -> Result<()> {
        self.set(index, value)
    }

    pub fn set_f64(&self, index: usize, value: f64) -> Result<()> {
        self.set(index, value)
    }

    pub fn set_bool(&self, index: usize, value: bool) -> Result<()> {
        self.set(index, value)
    }

    /// Bind an arbitrary precision number given as decimal text
    pub fn set_big_number(&self, index: usize, value: &str) -> Result<()> {
        self.set(index, Param::big_number(value)?)
    }

    pub fn set_bytes(&self, index: usize, value: &[u8]) -> Result<()> {
        self.set(index, value)
    }

    pub fn set_timestamp(&self, index: usize, value: NaiveDateTime) -> Result<()> {
        self.set(index, value)
    }

    /// Bind a dynamically typed value; null, list and map values are rejected
    pub fn set_value(&self, index: usize, value: Value) -> Result<()> {
        self.set(index, Param::try_from(value)?)
    }

    /// Run the template with the currently bound parameters
    pub async fn execute(&self) -> Result<BrokerResponse> {
        let query = {
            let slots = self.slots.read();
            if slots.closed {
                return Err(closed());
            }
            let mut bound = Vec::with_capacity(slots.params.len());
            for (i, param) in slots.params.iter().enumerate() {
                match param {
                    Some(param) => bound.push(param),
                    None => {
                        return Err(PinotError::Parameter(format!(
                            "parameter at index {} is not set",
                            i + 1
                        )))
                    }
                }
            }
            self.build_query(&bound)
        };
        self.connection.execute_sql(&self.table, &query).await
    }

    /// Run the template with `params`, ignoring the bound slots
    pub async fn execute_with_params(&self, params: &[Param]) -> Result<BrokerResponse> {
        let query = {
            let slots = self.slots.read();
            if slots.closed {
                return Err(closed());
            }
            if params.len() != self.count {
                return Err(PinotError::Parameter(format!(
                    "expected {} parameters, got {}",
                    self.count,
                    params.len()
                )));
            }
            let bound: Vec<&Param> = params.iter().collect();
            self.build_query(&bound)
        };
        self.connection.execute_sql(&self.table, &query).await
    }

    pub fn clear_parameters(&self) -> Result<()> {
        let mut slots = self.slots.write();
        if slots.closed {
            return Err(closed());
        }
        slots.params.iter_mut().for_each(|p| *p = None);
        Ok(())
    }

    /// Release the bound values; later setters and executions fail
    pub fn close(&self) -> Result<()> {
        let mut slots = self.slots.write();
        slots.closed = true;
        slots.params = Vec::new();
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.slots.read().closed
    }

    fn build_query(&self, params: &[&Param]) -> String {
        let fragments: Vec<&str> = self.query.split('?').collect();
        interleave(&fragments, params)
    }
}

fn closed() -> PinotError {
    PinotError::Parameter("prepared statement is closed".into())
}
