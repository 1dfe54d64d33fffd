//! Broker response shapes
//!
//! A broker answers with one JSON document (HTTP) or one JSON metadata block
//! followed by schema and row blocks (gRPC). Both end up in [`BrokerResponse`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Complete response of one query call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrokerResponse {
    /// PQL aggregation results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation_results: Option<Vec<AggregationResult>>,
    /// PQL selection results
    #[serde(alias = "SelectionResults", skip_serializing_if = "Option::is_none")]
    pub selection_results: Option<SelectionResults>,
    /// SQL result table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_table: Option<ResultTable>,
    /// Server side failures; may co-exist with a partial result
    pub exceptions: Vec<Exception>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub trace_info: HashMap<String, String>,
    pub num_servers_queried: i32,
    pub num_servers_responded: i32,
    pub num_segments_queried: i32,
    pub num_segments_processed: i32,
    pub num_segments_matched: i32,
    pub num_consuming_segments_queried: i32,
    pub num_docs_scanned: i64,
    pub num_entries_scanned_in_filter: i64,
    pub num_entries_scanned_post_filter: i64,
    pub num_groups_limit_reached: bool,
    pub total_docs: i64,
    pub time_used_ms: i32,
    pub min_consuming_freshness_time_ms: i64,
}

impl BrokerResponse {
    /// Whether the broker reported any exception
    pub fn has_exceptions(&self) -> bool {
        !self.exceptions.is_empty()
    }
}

/// PQL aggregation result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AggregationResult {
    pub function: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by_columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by_result: Option<Vec<GroupValue>>,
}

/// One group of a PQL group-by aggregation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupValue {
    pub value: String,
    pub group: Vec<String>,
}

/// PQL selection result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionResults {
    pub columns: Vec<String>,
    pub results: Vec<Vec<Value>>,
}

/// Column names and types of a result table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RespSchema {
    pub column_data_types: Vec<String>,
    pub column_names: Vec<String>,
}

impl RespSchema {
    pub fn new(column_names: Vec<String>, column_data_types: Vec<String>) -> Self {
        Self {
            column_data_types,
            column_names,
        }
    }
}

/// A server side query exception
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Exception {
    pub error_code: i32,
    pub message: String,
}

static NULL: Value = Value::Null;

/// SQL result table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResultTable {
    pub data_schema: RespSchema,
    pub rows: Vec<Vec<Value>>,
}

impl ResultTable {
    pub fn new(data_schema: RespSchema) -> Self {
        Self {
            data_schema,
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.data_schema.column_names.len()
    }

    pub fn column_name(&self, column: usize) -> Option<&str> {
        self.data_schema.column_names.get(column).map(String::as_str)
    }

    pub fn column_data_type(&self, column: usize) -> Option<&str> {
        self.data_schema
            .column_data_types
            .get(column)
            .map(String::as_str)
    }

    /// Cell at `(row, column)`. Short rows and out-of-range indexes read as Null.
    pub fn get(&self, row: usize, column: usize) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&NULL)
    }

    /// Cell rendered as text; Null reads as the empty string
    pub fn get_string(&self, row: usize, column: usize) -> String {
        self.get(row, column).to_string()
    }

    pub fn get_int(&self, row: usize, column: usize) -> i32 {
        self.get(row, column).to_i32()
    }

    pub fn get_long(&self, row: usize, column: usize) -> i64 {
        self.get(row, column).to_i64()
    }

    pub fn get_float(&self, row: usize, column: usize) -> f32 {
        self.get(row, column).to_f32()
    }

    pub fn get_double(&self, row: usize, column: usize) -> f64 {
        self.get(row, column).to_f64()
    }
}
