//! Literal substitution for `?` query templates

use chrono::{DateTime, NaiveDateTime, TimeZone};
use pinot_core::{Number, PinotError, Result, Value};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// A value bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    String(String),
    Int(i64),
    UInt(u64),
    Float32(f32),
    Float(f64),
    Bool(bool),
    /// Arbitrary precision integer or decimal, kept as text
    BigNumber(String),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
}

impl Param {
    /// Arbitrary precision number; rejects text that is not a numeric literal
    pub fn big_number(text: &str) -> Result<Self> {
        Number::parse(text)
            .map(|n| Param::BigNumber(n.as_str().to_string()))
            .ok_or_else(|| PinotError::Parameter(format!("invalid big number: {:?}", text)))
    }

    /// SQL literal for this value
    pub fn to_literal(&self) -> String {
        match self {
            Param::String(s) => quote(s),
            Param::Int(v) => v.to_string(),
            Param::UInt(v) => v.to_string(),
            Param::Float32(v) => v.to_string(),
            Param::Float(v) => v.to_string(),
            Param::Bool(v) => v.to_string(),
            Param::BigNumber(text) => format!("'{}'", text),
            Param::Bytes(bytes) => format!("'{}'", hex::encode(bytes)),
            Param::Timestamp(ts) => format!("'{}'", ts.format(TIMESTAMP_FORMAT)),
        }
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::String(v.to_string())
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Param::String(v)
    }
}

impl From<i32> for Param {
    fn from(v: i32) -> Self {
        Param::Int(v as i64)
    }
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::Int(v)
    }
}

impl From<u32> for Param {
    fn from(v: u32) -> Self {
        Param::UInt(v as u64)
    }
}

impl From<u64> for Param {
    fn from(v: u64) -> Self {
        Param::UInt(v)
    }
}

impl From<f32> for Param {
    fn from(v: f32) -> Self {
        Param::Float32(v)
    }
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Param::Float(v)
    }
}

impl From<bool> for Param {
    fn from(v: bool) -> Self {
        Param::Bool(v)
    }
}

impl From<Vec<u8>> for Param {
    fn from(v: Vec<u8>) -> Self {
        Param::Bytes(v)
    }
}

impl From<&[u8]> for Param {
    fn from(v: &[u8]) -> Self {
        Param::Bytes(v.to_vec())
    }
}

impl From<Number> for Param {
    fn from(v: Number) -> Self {
        Param::BigNumber(v.as_str().to_string())
    }
}

impl From<NaiveDateTime> for Param {
    fn from(v: NaiveDateTime) -> Self {
        Param::Timestamp(v)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Param {
    fn from(v: DateTime<Tz>) -> Self {
        Param::Timestamp(v.naive_local())
    }
}

impl TryFrom<Value> for Param {
    type Error = PinotError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Param::String(s)),
            Value::Bool(b) => Ok(Param::Bool(b)),
            Value::Number(n) => Ok(match n.as_i64() {
                Some(v) => Param::Int(v),
                None => Param::BigNumber(n.as_str().to_string()),
            }),
            Value::Bytes(b) => Ok(Param::Bytes(b)),
            Value::Null => Err(unsupported("null")),
            Value::List(_) => Err(unsupported("list")),
            Value::Map(_) => Err(unsupported("map")),
        }
    }
}

fn unsupported(kind: &str) -> PinotError {
    PinotError::Parameter(format!("unsupported type: {}", kind))
}

/// Interleave template fragments with the literals of `params`
pub(crate) fn interleave(fragments: &[&str], params: &[&Param]) -> String {
    let mut query = String::new();
    for (fragment, param) in fragments.iter().zip(params) {
        query.push_str(fragment);
        query.push_str(&param.to_literal());
    }
    if let Some(last) = fragments.get(params.len()) {
        query.push_str(last);
    }
    query
}

/// Replace each `?` in `template` with the matching parameter literal
pub fn format_query(template: &str, params: &[Param]) -> Result<String> {
    let fragments: Vec<&str> = template.split('?').collect();
    let placeholders = fragments.len() - 1;
    if placeholders != params.len() {
        return Err(PinotError::Parameter(format!(
            "number of placeholders in queryPattern ({}) does not match number of params ({})",
            placeholders,
            params.len()
        )));
    }
    let params: Vec<&Param> = params.iter().collect();
    Ok(interleave(&fragments, &params))
}
