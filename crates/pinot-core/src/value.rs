//! Cell values of a Pinot result table
//!
//! Numbers keep the exact text the broker sent until a typed getter asks for
//! a fixed-width representation. The getters never fail: a value that does not
//! fit, or is not numeric at all, reads as zero.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A numeric literal stored as its original decimal text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Number(String);

impl Number {
    /// Parse a numeric literal, keeping its text as-is
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        let literal = trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
        if trimmed.is_empty() || !literal || trimmed.parse::<f64>().is_err() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    /// The literal exactly as received
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact integer value, if the literal is an integer within `i64`
    pub fn as_i64(&self) -> Option<i64> {
        self.0.parse::<i64>().ok()
    }

    /// Floating point value, if the literal parses as one
    pub fn as_f64(&self) -> Option<f64> {
        self.0.parse::<f64>().ok()
    }

    /// 32-bit integer view; zero when out of range or not an integer
    pub fn to_i32(&self) -> i32 {
        self.as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .unwrap_or(0)
    }

    /// 64-bit integer view; zero when out of range or not an integer
    pub fn to_i64(&self) -> i64 {
        self.as_i64().unwrap_or(0)
    }

    /// 32-bit float view; zero when not numeric
    pub fn to_f32(&self) -> f32 {
        self.to_f64() as f32
    }

    /// 64-bit float view; zero when not numeric
    pub fn to_f64(&self) -> f64 {
        self.as_f64().unwrap_or(0.0)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i32> for Number {
    fn from(v: i32) -> Self {
        Self(v.to_string())
    }
}

impl From<i64> for Number {
    fn from(v: i64) -> Self {
        Self(v.to_string())
    }
}

impl From<f32> for Number {
    fn from(v: f32) -> Self {
        Self(v.to_string())
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Self(v.to_string())
    }
}

impl From<&serde_json::Number> for Number {
    fn from(n: &serde_json::Number) -> Self {
        // arbitrary_precision keeps the source text in the JSON number
        Self(n.to_string())
    }
}

/// A single result cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Numeric view of the cell. Numeric strings are accepted too, since
    /// Pinot sends BIG_DECIMAL and friends as strings.
    fn numeric(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(n.clone()),
            Value::String(s) => Number::parse(s),
            _ => None,
        }
    }

    pub fn to_i32(&self) -> i32 {
        self.numeric().map(|n| n.to_i32()).unwrap_or(0)
    }

    pub fn to_i64(&self) -> i64 {
        self.numeric().map(|n| n.to_i64()).unwrap_or(0)
    }

    pub fn to_f32(&self) -> f32 {
        self.numeric().map(|n| n.to_f32()).unwrap_or(0.0)
    }

    pub fn to_f64(&self) -> f64 {
        self.numeric().map(|n| n.to_f64()).unwrap_or(0.0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => f.write_str(s),
            Value::Bytes(b) => {
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Value::List(_) | Value::Map(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(Number::from(&n)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => match serde_json::Number::from_str(n.as_str()) {
                Ok(number) => number.serialize(serializer),
                Err(_) => serializer.serialize_str(n.as_str()),
            },
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_bytes(b),
            Value::List(items) => items.serialize(serializer),
            Value::Map(entries) => entries.serialize(serializer),
        }
    }
}

/// Decode JSON keeping every numeric literal's original text
pub fn decode_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> crate::Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}
