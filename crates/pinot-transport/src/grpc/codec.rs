//! Decoding of streamed broker response blocks
//!
//! A response stream carries, in order: one JSON metadata block, one binary
//! schema block, then any number of row blocks. Row blocks declare their
//! `rowSize`, and optionally their `encoding` and `compression`, in the block
//! metadata.

use std::collections::{BTreeMap, HashMap};

use pinot_core::config::{DEFAULT_GRPC_COMPRESSION, DEFAULT_GRPC_ENCODING};
use pinot_core::{decode_json, BrokerResponse, PinotError, RespSchema, ResultTable, Result, Value};

use super::ipc::decode_arrow_rows;
use super::proto;
use crate::compression::decompress;

/// Big-endian cursor over a block payload
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| {
                PinotError::Protocol(format!(
                    "unexpected end of payload: need {} bytes at offset {}, have {}",
                    n,
                    self.pos,
                    self.buf.len()
                ))
            })?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub(crate) fn read_i32(&mut self) -> Result<i32> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// `i32` length followed by that many bytes
    pub(crate) fn read_sized(&mut self, what: &str) -> Result<&'a [u8]> {
        let length = self.read_i32()?;
        if length < 0 {
            return Err(PinotError::Protocol(format!(
                "invalid {} length: {}",
                what, length
            )));
        }
        self.take(length as usize)
    }

    pub(crate) fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_sized("schema string")?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| PinotError::Protocol(format!("invalid utf-8 string: {}", e)))
    }
}

/// Column count, names, then types
pub fn decode_data_schema(payload: &[u8]) -> Result<RespSchema> {
    let mut reader = ByteReader::new(payload);
    let count = reader.read_i32().map_err(|e| {
        PinotError::Protocol(format!("failed to read schema column count: {}", e))
    })?;
    if count < 0 {
        return Err(PinotError::Protocol(format!(
            "invalid schema column count: {}",
            count
        )));
    }

    let mut names = Vec::new();
    for _ in 0..count {
        names.push(reader.read_string().map_err(|e| {
            PinotError::Protocol(format!("failed to read schema column name: {}", e))
        })?);
    }
    let mut types = Vec::new();
    for _ in 0..count {
        types.push(reader.read_string().map_err(|e| {
            PinotError::Protocol(format!("failed to read schema column type: {}", e))
        })?);
    }
    Ok(RespSchema::new(names, types))
}

/// `row_size` length-prefixed JSON arrays
pub fn decode_json_rows(payload: &[u8], row_size: i32) -> Result<Vec<Vec<Value>>> {
    if row_size <= 0 {
        return Ok(Vec::new());
    }
    let mut reader = ByteReader::new(payload);
    // Every row carries at least its 4-byte length prefix
    let mut rows = Vec::with_capacity((row_size as usize).min(payload.len() / 4));
    for _ in 0..row_size {
        let bytes = reader
            .read_sized("row")
            .map_err(|e| PinotError::Protocol(format!("failed to read row: {}", e)))?;
        let row: Vec<Value> = decode_json(bytes)
            .map_err(|e| PinotError::Protocol(format!("failed to decode row json: {}", e)))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Binary MAP cell: entry count, then length-prefixed keys and JSON values
pub fn decode_map(payload: &[u8]) -> Result<Value> {
    let mut reader = ByteReader::new(payload);
    let size = reader.read_i32()?;
    if size < 0 {
        return Err(PinotError::Protocol(format!("invalid map size: {}", size)));
    }
    let mut entries = BTreeMap::new();
    for _ in 0..size {
        let key = reader.read_string()?;
        let value: Value = decode_json(reader.read_sized("map value")?)?;
        entries.insert(key, value);
    }
    Ok(Value::Map(entries))
}

pub(crate) fn parse_row_size(metadata: &HashMap<String, String>) -> Result<i32> {
    let value = metadata
        .get("rowSize")
        .ok_or_else(|| PinotError::Protocol("grpc response metadata missing rowSize".to_string()))?;
    value.trim().parse::<i32>().map_err(|e| {
        PinotError::Protocol(format!("invalid grpc rowSize {:?}: {}", value, e))
    })
}

/// First non-empty of the block setting, the configured setting and the default
fn pick<'a>(block: Option<&'a String>, configured: &'a str, default: &'a str) -> &'a str {
    block
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .or(Some(configured).filter(|s| !s.is_empty()))
        .unwrap_or(default)
}

/// Folds streamed blocks into one [`BrokerResponse`]
#[derive(Debug)]
pub struct BlockDecoder {
    encoding: String,
    compression: String,
    response: Option<BrokerResponse>,
    schema_received: bool,
    blocks: usize,
}

impl BlockDecoder {
    /// `encoding` and `compression` apply to blocks that do not declare their own
    pub fn new(encoding: impl Into<String>, compression: impl Into<String>) -> Self {
        Self {
            encoding: encoding.into(),
            compression: compression.into(),
            response: None,
            schema_received: false,
            blocks: 0,
        }
    }

    pub fn push(&mut self, block: proto::BrokerResponse) -> Result<()> {
        self.blocks += 1;

        let Some(response) = self.response.as_mut() else {
            let response: BrokerResponse = decode_json(&block.payload).map_err(|e| {
                PinotError::Protocol(format!("failed to decode grpc metadata block: {}", e))
            })?;
            self.response = Some(response);
            return Ok(());
        };

        if !self.schema_received {
            let schema = decode_data_schema(&block.payload).map_err(|e| {
                PinotError::Protocol(format!("failed to decode grpc schema block: {}", e))
            })?;
            match response.result_table.as_mut() {
                Some(table) => table.data_schema = schema,
                None => response.result_table = Some(ResultTable::new(schema)),
            }
            self.schema_received = true;
            return Ok(());
        }

        let row_size = parse_row_size(&block.metadata)?;
        let encoding = pick(
            block.metadata.get("encoding"),
            &self.encoding,
            DEFAULT_GRPC_ENCODING,
        )
        .to_ascii_uppercase();
        let compression = pick(
            block.metadata.get("compression"),
            &self.compression,
            DEFAULT_GRPC_COMPRESSION,
        );
        let payload = decompress(&block.payload, compression)?;

        let table = response
            .result_table
            .get_or_insert_with(ResultTable::default);
        let rows = match encoding.as_str() {
            "JSON" => decode_json_rows(&payload, row_size)?,
            "ARROW" => decode_arrow_rows(&payload, &table.data_schema)?,
            other => {
                return Err(PinotError::Protocol(format!(
                    "unsupported grpc encoding: {}",
                    other
                )))
            }
        };
        table.rows.extend(rows);
        Ok(())
    }

    /// Number of blocks pushed so far
    pub fn blocks(&self) -> usize {
        self.blocks
    }

    pub fn finish(self) -> Result<BrokerResponse> {
        let response = self.response.ok_or_else(|| {
            PinotError::Protocol("no grpc response payload received".to_string())
        })?;
        if !self.schema_received {
            return Err(PinotError::Protocol(
                "grpc stream ended after the metadata block without a schema".to_string(),
            ));
        }
        Ok(response)
    }
}
