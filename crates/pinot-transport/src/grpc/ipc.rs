//! Arrow IPC row blocks
//!
//! Each record batch is flattened row-major. The declared Pinot column type
//! picks the array type the column is read as.

use std::io::Cursor;

use arrow::array::{
    Array, ArrayRef, BinaryArray, BooleanArray, Float32Array, Float64Array, Int32Array,
    Int64Array, ListArray, StringArray,
};
use arrow::ipc::reader::StreamReader;
use pinot_core::{Number, PinotError, RespSchema, Result, Value};

use super::codec::decode_map;

/// Decode an Arrow IPC stream into rows of values
pub fn decode_arrow_rows(payload: &[u8], schema: &RespSchema) -> Result<Vec<Vec<Value>>> {
    let reader = StreamReader::try_new(Cursor::new(payload), None)
        .map_err(|e| PinotError::Protocol(format!("failed to read arrow payload: {}", e)))?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch
            .map_err(|e| PinotError::Protocol(format!("failed to read arrow payload: {}", e)))?;
        for row_idx in 0..batch.num_rows() {
            let mut row = Vec::with_capacity(batch.num_columns());
            for (col_idx, column) in batch.columns().iter().enumerate() {
                let column_type = schema
                    .column_data_types
                    .get(col_idx)
                    .map(String::as_str)
                    .unwrap_or("");
                let value = read_arrow_value(column, column_type, row_idx).map_err(|e| {
                    PinotError::Protocol(format!("failed to read arrow value: {}", e))
                })?;
                row.push(value);
            }
            rows.push(row);
        }
    }
    Ok(rows)
}

fn downcast<'a, T: 'static>(column: &'a ArrayRef, expected: &str) -> Result<&'a T> {
    column
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| PinotError::Protocol(format!("expected {} column", expected)))
}

fn read_arrow_value(column: &ArrayRef, column_type: &str, row: usize) -> Result<Value> {
    if column.is_null(row) {
        return Ok(Value::Null);
    }

    let value = match column_type.to_ascii_uppercase().as_str() {
        "BOOLEAN" => Value::Bool(downcast::<BooleanArray>(column, "BOOLEAN")?.value(row)),
        "INT" => Number::from(downcast::<Int32Array>(column, "INT")?.value(row)).into(),
        "LONG" => Number::from(downcast::<Int64Array>(column, "LONG")?.value(row)).into(),
        "FLOAT" => Number::from(downcast::<Float32Array>(column, "FLOAT")?.value(row)).into(),
        "DOUBLE" => Number::from(downcast::<Float64Array>(column, "DOUBLE")?.value(row)).into(),
        "TIMESTAMP" | "STRING" | "BYTES" | "BIG_DECIMAL" | "JSON" | "OBJECT" => {
            Value::String(downcast::<StringArray>(column, "STRING")?.value(row).to_string())
        }
        "MAP" => decode_map(downcast::<BinaryArray>(column, "MAP")?.value(row))?,
        "UNKNOWN" => Value::Null,
        "BOOLEAN_ARRAY" => read_list(column, row, "BOOLEAN_ARRAY", |items, i| {
            Ok(Value::Bool(downcast::<BooleanArray>(items, "BOOLEAN list")?.value(i)))
        })?,
        "INT_ARRAY" => read_list(column, row, "INT_ARRAY", |items, i| {
            Ok(Number::from(downcast::<Int32Array>(items, "INT list")?.value(i)).into())
        })?,
        "LONG_ARRAY" => read_list(column, row, "LONG_ARRAY", |items, i| {
            Ok(Number::from(downcast::<Int64Array>(items, "LONG list")?.value(i)).into())
        })?,
        "FLOAT_ARRAY" => read_list(column, row, "FLOAT_ARRAY", |items, i| {
            Ok(Number::from(downcast::<Float32Array>(items, "FLOAT list")?.value(i)).into())
        })?,
        "DOUBLE_ARRAY" => read_list(column, row, "DOUBLE_ARRAY", |items, i| {
            Ok(Number::from(downcast::<Float64Array>(items, "DOUBLE list")?.value(i)).into())
        })?,
        "TIMESTAMP_ARRAY" | "STRING_ARRAY" | "BYTES_ARRAY" => {
            read_list(column, row, "STRING_ARRAY", |items, i| {
                Ok(Value::String(
                    downcast::<StringArray>(items, "STRING list")?.value(i).to_string(),
                ))
            })?
        }
        _ => match column.as_any().downcast_ref::<StringArray>() {
            Some(strings) => Value::String(strings.value(row).to_string()),
            None => {
                return Err(PinotError::Protocol(format!(
                    "unexpected column type {} for {}",
                    column.data_type(),
                    column_type
                )))
            }
        },
    };
    Ok(value)
}

fn read_list<F>(column: &ArrayRef, row: usize, expected: &str, read: F) -> Result<Value>
where
    F: Fn(&ArrayRef, usize) -> Result<Value>,
{
    let list = downcast::<ListArray>(column, expected)?;
    let items = list.value(row);
    (0..items.len())
        .map(|i| {
            if items.is_null(i) {
                Ok(Value::Null)
            } else {
                read(&items, i)
            }
        })
        .collect::<Result<Vec<_>>>()
        .map(Value::List)
}
