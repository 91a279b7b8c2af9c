//! JSON result decoding.
//!
//! `GET /api/query?format=json` answers with
//! `{"data": [{"col": value, ...}, ...], "rowCount": n}`. Rows are objects,
//! so the server gives no column order; columns come out sorted by name.
//! Every row must carry the same keys, and `rowCount` must match `data`.

use serde::Deserialize;
use serde_json::{Map, Number};

use super::types::{ColumnInfo, DecodedTable, Row, Value};
use crate::error::DecodeError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonResult {
    data: Vec<Map<String, serde_json::Value>>,
    row_count: Option<usize>,
}

/// Element type seen in a column, widened as rows are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Null,
    Boolean,
    Int64,
    Float64,
    Utf8,
}

impl Kind {
    fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Int(_) => Self::Int64,
            Value::Float(_) => Self::Float64,
            _ => Self::Utf8,
        }
    }

    fn widen(self, other: Self) -> Self {
        match (self, other) {
            (a, b) if a == b => a,
            (Self::Null, k) | (k, Self::Null) => k,
            (Self::Int64, Self::Float64) | (Self::Float64, Self::Int64) => Self::Float64,
            _ => Self::Utf8,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Boolean => "Boolean",
            Self::Int64 => "Int64",
            Self::Float64 => "Float64",
            Self::Utf8 => "Utf8",
        }
    }

    /// Brings a cell in line with the column kind.
    fn coerce(self, value: Value) -> Value {
        match (self, value) {
            (_, Value::Null) => Value::Null,
            (Self::Float64, Value::Int(i)) => Value::Float(i as f64),
            (Self::Utf8, Value::String(s)) => Value::String(s),
            (Self::Utf8, other) => Value::String(other.to_display_string()),
            (_, other) => other,
        }
    }
}

/// Decodes a JSON query result into a table.
pub fn decode_json(text: &str) -> Result<DecodedTable, DecodeError> {
    if text.trim().is_empty() {
        return Err(DecodeError::Empty);
    }

    let result: JsonResult =
        serde_json::from_str(text).map_err(|e| DecodeError::Json(e.to_string()))?;

    if let Some(declared) = result.row_count {
        if declared != result.data.len() {
            return Err(DecodeError::Json(format!(
                "rowCount is {declared} but data holds {} rows",
                result.data.len()
            )));
        }
    }

    let names: Vec<String> = result
        .data
        .first()
        .map(|row| row.keys().cloned().collect())
        .unwrap_or_default();

    let mut kinds = vec![Kind::Null; names.len()];
    let mut rows: Vec<Row> = Vec::with_capacity(result.data.len());
    for (index, mut object) in result.data.into_iter().enumerate() {
        if object.len() != names.len() {
            return Err(DecodeError::Json(format!(
                "row {index} has {} fields, expected {}",
                object.len(),
                names.len()
            )));
        }

        let mut row = Row::with_capacity(names.len());
        for (name, kind) in names.iter().zip(kinds.iter_mut()) {
            let raw = object.remove(name).ok_or_else(|| {
                DecodeError::Json(format!("row {index} is missing column '{name}'"))
            })?;
            let value = to_value(name, raw)?;
            *kind = kind.widen(Kind::of(&value));
            row.push(value);
        }
        rows.push(row);
    }

    for row in &mut rows {
        for (cell, kind) in row.iter_mut().zip(&kinds) {
            *cell = kind.coerce(std::mem::take(cell));
        }
    }

    let columns = names
        .into_iter()
        .zip(&kinds)
        .map(|(name, kind)| ColumnInfo::new(name, kind.name()))
        .collect();

    DecodedTable::try_new(columns, rows)
}

fn to_value(column: &str, value: serde_json::Value) -> Result<Value, DecodeError> {
    Ok(match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => number(column, &n)?,
        serde_json::Value::String(s) => Value::String(s),
        nested => Value::String(nested.to_string()),
    })
}

fn number(column: &str, n: &Number) -> Result<Value, DecodeError> {
    if let Some(i) = n.as_i64() {
        return Ok(Value::Int(i));
    }
    if n.is_u64() {
        return Err(DecodeError::Value {
            column: column.to_string(),
            message: format!("{n} does not fit in a signed 64-bit integer"),
        });
    }
    n.as_f64()
        .map(Value::Float)
        .ok_or_else(|| DecodeError::Value {
            column: column.to_string(),
            message: format!("{n} is not a representable number"),
        })
}
