//! Arrow IPC payload decoding.
//!
//! Turns the bytes returned by `POST /api/query` into a [`DecodedTable`]. The
//! server writes the IPC stream format; the IPC file format is accepted too
//! and detected by its magic prefix. Decoding is all-or-nothing: any schema or
//! length mismatch fails the whole payload. Lengths declared inside the
//! payload are checked against the received bytes before anything is
//! allocated from them.
//!
//! # Type mapping
//!
//! | Arrow DataType                         | Value       |
//! |----------------------------------------|-------------|
//! | `Boolean`                              | `Bool`      |
//! | `Int8`..`Int64`, `UInt8`..`UInt64`     | `Int`       |
//! | `Float16`..`Float64`                   | `Float`     |
//! | `Utf8`, `LargeUtf8`, `Utf8View`        | `String`    |
//! | `Binary`, `LargeBinary`, fixed, view   | `Bytes`     |
//! | `Timestamp(_, _)`, `Date32`, `Date64`  | `Timestamp` |
//! | `Null`                                 | `Null`      |
//! | anything else                          | `String` (Arrow display) |

use std::any::Any;
use std::io::Cursor;
use std::panic;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::{cast_with_options, CastOptions};
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Float64Type, Int64Type, SchemaRef, TimeUnit,
};
use arrow::error::ArrowError;
use arrow::ipc::reader::{FileReader, StreamReader};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use tracing::debug;

use super::frames;
use super::types::{ColumnInfo, DecodedTable, Row, Value};
use crate::error::DecodeError;

/// Leading bytes of the Arrow IPC file format.
const ARROW_FILE_MAGIC: &[u8] = b"ARROW1";

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Decodes an Arrow IPC payload into a row-major table.
pub fn decode(bytes: &[u8]) -> Result<DecodedTable, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let (schema, batches) = read_ipc(bytes)?;

    let columns: Vec<ColumnInfo> = schema
        .fields()
        .iter()
        .map(|field| {
            ColumnInfo::new(field.name().as_str(), field.data_type().to_string())
                .with_nullable(field.is_nullable())
        })
        .collect();

    let mut rows = Vec::new();
    for batch in &batches {
        rows.extend(batch_rows(&columns, batch)?);
    }

    debug!(
        "Decoded {} batches into {} rows x {} columns",
        batches.len(),
        rows.len(),
        columns.len()
    );

    DecodedTable::try_new(columns, rows)
}

/// Checks the framing, then reads the schema and every batch.
///
/// The IPC readers panic on some inconsistent metadata (unknown type widths,
/// missing buffers); those come back as `DecodeError::Arrow` as well.
fn read_ipc(bytes: &[u8]) -> Result<(SchemaRef, Vec<RecordBatch>), DecodeError> {
    let is_file = bytes.starts_with(ARROW_FILE_MAGIC);
    if is_file {
        frames::check_file(bytes)?;
    } else {
        frames::check_stream(bytes)?;
    }

    panic::catch_unwind(|| {
        if is_file {
            read_file(bytes)
        } else {
            read_stream(bytes)
        }
    })
    .unwrap_or_else(|payload| Err(DecodeError::Arrow(panic_message(payload))))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "IPC reader failed".to_string())
}

fn read_stream(bytes: &[u8]) -> Result<(SchemaRef, Vec<RecordBatch>), DecodeError> {
    let reader = StreamReader::try_new(Cursor::new(bytes), None)?;
    let schema = reader.schema();
    let batches = reader.collect::<Result<Vec<_>, ArrowError>>()?;
    Ok((schema, batches))
}

fn read_file(bytes: &[u8]) -> Result<(SchemaRef, Vec<RecordBatch>), DecodeError> {
    let reader = FileReader::try_new(Cursor::new(bytes), None)?;
    let schema = reader.schema();
    let batches = reader.collect::<Result<Vec<_>, ArrowError>>()?;
    Ok((schema, batches))
}

/// Converts one record batch into rows, checking it against the schema columns.
fn batch_rows(columns: &[ColumnInfo], batch: &RecordBatch) -> Result<Vec<Row>, DecodeError> {
    if batch.num_columns() != columns.len() {
        return Err(DecodeError::ColumnCount {
            declared: columns.len(),
            actual: batch.num_columns(),
        });
    }

    let values = columns
        .iter()
        .zip(batch.columns())
        .map(|(column, array)| column_values(&column.name, array))
        .collect::<Result<Vec<_>, _>>()?;

    transpose(columns, batch.num_rows(), values)
}

/// Transposes column-major values into rows.
///
/// Every column must hold exactly `num_rows` values.
pub fn transpose(
    columns: &[ColumnInfo],
    num_rows: usize,
    values: Vec<Vec<Value>>,
) -> Result<Vec<Row>, DecodeError> {
    if values.len() != columns.len() {
        return Err(DecodeError::ColumnCount {
            declared: columns.len(),
            actual: values.len(),
        });
    }

    for (column, column_values) in columns.iter().zip(&values) {
        if column_values.len() != num_rows {
            return Err(DecodeError::RowCount {
                column: column.name.clone(),
                declared: num_rows,
                actual: column_values.len(),
            });
        }
    }

    let mut iters: Vec<_> = values.into_iter().map(Vec::into_iter).collect();
    let mut rows = with_capacity(num_rows)?;
    rows.extend((0..num_rows).map(|_| {
        iters
            .iter_mut()
            .map(|it| it.next().unwrap_or_default())
            .collect()
    }));

    Ok(rows)
}

/// Reserves room for `len` entries, failing instead of aborting when the
/// length declared by the payload cannot be allocated.
fn with_capacity<T>(len: usize) -> Result<Vec<T>, DecodeError> {
    let mut values = Vec::new();
    values
        .try_reserve_exact(len)
        .map_err(|_| DecodeError::TooLarge { rows: len })?;
    Ok(values)
}

/// Converts a single Arrow array into values, mapping null slots to `Value::Null`.
fn column_values(name: &str, array: &ArrayRef) -> Result<Vec<Value>, DecodeError> {
    let value_error = |e: ArrowError| DecodeError::Value {
        column: name.to_string(),
        message: e.to_string(),
    };
    // Overflow (e.g. UInt64 above i64::MAX) must fail instead of becoming null.
    let strict = CastOptions {
        safe: false,
        ..Default::default()
    };

    let values = match array.data_type() {
        DataType::Null => {
            let mut values = with_capacity(array.len())?;
            values.resize(array.len(), Value::Null);
            values
        }
        DataType::Boolean => array.as_boolean().iter().map(Value::from).collect(),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => {
            let ints = cast_with_options(array, &DataType::Int64, &strict).map_err(value_error)?;
            ints.as_primitive::<Int64Type>()
                .iter()
                .map(Value::from)
                .collect()
        }
        DataType::Float16 | DataType::Float32 | DataType::Float64 => {
            let floats =
                cast_with_options(array, &DataType::Float64, &strict).map_err(value_error)?;
            floats
                .as_primitive::<Float64Type>()
                .iter()
                .map(Value::from)
                .collect()
        }
        DataType::Utf8 => strings(array.as_string::<i32>().iter()),
        DataType::LargeUtf8 => strings(array.as_string::<i64>().iter()),
        DataType::Utf8View => strings(array.as_string_view().iter()),
        DataType::Binary => binaries(array.as_binary::<i32>().iter()),
        DataType::LargeBinary => binaries(array.as_binary::<i64>().iter()),
        DataType::BinaryView => binaries(array.as_binary_view().iter()),
        DataType::FixedSizeBinary(_) => binaries(array.as_fixed_size_binary().iter()),
        DataType::Timestamp(unit, _) => {
            let raw = cast_with_options(array, &DataType::Int64, &strict).map_err(value_error)?;
            let to_millis: fn(i64) -> i64 = match unit {
                TimeUnit::Second => |v: i64| v.saturating_mul(1_000),
                TimeUnit::Millisecond => |v: i64| v,
                TimeUnit::Microsecond => |v: i64| v.div_euclid(1_000),
                TimeUnit::Nanosecond => |v: i64| v.div_euclid(1_000_000),
            };
            epoch_millis(
                raw.as_primitive::<Int64Type>()
                    .iter()
                    .map(|v| v.map(to_millis)),
            )
        }
        DataType::Date32 => epoch_millis(
            array
                .as_primitive::<Date32Type>()
                .iter()
                .map(|days| days.map(|d| i64::from(d) * MILLIS_PER_DAY)),
        ),
        DataType::Date64 => epoch_millis(array.as_primitive::<Date64Type>().iter()),
        _ => {
            let options = FormatOptions::default();
            let formatter =
                ArrayFormatter::try_new(array.as_ref(), &options).map_err(value_error)?;
            let mut values = with_capacity(array.len())?;
            values.extend((0..array.len()).map(|i| {
                if array.is_null(i) {
                    Value::Null
                } else {
                    Value::String(formatter.value(i).to_string())
                }
            }));
            values
        }
    };

    Ok(values)
}

fn strings<'a>(iter: impl Iterator<Item = Option<&'a str>>) -> Vec<Value> {
    iter.map(Value::from).collect()
}

fn binaries<'a>(iter: impl Iterator<Item = Option<&'a [u8]>>) -> Vec<Value> {
    iter.map(Value::from).collect()
}

fn epoch_millis(iter: impl Iterator<Item = Option<i64>>) -> Vec<Value> {
    iter.map(|ms| ms.map_or(Value::Null, Value::Timestamp))
        .collect()
}
