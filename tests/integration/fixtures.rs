//! Arrow payloads the test server replies with.

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::ipc::writer::{FileWriter, StreamWriter};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

fn stream(batch: &RecordBatch) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut writer = StreamWriter::try_new(&mut buf, &batch.schema()).unwrap();
        writer.write(batch).unwrap();
        writer.finish().unwrap();
    }
    buf
}

/// `SELECT 1 AS x`
pub fn select_one() -> Vec<u8> {
    let schema = Arc::new(Schema::new(vec![Field::new("x", DataType::Int32, false)]));
    let batch =
        RecordBatch::try_new(schema, vec![Arc::new(Int32Array::from(vec![1])) as ArrayRef])
            .unwrap();
    stream(&batch)
}

/// Zero rows with columns `a` and `b`.
pub fn empty_ab() -> Vec<u8> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("a", DataType::Int64, true),
        Field::new("b", DataType::Utf8, true),
    ]));
    stream(&RecordBatch::new_empty(schema))
}

fn daily_bar_batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("stock_code", DataType::Utf8, false),
        Field::new("close", DataType::Float64, true),
        Field::new("volume", DataType::Int64, true),
        Field::new("halted", DataType::Boolean, true),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(vec!["600000", "600519", "000001"])) as ArrayRef,
            Arc::new(Float64Array::from(vec![Some(7.12), None, Some(10.5)])),
            Arc::new(Int64Array::from(vec![Some(1200), Some(0), None])),
            Arc::new(BooleanArray::from(vec![Some(false), Some(true), None])),
        ],
    )
    .unwrap()
}

/// Three rows of mixed scalar types with nulls.
pub fn daily_bar() -> Vec<u8> {
    stream(&daily_bar_batch())
}

/// The same rows as [`daily_bar`], in the IPC file format.
pub fn daily_bar_file() -> Vec<u8> {
    let batch = daily_bar_batch();
    let mut buf = Vec::new();
    {
        let mut writer = FileWriter::try_new(&mut buf, &batch.schema()).unwrap();
        writer.write(&batch).unwrap();
        writer.finish().unwrap();
    }
    buf
}
