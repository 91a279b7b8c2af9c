//! Bounds checks on Arrow IPC framing.
//!
//! The IPC readers size their buffers from lengths written inside the
//! payload. Every declared length is checked here against the bytes that
//! actually arrived, before a reader sees them.

use arrow::ipc::reader::read_footer_length;
use arrow::ipc::{root_as_footer, root_as_message, Block, Message, MessageHeader};

use crate::error::DecodeError;

const CONTINUATION_MARKER: u32 = 0xFFFF_FFFF;

/// Magic plus padding in front of the first message of a file.
const FILE_HEADER_LEN: usize = 8;

/// Footer length plus trailing magic at the end of a file.
const FILE_TRAILER_LEN: usize = 10;

fn frame_error(message: impl Into<String>) -> DecodeError {
    DecodeError::Arrow(message.into())
}

/// Walks the messages of an IPC stream, checking each one fits in `bytes`.
pub(super) fn check_stream(bytes: &[u8]) -> Result<(), DecodeError> {
    let mut pos = 0;

    while pos < bytes.len() {
        let mut len = read_u32(bytes, pos)?;
        pos += 4;
        if len == CONTINUATION_MARKER {
            len = read_u32(bytes, pos)?;
            pos += 4;
        }
        if len == 0 {
            break;
        }
        if len > i32::MAX as u32 {
            return Err(frame_error(format!("invalid message length {len}")));
        }

        let meta_end = span(pos, len as usize, bytes.len(), "message metadata")?;
        let message = parse_message(&bytes[pos..meta_end])?;
        let body_len = non_negative(message.bodyLength(), "message body length")?;
        check_buffers(&message, body_len)?;
        pos = span(meta_end, body_len, bytes.len(), "message body")?;
    }

    Ok(())
}

/// Checks the footer of an IPC file and every block it lists.
pub(super) fn check_file(bytes: &[u8]) -> Result<(), DecodeError> {
    let trailer_start = bytes
        .len()
        .checked_sub(FILE_TRAILER_LEN)
        .filter(|&start| start >= FILE_HEADER_LEN)
        .ok_or_else(|| frame_error("file is too short to hold a footer"))?;

    let trailer: [u8; FILE_TRAILER_LEN] = bytes[trailer_start..]
        .try_into()
        .map_err(|_| frame_error("file trailer is truncated"))?;
    let footer_len = read_footer_length(trailer)?;
    let footer_start = trailer_start
        .checked_sub(footer_len)
        .filter(|&start| start >= FILE_HEADER_LEN)
        .ok_or_else(|| frame_error(format!("footer of {footer_len} bytes exceeds the file")))?;

    let footer = root_as_footer(&bytes[footer_start..trailer_start])
        .map_err(|e| frame_error(format!("unable to read file footer: {e:?}")))?;
    if footer.schema().is_none() {
        return Err(frame_error("file footer has no schema"));
    }

    let dictionaries = footer.dictionaries();
    let batches = footer.recordBatches();
    for block in dictionaries.iter().flatten().chain(batches.iter().flatten()) {
        check_block(bytes, block, footer_start)?;
    }

    Ok(())
}

/// Checks one file block lies before `limit` and its buffers stay in its body.
fn check_block(bytes: &[u8], block: &Block, limit: usize) -> Result<(), DecodeError> {
    let offset = non_negative(block.offset(), "block offset")?;
    let meta_len = non_negative(block.metaDataLength(), "block metadata length")?;
    let body_len = non_negative(block.bodyLength(), "block body length")?;
    if meta_len < 8 {
        return Err(frame_error(format!("block metadata of {meta_len} bytes")));
    }

    let meta_end = span(offset, meta_len, limit, "block metadata")?;
    span(meta_end, body_len, limit, "block body")?;

    let meta = &bytes[offset..meta_end];
    let prefix = if meta[..4] == CONTINUATION_MARKER.to_le_bytes() {
        8
    } else {
        4
    };
    let message = parse_message(&meta[prefix..])?;
    check_buffers(&message, body_len)
}

/// Checks the array buffers a batch message points at stay inside its body.
fn check_buffers(message: &Message<'_>, body_len: usize) -> Result<(), DecodeError> {
    let batch = match message.header_type() {
        MessageHeader::RecordBatch => message.header_as_record_batch(),
        MessageHeader::DictionaryBatch => message
            .header_as_dictionary_batch()
            .and_then(|dictionary| dictionary.data()),
        _ => None,
    };

    let Some(buffers) = batch.and_then(|batch| batch.buffers()) else {
        return Ok(());
    };
    for buffer in buffers.iter() {
        let offset = non_negative(buffer.offset(), "buffer offset")?;
        let len = non_negative(buffer.length(), "buffer length")?;
        span(offset, len, body_len, "array buffer")?;
    }

    Ok(())
}

fn parse_message(bytes: &[u8]) -> Result<Message<'_>, DecodeError> {
    root_as_message(bytes).map_err(|e| frame_error(format!("unable to read message: {e:?}")))
}

fn read_u32(bytes: &[u8], pos: usize) -> Result<u32, DecodeError> {
    bytes
        .get(pos..pos + 4)
        .and_then(|b| <[u8; 4]>::try_from(b).ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| frame_error(format!("truncated message length at offset {pos}")))
}

/// Returns `start + len`, or an error when that runs past `limit`.
fn span(start: usize, len: usize, limit: usize, what: &str) -> Result<usize, DecodeError> {
    start
        .checked_add(len)
        .filter(|&end| end <= limit)
        .ok_or_else(|| {
            frame_error(format!(
                "{what} of {len} bytes at offset {start} runs past the {limit} bytes available"
            ))
        })
}

fn non_negative<T>(value: T, what: &str) -> Result<usize, DecodeError>
where
    T: Copy + std::fmt::Display,
    usize: TryFrom<T>,
{
    usize::try_from(value).map_err(|_| frame_error(format!("invalid {what} {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int64Array;
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::ipc::writer::{FileWriter, StreamWriter};
    use arrow::record_batch::RecordBatch;
    use std::sync::Arc;

    fn batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![Field::new("n", DataType::Int64, false)]));
        RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(vec![1, 2, 3]))]).unwrap()
    }

    fn stream() -> Vec<u8> {
        let batch = batch();
        let mut buf = Vec::new();
        {
            let mut writer = StreamWriter::try_new(&mut buf, &batch.schema()).unwrap();
            writer.write(&batch).unwrap();
            writer.finish().unwrap();
        }
        buf
    }

    fn file() -> Vec<u8> {
        let batch = batch();
        let mut buf = Vec::new();
        {
            let mut writer = FileWriter::try_new(&mut buf, &batch.schema()).unwrap();
            writer.write(&batch).unwrap();
            writer.finish().unwrap();
        }
        buf
    }

    #[test]
    fn test_valid_payloads_pass() {
        check_stream(&stream()).unwrap();
        check_file(&file()).unwrap();
    }

    #[test]
    fn test_stream_without_end_marker_passes() {
        let bytes = stream();
        check_stream(&bytes[..bytes.len() - 8]).unwrap();
    }

    #[test]
    fn test_oversized_metadata_length() {
        let mut bytes = stream();
        bytes[4..8].copy_from_slice(&0x7FFF_0000u32.to_le_bytes());
        assert!(matches!(check_stream(&bytes), Err(DecodeError::Arrow(_))));
    }

    #[test]
    fn test_truncated_length_prefix() {
        let bytes = stream();
        assert!(matches!(check_stream(&bytes[..6]), Err(DecodeError::Arrow(_))));
    }

    #[test]
    fn test_file_footer_longer_than_file() {
        let mut bytes = file();
        let at = bytes.len() - FILE_TRAILER_LEN;
        bytes[at..at + 4].copy_from_slice(&i32::MAX.to_le_bytes());
        assert!(matches!(check_file(&bytes), Err(DecodeError::Arrow(_))));
    }

    #[test]
    fn test_file_too_short() {
        assert!(matches!(check_file(b"ARROW1"), Err(DecodeError::Arrow(_))));
    }

    #[test]
    fn test_span() {
        assert_eq!(span(2, 3, 5, "x"), Ok(5));
        assert!(span(2, 4, 5, "x").is_err());
        assert!(span(usize::MAX, 1, usize::MAX, "x").is_err());
    }
}
