// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Conversion of raw client values and errors into node types.

use failover_cache_node::{Reply, StoreError};
use redis::{RedisError, Value};

/// Maps a client error onto the node failure modes.
///
/// Timeouts are checked first since a socket timeout is also an I/O error.
pub(crate) fn store_error(error: RedisError) -> StoreError {
    if error.is_timeout() {
        StoreError::timed_out(error)
    } else if error.is_connection_refusal() || error.is_connection_dropped() || error.is_io_error() {
        StoreError::connection_refused(error)
    } else {
        StoreError::other(error)
    }
}

/// Decodes a reply value to text.
pub(crate) fn reply(value: Value) -> Result<Reply, StoreError> {
    match value {
        Value::Nil => Ok(Reply::Nil),
        Value::Okay => Ok(Reply::Ok),
        Value::Int(value) => Ok(Reply::Int(value)),
        Value::Boolean(value) => Ok(Reply::Int(i64::from(value))),
        Value::Double(value) => Ok(Reply::Text(value.to_string())),
        Value::SimpleString(text) | Value::VerbatimString { text, .. } => Ok(Reply::Text(text)),
        Value::BulkString(bytes) => String::from_utf8(bytes).map(Reply::Text).map_err(StoreError::protocol),
        Value::Array(items) | Value::Set(items) => list(items),
        Value::Map(pairs) => list(pairs.into_iter().flat_map(|(key, value)| [key, value])),
        Value::ServerError(error) => Err(StoreError::other(format!("server error: {error:?}"))),
        other => Err(StoreError::protocol(format!("unsupported reply: {other:?}"))),
    }
}

fn list(items: impl IntoIterator<Item = Value>) -> Result<Reply, StoreError> {
    items.into_iter().map(reply).collect::<Result<Vec<_>, _>>().map(Reply::List)
}
