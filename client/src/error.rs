//! Client error types

use protocol::ProtocolError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Queue '{0}' is closed")]
    QueueClosed(String),

    #[error("Queued operation aborted before completing")]
    ItemAborted,

    #[error("Invalid file handle: {0}")]
    InvalidHandle(u64),

    #[error("Path escapes the share root: {0}")]
    PathOutsideShare(String),

    #[error("Short read at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        offset: u64,
        expected: u64,
        actual: u64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

pub type Result<T> = std::result::Result<T, ClientError>;
