//! Protocol error types

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::status::StatusError;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Truncated data: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("Truncated frame: expected at least {expected} bytes, got {actual}")]
    TruncatedFrame { expected: usize, actual: usize },

    #[error("Invalid protocol id: {0:02x?}")]
    InvalidProtocolId([u8; 4]),

    #[error("Unknown command: {0:#06x}")]
    UnknownCommand(u16),

    #[error("Frame too large: maximum {max}, got {actual}")]
    FrameTooLarge { max: usize, actual: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Status(#[from] StatusError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
