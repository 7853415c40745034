//! smbcore protocol library
//!
//! Wire-level building blocks for an SMB2-style file-sharing client:
//! authentication cryptography, little-endian encoding, the NTSTATUS
//! catalog, and the fixed packet layouts built on top of them.

pub mod codec;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod ntlm;
pub mod packets;
pub mod signing;
pub mod status;

pub use constants::*;
pub use error::{ProtocolError, Result};
pub use status::{StatusCode, StatusError, StatusInfo, check_status, status_description};

/// SMB2 protocol id: 0xFE 'S' 'M' 'B'
pub const PROTOCOL_ID: [u8; 4] = [0xFE, 0x53, 0x4D, 0x42];

/// SMB2 header size
pub const HEADER_SIZE: usize = 64;

/// Largest payload a NetBIOS session frame can carry (24-bit length)
pub const MAX_SESSION_FRAME: usize = 0x00FF_FFFF;
