//! SMB2 packet structures
//!
//! The 64-byte message header, the ERROR response body, and the NetBIOS
//! direct-TCP framing that carries every message on port 445.

use bytes::{Buf, Bytes, BytesMut};

use crate::codec::{Decode, Encode, Reader, Writer};
use crate::constants::{Command, ERROR_STRUCTURE_SIZE, flags};
use crate::error::{ProtocolError, Result};
use crate::status::{StatusCode, StatusError};
use crate::{HEADER_SIZE, MAX_SESSION_FRAME, PROTOCOL_ID};

/// SMB2 sync header (64 bytes)
///
/// ```text
///  0 ProtocolId (4)     4 StructureSize (2)  6 CreditCharge (2)
///  8 Status (4)        12 Command (2)       14 CreditRequest (2)
/// 16 Flags (4)         20 NextCommand (4)   24 MessageId (8)
/// 32 ProcessId (4)     36 TreeId (4)        40 SessionId (8)
/// 48 Signature (16)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub credit_charge: u16,
    /// Raw NTSTATUS (requests send 0)
    pub status: u32,
    pub command: Command,
    /// CreditRequest on requests, CreditResponse on responses
    pub credits: u16,
    pub flags: u32,
    pub next_command: u32,
    pub message_id: u64,
    pub process_id: u32,
    pub tree_id: u32,
    pub session_id: u64,
    pub signature: [u8; 16],
}

impl Header {
    pub const SIZE: usize = HEADER_SIZE;

    /// Request header with one credit charged and one requested
    pub fn new(command: Command, message_id: u64) -> Self {
        Self {
            credit_charge: 1,
            status: 0,
            command,
            credits: 1,
            flags: 0,
            next_command: 0,
            message_id,
            process_id: 0,
            tree_id: 0,
            session_id: 0,
            signature: [0u8; 16],
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u32(self.status)
    }

    pub fn is_response(&self) -> bool {
        self.flags & flags::SERVER_TO_REDIR != 0
    }

    pub fn is_signed(&self) -> bool {
        self.flags & flags::SIGNED != 0
    }

    /// AsyncId overlays ProcessId/TreeId when the async flag is set
    pub fn async_id(&self) -> Option<u64> {
        if self.flags & flags::ASYNC_COMMAND != 0 {
            Some(u64::from(self.process_id) | (u64::from(self.tree_id) << 32))
        } else {
            None
        }
    }
}

impl Encode for Header {
    fn encode(&self, w: &mut Writer) {
        w.put_slice(&PROTOCOL_ID)
            .put(Self::SIZE as u16)
            .put(self.credit_charge)
            .put(self.status)
            .put(self.command.to_u16())
            .put(self.credits)
            .put(self.flags)
            .put(self.next_command)
            .put(self.message_id)
            .put(self.process_id)
            .put(self.tree_id)
            .put(self.session_id)
            .put_slice(&self.signature);
    }
}

impl Header {
    /// Read all 64 bytes without judging the protocol id or command
    fn decode_raw(r: &mut Reader<'_>) -> Result<([u8; 4], Self)> {
        if r.remaining() < Self::SIZE {
            return Err(ProtocolError::TruncatedFrame {
                expected: Self::SIZE,
                actual: r.remaining(),
            });
        }

        let protocol_id = r.array::<4>()?;
        // StructureSize is fixed at 64
        r.skip(2)?;

        let header = Self {
            credit_charge: r.get()?,
            status: r.get()?,
            command: Command::from_raw(r.get()?),
            credits: r.get()?,
            flags: r.get()?,
            next_command: r.get()?,
            message_id: r.get()?,
            process_id: r.get()?,
            tree_id: r.get()?,
            session_id: r.get()?,
            signature: r.array()?,
        };
        Ok((protocol_id, header))
    }
}

impl Decode for Header {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let (protocol_id, header) = Self::decode_raw(r)?;
        if protocol_id != PROTOCOL_ID {
            return Err(ProtocolError::InvalidProtocolId(protocol_id));
        }
        if let Command::Unknown(raw) = header.command {
            return Err(ProtocolError::UnknownCommand(raw));
        }
        Ok(header)
    }
}

/// SMB2 ERROR response
///
/// Header, then StructureSize (2), ErrorContextCount (1), Reserved (1),
/// ByteCount (4) and the raw error data. The error contexts themselves are
/// kept as opaque bytes.
///
/// Parsing only fails on a short buffer. An unexpected protocol id or an
/// unlisted command is kept as-is so the status is never lost.
#[derive(Debug, Clone)]
pub struct ErrorFrame {
    protocol_id: [u8; 4],
    header: Header,
    structure_size: u16,
    error_context_count: u8,
    reserved: u8,
    byte_count: u32,
    error_data: Bytes,
}

impl ErrorFrame {
    /// Header plus the fixed part of the error body
    pub const MIN_SIZE: usize = HEADER_SIZE + 8;

    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::MIN_SIZE {
            return Err(ProtocolError::TruncatedFrame {
                expected: Self::MIN_SIZE,
                actual: buf.len(),
            });
        }

        let mut r = Reader::new(buf);
        let (protocol_id, header) = Header::decode_raw(&mut r)?;
        let structure_size = r.get()?;
        let error_context_count = r.get()?;
        let reserved = r.get()?;
        let byte_count: u32 = r.get()?;

        let available = r.remaining().min(byte_count as usize);
        let error_data = Bytes::copy_from_slice(r.take(available)?);

        Ok(Self {
            protocol_id,
            header,
            structure_size,
            error_context_count,
            reserved,
            byte_count,
            error_data,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn protocol_id(&self) -> [u8; 4] {
        self.protocol_id
    }

    pub fn is_smb2(&self) -> bool {
        self.protocol_id == PROTOCOL_ID
    }

    pub fn status(&self) -> StatusCode {
        self.header.status()
    }

    pub fn structure_size(&self) -> u16 {
        self.structure_size
    }

    pub fn has_expected_structure_size(&self) -> bool {
        self.structure_size == ERROR_STRUCTURE_SIZE
    }

    pub fn error_context_count(&self) -> u8 {
        self.error_context_count
    }

    pub fn reserved(&self) -> u8 {
        self.reserved
    }

    pub fn byte_count(&self) -> u32 {
        self.byte_count
    }

    pub fn error_data(&self) -> &[u8] {
        &self.error_data
    }

    pub fn description(&self) -> String {
        self.status().description()
    }

    pub fn localized_description(&self) -> String {
        self.status().localized_description()
    }

    pub fn into_error(self) -> StatusError {
        StatusError::new(self.status())
    }
}

/// NetBIOS session message type
const SESSION_MESSAGE: u8 = 0x00;
/// NetBIOS keep-alive, carries no payload
const SESSION_KEEP_ALIVE: u8 = 0x85;
/// Type byte + 24-bit length
pub const SESSION_PREFIX_SIZE: usize = 4;

/// Wrap one SMB2 message in a NetBIOS session frame
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────────────┬─────────────────┐
/// │ Type (1) │ Length (3B BE)   │ Message         │
/// │ 0x00     │                  │ (Length bytes)  │
/// └──────────┴──────────────────┴─────────────────┘
/// ```
pub fn encode_session_frame(message: &[u8]) -> Result<Bytes> {
    if message.len() > MAX_SESSION_FRAME {
        return Err(ProtocolError::FrameTooLarge {
            max: MAX_SESSION_FRAME,
            actual: message.len(),
        });
    }

    let mut w = Writer::with_capacity(SESSION_PREFIX_SIZE + message.len());
    w.put_be(message.len() as u32).put_slice(message);
    Ok(w.freeze())
}

/// Pull one complete session frame off the front of `src`
///
/// Returns `Ok(None)` until a whole frame is buffered. Keep-alives are
/// consumed silently.
pub fn decode_session_frame(src: &mut BytesMut) -> Result<Option<Bytes>> {
    loop {
        if src.len() < SESSION_PREFIX_SIZE {
            return Ok(None);
        }

        let prefix = Reader::new(&src[..SESSION_PREFIX_SIZE]).get_be::<u32>()?;
        let kind = (prefix >> 24) as u8;
        let length = (prefix & 0x00FF_FFFF) as usize;

        if kind != SESSION_MESSAGE && kind != SESSION_KEEP_ALIVE {
            return Err(ProtocolError::InvalidInput(format!(
                "unexpected NetBIOS session packet type 0x{:02x}",
                kind
            )));
        }

        if src.len() < SESSION_PREFIX_SIZE + length {
            return Ok(None);
        }

        src.advance(SESSION_PREFIX_SIZE);
        let message = src.split_to(length).freeze();
        if kind == SESSION_MESSAGE {
            return Ok(Some(message));
        }
    }
}
