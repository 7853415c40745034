//! SMB2 message signing (HMAC-SHA256, dialects 2.0.2 and 2.1)

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::constants::{SIGNATURE_OFFSET, SIGNATURE_SIZE, flags};
use crate::crypto;
use crate::error::{ProtocolError, Result};
use crate::HEADER_SIZE;

const FLAGS_OFFSET: usize = 16;

fn ensure_header(message: &[u8]) -> Result<()> {
    if message.len() < HEADER_SIZE {
        return Err(ProtocolError::TruncatedFrame {
            expected: HEADER_SIZE,
            actual: message.len(),
        });
    }
    Ok(())
}

/// Set the signed flag and write the signature into `message` in place
pub fn sign(session_key: &[u8], message: &mut [u8]) -> Result<()> {
    ensure_header(message)?;

    let mut raw_flags = [0u8; 4];
    raw_flags.copy_from_slice(&message[FLAGS_OFFSET..FLAGS_OFFSET + 4]);
    let signed = u32::from_le_bytes(raw_flags) | flags::SIGNED;
    message[FLAGS_OFFSET..FLAGS_OFFSET + 4].copy_from_slice(&signed.to_le_bytes());

    let signature_range = SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_SIZE;
    message[signature_range.clone()].fill(0);
    let digest = crypto::hmac_sha256(session_key, message);
    message[signature_range].copy_from_slice(&digest[..SIGNATURE_SIZE]);
    Ok(())
}

/// Check the signature of a received message
pub fn verify(session_key: &[u8], message: &[u8]) -> Result<bool> {
    ensure_header(message)?;

    let signature = &message[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_SIZE];
    let mut mac =
        Hmac::<Sha256>::new_from_slice(session_key).expect("HMAC accepts keys of any length");
    mac.update(&message[..SIGNATURE_OFFSET]);
    mac.update(&[0u8; SIGNATURE_SIZE]);
    mac.update(&message[SIGNATURE_OFFSET + SIGNATURE_SIZE..]);

    Ok(mac.verify_truncated_left(signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Encode;
    use crate::constants::Command;
    use crate::packets::Header;

    fn message() -> Vec<u8> {
        let mut bytes = Header::new(Command::Read, 9).to_bytes().to_vec();
        bytes.extend_from_slice(b"read request body");
        bytes
    }

    #[test]
    fn test_sign_then_verify() {
        let key = [0x42u8; 16];
        let mut msg = message();
        sign(&key, &mut msg).unwrap();

        assert_ne!(&msg[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_SIZE], &[0u8; 16]);
        assert_eq!(msg[FLAGS_OFFSET] & flags::SIGNED as u8, flags::SIGNED as u8);
        assert!(verify(&key, &msg).unwrap());
    }

    #[test]
    fn test_signature_matches_hmac_over_zeroed_field() {
        let key = b"session-key";
        let mut msg = message();
        sign(key, &mut msg).unwrap();

        let mut zeroed = msg.clone();
        zeroed[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_SIZE].fill(0);
        let expected = crypto::hmac_sha256(key, &zeroed);
        assert_eq!(
            &msg[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_SIZE],
            &expected[..SIGNATURE_SIZE]
        );
    }

    #[test]
    fn test_tampered_message_fails() {
        let key = [0x42u8; 16];
        let mut msg = message();
        sign(&key, &mut msg).unwrap();

        let last = msg.len() - 1;
        msg[last] ^= 0xFF;
        assert!(!verify(&key, &msg).unwrap());
        assert!(!verify(&[0x43u8; 16], &message()).unwrap());
    }

    #[test]
    fn test_short_message() {
        let mut short = vec![0u8; HEADER_SIZE - 1];
        assert!(sign(b"k", &mut short).is_err());
        assert!(verify(b"k", &short).is_err());
    }
}
