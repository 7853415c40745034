//! Cryptographic primitives for the authentication handshake
//!
//! MD4 (for the NT password hash), HMAC-MD5 and HMAC-SHA256, the RC4
//! stream cipher used for session key exchange, and a CSPRNG source.
//! Every function here is a pure function of its inputs; nothing is kept
//! between calls.

use hmac::{Hmac, Mac};
use md5::Md5;
use rand::Rng;
use sha2::Sha256;
use thiserror::Error;

/// MD4 / HMAC-MD5 digest size
pub const MD4_SIZE: usize = 16;

/// HMAC-SHA256 digest size
pub const SHA256_SIZE: usize = 32;

/// RC4 accepts keys of 1..=256 bytes
pub const RC4_MAX_KEY: usize = 256;

const MD4_IV: [u32; 4] = [0x6745_2301, 0xefcd_ab89, 0x98ba_dcfe, 0x1032_5476];
const MD4_ROUND2: u32 = 0x5a82_7999;
const MD4_ROUND3: u32 = 0x6ed9_eba1;

type HmacMd5 = Hmac<Md5>;
type HmacSha256 = Hmac<Sha256>;

/// Crypto errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("RC4 key must not be empty")]
    EmptyKey,

    #[error("Invalid key length (maximum {max}, got {got})")]
    InvalidKeyLength { max: usize, got: usize },

    #[error("Wrong key length (expected {expected}, got {got})")]
    KeyLengthMismatch { expected: usize, got: usize },

    #[error("Invalid hex input: {0}")]
    InvalidHex(String),
}

/// Compute the MD4 digest of `data` (RFC 1320)
pub fn md4(data: &[u8]) -> [u8; MD4_SIZE] {
    let bit_len = (data.len() as u64).wrapping_mul(8);

    let mut message = Vec::with_capacity(data.len() + 72);
    message.extend_from_slice(data);
    message.push(0x80);
    while message.len() % 64 != 56 {
        message.push(0);
    }
    message.extend_from_slice(&bit_len.to_le_bytes());

    let mut state = MD4_IV;
    for block in message.chunks_exact(64) {
        md4_compress(&mut state, block);
    }

    let mut digest = [0u8; MD4_SIZE];
    for (out, word) in digest.chunks_exact_mut(4).zip(state.iter()) {
        out.copy_from_slice(&word.to_le_bytes());
    }
    digest
}

fn md4_compress(state: &mut [u32; 4], block: &[u8]) {
    let mut x = [0u32; 16];
    for (word, bytes) in x.iter_mut().zip(block.chunks_exact(4)) {
        *word = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }

    let [mut a, mut b, mut c, mut d] = *state;

    for i in [0, 4, 8, 12] {
        a = md4_step(a, md4_f(b, c, d), x[i], 0, 3);
        d = md4_step(d, md4_f(a, b, c), x[i + 1], 0, 7);
        c = md4_step(c, md4_f(d, a, b), x[i + 2], 0, 11);
        b = md4_step(b, md4_f(c, d, a), x[i + 3], 0, 19);
    }

    for i in 0..4 {
        a = md4_step(a, md4_g(b, c, d), x[i], MD4_ROUND2, 3);
        d = md4_step(d, md4_g(a, b, c), x[i + 4], MD4_ROUND2, 5);
        c = md4_step(c, md4_g(d, a, b), x[i + 8], MD4_ROUND2, 9);
        b = md4_step(b, md4_g(c, d, a), x[i + 12], MD4_ROUND2, 13);
    }

    for i in [0, 2, 1, 3] {
        a = md4_step(a, md4_h(b, c, d), x[i], MD4_ROUND3, 3);
        d = md4_step(d, md4_h(a, b, c), x[i + 8], MD4_ROUND3, 9);
        c = md4_step(c, md4_h(d, a, b), x[i + 4], MD4_ROUND3, 11);
        b = md4_step(b, md4_h(c, d, a), x[i + 12], MD4_ROUND3, 15);
    }

    state[0] = state[0].wrapping_add(a);
    state[1] = state[1].wrapping_add(b);
    state[2] = state[2].wrapping_add(c);
    state[3] = state[3].wrapping_add(d);
}

#[inline]
fn md4_step(acc: u32, mixed: u32, word: u32, constant: u32, shift: u32) -> u32 {
    acc.wrapping_add(mixed)
        .wrapping_add(word)
        .wrapping_add(constant)
        .rotate_left(shift)
}

#[inline]
fn md4_f(x: u32, y: u32, z: u32) -> u32 {
    (x & y) | (!x & z)
}

#[inline]
fn md4_g(x: u32, y: u32, z: u32) -> u32 {
    (x & y) | (x & z) | (y & z)
}

#[inline]
fn md4_h(x: u32, y: u32, z: u32) -> u32 {
    x ^ y ^ z
}

/// HMAC-MD5 (RFC 2104)
pub fn hmac_md5(key: &[u8], data: &[u8]) -> [u8; MD4_SIZE] {
    let mut mac = HmacMd5::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);

    let mut out = [0u8; MD4_SIZE];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// HMAC-SHA256 (RFC 2104)
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; SHA256_SIZE] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);

    let mut out = [0u8; SHA256_SIZE];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// One-shot RC4 over `data`
///
/// Applying it twice with the same key returns the original input.
/// Each call starts a fresh keystream, so callers must not encrypt two
/// different messages under the same key.
///
/// # Returns
/// * `Ok(Vec<u8>)` - Output of the same length as `data`
/// * `Err(CryptoError)` - Empty or over-long key
pub fn rc4(key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if key.is_empty() {
        return Err(CryptoError::EmptyKey);
    }
    if key.len() > RC4_MAX_KEY {
        return Err(CryptoError::InvalidKeyLength {
            max: RC4_MAX_KEY,
            got: key.len(),
        });
    }

    let mut s: [u8; 256] = std::array::from_fn(|i| i as u8);
    let mut j: u8 = 0;
    for i in 0..256 {
        j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
        s.swap(i, j as usize);
    }

    let (mut i, mut j) = (0u8, 0u8);
    let output = data
        .iter()
        .map(|&byte| {
            i = i.wrapping_add(1);
            j = j.wrapping_add(s[i as usize]);
            s.swap(i as usize, j as usize);
            let k = s[s[i as usize].wrapping_add(s[j as usize]) as usize];
            byte ^ k
        })
        .collect();

    Ok(output)
}

/// `count` bytes from the thread-local CSPRNG
pub fn random_bytes(count: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; count];
    rand::thread_rng().fill(&mut bytes[..]);
    bytes
}

/// Fixed-size random array (challenges, session keys)
pub fn random_array<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill(&mut bytes[..]);
    bytes
}

/// Format bytes as lowercase hex
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Parse a hex string (whitespace around it is ignored)
pub fn parse_hex(hex_str: &str) -> Result<Vec<u8>, CryptoError> {
    let hex_str = hex_str.trim();

    if hex_str.len() % 2 != 0 {
        return Err(CryptoError::InvalidHex(format!(
            "odd number of hex characters ({})",
            hex_str.len()
        )));
    }

    (0..hex_str.len())
        .step_by(2)
        .map(|i| {
            let byte_str = hex_str
                .get(i..i + 2)
                .ok_or_else(|| CryptoError::InvalidHex(format!("non-ASCII at position {}", i)))?;
            u8::from_str_radix(byte_str, 16)
                .map_err(|e| CryptoError::InvalidHex(format!("position {}: {}", i, e)))
        })
        .collect()
}
