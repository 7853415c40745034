//! NTLMv2 challenge/response computation
//!
//! The session layer feeds the server challenge and target info from the
//! CHALLENGE message in here and gets back the response fields and keys
//! for the AUTHENTICATE message.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::codec::Writer;
use crate::crypto::{self, CryptoError, MD4_SIZE};

/// Seconds between 1601-01-01 and 1970-01-01
const FILETIME_EPOCH_OFFSET: u64 = 11_644_473_600;

/// Blob version bytes (RespType, HiRespType)
const BLOB_VERSION: [u8; 2] = [0x01, 0x01];

pub type Challenge = [u8; 8];
pub type SessionKey = [u8; MD4_SIZE];

/// UTF-16LE encoding used for every NTLM string
pub fn utf16le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// NTOWFv1: MD4 of the UTF-16LE password
pub fn nt_hash(password: &str) -> [u8; MD4_SIZE] {
    crypto::md4(&utf16le(password))
}

/// NTOWFv2: HMAC-MD5 keyed by the NT hash over UPPER(user) + domain
pub fn ntowf_v2(password: &str, user: &str, domain: &str) -> [u8; MD4_SIZE] {
    let identity = utf16le(&format!("{}{}", user.to_uppercase(), domain));
    crypto::hmac_md5(&nt_hash(password), &identity)
}

/// Current time as a Windows FILETIME (100ns ticks since 1601)
pub fn filetime_now() -> u64 {
    let since_unix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (since_unix.as_secs() + FILETIME_EPOCH_OFFSET) * 10_000_000
        + u64::from(since_unix.subsec_nanos()) / 100
}

/// Output of one NTLMv2 computation
#[derive(Debug, Clone)]
pub struct Ntlmv2Response {
    /// HMAC-MD5 over server challenge + client blob
    pub nt_proof: [u8; MD4_SIZE],
    /// NtChallengeResponse: proof followed by the client blob
    pub nt_response: Vec<u8>,
    /// LmChallengeResponse (LMv2)
    pub lm_response: Vec<u8>,
    pub session_base_key: SessionKey,
}

impl Ntlmv2Response {
    pub fn compute(
        response_key: &[u8; MD4_SIZE],
        server_challenge: &Challenge,
        client_challenge: &Challenge,
        timestamp: u64,
        target_info: &[u8],
    ) -> Self {
        let blob = client_blob(client_challenge, timestamp, target_info);

        let mut proof_input = Vec::with_capacity(server_challenge.len() + blob.len());
        proof_input.extend_from_slice(server_challenge);
        proof_input.extend_from_slice(&blob);
        let nt_proof = crypto::hmac_md5(response_key, &proof_input);

        let mut nt_response = Vec::with_capacity(nt_proof.len() + blob.len());
        nt_response.extend_from_slice(&nt_proof);
        nt_response.extend_from_slice(&blob);

        let mut challenges = [0u8; 16];
        challenges[..8].copy_from_slice(server_challenge);
        challenges[8..].copy_from_slice(client_challenge);
        let mut lm_response = crypto::hmac_md5(response_key, &challenges).to_vec();
        lm_response.extend_from_slice(client_challenge);

        let session_base_key = crypto::hmac_md5(response_key, &nt_proof);

        Self {
            nt_proof,
            nt_response,
            lm_response,
            session_base_key,
        }
    }
}

fn client_blob(client_challenge: &Challenge, timestamp: u64, target_info: &[u8]) -> Vec<u8> {
    let mut w = Writer::with_capacity(28 + target_info.len() + 4);
    w.put_slice(&BLOB_VERSION)
        .put_zeros(6)
        .put(timestamp)
        .put_slice(client_challenge)
        .put_zeros(4)
        .put_slice(target_info)
        .put_zeros(4);
    w.into_vec()
}

/// Session key exchange for NTLMSSP_NEGOTIATE_KEY_EXCH
#[derive(Debug, Clone)]
pub struct KeyExchange {
    /// Key used to sign and seal the session
    pub exported_session_key: SessionKey,
    /// EncryptedRandomSessionKey field of the AUTHENTICATE message
    pub encrypted_session_key: Vec<u8>,
}

impl KeyExchange {
    /// Pick a fresh random session key and wrap it with RC4
    ///
    /// The key exchange key must only ever wrap one session key.
    pub fn new(key_exchange_key: &SessionKey) -> Result<Self, CryptoError> {
        Self::with_session_key(key_exchange_key, crypto::random_array())
    }

    pub fn with_session_key(
        key_exchange_key: &SessionKey,
        exported_session_key: SessionKey,
    ) -> Result<Self, CryptoError> {
        let encrypted_session_key = crypto::rc4(key_exchange_key, &exported_session_key)?;
        Ok(Self {
            exported_session_key,
            encrypted_session_key,
        })
    }

    /// Recover the exported key from the wrapped form
    pub fn unwrap_session_key(
        key_exchange_key: &SessionKey,
        encrypted_session_key: &[u8],
    ) -> Result<SessionKey, CryptoError> {
        let plain = crypto::rc4(key_exchange_key, encrypted_session_key)?;
        let mut key = [0u8; MD4_SIZE];
        if plain.len() != key.len() {
            return Err(CryptoError::KeyLengthMismatch {
                expected: MD4_SIZE,
                got: plain.len(),
            });
        }
        key.copy_from_slice(&plain);
        Ok(key)
    }
}
