//! Payload codec: structured value <-> printable ciphertext blob.
//!
//! Pipeline (seal):  serde_json → RSA-OAEP → base64 (standard alphabet)
//! Pipeline (open):  base64 → RSA-OAEP → serde_json
//!
//! # Size ceiling
//! A single OAEP block carries at most `k - 2*32 - 2` bytes of serialised
//! JSON (190 bytes with a 2048-bit key). With `ChunkingMode::Disabled`
//! anything larger fails with `PayloadTooLarge`.
//!
//! # Chunked envelope
//! With `ChunkingMode::Enabled`, an oversized payload is split into
//! ceiling-sized slices, each sealed independently:
//!
//!   chunked:v1:<count>:<b64 block>,<b64 block>,...
//!
//! `:` and `,` are outside the standard base64 alphabet, so a single-block
//! blob can never be mistaken for an envelope. Payloads that fit in one
//! block are always written in the single-block form.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::error::CryptoError;
use crate::keys::KeyPair;
use crate::oaep;

const CHUNK_PREFIX: &str = "chunked:v1:";

/// Hard ceiling on blocks in one envelope. Sealing never exceeds it and
/// opening accepts anything up to it, whatever either side's `max_chunks`.
pub const MAX_ENVELOPE_BLOCKS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ChunkingMode {
    /// Oversized payloads are rejected.
    Disabled,
    /// Oversized payloads are split into at most `max_chunks` blocks.
    Enabled { max_chunks: usize },
}

impl Default for ChunkingMode {
    fn default() -> Self {
        Self::Disabled
    }
}

impl ChunkingMode {
    /// `max_chunks` must lie in `1..=MAX_ENVELOPE_BLOCKS`.
    pub fn validate(&self) -> Result<(), CryptoError> {
        match *self {
            ChunkingMode::Enabled { max_chunks }
                if max_chunks == 0 || max_chunks > MAX_ENVELOPE_BLOCKS =>
            {
                Err(CryptoError::Envelope(format!(
                    "max_chunks {max_chunks} outside 1..={MAX_ENVELOPE_BLOCKS}"
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Seals and opens payloads under one key pair. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CipherCodec {
    keys: Arc<KeyPair>,
    chunking: ChunkingMode,
}

impl CipherCodec {
    pub fn new(keys: KeyPair) -> Self {
        Self::from_shared(Arc::new(keys))
    }

    pub fn from_shared(keys: Arc<KeyPair>) -> Self {
        Self {
            keys,
            chunking: ChunkingMode::default(),
        }
    }

    pub fn with_chunking(mut self, chunking: ChunkingMode) -> Self {
        self.chunking = chunking;
        self
    }

    /// Serialised-size ceiling of a single block.
    pub fn max_payload_len(&self) -> usize {
        self.keys.max_plaintext_len()
    }

    /// Serialise `payload` and seal it into a transport string.
    pub fn encrypt<T>(&self, payload: &T) -> Result<String, CryptoError>
    where
        T: Serialize + ?Sized,
    {
        let plaintext = serde_json::to_vec(payload).map_err(CryptoError::Serialisation)?;
        self.encrypt_bytes(&plaintext)
    }

    /// Open a transport string and deserialise the payload.
    pub fn decrypt<T>(&self, blob: &str) -> Result<T, CryptoError>
    where
        T: DeserializeOwned,
    {
        let plaintext = self.decrypt_bytes(blob)?;
        serde_json::from_slice(&plaintext).map_err(CryptoError::Deserialisation)
    }

    pub fn encrypt_bytes(&self, plaintext: &[u8]) -> Result<String, CryptoError> {
        let limit = self.max_payload_len();
        if plaintext.len() <= limit {
            let ct = oaep::encrypt(self.keys.public(), plaintext)?;
            return Ok(STANDARD.encode(ct));
        }

        let max_chunks = match self.chunking {
            ChunkingMode::Disabled => {
                return Err(CryptoError::PayloadTooLarge {
                    size: plaintext.len(),
                    limit,
                })
            }
            ChunkingMode::Enabled { max_chunks } => max_chunks.min(MAX_ENVELOPE_BLOCKS),
        };

        let count = plaintext.len().div_ceil(limit);
        if count > max_chunks {
            return Err(CryptoError::PayloadTooLarge {
                size: plaintext.len(),
                limit: limit * max_chunks,
            });
        }

        let blocks = plaintext
            .chunks(limit)
            .map(|slice| oaep::encrypt(self.keys.public(), slice).map(|ct| STANDARD.encode(ct)))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(size = plaintext.len(), count, "sealed payload as chunked envelope");
        Ok(format!("{CHUNK_PREFIX}{count}:{}", blocks.join(",")))
    }

    pub fn decrypt_bytes(&self, blob: &str) -> Result<Vec<u8>, CryptoError> {
        let blob = blob.trim();
        match blob.strip_prefix(CHUNK_PREFIX) {
            Some(rest) => self.open_envelope(rest),
            None => {
                let ct = STANDARD.decode(blob)?;
                oaep::decrypt(self.keys.private(), &ct)
            }
        }
    }

    fn open_envelope(&self, rest: &str) -> Result<Vec<u8>, CryptoError> {
        let (count, body) = rest
            .split_once(':')
            .ok_or_else(|| CryptoError::Envelope("missing block count".into()))?;
        let count: usize = count
            .parse()
            .map_err(|_| CryptoError::Envelope(format!("invalid block count {count:?}")))?;

        if count == 0 || count > MAX_ENVELOPE_BLOCKS {
            return Err(CryptoError::Envelope(format!(
                "block count {count} outside 1..={MAX_ENVELOPE_BLOCKS}"
            )));
        }

        let blocks: Vec<&str> = body.split(',').collect();
        if blocks.len() != count {
            return Err(CryptoError::Envelope(format!(
                "header declares {count} blocks, found {}",
                blocks.len()
            )));
        }

        let mut out = Vec::with_capacity(count * self.max_payload_len());
        for block in blocks {
            let ct = STANDARD.decode(block)?;
            out.extend_from_slice(&oaep::decrypt(self.keys.private(), &ct)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::OnceLock;

    fn codec() -> CipherCodec {
        static KEYS: OnceLock<Arc<KeyPair>> = OnceLock::new();
        let keys = KEYS.get_or_init(|| Arc::new(KeyPair::generate(2048).expect("generate test key")));
        CipherCodec::from_shared(keys.clone())
    }

    /// A JSON string literal that serialises to exactly `len` bytes.
    fn payload_of_len(len: usize) -> Value {
        Value::String("x".repeat(len - 2))
    }

    #[test]
    fn roundtrip_structured_value() {
        let codec = codec();
        let payload = json!({
            "submitterIdentifier": "42",
            "evaluatedParties": [
                {"displayName": "A. Kumar", "courseCode": "CS101", "comment": "great"}
            ]
        });
        let blob = codec.encrypt(&payload).unwrap();
        let back: Value = codec.decrypt(&blob).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn ceiling_is_inclusive() {
        let codec = codec();
        let limit = codec.max_payload_len();
        assert_eq!(limit, 190);

        let at_limit = payload_of_len(limit);
        assert_eq!(serde_json::to_vec(&at_limit).unwrap().len(), limit);
        let blob = codec.encrypt(&at_limit).unwrap();
        assert_eq!(codec.decrypt::<Value>(&blob).unwrap(), at_limit);

        let over = payload_of_len(limit + 1);
        let err = codec.encrypt(&over).unwrap_err();
        assert!(matches!(err, CryptoError::PayloadTooLarge { size: 191, limit: 190 }));
    }

    #[test]
    fn encryption_is_randomised() {
        let codec = codec();
        let payload = json!({"rating": 5});
        let a = codec.encrypt(&payload).unwrap();
        let b = codec.encrypt(&payload).unwrap();
        assert_ne!(a, b);
        assert_eq!(codec.decrypt::<Value>(&a).unwrap(), payload);
        assert_eq!(codec.decrypt::<Value>(&b).unwrap(), payload);
    }

    #[test]
    fn malformed_base64_is_decode_error() {
        let err = codec().decrypt::<Value>("not*base64!").unwrap_err();
        assert!(matches!(err, CryptoError::Decode(_)));
        assert!(err.is_per_record());
    }

    #[test]
    fn tampered_blob_is_decryption_error() {
        let codec = codec();
        let blob = codec.encrypt(&json!({"comment": "fine"})).unwrap();
        let mut raw = STANDARD.decode(&blob).unwrap();
        raw[40] ^= 0xff;
        let err = codec.decrypt::<Value>(&STANDARD.encode(raw)).unwrap_err();
        assert!(matches!(err, CryptoError::Decryption));
    }

    #[test]
    fn non_json_plaintext_is_deserialisation_error() {
        let codec = codec();
        let blob = codec.encrypt_bytes(b"{not json").unwrap();
        let err = codec.decrypt::<Value>(&blob).unwrap_err();
        assert!(matches!(err, CryptoError::Deserialisation(_)));
    }

    #[test]
    fn chunked_envelope_roundtrip() {
        let codec = codec().with_chunking(ChunkingMode::Enabled { max_chunks: 8 });
        let payload = json!({"comment": "long ".repeat(100)});
        let blob = codec.encrypt(&payload).unwrap();
        assert!(blob.starts_with("chunked:v1:3:"));
        assert_eq!(codec.decrypt::<Value>(&blob).unwrap(), payload);

        // Readers with chunking disabled still open envelopes.
        let reader = CipherCodec::from_shared(codec.keys.clone());
        assert_eq!(reader.decrypt::<Value>(&blob).unwrap(), payload);
    }

    #[test]
    fn small_payload_stays_single_block_when_chunking() {
        let codec = codec().with_chunking(ChunkingMode::Enabled { max_chunks: 8 });
        let blob = codec.encrypt(&json!({"a": 1})).unwrap();
        assert!(!blob.starts_with(CHUNK_PREFIX));
    }

    #[test]
    fn chunk_limit_enforced() {
        let codec = codec().with_chunking(ChunkingMode::Enabled { max_chunks: 2 });
        let err = codec.encrypt(&payload_of_len(600)).unwrap_err();
        assert!(matches!(err, CryptoError::PayloadTooLarge { size: 600, limit: 380 }));
    }

    #[test]
    fn reader_settings_do_not_limit_stored_envelopes() {
        let writer = codec().with_chunking(ChunkingMode::Enabled { max_chunks: 200 });
        let payload = payload_of_len(70 * writer.max_payload_len());
        let blob = writer.encrypt(&payload).unwrap();
        assert!(blob.starts_with("chunked:v1:70:"));

        let narrow = codec().with_chunking(ChunkingMode::Enabled { max_chunks: 2 });
        for reader in [codec(), narrow] {
            assert_eq!(reader.decrypt::<Value>(&blob).unwrap(), payload);
        }
    }

    #[test]
    fn sealing_is_capped_at_envelope_ceiling() {
        let codec = codec().with_chunking(ChunkingMode::Enabled { max_chunks: 10_000 });
        let limit = codec.max_payload_len();
        let err = codec
            .encrypt(&payload_of_len(limit * MAX_ENVELOPE_BLOCKS + 1))
            .unwrap_err();
        assert!(matches!(err, CryptoError::PayloadTooLarge { .. }));
    }

    #[test]
    fn chunking_mode_bounds_validated() {
        assert!(ChunkingMode::Disabled.validate().is_ok());
        assert!(ChunkingMode::Enabled { max_chunks: MAX_ENVELOPE_BLOCKS }.validate().is_ok());
        assert!(ChunkingMode::Enabled { max_chunks: 0 }.validate().is_err());
        assert!(ChunkingMode::Enabled { max_chunks: MAX_ENVELOPE_BLOCKS + 1 }.validate().is_err());
    }

    #[test]
    fn envelope_count_mismatch_rejected() {
        let codec = codec().with_chunking(ChunkingMode::Enabled { max_chunks: 8 });
        let blob = codec.encrypt(&payload_of_len(300)).unwrap();
        let (_, blocks) = blob.strip_prefix("chunked:v1:2:").unwrap().split_once(',').unwrap();
        let forged = format!("chunked:v1:2:{blocks}");
        let err = codec.decrypt::<Value>(&forged).unwrap_err();
        assert!(matches!(err, CryptoError::Envelope(_)));

        let err = codec.decrypt::<Value>("chunked:v1:zero:AAAA").unwrap_err();
        assert!(matches!(err, CryptoError::Envelope(_)));
    }
}
