use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Key load failed: {0}")]
    KeyLoad(String),

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Payload of {size} bytes exceeds the OAEP ceiling of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("OAEP encryption failed: {0}")]
    Encryption(String),

    #[error("OAEP decryption failed (padding check failed: wrong key or tampered blob)")]
    Decryption,

    #[error("Malformed ciphertext envelope: {0}")]
    Envelope(String),

    #[error("Serialisation error: {0}")]
    Serialisation(#[source] serde_json::Error),

    #[error("Deserialisation error: {0}")]
    Deserialisation(#[source] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),
}

impl CryptoError {
    /// Errors that belong to a single stored blob rather than to the caller
    /// or the key material. Batch readers skip these and carry on.
    pub fn is_per_record(&self) -> bool {
        matches!(
            self,
            CryptoError::Decode(_)
                | CryptoError::Decryption
                | CryptoError::Deserialisation(_)
                | CryptoError::Envelope(_)
        )
    }
}
