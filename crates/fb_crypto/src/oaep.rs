//! RSA-OAEP block primitive
//!
//! SHA-256 is both the label hash and the MGF1 hash; the label is empty.
//! One block carries at most `k - 2*hLen - 2` plaintext bytes, where `k` is
//! the modulus length in bytes (190 bytes for a 2048-bit key).
//!
//! Ciphertext is always exactly `k` bytes.

use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::error::CryptoError;

const HASH_LEN: usize = 32;

/// Plaintext ceiling for one OAEP block under `key`.
pub fn max_plaintext_len(key: &RsaPublicKey) -> usize {
    key.size().saturating_sub(2 * HASH_LEN + 2)
}

fn padding() -> Oaep {
    Oaep::new::<Sha256>()
}

/// Encrypt one block. Randomised: the same input never yields the same
/// ciphertext twice.
pub fn encrypt(key: &RsaPublicKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let limit = max_plaintext_len(key);
    if plaintext.len() > limit {
        return Err(CryptoError::PayloadTooLarge {
            size: plaintext.len(),
            limit,
        });
    }
    key.encrypt(&mut OsRng, padding(), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))
}

/// Decrypt one block. Any padding or length failure collapses to
/// `Decryption` so callers cannot distinguish failure modes.
pub fn decrypt(key: &RsaPrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() != key.size() {
        return Err(CryptoError::Decryption);
    }
    key.decrypt(padding(), ciphertext)
        .map_err(|_| CryptoError::Decryption)
}
