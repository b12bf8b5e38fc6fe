//! fb_crypto: public-key sealing of feedback payloads
//!
//! # Design principles
//! - NO custom crypto; RSA and OAEP come from the `rsa` crate.
//! - The key pair is loaded once and shared read-only; there is no ambient
//!   global, callers hold a `CipherCodec` handle.
//! - PEM input is zeroized after parsing.
//!
//! # Module layout
//! - `keys`  : PEM loading / generation of the RSA key pair (the key store)
//! - `oaep`  : RSA-OAEP (SHA-256 / MGF1-SHA-256, empty label) block primitive
//! - `codec` : structured payload <-> transport-safe text blob
//! - `error` : unified error type

pub mod codec;
pub mod error;
pub mod keys;
pub mod oaep;

pub use codec::{ChunkingMode, CipherCodec, MAX_ENVELOPE_BLOCKS};
pub use error::CryptoError;
pub use keys::KeyPair;
