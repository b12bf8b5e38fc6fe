use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    #[error("Invalid name: display name is empty")]
    InvalidName,

    #[error("Identity {0} not found")]
    IdentityNotFound(i64),

    #[error("Crypto error: {0}")]
    Crypto(#[from] fb_crypto::CryptoError),

    #[error("Store error: {0}")]
    Store(#[from] fb_store::StoreError),
}
