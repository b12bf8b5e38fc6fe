//! fb_proto: Data model shared by the store, the pipeline and the CLI
//!
//! Everything that is sealed is a `FeedbackSubmission` serialised as JSON
//! (camelCase keys). Everything that is stored in plaintext is identifiers
//! and timestamps only.
//!
//! # Modules
//! - `submission`: the plaintext payload (inside the ciphertext blob)
//! - `identity`  : evaluated parties and submitters
//! - `record`    : stored ciphertext rows and the ingest / retrieval views

pub mod identity;
pub mod record;
pub mod submission;

pub use identity::{Attributes, EvaluatedPartyIdentity, PartyName, SubmitterIdentity};
pub use record::{
    EncryptedFeedbackRecord, IngestReport, NewFeedbackRecord, PartyFeedback, RecordSummary,
    Retrieval, SkipReason, SkippedMention, SubmitterFeedback,
};
pub use submission::{EvaluatedPartyMention, FeedbackSubmission};
