//! Stored ciphertext rows and the views the pipeline hands back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::submission::FeedbackSubmission;

/// One stored row. `ciphertext` opens to the *whole* submission, not just
/// the mention for `evaluated_party_ref`; rows from one submission share a
/// `submission_id` and differ only in their routing key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedFeedbackRecord {
    pub record_id: i64,
    pub submission_id: Uuid,
    pub submitter_ref: i64,
    pub evaluated_party_ref: i64,
    pub ciphertext: String,
    pub created_at: DateTime<Utc>,
}

/// Insert form of `EncryptedFeedbackRecord`; the store assigns the id and
/// timestamp.
#[derive(Debug, Clone)]
pub struct NewFeedbackRecord<'a> {
    pub submission_id: Uuid,
    pub submitter_ref: i64,
    pub evaluated_party_ref: i64,
    pub ciphertext: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSummary {
    pub record_id: i64,
    pub evaluated_party_ref: i64,
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Name was empty after trimming.
    EmptyName,
    /// Identity lookup or creation failed.
    ResolutionFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedMention {
    /// Position in `evaluated_parties`.
    pub index: usize,
    pub display_name: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub submission_id: Uuid,
    pub records: Vec<RecordSummary>,
    pub skipped: Vec<SkippedMention>,
}

/// A record opened for an evaluated party; `payload` only carries the
/// mentions that matched that party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyFeedback {
    pub record_id: i64,
    pub submission_id: Uuid,
    pub submitter_ref: i64,
    pub evaluated_party_ref: i64,
    pub created_at: DateTime<Utc>,
    pub payload: FeedbackSubmission,
}

/// A record opened for its submitter; `payload` is the full submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitterFeedback {
    pub record_id: i64,
    pub submission_id: Uuid,
    pub evaluated_party_ref: i64,
    pub created_at: DateTime<Utc>,
    pub payload: FeedbackSubmission,
}

/// Result of a batch read. `skipped` counts rows that could not be opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Retrieval<T> {
    pub results: Vec<T>,
    pub skipped: usize,
}

impl<T> Retrieval<T> {
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            skipped: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl<T> Default for Retrieval<T> {
    fn default() -> Self {
        Self::empty()
    }
}
