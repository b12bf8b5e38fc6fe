//! Feedback ingestion
//!
//! The whole submission is sealed once and the same blob is stored under
//! every evaluated party it names, so each party's feedback can be fetched
//! by its own key without opening anyone else's rows.
//!
//! There is no transaction around the per-party inserts. Each insert is
//! keyed by `(submission_id, party)`, so re-running `ingest_as` with the
//! same submission id after a crash fills in only the missing rows. A
//! re-run must carry the same submission that was stored the first time.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use fb_crypto::CipherCodec;
use fb_proto::{
    Attributes, EncryptedFeedbackRecord, EvaluatedPartyMention, FeedbackSubmission, IngestReport,
    NewFeedbackRecord, RecordSummary, SkipReason, SkippedMention,
};
use fb_store::FeedbackStore;

use crate::error::PipelineError;
use crate::identity::{IdentityResolver, SubmitterResolver};

#[derive(Clone)]
pub struct FeedbackIngestor {
    store: Arc<dyn FeedbackStore>,
    codec: CipherCodec,
    identities: IdentityResolver,
    submitters: SubmitterResolver,
    strict_resolution: bool,
}

impl FeedbackIngestor {
    pub fn new(
        store: Arc<dyn FeedbackStore>,
        codec: CipherCodec,
        identities: IdentityResolver,
        submitters: SubmitterResolver,
    ) -> Self {
        Self {
            store,
            codec,
            identities,
            submitters,
            strict_resolution: false,
        }
    }

    /// When set, a mention whose identity cannot be resolved fails the
    /// whole call instead of being skipped.
    pub fn strict_resolution(mut self, strict: bool) -> Self {
        self.strict_resolution = strict;
        self
    }

    /// Ingest under a fresh submission id.
    pub async fn ingest(
        &self,
        submission: &FeedbackSubmission,
    ) -> Result<IngestReport, PipelineError> {
        self.ingest_as(Uuid::new_v4(), submission).await
    }

    /// Ingest under `submission_id`. Parties that already have a record for
    /// this submission are reported from the existing row.
    pub async fn ingest_as(
        &self,
        submission_id: Uuid,
        submission: &FeedbackSubmission,
    ) -> Result<IngestReport, PipelineError> {
        validate(submission)?;

        let ciphertext = self.codec.encrypt(submission)?;
        let mut stored = self.stored_rows(submission_id, submission).await?;
        let submitter = self
            .submitters
            .resolve_or_create(&submission.submitter_identifier)
            .await?;
        if let Some(foreign) = stored.values().find(|r| r.submitter_ref != submitter.id) {
            return Err(PipelineError::InvalidSubmission(format!(
                "submission {submission_id} already holds record {} of another submitter",
                foreign.record_id
            )));
        }

        let mut records = Vec::with_capacity(submission.evaluated_parties.len());
        let mut skipped = Vec::new();

        for (index, mention) in submission.evaluated_parties.iter().enumerate() {
            let name = mention.normalized_name();
            if name.is_empty() {
                debug!(index, "skipping mention with empty name");
                skipped.push(SkippedMention {
                    index,
                    display_name: mention.display_name.clone(),
                    reason: SkipReason::EmptyName,
                });
                continue;
            }

            let party = match self.identities.resolve_or_create(name, &hints_for(mention)).await {
                Ok(party) => party,
                Err(err) if self.strict_resolution => return Err(err),
                Err(err) => {
                    warn!(index, error = %err, "skipping mention: identity resolution failed");
                    skipped.push(SkippedMention {
                        index,
                        display_name: name.to_string(),
                        reason: SkipReason::ResolutionFailed,
                    });
                    continue;
                }
            };

            let record_id = match stored.get(&party.id) {
                Some(existing) => {
                    debug!(record_id = existing.record_id, party_id = party.id, "record already stored");
                    existing.record_id
                }
                None => {
                    let record = self
                        .store
                        .insert_record(NewFeedbackRecord {
                            submission_id,
                            submitter_ref: submitter.id,
                            evaluated_party_ref: party.id,
                            ciphertext: &ciphertext,
                        })
                        .await?;
                    let record_id = record.record_id;
                    stored.insert(party.id, record);
                    record_id
                }
            };

            records.push(RecordSummary {
                record_id,
                evaluated_party_ref: party.id,
                display_name: name.to_string(),
            });
        }

        info!(
            %submission_id,
            stored = records.len(),
            skipped = skipped.len(),
            "feedback submission ingested"
        );

        Ok(IngestReport {
            submission_id,
            records,
            skipped,
        })
    }
}

impl FeedbackIngestor {
    /// Rows an earlier run wrote under `submission_id`, keyed by party.
    /// They must hold the same submission that is being ingested now.
    async fn stored_rows(
        &self,
        submission_id: Uuid,
        submission: &FeedbackSubmission,
    ) -> Result<HashMap<i64, EncryptedFeedbackRecord>, PipelineError> {
        let mut stored = HashMap::new();
        for row in self.store.records_for_submission(submission_id).await? {
            let record = row?;
            stored.entry(record.evaluated_party_ref).or_insert(record);
        }

        if let Some(first) = stored.values().min_by_key(|r| r.record_id) {
            let earlier: FeedbackSubmission = self.codec.decrypt(&first.ciphertext)?;
            if earlier != *submission {
                return Err(PipelineError::InvalidSubmission(format!(
                    "submission {submission_id} was stored with different content"
                )));
            }
            debug!(%submission_id, rows = stored.len(), "resuming stored submission");
        }
        Ok(stored)
    }
}

fn validate(submission: &FeedbackSubmission) -> Result<(), PipelineError> {
    if submission.submitter_identifier.trim().is_empty() {
        return Err(PipelineError::InvalidSubmission(
            "submitter identifier is required".into(),
        ));
    }
    if submission.evaluated_parties.is_empty() {
        return Err(PipelineError::InvalidSubmission(
            "at least one evaluated party is required".into(),
        ));
    }
    Ok(())
}

/// Attributes recorded on a party created from this mention.
fn hints_for(mention: &EvaluatedPartyMention) -> Attributes {
    let mut hints = Attributes::new();
    if let Some(code) = mention.course_code.as_deref().map(str::trim) {
        if !code.is_empty() {
            hints.insert("course_code".into(), Value::String(code.to_string()));
        }
    }
    hints
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_requires_submitter_and_parties() {
        let no_parties = FeedbackSubmission::new("42");
        assert!(matches!(
            validate(&no_parties),
            Err(PipelineError::InvalidSubmission(_))
        ));

        let blank_submitter =
            FeedbackSubmission::new("  ").with_party(EvaluatedPartyMention::new("A"));
        assert!(matches!(
            validate(&blank_submitter),
            Err(PipelineError::InvalidSubmission(_))
        ));

        let ok = FeedbackSubmission::new("42").with_party(EvaluatedPartyMention::new("A"));
        assert!(validate(&ok).is_ok());
    }

    #[test]
    fn hints_carry_course_code() {
        let hints = hints_for(&EvaluatedPartyMention::new("A").with_course(" CS101 "));
        assert_eq!(hints.get("course_code"), Some(&Value::String("CS101".into())));
        assert!(hints_for(&EvaluatedPartyMention::new("A")).is_empty());
        assert!(hints_for(&EvaluatedPartyMention::new("A").with_course("")).is_empty());
    }
}
