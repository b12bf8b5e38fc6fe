//! Feedback retrieval
//!
//! Each stored row is opened independently. A row that the store cannot
//! convert, or whose blob will not decode, decrypt or deserialise, is
//! logged and counted in `Retrieval::skipped`; the rest of the batch is
//! still returned.

use std::sync::Arc;

use tracing::{debug, warn};

use fb_crypto::CipherCodec;
use fb_proto::{
    EncryptedFeedbackRecord, FeedbackSubmission, PartyFeedback, Retrieval, SubmitterFeedback,
};
use fb_store::{FeedbackStore, StoredRecord};

use crate::error::PipelineError;
use crate::identity::SubmitterResolver;
use crate::matcher::NameMatcher;

#[derive(Clone)]
pub struct FeedbackRetriever {
    store: Arc<dyn FeedbackStore>,
    codec: CipherCodec,
    matcher: Arc<dyn NameMatcher>,
    submitters: SubmitterResolver,
}

impl FeedbackRetriever {
    pub fn new(
        store: Arc<dyn FeedbackStore>,
        codec: CipherCodec,
        matcher: Arc<dyn NameMatcher>,
        submitters: SubmitterResolver,
    ) -> Self {
        Self {
            store,
            codec,
            matcher,
            submitters,
        }
    }

    /// Feedback about one evaluated party. Each result's payload keeps only
    /// the mentions whose name matches the party's canonical name; rows
    /// where nothing matches are left out.
    pub async fn by_evaluated_party(
        &self,
        identity_id: i64,
    ) -> Result<Retrieval<PartyFeedback>, PipelineError> {
        let records = self.store.records_for_party(identity_id).await?;
        if records.is_empty() {
            return Ok(Retrieval::empty());
        }

        let party = self
            .store
            .get_party(identity_id)
            .await?
            .ok_or(PipelineError::IdentityNotFound(identity_id))?;

        let mut out = Retrieval::empty();
        for row in records {
            let Some((record, payload)) = self.open(row)? else {
                out.skipped += 1;
                continue;
            };

            let payload = payload
                .narrowed(|m| self.matcher.matches(m.normalized_name(), &party.display_name));
            if payload.evaluated_parties.is_empty() {
                debug!(record_id = record.record_id, "no mention matches party name");
                continue;
            }

            out.results.push(PartyFeedback {
                record_id: record.record_id,
                submission_id: record.submission_id,
                submitter_ref: record.submitter_ref,
                evaluated_party_ref: record.evaluated_party_ref,
                created_at: record.created_at,
                payload,
            });
        }

        debug!(
            party_id = identity_id,
            returned = out.results.len(),
            skipped = out.skipped,
            "retrieved feedback for party"
        );
        Ok(out)
    }

    /// Everything one submitter sent, unfiltered.
    pub async fn by_submitter(
        &self,
        submitter_id: i64,
    ) -> Result<Retrieval<SubmitterFeedback>, PipelineError> {
        let records = self.store.records_for_submitter(submitter_id).await?;
        if records.is_empty() {
            return Ok(Retrieval::empty());
        }
        if self.store.get_submitter(submitter_id).await?.is_none() {
            return Err(PipelineError::IdentityNotFound(submitter_id));
        }

        let mut out = Retrieval::empty();
        for row in records {
            let Some((record, payload)) = self.open(row)? else {
                out.skipped += 1;
                continue;
            };
            out.results.push(SubmitterFeedback {
                record_id: record.record_id,
                submission_id: record.submission_id,
                evaluated_party_ref: record.evaluated_party_ref,
                created_at: record.created_at,
                payload,
            });
        }
        Ok(out)
    }

    /// `by_submitter` keyed by the identifier the client submitted with.
    /// Unknown submitters have no feedback.
    pub async fn by_submitter_ref(
        &self,
        identifier: &str,
    ) -> Result<Retrieval<SubmitterFeedback>, PipelineError> {
        match self.submitters.lookup(identifier).await? {
            Some(submitter) => self.by_submitter(submitter.id).await,
            None => Ok(Retrieval::empty()),
        }
    }

    fn open(
        &self,
        row: StoredRecord,
    ) -> Result<Option<(EncryptedFeedbackRecord, FeedbackSubmission)>, PipelineError> {
        let record = match row {
            Ok(record) => record,
            Err(err) if err.is_per_record() => {
                warn!(error = %err, "skipping malformed feedback row");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        match self.codec.decrypt(&record.ciphertext) {
            Ok(payload) => Ok(Some((record, payload))),
            Err(err) if err.is_per_record() => {
                warn!(record_id = record.record_id, error = %err, "skipping unreadable feedback record");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}
