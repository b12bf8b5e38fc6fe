//! Store contract consumed by the feedback pipeline.

use async_trait::async_trait;
use uuid::Uuid;

use fb_proto::{
    Attributes, EncryptedFeedbackRecord, EvaluatedPartyIdentity, NewFeedbackRecord, PartyName,
    SubmitterIdentity,
};

use crate::error::StoreError;

/// One row of a batch read. A row that cannot be converted is reported in
/// place so the rest of the batch stays readable.
pub type StoredRecord = Result<EncryptedFeedbackRecord, StoreError>;

/// Every `Vec` returned here is in insertion (id) order.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Id and display name of every evaluated party.
    async fn party_names(&self) -> Result<Vec<PartyName>, StoreError>;

    async fn get_party(&self, id: i64) -> Result<Option<EvaluatedPartyIdentity>, StoreError>;

    async fn insert_party(
        &self,
        display_name: &str,
        attributes: &Attributes,
    ) -> Result<EvaluatedPartyIdentity, StoreError>;

    async fn find_submitter(
        &self,
        external_ref: &str,
    ) -> Result<Option<SubmitterIdentity>, StoreError>;

    /// Insert a submitter, or return the existing row for `external_ref`.
    async fn insert_submitter(&self, external_ref: &str) -> Result<SubmitterIdentity, StoreError>;

    async fn get_submitter(&self, id: i64) -> Result<Option<SubmitterIdentity>, StoreError>;

    async fn insert_record(
        &self,
        record: NewFeedbackRecord<'_>,
    ) -> Result<EncryptedFeedbackRecord, StoreError>;

    /// Records already written under `submission_id`.
    async fn records_for_submission(
        &self,
        submission_id: Uuid,
    ) -> Result<Vec<StoredRecord>, StoreError>;

    async fn records_for_party(
        &self,
        evaluated_party_ref: i64,
    ) -> Result<Vec<StoredRecord>, StoreError>;

    async fn records_for_submitter(
        &self,
        submitter_ref: i64,
    ) -> Result<Vec<StoredRecord>, StoreError>;
}
