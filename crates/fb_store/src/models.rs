//! Database row models: these map to/from SQL rows.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use fb_proto::{
    Attributes, EncryptedFeedbackRecord, EvaluatedPartyIdentity, PartyName, SubmitterIdentity,
};

use crate::error::StoreError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PartyRow {
    pub id: i64,
    pub display_name: String,
    /// JSON object
    pub attributes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PartyNameRow {
    pub id: i64,
    pub display_name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubmitterRow {
    pub id: i64,
    pub external_ref: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecordRow {
    pub id: i64,
    /// Hyphenated UUID
    pub submission_id: String,
    pub submitter_id: i64,
    pub evaluated_party_id: i64,
    /// Base64 OAEP ciphertext (or chunked envelope)
    pub ciphertext: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PartyRow> for EvaluatedPartyIdentity {
    type Error = StoreError;

    fn try_from(row: PartyRow) -> Result<Self, Self::Error> {
        let attributes: Attributes =
            serde_json::from_str(&row.attributes).map_err(|e| StoreError::Corrupt {
                table: "evaluated_parties",
                detail: format!("id {}: attributes: {e}", row.id),
            })?;
        Ok(Self {
            id: row.id,
            display_name: row.display_name,
            attributes,
            created_at: row.created_at,
        })
    }
}

impl From<PartyNameRow> for PartyName {
    fn from(row: PartyNameRow) -> Self {
        Self {
            id: row.id,
            display_name: row.display_name,
        }
    }
}

impl From<SubmitterRow> for SubmitterIdentity {
    fn from(row: SubmitterRow) -> Self {
        Self {
            id: row.id,
            external_ref: row.external_ref,
            created_at: row.created_at,
        }
    }
}

impl TryFrom<RecordRow> for EncryptedFeedbackRecord {
    type Error = StoreError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let submission_id =
            Uuid::parse_str(&row.submission_id).map_err(|e| StoreError::Corrupt {
                table: "feedback_records",
                detail: format!("id {}: submission_id: {e}", row.id),
            })?;
        Ok(Self {
            record_id: row.id,
            submission_id,
            submitter_ref: row.submitter_id,
            evaluated_party_ref: row.evaluated_party_id,
            ciphertext: row.ciphertext,
            created_at: row.created_at,
        })
    }
}
