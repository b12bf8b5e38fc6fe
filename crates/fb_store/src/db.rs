//! SQLite backend over sqlx.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};
use uuid::Uuid;

use fb_proto::{
    Attributes, EncryptedFeedbackRecord, EvaluatedPartyIdentity, NewFeedbackRecord, PartyName,
    SubmitterIdentity,
};

use crate::backend::{FeedbackStore, StoredRecord};
use crate::error::StoreError;
use crate::migrations::run_migrations;
use crate::models::{PartyNameRow, PartyRow, RecordRow, SubmitterRow};

const RECORD_COLUMNS: &str =
    "id, submission_id, submitter_id, evaluated_party_id, ciphertext, created_at";

/// Central store handle. Cheap to clone (the pool is reference counted).
#[derive(Clone)]
pub struct Store {
    pub pool: SqlitePool,
}

impl Store {
    /// Open (or create) the SQLite database at `db_path` and run pending
    /// migrations.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);
        Self::with_options(opts, SqlitePoolOptions::new()).await
    }

    /// Open from a sqlx URL such as `sqlite://feedback.db`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        if url.contains(":memory:") {
            return Self::in_memory().await;
        }
        let opts = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);
        Self::with_options(opts, SqlitePoolOptions::new()).await
    }

    /// Private in-memory database. A single connection that is never
    /// recycled, otherwise the database would vanish with it.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>);
        Self::with_options(opts, pool).await
    }

    async fn with_options(
        opts: SqliteConnectOptions,
        pool: SqlitePoolOptions,
    ) -> Result<Self, StoreError> {
        let pool = pool.connect_with(opts).await?;
        run_migrations(&pool).await?;
        info!("feedback store ready");
        Ok(Self { pool })
    }

    async fn fetch_records(
        &self,
        column: &'static str,
        value: i64,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM feedback_records WHERE {column} = ? ORDER BY id");
        let rows: Vec<RecordRow> = sqlx::query_as(&sql).bind(value).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(EncryptedFeedbackRecord::try_from).collect())
    }
}

#[async_trait]
impl FeedbackStore for Store {
    async fn party_names(&self) -> Result<Vec<PartyName>, StoreError> {
        let rows: Vec<PartyNameRow> =
            sqlx::query_as("SELECT id, display_name FROM evaluated_parties ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_party(&self, id: i64) -> Result<Option<EvaluatedPartyIdentity>, StoreError> {
        let row: Option<PartyRow> = sqlx::query_as(
            "SELECT id, display_name, attributes, created_at FROM evaluated_parties WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(EvaluatedPartyIdentity::try_from).transpose()
    }

    async fn insert_party(
        &self,
        display_name: &str,
        attributes: &Attributes,
    ) -> Result<EvaluatedPartyIdentity, StoreError> {
        let row: PartyRow = sqlx::query_as(
            "INSERT INTO evaluated_parties (display_name, attributes, created_at) VALUES (?, ?, ?) \
             RETURNING id, display_name, attributes, created_at",
        )
        .bind(display_name)
        .bind(serde_json::to_string(attributes)?)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        debug!(party_id = row.id, "inserted evaluated party");
        row.try_into()
    }

    async fn find_submitter(
        &self,
        external_ref: &str,
    ) -> Result<Option<SubmitterIdentity>, StoreError> {
        let row: Option<SubmitterRow> = sqlx::query_as(
            "SELECT id, external_ref, created_at FROM submitters WHERE external_ref = ?",
        )
        .bind(external_ref)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn insert_submitter(&self, external_ref: &str) -> Result<SubmitterIdentity, StoreError> {
        sqlx::query(
            "INSERT INTO submitters (external_ref, created_at) VALUES (?, ?) \
             ON CONFLICT (external_ref) DO NOTHING",
        )
        .bind(external_ref)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let row: SubmitterRow = sqlx::query_as(
            "SELECT id, external_ref, created_at FROM submitters WHERE external_ref = ?",
        )
        .bind(external_ref)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn get_submitter(&self, id: i64) -> Result<Option<SubmitterIdentity>, StoreError> {
        let row: Option<SubmitterRow> =
            sqlx::query_as("SELECT id, external_ref, created_at FROM submitters WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Into::into))
    }

    async fn insert_record(
        &self,
        record: NewFeedbackRecord<'_>,
    ) -> Result<EncryptedFeedbackRecord, StoreError> {
        let sql = format!(
            "INSERT INTO feedback_records \
             (submission_id, submitter_id, evaluated_party_id, ciphertext, created_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING {RECORD_COLUMNS}"
        );
        let row: RecordRow = sqlx::query_as(&sql)
            .bind(record.submission_id.to_string())
            .bind(record.submitter_ref)
            .bind(record.evaluated_party_ref)
            .bind(record.ciphertext)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;
        debug!(record_id = row.id, party_id = row.evaluated_party_id, "inserted feedback record");
        row.try_into()
    }

    async fn records_for_submission(
        &self,
        submission_id: Uuid,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM feedback_records WHERE submission_id = ? ORDER BY id"
        );
        let rows: Vec<RecordRow> = sqlx::query_as(&sql)
            .bind(submission_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(EncryptedFeedbackRecord::try_from).collect())
    }

    async fn records_for_party(
        &self,
        evaluated_party_ref: i64,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        self.fetch_records("evaluated_party_id", evaluated_party_ref).await
    }

    async fn records_for_submitter(
        &self,
        submitter_ref: i64,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        self.fetch_records("submitter_id", submitter_ref).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn party_roundtrip_keeps_attributes() {
        let store = Store::in_memory().await.expect("open store");
        let mut attrs = Attributes::new();
        attrs.insert("course_code".into(), json!("CS101"));

        let created = store.insert_party("A. Kumar", &attrs).await.unwrap();
        let fetched = store.get_party(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.attributes.get("course_code"), Some(&json!("CS101")));
        assert!(store.get_party(created.id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_submitter_is_idempotent() {
        let store = Store::in_memory().await.expect("open store");
        let a = store.insert_submitter("42").await.unwrap();
        let b = store.insert_submitter("42").await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(store.find_submitter("42").await.unwrap(), Some(a.clone()));
        assert_eq!(store.get_submitter(a.id).await.unwrap(), Some(a));
        assert!(store.find_submitter("43").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_record_for_submission_and_party_rejected() {
        let store = Store::in_memory().await.expect("open store");
        let party = store.insert_party("X", &Attributes::new()).await.unwrap();
        let submitter = store.insert_submitter("s").await.unwrap();
        let submission_id = Uuid::new_v4();
        let record = NewFeedbackRecord {
            submission_id,
            submitter_ref: submitter.id,
            evaluated_party_ref: party.id,
            ciphertext: "AAAA",
        };
        store.insert_record(record.clone()).await.unwrap();
        let err = store.insert_record(record).await.unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[tokio::test]
    async fn record_requires_known_party() {
        let store = Store::in_memory().await.expect("open store");
        let submitter = store.insert_submitter("s").await.unwrap();
        let err = store
            .insert_record(NewFeedbackRecord {
                submission_id: Uuid::new_v4(),
                submitter_ref: submitter.id,
                evaluated_party_ref: 999,
                ciphertext: "AAAA",
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
    }
}
