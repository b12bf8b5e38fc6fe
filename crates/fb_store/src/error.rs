use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),

    #[error("Corrupt row in {table}: {detail}")]
    Corrupt { table: &'static str, detail: String },

    #[error("Migration error: {0}")]
    Migration(String),
}

impl StoreError {
    /// True when only the row being read is affected, not the store.
    pub fn is_per_record(&self) -> bool {
        matches!(self, StoreError::Corrupt { .. })
    }
}
