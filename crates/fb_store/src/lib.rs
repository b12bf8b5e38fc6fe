//! fb_store: Storage for identities and sealed feedback records
//!
//! # What is stored in plaintext
//! Only routing data: identity names and attributes, submitter refs,
//! record ids, submission ids and timestamps. Feedback content lives
//! exclusively in the `ciphertext` column, sealed by `fb_crypto`.
//!
//! # Backends
//! `FeedbackStore` is the contract the pipeline is written against.
//! `Store` implements it over SQLite via sqlx; migrations in
//! `migrations/` are run on open.

pub mod backend;
pub mod db;
pub mod error;
pub mod migrations;
pub mod models;

pub use backend::{FeedbackStore, StoredRecord};
pub use db::Store;
pub use error::StoreError;
