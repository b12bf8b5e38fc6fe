//! fb_pipeline: The sealed-feedback pipeline
//!
//! Ingest:    validate → seal whole submission once → resolve each named
//!            party → one stored record per party, all sharing the blob.
//! Retrieve:  load rows for a party (or submitter) → open each blob →
//!            keep only the mentions that belong to the requested party.
//!
//! A row that cannot be opened is logged and skipped; it never fails the
//! batch. Input validation and store failures do.
//!
//! # Modules
//! - `matcher`  : pluggable display-name matching
//! - `identity` : evaluated-party and submitter resolution
//! - `ingest`   : `FeedbackIngestor`
//! - `retrieve` : `FeedbackRetriever`
//! - `settings` : `PipelineSettings`
//! - `error`    : unified error type

pub mod error;
pub mod identity;
pub mod ingest;
pub mod matcher;
pub mod retrieve;
pub mod settings;

use std::sync::Arc;

use fb_crypto::{CipherCodec, KeyPair};
use fb_store::FeedbackStore;

pub use error::PipelineError;
pub use identity::{IdentityResolver, SubmitterResolver};
pub use ingest::FeedbackIngestor;
pub use matcher::{ExactMatcher, MatcherKind, NameMatcher, SubstringMatcher};
pub use retrieve::FeedbackRetriever;
pub use settings::PipelineSettings;

/// Ingestor and retriever wired to one store, one codec and one matcher.
#[derive(Clone)]
pub struct FeedbackPipeline {
    pub ingestor: FeedbackIngestor,
    pub retriever: FeedbackRetriever,
}

impl FeedbackPipeline {
    pub fn new(store: Arc<dyn FeedbackStore>, keys: KeyPair, settings: &PipelineSettings) -> Self {
        let codec = CipherCodec::new(keys).with_chunking(settings.chunking);
        let matcher = settings.matcher.build();
        let identities = IdentityResolver::new(store.clone(), matcher.clone());
        let submitters = SubmitterResolver::new(store.clone());

        Self {
            ingestor: FeedbackIngestor::new(
                store.clone(),
                codec.clone(),
                identities,
                submitters.clone(),
            )
            .strict_resolution(settings.strict_resolution),
            retriever: FeedbackRetriever::new(store, codec, matcher, submitters),
        }
    }
}
