//! Identity resolution
//!
//! Evaluated parties are matched loosely through a `NameMatcher` and
//! created on first sight. Submitters are matched exactly on the
//! identifier the client sent; there is no hashing of non-numeric ids.
//!
//! Two concurrent ingests naming the same *new* party can both miss and
//! both create it. Submitters do not have this problem: the `submitters`
//! table is unique on `external_ref`.

use std::sync::Arc;

use tracing::{debug, info};

use fb_proto::{Attributes, EvaluatedPartyIdentity, SubmitterIdentity};
use fb_store::FeedbackStore;

use crate::error::PipelineError;
use crate::matcher::NameMatcher;

#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn FeedbackStore>,
    matcher: Arc<dyn NameMatcher>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn FeedbackStore>, matcher: Arc<dyn NameMatcher>) -> Self {
        Self { store, matcher }
    }

    /// First known party (in store order) whose name matches `display_name`.
    pub async fn find(
        &self,
        display_name: &str,
    ) -> Result<Option<EvaluatedPartyIdentity>, PipelineError> {
        let name = display_name.trim();
        if name.is_empty() {
            return Err(PipelineError::InvalidName);
        }
        let hit = self
            .store
            .party_names()
            .await?
            .into_iter()
            .find(|party| self.matcher.matches(name, &party.display_name));
        match hit {
            Some(party) => Ok(self.store.get_party(party.id).await?),
            None => Ok(None),
        }
    }

    /// Map a free-text name to a party, creating one with `hints` as its
    /// attributes when nothing matches.
    pub async fn resolve_or_create(
        &self,
        display_name: &str,
        hints: &Attributes,
    ) -> Result<EvaluatedPartyIdentity, PipelineError> {
        if let Some(party) = self.find(display_name).await? {
            debug!(party_id = party.id, "resolved evaluated party");
            return Ok(party);
        }

        let party = self.store.insert_party(display_name.trim(), hints).await?;
        info!(party_id = party.id, "created evaluated party");
        Ok(party)
    }
}

#[derive(Clone)]
pub struct SubmitterResolver {
    store: Arc<dyn FeedbackStore>,
}

impl SubmitterResolver {
    pub fn new(store: Arc<dyn FeedbackStore>) -> Self {
        Self { store }
    }

    /// Look up a submitter without creating one.
    pub async fn lookup(
        &self,
        identifier: &str,
    ) -> Result<Option<SubmitterIdentity>, PipelineError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Ok(None);
        }
        Ok(self.store.find_submitter(identifier).await?)
    }

    pub async fn resolve_or_create(
        &self,
        identifier: &str,
    ) -> Result<SubmitterIdentity, PipelineError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(PipelineError::InvalidSubmission(
                "submitter identifier is empty".into(),
            ));
        }
        if let Some(existing) = self.store.find_submitter(identifier).await? {
            return Ok(existing);
        }
        let submitter = self.store.insert_submitter(identifier).await?;
        info!(submitter_id = submitter.id, "registered submitter");
        Ok(submitter)
    }
}
