//! Plaintext feedback payload. This is what gets sealed, in full, into
//! every record produced by one submission.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSubmission {
    /// Free-text submitter identifier as supplied by the client.
    #[serde(alias = "student_id")]
    pub submitter_identifier: String,
    #[serde(alias = "instructors")]
    pub evaluated_parties: Vec<EvaluatedPartyMention>,
    /// Top-level fields the client sends alongside the mentions
    /// (programme, semester, ...). Sealed and returned unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One evaluated party named in a submission.
///
/// Ratings, comments and anything else the client sends are kept verbatim
/// in `details` so they survive the seal/open round trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatedPartyMention {
    #[serde(alias = "name")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_code: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl EvaluatedPartyMention {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            course_code: None,
            details: Map::new(),
        }
    }

    pub fn with_course(mut self, course_code: impl Into<String>) -> Self {
        self.course_code = Some(course_code.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Display name with surrounding whitespace removed.
    pub fn normalized_name(&self) -> &str {
        self.display_name.trim()
    }
}

impl FeedbackSubmission {
    pub fn new(submitter_identifier: impl Into<String>) -> Self {
        Self {
            submitter_identifier: submitter_identifier.into(),
            evaluated_parties: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn with_party(mut self, mention: EvaluatedPartyMention) -> Self {
        self.evaluated_parties.push(mention);
        self
    }

    /// Copy of this submission keeping only the mentions `keep` accepts.
    pub fn narrowed<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&EvaluatedPartyMention) -> bool,
    {
        Self {
            submitter_identifier: self.submitter_identifier.clone(),
            evaluated_parties: self
                .evaluated_parties
                .iter()
                .filter(|m| keep(m))
                .cloned()
                .collect(),
            extra: self.extra.clone(),
        }
    }
}
