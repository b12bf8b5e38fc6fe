//! Resolved identities. Integer ids are assigned by the store and are
//! stable for the lifetime of the row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form metadata kept next to an identity (e.g. `course_code`).
pub type Attributes = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedPartyIdentity {
    pub id: i64,
    pub display_name: String,
    #[serde(default)]
    pub attributes: Attributes,
    pub created_at: DateTime<Utc>,
}

/// Just enough of a party to match names against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyName {
    pub id: i64,
    pub display_name: String,
}

/// A submitter, keyed by the exact identifier the client supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitterIdentity {
    pub id: i64,
    pub external_ref: String,
    pub created_at: DateTime<Utc>,
}
