use fb_crypto::ChunkingMode;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::matcher::MatcherKind;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// How payloads above the single-block ceiling are handled.
    #[serde(default)]
    pub chunking: ChunkingMode,
    /// Abort the whole ingest when one mention cannot be resolved.
    #[serde(default)]
    pub strict_resolution: bool,
    #[serde(default)]
    pub matcher: MatcherKind,
}

impl PipelineSettings {
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.chunking.validate()?;
        Ok(())
    }
}
