/*!
 * Database entity models and DTOs.
 *
 * These structures map directly to database tables and provide
 * type-safe access to persisted data.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::document::{DocumentKind, Loc};

/// Processing step whose input hash is remembered per source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    /// Search fragments were stored
    Fragments,
    /// Display chunks were stored
    Chunks,
}

impl ProcessingStage {
    /// Column of `sources` holding the body hash for this stage
    pub fn hash_column(&self) -> &'static str {
        match self {
            ProcessingStage::Fragments => "fragments_hash",
            ProcessingStage::Chunks => "chunks_hash",
        }
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingStage::Fragments => write!(f, "fragments"),
            ProcessingStage::Chunks => write!(f, "chunks"),
        }
    }
}

impl std::str::FromStr for ProcessingStage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fragments" => Ok(ProcessingStage::Fragments),
            "chunks" => Ok(ProcessingStage::Chunks),
            _ => Err(anyhow::anyhow!("Invalid processing stage: {}", s)),
        }
    }
}

/// Stored source document metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub id: i64,
    pub source_key: String,
    pub kind: DocumentKind,
    pub title: Option<String>,
    pub url: Option<String>,
    pub published: Option<String>,
    /// Comma separated tags
    pub tags: String,
    /// Body hash when fragments were last stored
    pub fragments_hash: Option<String>,
    /// Body hash when chunks were last stored
    pub chunks_hash: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A distinct fragment text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentRecord {
    pub id: i64,
    pub text: String,
    pub count_chars: i64,
    pub count_meaty_chars: i64,
}

/// One occurrence of a fragment in a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitRef {
    pub source_key: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub tags: String,
    pub loc: Option<Loc>,
}

/// A fragment with a sample of the places it occurs in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentWithRefs {
    pub fragment: FragmentRecord,
    pub refs: Vec<HitRef>,
    /// Number of occurrences before sampling
    pub total_refs: usize,
}

/// A stored display chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRecord {
    pub id: i64,
    pub source_id: i64,
    pub seq: i64,
    pub loc: Option<Loc>,
    pub text: String,
    pub html: String,
}

/// Result of storing a source's fragments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreSummary {
    pub source_id: i64,
    /// Fragment texts seen for the first time
    pub new_fragments: usize,
    /// Occurrences recorded for the source
    pub hits: usize,
    /// Fragment texts dropped because no source uses them any more
    pub removed_fragments: usize,
}
