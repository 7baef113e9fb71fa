use rkyv::{AlignedVec, Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};
use thiserror::Error;

use crate::key_encoder::FrontierKey;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Serialize failed: {0}")]
    Serialize(String),

    #[error("Deserialize failed: {0}")]
    Deserialize(String),
}

/// A URL waiting in the frontier.
///
/// `(priority, depth, docid)` decides the crawl order and never changes once
/// the record has been written; everything else is provenance.
#[derive(
    Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
#[archive(check_bytes)]
pub struct UrlRecord {
    /// The URL as it was discovered.
    pub url: String,

    /// Canonical form used as the dedup identity.
    pub canonical_url: String,

    /// Unique per canonical URL; lower docids were discovered earlier.
    pub docid: u32,

    /// Docid of the page the link was found on. `None` for seeds.
    pub parent_docid: Option<u32>,

    pub parent_url: Option<String>,

    /// Anchor text of the link, when the extractor captured one.
    pub anchor: Option<String>,

    /// 0 is crawled first.
    pub priority: u8,

    /// Link hops from a seed.
    pub depth: u32,
}

impl UrlRecord {
    /// Create a seed-like record with priority 0 and depth 0.
    pub fn new(url: impl Into<String>, canonical_url: impl Into<String>, docid: u32) -> Self {
        Self {
            url: url.into(),
            canonical_url: canonical_url.into(),
            docid,
            parent_docid: None,
            parent_url: None,
            anchor: None,
            priority: 0,
            depth: 0,
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_parent(mut self, parent_docid: u32, parent_url: impl Into<String>) -> Self {
        self.parent_docid = Some(parent_docid);
        self.parent_url = Some(parent_url.into());
        self
    }

    pub fn with_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }

    /// Sort key this record is stored under.
    pub fn key(&self) -> FrontierKey {
        FrontierKey::for_record(self)
    }

    /// Serialize to the stored value layout.
    pub fn encode(&self) -> Result<AlignedVec, RecordError> {
        rkyv::to_bytes::<_, 256>(self).map_err(|e| RecordError::Serialize(e.to_string()))
    }

    /// Validate and deserialize a stored value.
    pub fn decode(bytes: &[u8]) -> Result<Self, RecordError> {
        // redb hands out unaligned slices; rkyv needs aligned input.
        let mut aligned = AlignedVec::with_capacity(bytes.len());
        aligned.extend_from_slice(bytes);
        rkyv::from_bytes::<UrlRecord>(&aligned)
            .map_err(|e| RecordError::Deserialize(format!("{:?}", e)))
    }
}
