//! Fixed-width sort keys for frontier entries.
//!
//! Layout: `[priority, depth, docid_be32]`. Byte-wise comparison of two keys
//! is the crawl order: lower priority value first, then shallower depth, then
//! earlier docid.

use std::fmt;

use crate::models::UrlRecord;

pub const KEY_LEN: usize = 6;

/// Depths beyond this share the last depth bucket.
pub const MAX_DEPTH_BYTE: u8 = i8::MAX as u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrontierKey([u8; KEY_LEN]);

impl FrontierKey {
    pub fn new(priority: u8, depth: u32, docid: u32) -> Self {
        let depth_byte = depth.min(MAX_DEPTH_BYTE as u32) as u8;
        let docid = docid.to_be_bytes();
        Self([
            priority, depth_byte, docid[0], docid[1], docid[2], docid[3],
        ])
    }

    pub fn for_record(record: &UrlRecord) -> Self {
        Self::new(record.priority, record.depth, record.docid)
    }

    /// Rebuild a key read back from the store. `None` unless exactly six bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        <[u8; KEY_LEN]>::try_from(bytes).ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn priority(&self) -> u8 {
        self.0[0]
    }

    /// Stored depth, already clamped.
    pub fn depth(&self) -> u8 {
        self.0[1]
    }

    pub fn docid(&self) -> u32 {
        u32::from_be_bytes([self.0[2], self.0[3], self.0[4], self.0[5]])
    }
}

impl fmt::Display for FrontierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "p{}/d{}/#{}",
            self.priority(),
            self.depth(),
            self.docid()
        )
    }
}
